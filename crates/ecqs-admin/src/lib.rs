//! # 叫号系统管理模块
//!
//! 提供配置加载、验证和日志初始化等运维功能

pub mod config;
pub mod logging;

pub use config::{
    AnnouncementConfig, CatalogConfig, CommandSinkConfig, ConfigManager, ConfigValidator,
    EcqsConfig, LoggingConfig, RetentionConfig, ServerConfig, SinkKind,
};
pub use logging::init_logging;
