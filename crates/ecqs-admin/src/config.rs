//! 配置管理
//!
//! 从 TOML 文件和 `ECQS_` 前缀的环境变量加载配置，提供验证和重新加载

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use tracing::{info, error};
use config::{Config, Environment, File};
use ecqs_core::{Room, RoomDirectory, RoomType};

/// 已完成记录最长保留时长（10年）
pub const MAX_RETENTION_HOURS: u32 = 10 * 365 * 24;

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<EcqsConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 叫号系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcqsConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 语音播报配置
    pub announcement: AnnouncementConfig,
    /// 记录保留配置
    pub retention: RetentionConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 房间目录，留空时使用内置目录
    pub catalog: CatalogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 播报输出方式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// 只写日志
    #[default]
    Log,
    /// 调用外部语音合成命令
    Command,
}

/// 语音播报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementConfig {
    /// 启用播报
    pub enabled: bool,
    /// 两种语言之间的停顿（毫秒）
    pub language_pause_ms: u64,
    /// 输出方式
    pub sink: SinkKind,
    /// 外部命令配置
    pub command: CommandSinkConfig,
}

/// 外部语音合成命令，参数中的 `{text}` 和 `{lang}` 会被替换
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSinkConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// 记录保留配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// 启用定期清理
    pub enabled: bool,
    /// 已完成记录保留时长（小时）
    pub max_age_hours: u32,
    /// 清理间隔（秒）
    pub sweep_interval_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 优先
    pub level: String,
    /// 输出 JSON 格式
    pub json: bool,
}

/// 房间目录配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub room_types: Vec<RoomType>,
    pub rooms: Vec<Room>,
}

impl AnnouncementConfig {
    pub fn language_pause(&self) -> Duration {
        Duration::from_millis(self.language_pause_ms)
    }
}

impl RetentionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.max_age_hours))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl CatalogConfig {
    pub fn is_empty(&self) -> bool {
        self.room_types.is_empty() && self.rooms.is_empty()
    }
}

impl EcqsConfig {
    /// 根据配置构建房间目录
    pub fn build_directory(&self) -> ecqs_core::Result<RoomDirectory> {
        if self.catalog.is_empty() {
            return Ok(RoomDirectory::default());
        }
        RoomDirectory::new(self.catalog.room_types.clone(), self.catalog.rooms.clone())
    }

    /// 序列化为 TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: String,
    /// 验证函数
    validator: fn(&EcqsConfig) -> Result<()>,
    /// 错误消息
    error_message: String,
}

impl ConfigManager {
    /// 创建新的配置管理器，配置文件不存在时使用默认值
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let validator = ConfigValidator::new();
        let config = Self::load_config(config_path)?;
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 加载配置，环境变量覆盖文件，如 `ECQS_SERVER__PORT=9000`
    fn load_config(config_path: Option<&str>) -> Result<EcqsConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("ECQS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: EcqsConfig = settings.try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!("Configuration loaded from: {}", config_path.unwrap_or("<defaults>"));
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> EcqsConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 重新加载配置，验证失败时保留旧配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration reloaded");
        Ok(())
    }

    /// 验证当前配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port".to_string(),
                validator: |config| {
                    if config.server.port == 0 {
                        Err(anyhow::anyhow!("Server port cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid server port".to_string(),
            },
            ValidationRule {
                field_path: "retention.sweep_interval_secs".to_string(),
                validator: |config| {
                    if config.retention.enabled && config.retention.sweep_interval_secs == 0 {
                        Err(anyhow::anyhow!("Sweep interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid retention settings".to_string(),
            },
            ValidationRule {
                field_path: "retention.max_age_hours".to_string(),
                validator: |config| {
                    if config.retention.max_age_hours > MAX_RETENTION_HOURS {
                        Err(anyhow::anyhow!(
                            "Max age cannot exceed {} hours",
                            MAX_RETENTION_HOURS
                        ))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid retention settings".to_string(),
            },
            ValidationRule {
                field_path: "announcement.command.program".to_string(),
                validator: |config| {
                    let announcement = &config.announcement;
                    if announcement.enabled
                        && announcement.sink == SinkKind::Command
                        && announcement.command.program.trim().is_empty()
                    {
                        Err(anyhow::anyhow!("Command sink requires a program"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid announcement settings".to_string(),
            },
            ValidationRule {
                field_path: "catalog".to_string(),
                validator: |config| {
                    config.build_directory().map(|_| ()).map_err(anyhow::Error::from)
                },
                error_message: "Invalid room catalog".to_string(),
            },
        ];

        Self {
            validation_rules,
        }
    }

    /// 验证配置
    pub fn validate(&self, config: &EcqsConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language_pause_ms: 500,
            sink: SinkKind::Log,
            command: CommandSinkConfig::default(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_hours: 24,
            sweep_interval_secs: 60 * 60, // 1 hour
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_config(contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("ecqs-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EcqsConfig::default();
        assert!(ConfigValidator::new().validate(&config).is_ok());
        assert_eq!(config.retention.max_age(), chrono::Duration::hours(24));
        assert_eq!(config.announcement.language_pause(), Duration::from_millis(500));
        assert_eq!(config.build_directory().unwrap().rooms().len(), 11);
    }

    #[test]
    fn test_validation_rules() {
        let validator = ConfigValidator::new();

        let mut config = EcqsConfig::default();
        config.server.port = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = EcqsConfig::default();
        config.retention.max_age_hours = u32::MAX;
        assert!(validator.validate(&config).is_err());
        config.retention.max_age_hours = MAX_RETENTION_HOURS;
        assert!(validator.validate(&config).is_ok());

        let mut config = EcqsConfig::default();
        config.announcement.sink = SinkKind::Command;
        assert!(validator.validate(&config).is_err());
        config.announcement.command.program = "espeak".to_string();
        assert!(validator.validate(&config).is_ok());

        let mut config = EcqsConfig::default();
        config.catalog.rooms.push(Room {
            id: "R01".to_string(),
            room_type: "ZZ".to_string(),
            name: "Room 1".to_string(),
        });
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let path = write_temp_config(
            r#"
[server]
port = 8088

[announcement]
sink = "command"
language_pause_ms = 250

[announcement.command]
program = "espeak"
args = ["-v", "{lang}", "{text}"]
"#,
        );

        let manager = ConfigManager::new(Some(&path)).unwrap();
        let config = manager.get_config().await;
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.announcement.sink, SinkKind::Command);
        assert_eq!(config.announcement.command.args.len(), 3);
        assert_eq!(config.announcement.language_pause_ms, 250);
        assert_eq!(config.retention.max_age_hours, 24);

        std::fs::write(&path, "[server]\nport = 0\n").unwrap();
        assert!(manager.reload_config().await.is_err());
        assert_eq!(manager.get_config().await.server.port, 8088);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("ecqs-missing-{}", uuid::Uuid::new_v4()));
        let manager = ConfigManager::new(path.to_str()).unwrap();
        let config = manager.config.try_read().unwrap().clone();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_toml_round_trip_keeps_catalog_optional() {
        let text = EcqsConfig::default().to_toml().unwrap();
        assert!(text.contains("[server]"));
        assert!(text.contains("max_age_hours = 24"));

        let parsed: EcqsConfig = toml::from_str(&text).unwrap();
        assert!(parsed.catalog.is_empty());
    }
}
