//! # ECQS 诊所叫号系统
//!
//! 各子模块的统一入口：
//! - [`core`]：数据模型、房间目录、错误类型
//! - [`workflow`]：排队账本、查询投影、叫号引擎
//! - [`voice`]：双语播报文本与播报串行器

pub use ecqs_core as core;
pub use ecqs_voice as voice;
pub use ecqs_workflow as workflow;
