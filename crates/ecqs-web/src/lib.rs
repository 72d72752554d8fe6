//! # 叫号系统 Web 接口
//!
//! 登记台、房间操作端、房间显示屏和仪表盘使用的 HTTP/JSON 接口

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::{create_app, WebServer};
