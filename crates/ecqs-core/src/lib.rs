//! # ECQS Core
//!
//! 叫号系统的核心模块，提供基础数据结构、房间目录、错误定义和通用工具。

pub mod directory;
pub mod error;
pub mod models;
pub mod utils;

pub use directory::{RoomDirectory, RoomView};
pub use error::{EcqsError, Result};
pub use models::*;
