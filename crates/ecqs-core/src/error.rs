//! 错误定义模块

use thiserror::Error;

/// 叫号系统统一错误类型
#[derive(Error, Debug)]
pub enum EcqsError {
    #[error("Invalid room type: {0}")]
    InvalidRoomType(String),

    #[error("Room not found: {0}")]
    UnknownRoom(String),

    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Room type mismatch: {room_id} ({room_type}) cannot serve {entry_type}")]
    RoomTypeMismatch {
        room_id: String,
        room_type: String,
        entry_type: String,
    },

    #[error("Invalid queue number: {0}")]
    InvalidQueueNumber(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Announcer error: {0}")]
    Announcer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EcqsError {
    /// 是否为调用方可修正的业务错误（非系统故障）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EcqsError::InvalidRoomType(_)
                | EcqsError::UnknownRoom(_)
                | EcqsError::EntryNotFound(_)
                | EcqsError::RoomTypeMismatch { .. }
                | EcqsError::InvalidQueueNumber(_)
                | EcqsError::Validation(_)
        )
    }
}

/// 叫号系统统一结果类型
pub type Result<T> = std::result::Result<T, EcqsError>;
