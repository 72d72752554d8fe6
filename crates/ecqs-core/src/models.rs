//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EcqsError;
use crate::utils::format_queue_number;

/// 播报语言
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// 英语（主语言）
    En,
    /// 他加禄语（第二语言）
    Tl,
}

impl Language {
    /// 语音合成使用的语言代码
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Tl => "tl",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 双语文本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    pub en: String,
    pub tl: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, tl: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            tl: tl.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Tl => &self.tl,
        }
    }
}

/// 房间类型（服务类别）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomType {
    pub code: String,              // 类型代码 (MC, SP等)
    pub name: LocalizedText,       // 显示名称
    pub color: String,             // 颜色标签 (#4299E1)
    pub color_name: String,        // 播报用颜色名 (blue)
    pub description: LocalizedText,
}

/// 房间
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: String,        // 房间ID (R01)
    pub room_type: String, // 所服务的房间类型代码
    pub name: String,      // 显示名称 ("Room 1 / Kwarto 1")
}

/// 排队号码，格式为 `<类型代码><至少三位序号>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueNumber {
    code: String,
    sequence: u32,
}

impl QueueNumber {
    pub fn new(code: impl Into<String>, sequence: u32) -> Self {
        Self {
            code: code.into(),
            sequence,
        }
    }

    /// 房间类型代码
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 序号（不含前导零）
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for QueueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_queue_number(&self.code, self.sequence))
    }
}

impl FromStr for QueueNumber {
    type Err = EcqsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EcqsError::InvalidQueueNumber(s.to_string());

        let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
        let (code, digits) = s.split_at(split);

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let sequence: u32 = digits.parse().map_err(|_| invalid())?;
        if sequence == 0 {
            return Err(invalid());
        }

        Ok(Self::new(code, sequence))
    }
}

impl TryFrom<String> for QueueNumber {
    type Error = EcqsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueueNumber> for String {
    fn from(number: QueueNumber) -> Self {
        number.to_string()
    }
}

/// 排队状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueStatus {
    Waiting,  // 等待中
    Called,   // 已叫号
    Complete, // 已完成
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueStatus::Waiting => "Waiting",
            QueueStatus::Called => "Called",
            QueueStatus::Complete => "Complete",
        };
        f.write_str(s)
    }
}

/// 排队记录（一位患者的号票及其生命周期）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub number: QueueNumber,
    pub name: String,
    pub room_type: String,
    pub status: QueueStatus,
    pub call_room: Option<String>,
    pub register_time: DateTime<Utc>,
    pub call_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// 创建处于等待状态的新记录
    pub fn waiting(number: QueueNumber, name: String, room_type: String, now: DateTime<Utc>) -> Self {
        Self {
            number,
            name,
            room_type,
            status: QueueStatus::Waiting,
            call_room: None,
            register_time: now,
            call_time: None,
            complete_time: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == QueueStatus::Waiting
    }

    pub fn is_called(&self) -> bool {
        self.status == QueueStatus::Called
    }

    pub fn is_complete(&self) -> bool {
        self.status == QueueStatus::Complete
    }

    /// 是否当前在指定房间就诊
    pub fn is_current_in(&self, room_id: &str) -> bool {
        self.is_called() && self.call_room.as_deref() == Some(room_id)
    }
}
