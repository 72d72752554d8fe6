//! 播报文本生成

use ecqs_core::utils::primary_display_name;
use ecqs_core::{Language, QueueNumber, Result, RoomDirectory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 颜色名的他加禄语对照表
const COLOR_TRANSLATIONS: &[(&str, &str)] = &[
    ("blue", "asul"),
    ("green", "berde"),
    ("orange", "orange"),
    ("purple", "lila"),
    ("red", "pula"),
];

/// 将英语颜色名翻译为他加禄语，未收录的颜色保留原词
pub fn translate_color(color_name: &str) -> &str {
    COLOR_TRANSLATIONS
        .iter()
        .find(|(en, _)| en.eq_ignore_ascii_case(color_name))
        .map(|(_, tl)| *tl)
        .unwrap_or(color_name)
}

/// 一次叫号的双语播报文本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    pub queue_number: String,
    pub room_id: String,
    pub primary: String,
    pub secondary: String,
}

impl Announcement {
    /// 按播放顺序排列的 (语言, 文本)
    pub fn segments(&self) -> [(Language, &str); 2] {
        [
            (Language::En, self.primary.as_str()),
            (Language::Tl, self.secondary.as_str()),
        ]
    }
}

/// 播报文本生成器
#[derive(Debug, Clone)]
pub struct AnnouncementBuilder {
    directory: Arc<RoomDirectory>,
}

impl AnnouncementBuilder {
    pub fn new(directory: Arc<RoomDirectory>) -> Self {
        Self { directory }
    }

    /// 生成播报文本，如 "blue 1, please proceed to Room 1"
    pub fn build(&self, queue_number: &QueueNumber, room_id: &str) -> Result<Announcement> {
        let room = self.directory.require_room(room_id)?;
        let room_type = self.directory.require_room_type(queue_number.code())?;

        let color = &room_type.color_name;
        let sequence = queue_number.sequence();
        let room_name = primary_display_name(&room.name);

        let primary = format!("{} {}, please proceed to {}", color, sequence, room_name);
        let secondary = format!(
            "Numero {} {}, mangyaring pumunta sa {}",
            translate_color(color),
            sequence,
            room_name
        );

        Ok(Announcement {
            queue_number: queue_number.to_string(),
            room_id: room.id.clone(),
            primary,
            secondary,
        })
    }
}
