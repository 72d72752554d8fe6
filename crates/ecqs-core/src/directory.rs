//! 房间目录
//!
//! 房间类型目录与房间到类型的映射，进程生命周期内只读

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EcqsError, Result};
use crate::models::{LocalizedText, Room, RoomType};
use crate::utils::is_valid_room_type_code;

/// 房间配置视图（供房间显示屏使用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub type_name: String,
    pub color: String,
}

/// 房间目录
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    room_types: Vec<RoomType>,
    rooms: Vec<Room>,
}

impl RoomDirectory {
    /// 从房间类型和房间列表创建目录，保持声明顺序
    pub fn new(room_types: Vec<RoomType>, rooms: Vec<Room>) -> Result<Self> {
        let mut codes = HashSet::new();
        for room_type in &room_types {
            if !is_valid_room_type_code(&room_type.code) {
                return Err(EcqsError::Validation(format!(
                    "Room type code must be uppercase letters: {}",
                    room_type.code
                )));
            }
            if !codes.insert(room_type.code.as_str()) {
                return Err(EcqsError::Validation(format!(
                    "Duplicate room type: {}",
                    room_type.code
                )));
            }
        }

        let mut ids = HashSet::new();
        for room in &rooms {
            if !ids.insert(room.id.as_str()) {
                return Err(EcqsError::Validation(format!("Duplicate room: {}", room.id)));
            }
            if !codes.contains(room.room_type.as_str()) {
                return Err(EcqsError::InvalidRoomType(room.room_type.clone()));
            }
        }

        tracing::debug!(
            "Room directory loaded: {} room types, {} rooms",
            room_types.len(),
            rooms.len()
        );

        Ok(Self { room_types, rooms })
    }

    /// 所有房间类型（声明顺序）
    pub fn room_types(&self) -> &[RoomType] {
        &self.room_types
    }

    /// 所有房间（声明顺序）
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_type(&self, code: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|t| t.code == code)
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn require_room_type(&self, code: &str) -> Result<&RoomType> {
        self.room_type(code)
            .ok_or_else(|| EcqsError::InvalidRoomType(code.to_string()))
    }

    pub fn require_room(&self, room_id: &str) -> Result<&Room> {
        self.room(room_id)
            .ok_or_else(|| EcqsError::UnknownRoom(room_id.to_string()))
    }

    /// 某一类型下的所有房间
    pub fn rooms_of_type<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Room> + 'a {
        self.rooms.iter().filter(move |r| r.room_type == code)
    }

    /// 获取房间配置视图
    pub fn room_view(&self, room_id: &str) -> Result<RoomView> {
        let room = self.require_room(room_id)?;
        let room_type = self.require_room_type(&room.room_type)?;

        Ok(RoomView {
            id: room.id.clone(),
            name: room.name.clone(),
            room_type: room_type.code.clone(),
            type_name: room_type.name.en.clone(),
            color: room_type.color.clone(),
        })
    }
}

impl Default for RoomDirectory {
    /// 默认目录：五种服务类型，十一个房间
    fn default() -> Self {
        let room_types = vec![
            room_type(
                "MC",
                ("Medical Clearance", "Medikal na Clearance"),
                "#4299E1",
                "blue",
                (
                    "For patients needing medical clearance",
                    "Para sa mga pasyenteng nangangailangan ng medikal na clearance",
                ),
            ),
            room_type(
                "SP",
                ("Scheduled Patient", "Nakaiskedyul na Pasyente"),
                "#48BB78",
                "green",
                (
                    "For patients with scheduled appointments",
                    "Para sa mga pasyenteng may appointment",
                ),
            ),
            room_type(
                "OP",
                ("Operation Schedule", "Iskedyul ng Operasyon"),
                "#ED8936",
                "orange",
                (
                    "For scheduling surgical procedures",
                    "Para sa pag-iskedyul ng operasyon",
                ),
            ),
            room_type(
                "RQ",
                ("Requirements Processing", "Pagpoproseso ng Dokumento"),
                "#9F7AEA",
                "purple",
                (
                    "For document and requirements processing",
                    "Para sa pagpoproseso ng mga dokumento at requirements",
                ),
            ),
            room_type(
                "WA",
                ("Walk-in Appointment", "Walk-in na Pasyente"),
                "#F56565",
                "red",
                (
                    "For walk-in patients without appointment",
                    "Para sa mga pasyenteng walang appointment",
                ),
            ),
        ];

        let assignments = [
            "MC", "MC", "SP", "SP", "OP", "OP", "RQ", "RQ", "WA", "WA", "WA",
        ];
        let rooms = assignments
            .iter()
            .enumerate()
            .map(|(i, code)| Room {
                id: format!("R{:02}", i + 1),
                room_type: code.to_string(),
                name: format!("Room {} / Kwarto {}", i + 1, i + 1),
            })
            .collect();

        Self { room_types, rooms }
    }
}

fn room_type(
    code: &str,
    name: (&str, &str),
    color: &str,
    color_name: &str,
    description: (&str, &str),
) -> RoomType {
    RoomType {
        code: code.to_string(),
        name: LocalizedText::new(name.0, name.1),
        color: color.to_string(),
        color_name: color_name.to_string(),
        description: LocalizedText::new(description.0, description.1),
    }
}
