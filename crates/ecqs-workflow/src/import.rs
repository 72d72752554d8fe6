//! 批量导入
//!
//! 校验并登记由前端解析好的表格行。文件解析不在此处。

use ecqs_core::{EcqsError, Result, RoomDirectory};
use serde::{Deserialize, Serialize};

/// 导入行，字段名与导入模板的表头一致。缺失的列按空值处理
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Room Type")]
    pub room_type: String,
    #[serde(rename = "Room")]
    pub room: String,
}

/// 导入结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    /// 成功登记的行数
    pub success: usize,
    /// 失败行的错误信息，如 "Row 3: Invalid room: R42"
    pub errors: Vec<String>,
}

impl ImportRow {
    /// 校验一行，返回去除首尾空白后的姓名
    pub fn validate(&self, directory: &RoomDirectory) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() || self.room_type.is_empty() || self.room.is_empty() {
            return Err(EcqsError::Validation("Missing required fields".to_string()));
        }

        directory.require_room_type(&self.room_type)?;
        let room = directory
            .room(&self.room)
            .ok_or_else(|| EcqsError::Validation(format!("Invalid room: {}", self.room)))?;

        if room.room_type != self.room_type {
            return Err(EcqsError::Validation(format!(
                "Room {} is not of type {}",
                self.room, self.room_type
            )));
        }

        Ok(name.to_string())
    }
}

/// 导入模板中的行号（第1行为表头）
pub fn sheet_row_number(index: usize) -> usize {
    index + 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, room_type: &str, room: &str) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            room_type: room_type.to_string(),
            room: room.to_string(),
        }
    }

    #[test]
    fn test_validate_row() {
        let directory = RoomDirectory::default();

        assert_eq!(row("  Ann  ", "MC", "R01").validate(&directory).unwrap(), "Ann");
        assert!(row("", "MC", "R01").validate(&directory).is_err());
        assert!(matches!(
            row("Ann", "ZZ", "R01").validate(&directory),
            Err(EcqsError::InvalidRoomType(_))
        ));

        let err = row("Ann", "MC", "R42").validate(&directory).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid room: R42");

        let err = row("Ann", "MC", "R03").validate(&directory).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Room R03 is not of type MC");
    }

    #[test]
    fn test_row_field_names() {
        let json = r#"{"Name": "Ann", "Room Type": "SP", "Room": "R04"}"#;
        let parsed: ImportRow = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, row("Ann", "SP", "R04"));
        assert_eq!(sheet_row_number(0), 2);

        let partial: ImportRow = serde_json::from_str(r#"{"Name": "Ann"}"#).unwrap();
        let err = partial.validate(&RoomDirectory::default()).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Missing required fields");
    }
}
