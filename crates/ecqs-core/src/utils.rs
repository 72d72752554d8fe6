//! 通用工具函数

/// 生成排队号码文本，序号至少补齐三位，超过三位时保留全部数字
pub fn format_queue_number(code: &str, sequence: u32) -> String {
    format!("{}{:03}", code, sequence)
}

/// 验证房间类型代码格式
pub fn is_valid_room_type_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 8 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// 取房间显示名称的主语言部分（"Room 1 / Kwarto 1" -> "Room 1"）
pub fn primary_display_name(name: &str) -> &str {
    name.split('/').next().unwrap_or(name).trim()
}
