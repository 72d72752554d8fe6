//! # 语音播报模块
//!
//! 将叫号事件转换为双语播报并按顺序送往语音合成端，包括：
//! - 播报文本生成：颜色 + 序号 + 房间名，英语与他加禄语各一句
//! - 播报串行器：单消费者队列，严格先进先出，不阻塞叫号请求
//! - 语音输出端：日志输出、外部TTS命令、测试用录制端

pub mod announcement;
pub mod announcer;
pub mod sink;

pub use announcement::{translate_color, Announcement, AnnouncementBuilder};
pub use announcer::{
    Announcer, AnnouncerCommand, AnnouncerConfig, AnnouncerHandle, AnnouncerStatsSnapshot,
    AnnouncementEvent,
};
pub use sink::{CommandSpeechSink, LogSpeechSink, RecordingSpeechSink, SpeechSink};
