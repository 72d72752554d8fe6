//! # 叫号工作流模块
//!
//! 提供完整的排队叫号生命周期管理，包括：
//! - 号票状态机：Waiting → Called → Complete
//! - 排队账本：按房间类型连续编号、叫号、完成、清理
//! - 查询投影：房间队列、类型队列、仪表盘汇总、最近叫号
//! - 批量导入与保留期清理
//! - 叫号引擎：加锁访问账本并在叫号成功后入队语音播报

pub mod engine;
pub mod import;
pub mod ledger;
pub mod projection;
pub mod retention;
pub mod state_machine;

// 重新导出主要类型
pub use engine::{CallOutcome, QueueEngine};
pub use import::{ImportReport, ImportRow};
pub use ledger::QueueLedger;
pub use projection::{
    LedgerSummary, RoomQueue, RoomStatus, RoomTypeStatus, DEFAULT_RECENT_CALLS_LIMIT,
    NEXT_UP_LIMIT,
};
pub use retention::RetentionSweeper;
pub use state_machine::{QueueEvent, QueueStateMachine};
