//! 排队账本
//!
//! 唯一的有状态组件：负责号码生成、状态转换和记录清理。
//! 账本本身不做同步，由 [`crate::engine::QueueEngine`] 在锁内调用。

use chrono::{DateTime, Duration, Utc};
use ecqs_core::{EcqsError, QueueEntry, QueueNumber, QueueStatus, Result, RoomDirectory};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state_machine::{QueueEvent, QueueStateMachine};

/// 排队账本
#[derive(Debug)]
pub struct QueueLedger {
    directory: Arc<RoomDirectory>,
    state_machine: QueueStateMachine,
    entries: Vec<QueueEntry>,           // 按登记顺序
    last_numbers: HashMap<String, u32>, // room_type -> 最后发出的序号
}

impl QueueLedger {
    /// 创建新的排队账本，所有类型的计数从0开始
    pub fn new(directory: Arc<RoomDirectory>) -> Self {
        let last_numbers = directory
            .room_types()
            .iter()
            .map(|t| (t.code.clone(), 0))
            .collect();

        Self {
            directory,
            state_machine: QueueStateMachine::new(),
            entries: Vec::new(),
            last_numbers,
        }
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    /// 登记新患者，返回生成的排队号码
    pub fn register(&mut self, name: &str, room_type: &str) -> Result<QueueNumber> {
        self.register_at(name, room_type, Utc::now())
    }

    pub(crate) fn register_at(&mut self, name: &str, room_type: &str, now: DateTime<Utc>) -> Result<QueueNumber> {
        self.directory.require_room_type(room_type)?;

        let counter = self.last_numbers.entry(room_type.to_string()).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| EcqsError::Internal(format!("Queue counter exhausted for {}", room_type)))?;

        let number = QueueNumber::new(room_type, *counter);
        self.entries.push(QueueEntry::waiting(
            number.clone(),
            name.to_string(),
            room_type.to_string(),
            now,
        ));

        tracing::info!("Registered {} for room type {}", number, room_type);
        Ok(number)
    }

    /// 叫号到指定房间
    ///
    /// 等待中和已叫号的记录都可以被叫号；对已叫号记录再次叫号会刷新
    /// 房间和叫号时间。房间类型必须与记录类型一致。
    pub fn call(&mut self, queue_number: &str, room_id: &str) -> Result<QueueEntry> {
        self.call_at(queue_number, room_id, Utc::now())
    }

    pub(crate) fn call_at(&mut self, queue_number: &str, room_id: &str, now: DateTime<Utc>) -> Result<QueueEntry> {
        let room = self.directory.require_room(room_id)?;
        let wanted = canonical_number(queue_number)?;

        let index = self
            .entries
            .iter()
            .position(|e| {
                e.number == wanted && matches!(e.status, QueueStatus::Waiting | QueueStatus::Called)
            })
            .ok_or_else(|| EcqsError::EntryNotFound(queue_number.to_string()))?;

        let entry = &mut self.entries[index];
        if room.room_type != entry.room_type {
            tracing::warn!(
                "Rejected call of {} to {}: room serves {}, entry is {}",
                queue_number,
                room_id,
                room.room_type,
                entry.room_type
            );
            return Err(EcqsError::RoomTypeMismatch {
                room_id: room.id.clone(),
                room_type: room.room_type.clone(),
                entry_type: entry.room_type.clone(),
            });
        }

        let event = QueueStateMachine::call_event(entry.status);
        let status = self.state_machine.transition(entry.status, event)?;

        if event == QueueEvent::Recall {
            tracing::info!(
                "Re-calling {} (previously {:?}) to {}",
                entry.number,
                entry.call_room,
                room.id
            );
        }

        entry.status = status;
        entry.call_room = Some(room.id.clone());
        entry.call_time = Some(now);

        tracing::info!("Called {} to room {}", entry.number, room.id);
        Ok(entry.clone())
    }

    /// 完成服务，仅对已叫号的记录有效
    pub fn complete(&mut self, queue_number: &str) -> Result<QueueEntry> {
        self.complete_at(queue_number, Utc::now())
    }

    pub(crate) fn complete_at(&mut self, queue_number: &str, now: DateTime<Utc>) -> Result<QueueEntry> {
        let wanted = canonical_number(queue_number)?;

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.number == wanted && e.status == QueueStatus::Called)
            .ok_or_else(|| EcqsError::EntryNotFound(queue_number.to_string()))?;

        entry.status = self.state_machine.transition(entry.status, QueueEvent::Complete)?;
        entry.complete_time = Some(now);

        tracing::info!("Completed {} in room {:?}", entry.number, entry.call_room);
        Ok(entry.clone())
    }

    /// 删除号票（不回退计数器）
    pub fn remove(&mut self, queue_number: &str) -> Result<QueueEntry> {
        let wanted = canonical_number(queue_number)?;

        let index = self
            .entries
            .iter()
            .position(|e| e.number == wanted)
            .ok_or_else(|| EcqsError::EntryNotFound(queue_number.to_string()))?;

        let entry = self.entries.remove(index);
        tracing::info!("Removed {} ({})", entry.number, entry.status);
        Ok(entry)
    }

    /// 清理完成时间早于 `now - retention` 的已完成记录，返回清理数量
    pub fn purge_older_than(&mut self, retention: Duration) -> usize {
        match Utc::now().checked_sub_signed(retention) {
            Some(cutoff) => self.purge_completed_before(cutoff),
            // 截止时间超出可表示范围，不可能有更早的记录
            None => 0,
        }
    }

    /// 清理完成时间早于指定时间点的已完成记录
    pub fn purge_completed_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            !(e.status == QueueStatus::Complete && e.complete_time.map_or(false, |t| t < cutoff))
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!("Purged {} completed entries older than {}", removed, cutoff);
        }
        removed
    }

    /// 全部记录（账本顺序）
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn entry(&self, queue_number: &str) -> Option<&QueueEntry> {
        let wanted = canonical_number(queue_number).ok()?;
        self.entries.iter().find(|e| e.number == wanted)
    }

    /// 某类型最后发出的序号
    pub fn last_number(&self, room_type: &str) -> u32 {
        self.last_numbers.get(room_type).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 解析号码文本；非规范写法（如 "MC01"）视为不存在的号码
fn canonical_number(queue_number: &str) -> Result<QueueNumber> {
    match queue_number.parse::<QueueNumber>() {
        Ok(number) if number.to_string() == queue_number => Ok(number),
        _ => Err(EcqsError::EntryNotFound(queue_number.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ledger() -> QueueLedger {
        QueueLedger::new(Arc::new(RoomDirectory::default()))
    }

    #[test]
    fn test_numbers_are_sequential_per_type() {
        let mut ledger = ledger();

        assert_eq!(ledger.register("Ann", "MC").unwrap().to_string(), "MC001");
        assert_eq!(ledger.register("Bob", "SP").unwrap().to_string(), "SP001");
        assert_eq!(ledger.register("Cid", "MC").unwrap().to_string(), "MC002");

        let sequences: Vec<u32> = (0..20)
            .map(|i| ledger.register(&format!("P{}", i), "WA").unwrap().sequence())
            .collect();
        assert_eq!(sequences, (1..=20).collect::<Vec<_>>());
        assert_eq!(ledger.last_number("WA"), 20);
    }

    #[test]
    fn test_register_unknown_type() {
        let mut ledger = ledger();
        let result = ledger.register("Ann", "XX");
        assert!(matches!(result, Err(EcqsError::InvalidRoomType(code)) if code == "XX"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_numbers_past_999_keep_all_digits() {
        let mut ledger = ledger();
        ledger.last_numbers.insert("OP".to_string(), 999);
        assert_eq!(ledger.register("Ann", "OP").unwrap().to_string(), "OP1000");
    }

    #[test]
    fn test_call_sets_room_and_time() {
        let mut ledger = ledger();
        ledger.register("Ann", "MC").unwrap();

        let entry = ledger.call("MC001", "R01").unwrap();
        assert_eq!(entry.status, QueueStatus::Called);
        assert_eq!(entry.call_room.as_deref(), Some("R01"));
        assert!(entry.call_time.is_some());
        assert!(entry.complete_time.is_none());
    }

    #[test]
    fn test_call_validation_order() {
        let mut ledger = ledger();
        ledger.register("Ann", "MC").unwrap();

        assert!(matches!(ledger.call("MC001", "R99"), Err(EcqsError::UnknownRoom(_))));
        assert!(matches!(ledger.call("MC009", "R01"), Err(EcqsError::EntryNotFound(_))));
        assert!(matches!(ledger.call("MC01", "R01"), Err(EcqsError::EntryNotFound(_))));
    }

    #[test]
    fn test_call_mismatched_room_leaves_entry_unchanged() {
        let mut ledger = ledger();
        ledger.register("Ann", "MC").unwrap();

        let result = ledger.call("MC001", "R03");
        assert!(matches!(result, Err(EcqsError::RoomTypeMismatch { .. })));

        let entry = ledger.entry("MC001").unwrap();
        assert_eq!(entry.status, QueueStatus::Waiting);
        assert!(entry.call_room.is_none());
        assert!(entry.call_time.is_none());
    }

    #[test]
    fn test_recall_to_another_room_refreshes() {
        let mut ledger = ledger();
        ledger.register("Ann", "MC").unwrap();

        let t0 = Utc::now();
        ledger.call_at("MC001", "R01", t0).unwrap();
        let t1 = t0 + Duration::seconds(30);
        let entry = ledger.call_at("MC001", "R02", t1).unwrap();

        assert_eq!(entry.status, QueueStatus::Called);
        assert_eq!(entry.call_room.as_deref(), Some("R02"));
        assert_eq!(entry.call_time, Some(t1));
    }

    #[test]
    fn test_complete_requires_called() {
        let mut ledger = ledger();
        ledger.register("Ann", "MC").unwrap();

        assert!(matches!(ledger.complete("MC001"), Err(EcqsError::EntryNotFound(_))));

        ledger.call("MC001", "R01").unwrap();
        let entry = ledger.complete("MC001").unwrap();
        assert_eq!(entry.status, QueueStatus::Complete);
        assert!(entry.complete_time.is_some());

        assert!(matches!(ledger.complete("MC001"), Err(EcqsError::EntryNotFound(_))));
        assert!(matches!(ledger.call("MC001", "R01"), Err(EcqsError::EntryNotFound(_))));
    }

    #[test]
    fn test_timestamps_are_ordered() {
        let mut ledger = ledger();
        let t0 = Utc::now();
        ledger.register_at("Ann", "SP", t0).unwrap();
        ledger.call_at("SP001", "R03", t0 + Duration::minutes(5)).unwrap();
        let entry = ledger.complete_at("SP001", t0 + Duration::minutes(15)).unwrap();

        assert!(entry.register_time < entry.call_time.unwrap());
        assert!(entry.call_time.unwrap() < entry.complete_time.unwrap());
    }

    #[test]
    fn test_purge_only_old_completed_entries() {
        let mut ledger = ledger();
        let now = Utc::now();

        for name in ["A", "B", "C", "D"] {
            ledger.register_at(name, "MC", now - Duration::hours(30)).unwrap();
        }
        ledger.call_at("MC001", "R01", now - Duration::hours(29)).unwrap();
        ledger.complete_at("MC001", now - Duration::hours(28)).unwrap();
        ledger.call_at("MC002", "R02", now - Duration::hours(2)).unwrap();
        ledger.complete_at("MC002", now - Duration::hours(1)).unwrap();
        ledger.call_at("MC003", "R01", now - Duration::hours(27)).unwrap();

        let removed = ledger.purge_completed_before(now - Duration::hours(24));
        assert_eq!(removed, 1);

        let numbers: Vec<String> = ledger.entries().iter().map(|e| e.number.to_string()).collect();
        assert_eq!(numbers, vec!["MC002", "MC003", "MC004"]);

        // 等待中和已叫号记录不受保留时长影响
        let removed = ledger.purge_completed_before(now + Duration::days(365));
        assert_eq!(removed, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_purge_with_huge_retention_removes_nothing() {
        let mut ledger = ledger();
        let now = Utc::now();
        ledger.register_at("A", "MC", now - Duration::hours(30)).unwrap();
        ledger.register_at("B", "MC", now - Duration::hours(30)).unwrap();
        ledger.call_at("MC001", "R01", now - Duration::hours(29)).unwrap();
        ledger.complete_at("MC001", now - Duration::hours(28)).unwrap();

        assert_eq!(ledger.purge_older_than(Duration::hours(i64::from(u32::MAX))), 0);
        assert_eq!(ledger.len(), 2);

        assert_eq!(ledger.purge_older_than(Duration::hours(24)), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_remove_does_not_rewind_counter() {
        let mut ledger = ledger();
        ledger.register("Ann", "RQ").unwrap();

        let removed = ledger.remove("RQ001").unwrap();
        assert_eq!(removed.name, "Ann");
        assert!(ledger.is_empty());
        assert!(matches!(ledger.remove("RQ001"), Err(EcqsError::EntryNotFound(_))));

        assert_eq!(ledger.register("Bob", "RQ").unwrap().to_string(), "RQ002");
    }
}
