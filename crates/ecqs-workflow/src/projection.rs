//! 查询投影
//!
//! 基于账本当前快照的只读视图，不修改状态，无外部副作用

use ecqs_core::{QueueEntry, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::QueueLedger;

/// 房间"下一位"列表的长度
pub const NEXT_UP_LIMIT: usize = 3;

/// 最近叫号记录的默认条数
pub const DEFAULT_RECENT_CALLS_LIMIT: usize = 10;

/// 单个房间的队列视图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomQueue {
    pub current: Option<QueueEntry>,
    pub next: Vec<QueueEntry>,
}

/// 仪表盘中单个房间的状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStatus {
    pub room_id: String,
    pub room_name: String,
    pub current: Option<String>,
    pub next: Vec<String>,
    pub waiting_count: usize,
}

/// 仪表盘中单个房间类型的汇总
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomTypeStatus {
    pub rooms: Vec<RoomStatus>,
    /// 各房间 `waiting_count` 之和。同类型多个房间共享同一等待池，
    /// 因此该值会重复计数。
    pub total_waiting: usize,
}

/// 账本按状态统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSummary {
    pub total: usize,
    pub waiting: usize,
    pub called: usize,
    pub complete: usize,
}

impl QueueLedger {
    /// 房间当前就诊患者及接下来最多三位等待患者
    pub fn room_queue(&self, room_id: &str) -> Result<RoomQueue> {
        let room = self.directory().require_room(room_id)?;

        // 同一房间出现多个已叫号记录时取账本顺序中的第一个
        let current = self
            .entries()
            .iter()
            .find(|e| e.is_current_in(room_id))
            .cloned();

        let next = self
            .waiting_of_type(&room.room_type)
            .take(NEXT_UP_LIMIT)
            .cloned()
            .collect();

        Ok(RoomQueue { current, next })
    }

    /// 某类型的全部等待患者（登记顺序）
    pub fn type_queue(&self, room_type: &str) -> Result<Vec<QueueEntry>> {
        self.directory().require_room_type(room_type)?;
        Ok(self.waiting_of_type(room_type).cloned().collect())
    }

    /// 所有房间类型的状态汇总
    pub fn room_type_status(&self) -> BTreeMap<String, RoomTypeStatus> {
        let directory = self.directory();
        let mut status = BTreeMap::new();

        for room_type in directory.room_types() {
            let rooms: Vec<RoomStatus> = directory
                .rooms_of_type(&room_type.code)
                .map(|room| {
                    let current = self
                        .entries()
                        .iter()
                        .find(|e| e.is_current_in(&room.id))
                        .map(|e| e.number.to_string());
                    let next: Vec<String> = self
                        .waiting_of_type(&room.room_type)
                        .take(NEXT_UP_LIMIT)
                        .map(|e| e.number.to_string())
                        .collect();

                    RoomStatus {
                        room_id: room.id.clone(),
                        room_name: room.name.clone(),
                        current,
                        waiting_count: next.len(),
                        next,
                    }
                })
                .collect();

            let total_waiting = rooms.iter().map(|r| r.waiting_count).sum();
            status.insert(room_type.code.clone(), RoomTypeStatus { rooms, total_waiting });
        }

        tracing::debug!("Computed room type status for {} types", status.len());
        status
    }

    /// 某房间最近的叫号记录，按叫号时间倒序
    pub fn recent_calls(&self, room_id: &str, limit: usize) -> Result<Vec<QueueEntry>> {
        self.directory().require_room(room_id)?;

        let mut calls: Vec<&QueueEntry> = self
            .entries()
            .iter()
            .filter(|e| e.call_room.as_deref() == Some(room_id))
            .collect();

        // 稳定排序：叫号时间相同时保持账本顺序
        calls.sort_by(|a, b| b.call_time.cmp(&a.call_time));

        Ok(calls.into_iter().take(limit).cloned().collect())
    }

    /// 按状态统计
    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total: self.len(),
            ..Default::default()
        };

        for entry in self.entries() {
            match entry.status {
                QueueStatus::Waiting => summary.waiting += 1,
                QueueStatus::Called => summary.called += 1,
                QueueStatus::Complete => summary.complete += 1,
            }
        }

        summary
    }

    fn waiting_of_type<'a>(&'a self, room_type: &'a str) -> impl Iterator<Item = &'a QueueEntry> + 'a {
        self.entries()
            .iter()
            .filter(move |e| e.is_waiting() && e.room_type == room_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::ledger;
    use chrono::{Duration, Utc};
    use ecqs_core::EcqsError;

    fn numbers(entries: &[QueueEntry]) -> Vec<String> {
        entries.iter().map(|e| e.number.to_string()).collect()
    }

    #[test]
    fn test_room_queue_next_is_first_three_waiting() {
        let mut ledger = ledger();
        for name in ["A", "B", "C", "D"] {
            ledger.register(name, "MC").unwrap();
        }

        let queue = ledger.room_queue("R01").unwrap();
        assert!(queue.current.is_none());
        assert_eq!(numbers(&queue.next), vec!["MC001", "MC002", "MC003"]);
    }

    #[test]
    fn test_called_entry_becomes_current_and_leaves_next() {
        let mut ledger = ledger();
        for name in ["A", "B", "C", "D"] {
            ledger.register(name, "MC").unwrap();
        }
        ledger.call("MC001", "R01").unwrap();

        let r01 = ledger.room_queue("R01").unwrap();
        assert_eq!(r01.current.unwrap().number.to_string(), "MC001");
        assert_eq!(numbers(&r01.next), vec!["MC002", "MC003", "MC004"]);

        let r02 = ledger.room_queue("R02").unwrap();
        assert!(r02.current.is_none());
        assert!(!numbers(&r02.next).contains(&"MC001".to_string()));
    }

    #[test]
    fn test_room_queue_ignores_other_types() {
        let mut ledger = ledger();
        ledger.register("A", "SP").unwrap();
        ledger.register("B", "MC").unwrap();

        let queue = ledger.room_queue("R03").unwrap();
        assert_eq!(numbers(&queue.next), vec!["SP001"]);
        assert!(matches!(ledger.room_queue("R99"), Err(EcqsError::UnknownRoom(_))));
    }

    #[test]
    fn test_current_resolves_to_first_in_ledger_order() {
        let mut ledger = ledger();
        ledger.register("A", "MC").unwrap();
        ledger.register("B", "MC").unwrap();
        ledger.call("MC002", "R01").unwrap();
        ledger.call("MC001", "R01").unwrap();

        let queue = ledger.room_queue("R01").unwrap();
        assert_eq!(queue.current.unwrap().number.to_string(), "MC001");
    }

    #[test]
    fn test_type_queue() {
        let mut ledger = ledger();
        ledger.register("A", "OP").unwrap();
        ledger.register("B", "OP").unwrap();
        ledger.register("C", "OP").unwrap();
        ledger.call("OP002", "R05").unwrap();

        let queue = ledger.type_queue("OP").unwrap();
        assert_eq!(numbers(&queue), vec!["OP001", "OP003"]);
        assert!(ledger.type_queue("WA").unwrap().is_empty());
        assert!(matches!(ledger.type_queue("ZZ"), Err(EcqsError::InvalidRoomType(_))));
    }

    #[test]
    fn test_room_type_status_double_counts_shared_pool() {
        let mut ledger = ledger();
        ledger.register("A", "MC").unwrap();
        ledger.register("B", "MC").unwrap();
        ledger.call("MC001", "R02").unwrap();

        let status = ledger.room_type_status();
        assert_eq!(status.len(), 5);

        let mc = &status["MC"];
        assert_eq!(mc.rooms.len(), 2);
        assert_eq!(mc.rooms[0].room_id, "R01");
        assert_eq!(mc.rooms[0].current, None);
        assert_eq!(mc.rooms[0].next, vec!["MC002"]);
        assert_eq!(mc.rooms[1].current.as_deref(), Some("MC001"));
        assert_eq!(mc.rooms[1].waiting_count, 1);
        assert_eq!(mc.total_waiting, 2);

        assert_eq!(status["WA"].rooms.len(), 3);
        assert_eq!(status["WA"].total_waiting, 0);
    }

    #[test]
    fn test_recent_calls_newest_first() {
        let mut ledger = ledger();
        let t0 = Utc::now();
        for name in ["A", "B", "C"] {
            ledger.register(name, "SP").unwrap();
        }
        ledger.call_at("SP001", "R03", t0).unwrap();
        ledger.call_at("SP002", "R03", t0 + Duration::minutes(1)).unwrap();
        ledger.call_at("SP003", "R04", t0 + Duration::minutes(2)).unwrap();
        ledger.complete("SP001").unwrap();

        let calls = ledger.recent_calls("R03", DEFAULT_RECENT_CALLS_LIMIT).unwrap();
        assert_eq!(numbers(&calls), vec!["SP002", "SP001"]);

        let calls = ledger.recent_calls("R03", 1).unwrap();
        assert_eq!(numbers(&calls), vec!["SP002"]);

        assert!(ledger.recent_calls("R01", 10).unwrap().is_empty());
        assert!(matches!(ledger.recent_calls("R42", 10), Err(EcqsError::UnknownRoom(_))));
    }

    #[test]
    fn test_summary() {
        let mut ledger = ledger();
        ledger.register("A", "RQ").unwrap();
        ledger.register("B", "RQ").unwrap();
        ledger.register("C", "RQ").unwrap();
        ledger.call("RQ001", "R07").unwrap();
        ledger.call("RQ002", "R08").unwrap();
        ledger.complete("RQ002").unwrap();

        let summary = ledger.summary();
        assert_eq!(
            summary,
            LedgerSummary {
                total: 3,
                waiting: 1,
                called: 1,
                complete: 1,
            }
        );
    }
}
