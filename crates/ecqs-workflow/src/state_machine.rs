//! 号票状态机
//!
//! 管理排队记录的生命周期状态转换：Waiting → Called → Complete

use ecqs_core::{EcqsError, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 号票状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    Call,     // 首次叫号
    Recall,   // 重新叫号（可改派房间）
    Complete, // 完成服务
}

/// 号票状态机
#[derive(Debug)]
pub struct QueueStateMachine {
    transitions: HashMap<(QueueStatus, QueueEvent), QueueStatus>,
}

impl QueueStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert((QueueStatus::Waiting, QueueEvent::Call), QueueStatus::Called);
        transitions.insert((QueueStatus::Called, QueueEvent::Recall), QueueStatus::Called);
        transitions.insert((QueueStatus::Called, QueueEvent::Complete), QueueStatus::Complete);

        Self { transitions }
    }

    /// 叫号时根据当前状态选择事件
    pub fn call_event(current: QueueStatus) -> QueueEvent {
        match current {
            QueueStatus::Called => QueueEvent::Recall,
            _ => QueueEvent::Call,
        }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: QueueStatus, event: QueueEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: QueueStatus, event: QueueEvent) -> Result<QueueStatus> {
        self.transitions.get(&(from, event)).copied().ok_or_else(|| {
            EcqsError::Internal(format!("Invalid state transition: {:?} on {:?}", from, event))
        })
    }

    /// 获取状态的所有可能事件
    pub fn possible_events(&self, current: QueueStatus) -> Vec<QueueEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for QueueStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
