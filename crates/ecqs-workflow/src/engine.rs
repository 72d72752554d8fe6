//! 叫号引擎
//!
//! 协调账本、查询投影和语音播报的核心引擎。账本是唯一的共享可变资源，
//! 所有修改在写锁内完成；查询持有读锁，不会看到修改到一半的记录。

use chrono::Duration;
use ecqs_core::{EcqsError, QueueEntry, QueueNumber, Result, RoomDirectory};
use ecqs_voice::{Announcement, AnnouncementBuilder, AnnouncerHandle, AnnouncerStatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::import::{sheet_row_number, ImportReport, ImportRow};
use crate::ledger::QueueLedger;
use crate::projection::{LedgerSummary, RoomQueue, RoomTypeStatus};

/// 叫号结果
#[derive(Debug, Clone, Serialize)]
pub struct CallOutcome {
    pub entry: QueueEntry,
    /// 播报文本预览（实际播放由后台任务完成）；文本生成失败时为空
    pub announcement: Option<Announcement>,
    /// 已入队的播报事件ID；播报关闭或不可用时为空
    pub announcement_id: Option<Uuid>,
}

/// 叫号引擎
#[derive(Debug)]
pub struct QueueEngine {
    directory: Arc<RoomDirectory>,
    ledger: Arc<RwLock<QueueLedger>>,
    builder: AnnouncementBuilder,
    announcer: Option<AnnouncerHandle>,
}

impl QueueEngine {
    /// 创建新的叫号引擎
    pub fn new(directory: Arc<RoomDirectory>, announcer: Option<AnnouncerHandle>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(QueueLedger::new(directory.clone()))),
            builder: AnnouncementBuilder::new(directory.clone()),
            directory,
            announcer,
        }
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    /// 共享账本（供保留期清理任务使用）
    pub fn ledger(&self) -> Arc<RwLock<QueueLedger>> {
        self.ledger.clone()
    }

    /// 登记新患者
    pub async fn register(&self, name: &str, room_type: &str) -> Result<QueueNumber> {
        let mut ledger = self.ledger.write().await;
        ledger.register(name, room_type)
    }

    /// 批量登记，逐行校验，单行失败不影响其他行
    pub async fn register_batch(&self, rows: &[ImportRow]) -> ImportReport {
        let mut report = ImportReport::default();
        let mut ledger = self.ledger.write().await;

        for (index, row) in rows.iter().enumerate() {
            let result = row
                .validate(&self.directory)
                .and_then(|name| ledger.register(&name, &row.room_type));

            match result {
                Ok(_) => report.success += 1,
                Err(e) => {
                    let message = match e {
                        EcqsError::Validation(msg) => msg,
                        other => other.to_string(),
                    };
                    report
                        .errors
                        .push(format!("Row {}: {}", sheet_row_number(index), message));
                }
            }
        }

        tracing::info!(
            "Batch import finished: {} registered, {} rejected",
            report.success,
            report.errors.len()
        );
        report
    }

    /// 叫号并入队播报
    ///
    /// 播报在写锁内入队，因此播报顺序与叫号成功的顺序一致。
    /// 播报失败或不可用不影响叫号结果。
    pub async fn call(&self, queue_number: &str, room_id: &str) -> Result<CallOutcome> {
        let mut ledger = self.ledger.write().await;
        let entry = ledger.call(queue_number, room_id)?;

        // 叫号已提交，预览失败只记录日志
        let announcement = match self.builder.build(&entry.number, room_id) {
            Ok(announcement) => Some(announcement),
            Err(e) => {
                tracing::error!("Failed to build announcement preview for {}: {}", entry.number, e);
                None
            }
        };

        let announcement_id = match &self.announcer {
            Some(announcer) => match announcer.enqueue(entry.number.clone(), room_id) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Announcement for {} dropped: {}", entry.number, e);
                    None
                }
            },
            None => {
                tracing::debug!("Announcements disabled, {} called silently", entry.number);
                None
            }
        };
        drop(ledger);

        Ok(CallOutcome {
            entry,
            announcement,
            announcement_id,
        })
    }

    /// 完成服务
    pub async fn complete(&self, queue_number: &str) -> Result<QueueEntry> {
        let mut ledger = self.ledger.write().await;
        ledger.complete(queue_number)
    }

    /// 删除号票
    pub async fn remove(&self, queue_number: &str) -> Result<QueueEntry> {
        let mut ledger = self.ledger.write().await;
        ledger.remove(queue_number)
    }

    /// 清理过期的已完成记录
    pub async fn purge_older_than(&self, retention: Duration) -> usize {
        let mut ledger = self.ledger.write().await;
        ledger.purge_older_than(retention)
    }

    pub async fn room_queue(&self, room_id: &str) -> Result<RoomQueue> {
        self.ledger.read().await.room_queue(room_id)
    }

    pub async fn type_queue(&self, room_type: &str) -> Result<Vec<QueueEntry>> {
        self.ledger.read().await.type_queue(room_type)
    }

    pub async fn room_type_status(&self) -> BTreeMap<String, RoomTypeStatus> {
        self.ledger.read().await.room_type_status()
    }

    pub async fn recent_calls(&self, room_id: &str, limit: usize) -> Result<Vec<QueueEntry>> {
        self.ledger.read().await.recent_calls(room_id, limit)
    }

    /// 全部记录快照
    pub async fn entries(&self) -> Vec<QueueEntry> {
        self.ledger.read().await.entries().to_vec()
    }

    pub async fn summary(&self) -> LedgerSummary {
        self.ledger.read().await.summary()
    }

    /// 播放一条测试播报（第一个类型的1号，叫到该类型的第一个房间），不修改账本
    pub fn test_announcement(&self) -> Result<Announcement> {
        let announcer = self
            .announcer
            .as_ref()
            .ok_or_else(|| EcqsError::Announcer("Announcements are disabled".to_string()))?;

        let room_type = self
            .directory
            .room_types()
            .first()
            .ok_or_else(|| EcqsError::Config("Room directory is empty".to_string()))?;
        let room = self
            .directory
            .rooms_of_type(&room_type.code)
            .next()
            .ok_or_else(|| EcqsError::Config(format!("No room serves {}", room_type.code)))?;

        let number = QueueNumber::new(room_type.code.clone(), 1);
        let announcement = self.builder.build(&number, &room.id)?;
        announcer.enqueue(number, &room.id)?;

        tracing::info!("Test announcement queued for {}", room.id);
        Ok(announcement)
    }

    pub fn announcer_stats(&self) -> Option<AnnouncerStatsSnapshot> {
        self.announcer.as_ref().map(|a| a.stats())
    }
}
