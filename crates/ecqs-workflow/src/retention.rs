//! 记录保留期管理
//!
//! 定期清理超过保留时长的已完成记录

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::ledger::QueueLedger;

/// 保留期清理任务
#[derive(Debug)]
pub struct RetentionSweeper {
    ledger: Arc<RwLock<QueueLedger>>,
    max_age: Duration,
    sweep_interval: std::time::Duration,
}

impl RetentionSweeper {
    pub fn new(
        ledger: Arc<RwLock<QueueLedger>>,
        max_age: Duration,
        sweep_interval: std::time::Duration,
    ) -> Self {
        Self {
            ledger,
            max_age,
            sweep_interval,
        }
    }

    /// 执行一次清理
    pub async fn sweep_once(&self) -> usize {
        let mut ledger = self.ledger.write().await;
        let removed = ledger.purge_older_than(self.max_age);
        debug!("Retention sweep removed {} entries, {} remain", removed, ledger.len());
        removed
    }

    /// 在后台定期清理，直到收到关闭信号
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting retention sweeper: max age {}h, every {}s",
            self.max_age.num_hours(),
            self.sweep_interval.as_secs()
        );

        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Retention sweeper stopped");
    }
}
