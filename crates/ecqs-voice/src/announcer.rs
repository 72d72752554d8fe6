//! 播报串行器
//!
//! 单一消费者的无界队列。叫号请求只负责入队，立即返回；后台任务按
//! 入队顺序逐条播报，每条先英语后他加禄语，中间停顿片刻避免声音重叠。
//! 单条播报失败只记录日志，不影响后续事件。

use chrono::{DateTime, Utc};
use ecqs_core::{EcqsError, QueueNumber, Result, RoomDirectory};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::announcement::AnnouncementBuilder;
use crate::sink::SpeechSink;

/// 播报事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementEvent {
    pub id: Uuid,
    pub queue_number: QueueNumber,
    pub room_id: String,
    pub enqueued_at: DateTime<Utc>,
}

/// 串行器命令
#[derive(Debug)]
pub enum AnnouncerCommand {
    Announce(AnnouncementEvent),
    /// 处理完之前的事件后停止
    Stop,
}

/// 串行器配置
#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// 两种语言之间的停顿
    pub language_pause: Duration,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            language_pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Default)]
struct AnnouncerStats {
    processed: AtomicU64,
    failed: AtomicU64,
}

/// 串行器统计快照
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnouncerStatsSnapshot {
    pub processed: u64,
    pub failed: u64,
}

/// 串行器句柄，可克隆，供叫号方入队
#[derive(Debug, Clone)]
pub struct AnnouncerHandle {
    sender: mpsc::UnboundedSender<AnnouncerCommand>,
    stats: Arc<AnnouncerStats>,
}

impl AnnouncerHandle {
    /// 入队一条播报，不等待播放
    pub fn enqueue(&self, queue_number: QueueNumber, room_id: &str) -> Result<Uuid> {
        let event = AnnouncementEvent {
            id: Uuid::new_v4(),
            queue_number,
            room_id: room_id.to_string(),
            enqueued_at: Utc::now(),
        };
        let id = event.id;

        debug!("Enqueue announcement {} for {}", id, event.queue_number);
        self.sender
            .send(AnnouncerCommand::Announce(event))
            .map_err(|_| EcqsError::Announcer("Announcer is not running".to_string()))?;

        Ok(id)
    }

    /// 发送停止信号
    pub fn stop(&self) -> Result<()> {
        self.sender
            .send(AnnouncerCommand::Stop)
            .map_err(|_| EcqsError::Announcer("Announcer is not running".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn stats(&self) -> AnnouncerStatsSnapshot {
        AnnouncerStatsSnapshot {
            processed: self.stats.processed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }
}

/// 播报串行器（后台任务）
pub struct Announcer {
    builder: AnnouncementBuilder,
    sink: Arc<dyn SpeechSink>,
    config: AnnouncerConfig,
    receiver: mpsc::UnboundedReceiver<AnnouncerCommand>,
    stats: Arc<AnnouncerStats>,
}

impl Announcer {
    /// 启动后台播报任务
    pub fn spawn(
        directory: Arc<RoomDirectory>,
        sink: Arc<dyn SpeechSink>,
        config: AnnouncerConfig,
    ) -> (AnnouncerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(AnnouncerStats::default());

        let announcer = Self {
            builder: AnnouncementBuilder::new(directory),
            sink,
            config,
            receiver,
            stats: stats.clone(),
        };

        let task = tokio::spawn(announcer.run());
        (AnnouncerHandle { sender, stats }, task)
    }

    async fn run(mut self) {
        info!("Announcer started with sink: {}", self.sink.name());

        while let Some(command) = self.receiver.recv().await {
            match command {
                AnnouncerCommand::Announce(event) => {
                    let ok = self.process(&event).await;
                    self.stats.processed.fetch_add(1, Ordering::Relaxed);
                    if !ok {
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                AnnouncerCommand::Stop => {
                    info!("Announcer received stop signal");
                    break;
                }
            }
        }

        info!("Announcer stopped");
    }

    /// 播报一条事件，返回是否全部成功
    async fn process(&self, event: &AnnouncementEvent) -> bool {
        let announcement = match self.builder.build(&event.queue_number, &event.room_id) {
            Ok(announcement) => announcement,
            Err(e) => {
                error!("Failed to build announcement {}: {}", event.id, e);
                return false;
            }
        };

        let mut ok = true;
        for (index, (language, text)) in announcement.segments().into_iter().enumerate() {
            if index > 0 && !self.config.language_pause.is_zero() {
                tokio::time::sleep(self.config.language_pause).await;
            }

            if let Err(e) = self.sink.speak(text, language).await {
                error!(
                    "Speech failed for {} ({}) in {}: {:#}",
                    event.queue_number, event.id, language, e
                );
                ok = false;
            }
        }

        let waited = Utc::now() - event.enqueued_at;
        if ok {
            info!(
                "Announced {} to {} ({} ms after enqueue)",
                event.queue_number,
                event.room_id,
                waited.num_milliseconds()
            );
        } else {
            warn!("Announcement {} for {} incomplete", event.id, event.queue_number);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSpeechSink;
    use async_trait::async_trait;
    use ecqs_core::Language;
    use tokio::sync::Semaphore;

    fn spawn_with(sink: Arc<dyn SpeechSink>) -> (AnnouncerHandle, JoinHandle<()>) {
        Announcer::spawn(
            Arc::new(RoomDirectory::default()),
            sink,
            AnnouncerConfig {
                language_pause: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_events_are_spoken_in_order() {
        let sink = RecordingSpeechSink::new();
        let (handle, task) = spawn_with(Arc::new(sink.clone()));

        handle.enqueue(QueueNumber::new("MC", 1), "R01").unwrap();
        handle.enqueue(QueueNumber::new("SP", 1), "R04").unwrap();
        handle.stop().unwrap();
        task.await.unwrap();

        let spoken = sink.spoken();
        assert_eq!(
            spoken,
            vec![
                ("blue 1, please proceed to Room 1".to_string(), Language::En),
                ("Numero asul 1, mangyaring pumunta sa Room 1".to_string(), Language::Tl),
                ("green 1, please proceed to Room 4".to_string(), Language::En),
                ("Numero berde 1, mangyaring pumunta sa Room 4".to_string(), Language::Tl),
            ]
        );
        assert_eq!(handle.stats().processed, 2);
        assert_eq!(handle.stats().failed, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_worker() {
        let sink = RecordingSpeechSink::failing_on("blue 1,");
        let (handle, task) = spawn_with(Arc::new(sink.clone()));

        handle.enqueue(QueueNumber::new("MC", 1), "R01").unwrap();
        handle.enqueue(QueueNumber::new("MC", 77), "R99").unwrap();
        handle.enqueue(QueueNumber::new("OP", 2), "R05").unwrap();
        handle.stop().unwrap();
        task.await.unwrap();

        let texts: Vec<String> = sink.spoken().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            texts,
            vec![
                "Numero asul 1, mangyaring pumunta sa Room 1",
                "orange 2, please proceed to Room 5",
                "Numero orange 2, mangyaring pumunta sa Room 5",
            ]
        );
        assert_eq!(
            handle.stats(),
            AnnouncerStatsSnapshot {
                processed: 3,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_enqueue_after_stop_fails() {
        let (handle, task) = spawn_with(Arc::new(RecordingSpeechSink::new()));
        handle.stop().unwrap();
        task.await.unwrap();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.enqueue(QueueNumber::new("MC", 1), "R01"),
            Err(EcqsError::Announcer(_))
        ));
    }

    /// 阻塞在闸门上的输出端，用来确认入队不等待播放
    struct GatedSink {
        gate: Arc<Semaphore>,
        inner: RecordingSpeechSink,
    }

    #[async_trait]
    impl SpeechSink for GatedSink {
        async fn speak(&self, text: &str, language: Language) -> anyhow::Result<()> {
            self.gate.acquire().await?.forget();
            self.inner.speak(text, language).await
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_enqueue_does_not_wait_for_playback() {
        let gate = Arc::new(Semaphore::new(0));
        let recorder = RecordingSpeechSink::new();
        let sink = GatedSink {
            gate: gate.clone(),
            inner: recorder.clone(),
        };
        let (handle, task) = spawn_with(Arc::new(sink));

        for n in 1..=5 {
            handle.enqueue(QueueNumber::new("WA", n), "R09").unwrap();
        }
        assert!(recorder.spoken().is_empty());

        handle.stop().unwrap();
        // 每段播报放行一次
        gate.add_permits(10);
        task.await.unwrap();

        let spoken = recorder.spoken();
        assert_eq!(spoken.len(), 10);
        assert_eq!(spoken[0].0, "red 1, please proceed to Room 9");
        assert_eq!(spoken[9].0, "Numero pula 5, mangyaring pumunta sa Room 9");
    }
}
