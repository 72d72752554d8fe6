//! 叫号流程演示程序
//!
//! 登记几位患者、叫号、完成服务，并打印仪表盘状态和播报内容

use ecqs::core::RoomDirectory;
use ecqs::voice::{Announcer, AnnouncerConfig, LogSpeechSink};
use ecqs::workflow::QueueEngine;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🚀 ECQS 叫号流程演示\n");

    let directory = Arc::new(RoomDirectory::default());
    let (announcer, announcer_task) = Announcer::spawn(
        directory.clone(),
        Arc::new(LogSpeechSink),
        AnnouncerConfig::default(),
    );
    let engine = QueueEngine::new(directory, Some(announcer.clone()));

    // 1. 登记患者
    for (name, room_type) in [
        ("Juan Dela Cruz", "MC"),
        ("Maria Santos", "MC"),
        ("Jose Rizal", "SP"),
        ("Ana Reyes", "WA"),
    ] {
        let number = engine.register(name, room_type).await?;
        println!("✅ 登记 {} -> {}", name, number);
    }

    // 2. 叫号
    for (number, room) in [("MC001", "R01"), ("SP001", "R03"), ("MC002", "R02")] {
        let outcome = engine.call(number, room).await?;
        if let Some(announcement) = outcome.announcement {
            println!("📢 {}", announcement.primary);
            println!("   {}", announcement.secondary);
        }
    }

    // 3. 类型不符的叫号会被拒绝
    if let Err(e) = engine.call("WA001", "R01").await {
        warn!("Demo call rejected as expected: {}", e);
        println!("⚠️  {}", e);
    }

    // 4. 完成服务
    engine.complete("MC001").await?;
    println!("✅ MC001 服务完成");

    // 5. 仪表盘
    println!("\n📊 仪表盘:");
    for (code, status) in engine.room_type_status().await {
        println!("   {} (等待合计 {})", code, status.total_waiting);
        for room in status.rooms {
            println!(
                "     {} 当前: {} 下一位: [{}]",
                room.room_id,
                room.current.as_deref().unwrap_or("-"),
                room.next.join(", ")
            );
        }
    }

    let summary = engine.summary().await;
    println!(
        "\n共 {} 条记录: 等待 {}, 已叫号 {}, 已完成 {}",
        summary.total, summary.waiting, summary.called, summary.complete
    );

    // 等待播报全部完成
    announcer.stop()?;
    announcer_task.await?;
    let stats = announcer.stats();
    info!("Demo finished: {} announcements, {} failed", stats.processed, stats.failed);
    println!("\n🔊 已播报 {} 条", stats.processed);

    Ok(())
}
