//! 叫号服务器主程序

use anyhow::Context;
use clap::Parser;
use ecqs_admin::{init_logging, ConfigManager, ConfigValidator, EcqsConfig, SinkKind};
use ecqs_voice::{Announcer, AnnouncerConfig, CommandSpeechSink, LogSpeechSink, SpeechSink};
use ecqs_web::{AppState, WebServer};
use ecqs_workflow::{QueueEngine, RetentionSweeper};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 叫号服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "ecqs-server")]
#[command(about = "诊所叫号系统 (Clinic Queue Calling System) 服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机（覆盖配置文件）
    #[arg(long)]
    host: Option<String>,

    /// 监听端口（覆盖配置文件）
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别（覆盖配置文件）
    #[arg(short, long)]
    log_level: Option<String>,

    /// 打印生效的配置后退出
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut EcqsConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// 根据配置选择语音输出端
fn build_sink(config: &EcqsConfig) -> Arc<dyn SpeechSink> {
    match config.announcement.sink {
        SinkKind::Log => Arc::new(LogSpeechSink),
        SinkKind::Command => {
            let command = &config.announcement.command;
            Arc::new(CommandSpeechSink::new(command.program.clone(), command.args.clone()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听退出信号: {}", e);
        return;
    }
    info!("收到退出信号，正在关闭...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    args.apply(&mut config);
    ConfigValidator::new().validate(&config)?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    // 初始化日志
    init_logging(&config.logging)?;

    info!("启动叫号服务器...");

    let directory = Arc::new(config.build_directory().context("Invalid room catalog")?);
    info!(
        "房间目录: {} 个类型, {} 个房间",
        directory.room_types().len(),
        directory.rooms().len()
    );

    // 启动语音播报
    let announcer = if config.announcement.enabled {
        let sink = build_sink(&config);
        info!("  播报输出: {}", sink.name());
        Some(Announcer::spawn(
            directory.clone(),
            sink,
            AnnouncerConfig {
                language_pause: config.announcement.language_pause(),
            },
        ))
    } else {
        warn!("语音播报已关闭");
        None
    };

    let engine = Arc::new(QueueEngine::new(
        directory,
        announcer.as_ref().map(|(handle, _)| handle.clone()),
    ));

    // 启动保留期清理
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config.retention.enabled.then(|| {
        RetentionSweeper::new(
            engine.ledger(),
            config.retention.max_age(),
            config.retention.sweep_interval(),
        )
        .spawn(shutdown_rx)
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    info!("  监听地址: {}", addr);

    let server = WebServer::new(addr, AppState::new(engine));
    let served = server.run(shutdown_signal()).await;

    // 先停止后台任务，再返回服务器结果
    let _ = shutdown_tx.send(true);
    if let Some(task) = sweeper {
        if let Err(e) = task.await {
            error!("清理任务异常退出: {}", e);
        }
    }
    if let Some((handle, task)) = announcer {
        if handle.stop().is_ok() {
            if let Err(e) = task.await {
                error!("播报任务异常退出: {}", e);
            }
        }
    }

    if let Err(e) = &served {
        error!("服务器运行失败: {}", e);
    }
    served
}
