//! 语音输出端
//!
//! 语音合成引擎本身不在本系统范围内，这里只定义输出接口和几种简单实现

use anyhow::{Context, Result};
use async_trait::async_trait;
use ecqs_core::Language;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, info};

/// 语音输出接口
///
/// 实现可以很慢甚至阻塞较长时间，调用方负责不在请求路径上等待它
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// 播放一段指定语言的文本
    async fn speak(&self, text: &str, language: Language) -> Result<()>;

    /// 输出端名称
    fn name(&self) -> &str;
}

/// 仅记录日志的输出端（默认）
#[derive(Debug, Default)]
pub struct LogSpeechSink;

#[async_trait]
impl SpeechSink for LogSpeechSink {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        info!("[speech:{}] {}", language, text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// 调用外部TTS程序的输出端
///
/// 参数中的 `{text}` 和 `{lang}` 会被替换；若没有任何参数包含 `{text}`，
/// 文本作为最后一个参数追加。
#[derive(Debug, Clone)]
pub struct CommandSpeechSink {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 生成实际调用参数
    pub fn render_args(&self, text: &str, language: Language) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{text}", text).replace("{lang}", language.code()))
            .collect();

        if !self.args.iter().any(|arg| arg.contains("{text}")) {
            args.push(text.to_string());
        }
        args
    }
}

#[async_trait]
impl SpeechSink for CommandSpeechSink {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        let args = self.render_args(text, language);
        debug!("Running speech command: {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run speech command: {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Speech command exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// 记录所有播报内容的输出端，用于测试和演示
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeechSink {
    spoken: Arc<Mutex<Vec<(String, Language)>>>,
    fail_when_contains: Option<String>,
}

impl RecordingSpeechSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 文本包含指定片段时返回失败（片段本身不会被记录）
    pub fn failing_on(pattern: impl Into<String>) -> Self {
        Self {
            spoken: Arc::default(),
            fail_when_contains: Some(pattern.into()),
        }
    }

    /// 已播报内容（按播放顺序）
    pub fn spoken(&self) -> Vec<(String, Language)> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeechSink {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        if let Some(pattern) = &self.fail_when_contains {
            if text.contains(pattern.as_str()) {
                return Err(anyhow::anyhow!("Playback failed for: {}", text));
            }
        }

        self.spoken
            .lock()
            .map_err(|_| anyhow::anyhow!("Recording sink lock poisoned"))?
            .push((text.to_string(), language));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
