use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

use anyhow::Result;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const LOG_FILE: &str = "smartpaste.log";

/**
 * \brief 补全调用产生的遥测事件。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /**
     * \brief 调用成功。
     * \details token 数默认是 0 占位；上游响应带 OpenAI 兼容的 `usage` 时改为记录其真实计数。
     * 非 2xx 的错误文本路径没有 usage，始终为 0。
     */
    CustomFormatGenerated {
        prompt_tokens: u32,
        completion_tokens: u32,
        model: String,
    },
    /** \brief 调用失败，携带错误信息。 */
    CustomFormatFailed { error: String },
}

impl TelemetryEvent {
    fn level(&self) -> &'static str {
        match self {
            Self::CustomFormatGenerated { .. } => "INFO",
            Self::CustomFormatFailed { .. } => "ERROR",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::CustomFormatGenerated { .. } => "advanced_paste.custom_format",
            Self::CustomFormatFailed { .. } => "advanced_paste.custom_format_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::CustomFormatGenerated {
                prompt_tokens,
                completion_tokens,
                model,
            } => format!(
                "model={} prompt_tokens={} completion_tokens={}",
                model, prompt_tokens, completion_tokens
            ),
            Self::CustomFormatFailed { error } => error.clone(),
        }
    }
}

/**
 * \brief 单向遥测出口，调用方不等待结果。
 */
pub trait TelemetrySink: Send + Sync {
    fn write_event(&self, event: TelemetryEvent);
}

/**
 * \brief 丢弃所有事件。
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn write_event(&self, _event: TelemetryEvent) {}
}

/**
 * \brief 追加写入本地日志文件的遥测实现，默认关闭。
 */
#[derive(Debug)]
pub struct FileTelemetry {
    log_dir: PathBuf,
    enabled: RwLock<bool>,
}

impl FileTelemetry {
    pub fn new(log_dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            log_dir: log_dir.into(),
            enabled: RwLock::new(enabled),
        }
    }

    /**
     * \brief 更新遥测开关状态。
     */
    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut guard) = self.enabled.write() {
            *guard = enabled;
        }
    }

    /**
     * \brief 查询当前遥测开关状态。
     */
    pub fn is_enabled(&self) -> bool {
        self.enabled.read().map(|g| *g).unwrap_or(false)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE)
    }
}

impl TelemetrySink for FileTelemetry {
    fn write_event(&self, event: TelemetryEvent) {
        if !self.is_enabled() {
            return;
        }
        if let Err(err) = write_line(&self.log_dir, event.level(), event.category(), &event.message()) {
            eprintln!("telemetry write failed: {}", err);
        }
    }
}

fn write_line(log_dir: &Path, level: &str, category: &str, message: &str) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;
    writeln!(file, "{} [{}] {} - {}", timestamp, level, category, message)?;
    Ok(())
}

/**
 * \brief 记录到内存的遥测实现，便于宿主或测试断言。
 */
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn write_event(&self, event: TelemetryEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_telemetry_disabled_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileTelemetry::new(dir.path().join("logs"), false);
        sink.write_event(TelemetryEvent::CustomFormatFailed {
            error: "boom".to_string(),
        });
        assert!(!sink.log_path().exists());
    }

    #[test]
    fn test_file_telemetry_appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileTelemetry::new(dir.path().join("logs"), true);
        sink.write_event(TelemetryEvent::CustomFormatGenerated {
            prompt_tokens: 0,
            completion_tokens: 0,
            model: "qwen-plus-1127".to_string(),
        });
        sink.write_event(TelemetryEvent::CustomFormatFailed {
            error: "connection refused".to_string(),
        });

        let content = std::fs::read_to_string(sink.log_path()).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO] advanced_paste.custom_format - model=qwen-plus-1127"));
        assert!(lines[1].ends_with("[ERROR] advanced_paste.custom_format_error - connection refused"));
    }

    #[test]
    fn test_file_telemetry_toggle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileTelemetry::new(dir.path(), false);
        assert!(!sink.is_enabled());
        sink.set_enabled(true);
        assert!(sink.is_enabled());
    }

    #[test]
    fn test_memory_telemetry_records_in_order() {
        let sink = MemoryTelemetry::default();
        sink.write_event(TelemetryEvent::CustomFormatFailed {
            error: "a".to_string(),
        });
        sink.write_event(TelemetryEvent::CustomFormatFailed {
            error: "b".to_string(),
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            TelemetryEvent::CustomFormatFailed {
                error: "b".to_string()
            }
        );
    }
}
