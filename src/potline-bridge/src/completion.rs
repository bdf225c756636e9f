// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Completed-lot records.
//!
//! [`JsonlCompletionLog`] writes one JSON object per line to a file that
//! rotates daily.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use potline_core::{unix_millis, ActiveLot, Line, LotId};

use crate::config::CompletionLogConfig;

/// A lot finished on a line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionEvent {
    pub line: Line,
    pub lot_id: LotId,
    pub actual_count: u32,
    pub activated_at_ms: u64,
    pub completed_at_ms: u64,
}

impl CompletionEvent {
    pub fn new(lot: &ActiveLot, actual_count: u32) -> Self {
        Self {
            line: lot.line,
            lot_id: lot.lot_id,
            actual_count,
            activated_at_ms: lot.activated_at_ms,
            completed_at_ms: unix_millis(),
        }
    }
}

pub trait CompletionSink: Send + Sync {
    fn record(&self, event: &CompletionEvent);
}

/// Emits completions as log events only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCompletionSink;

impl CompletionSink for TracingCompletionSink {
    fn record(&self, event: &CompletionEvent) {
        info!(
            "Line {} completed lot {} ({} units)",
            event.line, event.lot_id, event.actual_count
        );
    }
}

struct LogFileState {
    current_file_name: String,
    writer: BufWriter<File>,
}

pub struct JsonlCompletionLog {
    base_dir: PathBuf,
    file_template: String,
    state: Mutex<LogFileState>,
}

impl JsonlCompletionLog {
    fn resolve_file_name(template: &str) -> String {
        let now = Utc::now();
        template
            .replace("%YYYY%", &now.format("%Y").to_string())
            .replace("%MM%", &now.format("%m").to_string())
            .replace("%DD%", &now.format("%d").to_string())
    }

    fn open_writer(path: &Path) -> Result<BufWriter<File>, String> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(|e| {
                format!("create completion log dir '{}': {}", parent.display(), e)
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("open completion log '{}': {}", path.display(), e))?;
        Ok(BufWriter::new(file))
    }

    pub fn open(base_dir: &Path, template: &str) -> Result<Self, String> {
        let file_name = Self::resolve_file_name(template);
        let writer = Self::open_writer(&base_dir.join(&file_name))?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            file_template: template.to_string(),
            state: Mutex::new(LogFileState {
                current_file_name: file_name,
                writer,
            }),
        })
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> PathBuf {
        self.base_dir.join(&self.state().current_file_name)
    }

    fn state(&self) -> MutexGuard<'_, LogFileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_event(&self, event: &CompletionEvent) {
        let line = json!({
            "ts_ms": unix_millis(),
            "event": "lot_completed",
            "payload": event,
        });
        let mut state = self.state();

        let next_file_name = Self::resolve_file_name(&self.file_template);
        if next_file_name != state.current_file_name {
            match Self::open_writer(&self.base_dir.join(&next_file_name)) {
                Ok(next_writer) => {
                    state.current_file_name = next_file_name;
                    state.writer = next_writer;
                }
                Err(e) => {
                    warn!("completion log reopen failed: {}", e);
                    return;
                }
            }
        }

        if serde_json::to_writer(&mut state.writer, &line).is_err() {
            warn!("completion log serialization failed");
            return;
        }
        if state.writer.write_all(b"\n").is_err() {
            warn!("completion log write failed");
            return;
        }
        let _ = state.writer.flush();
    }
}

impl CompletionSink for JsonlCompletionLog {
    fn record(&self, event: &CompletionEvent) {
        TracingCompletionSink.record(event);
        self.write_event(event);
    }
}

/// File log when enabled, log events otherwise.
pub fn completion_sink_from_config(
    cfg: &CompletionLogConfig,
) -> Result<Arc<dyn CompletionSink>, String> {
    if !cfg.enabled {
        return Ok(Arc::new(TracingCompletionSink));
    }
    let base_dir = PathBuf::from(cfg.dir.trim());
    create_dir_all(&base_dir)
        .map_err(|e| format!("create completion log dir '{}': {}", base_dir.display(), e))?;
    Ok(Arc::new(JsonlCompletionLog::open(&base_dir, &cfg.file)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use potline_core::LotRecord;

    fn event(lot_id: LotId, actual_count: u32) -> CompletionEvent {
        CompletionEvent::new(&ActiveLot::new(Line::Two, LotRecord::new(lot_id)), actual_count)
    }

    #[test]
    fn test_resolve_file_name() {
        let name = JsonlCompletionLog::resolve_file_name("completions-%YYYY%-%MM%-%DD%.log");
        assert!(name.starts_with("completions-"));
        assert!(!name.contains('%'));
        assert_eq!(name.len(), "completions-2026-01-01.log".len());
    }

    #[test]
    fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlCompletionLog::open(dir.path(), "completions-%YYYY%-%MM%-%DD%.log").unwrap();
        log.record(&event(5, 120));
        log.record(&event(7, 80));

        let path = log.current_path();
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "lot_completed");
        assert_eq!(lines[0]["payload"]["line"], 2);
        assert_eq!(lines[0]["payload"]["lot_id"], 5);
        assert_eq!(lines[1]["payload"]["actual_count"], 80);
    }

    #[test]
    fn test_records_after_writer_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(
            JsonlCompletionLog::open(dir.path(), "completions-%YYYY%-%MM%-%DD%.log").unwrap(),
        );
        let holder = Arc::clone(&log);
        let _ = std::thread::spawn(move || {
            let _state = holder.state.lock().unwrap();
            panic!("writer thread died");
        })
        .join();
        assert!(log.state.is_poisoned());

        log.record(&event(9, 3));
        let content = std::fs::read_to_string(log.current_path()).unwrap();
        let entry: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(entry["payload"]["lot_id"], 9);
    }

    #[test]
    fn test_disabled_config_uses_tracing_sink() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CompletionLogConfig {
            enabled: false,
            dir: dir.path().join("unused").to_string_lossy().to_string(),
            ..CompletionLogConfig::default()
        };
        let sink = completion_sink_from_config(&cfg).unwrap();
        sink.record(&event(1, 1));
        assert!(!dir.path().join("unused").exists());
    }

    #[test]
    fn test_enabled_config_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("completions");
        let cfg = CompletionLogConfig {
            enabled: true,
            dir: log_dir.to_string_lossy().to_string(),
            ..CompletionLogConfig::default()
        };
        let sink = completion_sink_from_config(&cfg).unwrap();
        sink.record(&event(3, 10));
        let files: Vec<_> = std::fs::read_dir(&log_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
