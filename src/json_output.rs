//! JSON output for tool integration
//!
//! When --json-progress is enabled, progress and status information is
//! emitted as JSON lines to stdout and the decorated console output is
//! suppressed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last progress emission timestamp (milliseconds since epoch)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

/// Minimum delay between two progress lines
const PROGRESS_INTERVAL_MS: u64 = 40;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// ROI cropped and written
    FileCompleted {
        input_path: String,
        output_path: String,
        roi: [u32; 4],
        processing_time_ms: u128,
    },
    FileFailed { input_path: String, error: String },
    /// Label map produced by a split
    LabelMap { labels: Vec<String>, counts: Vec<usize> },
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        duration_secs: f64,
    },
}

impl JsonMessage {
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_line() {
            println!("{}", json);
        }
    }

    /// Emit a progress message, throttled to one every 40ms.
    ///
    /// The final update (current == total) is always emitted.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let last_ms = LAST_PROGRESS_MS.load(Ordering::Relaxed);

        if now_ms.saturating_sub(last_ms) >= PROGRESS_INTERVAL_MS || current == total {
            LAST_PROGRESS_MS.store(now_ms, Ordering::Relaxed);
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    pub fn file_completed(
        input_path: &Path,
        output_path: &Path,
        roi: [u32; 4],
        processing_time_ms: u128,
    ) {
        Self::FileCompleted {
            input_path: input_path.display().to_string(),
            output_path: output_path.display().to_string(),
            roi,
            processing_time_ms,
        }
        .emit();
    }

    pub fn file_failed(input_path: &Path, error: impl Into<String>) {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            error: error.into(),
        }
        .emit();
    }

    pub fn summary(total_files: usize, processed: usize, failed: usize, duration_secs: f64) {
        Self::Summary {
            total_files,
            processed,
            failed,
            duration_secs,
        }
        .emit();
    }
}
