//! JSON progress handler for structured progress output
//!
//! Writes one JSON object per line to stdout so that wrapper scripts can
//! follow a redaction run without parsing human-readable logs.

use super::{Event, EventHandler};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Frame interval used when the total frame count is unknown.
const UNKNOWN_TOTAL_INTERVAL: u64 = 100;

/// Event handler that outputs progress events as structured JSON to stdout
pub struct JsonProgressHandler {
    output: Mutex<Box<dyn Write + Send>>,
}

impl JsonProgressHandler {
    /// Create a new JSON progress handler that writes to stdout
    pub fn new() -> Self {
        Self {
            output: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Create a new JSON progress handler with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_json(&self, value: serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            if let Ok(json_str) = serde_json::to_string(&value) {
                let _ = writeln!(output, "{}", json_str);
                let _ = output.flush();
            }
        }
    }
}

/// Whether frame `index` should produce a progress line.
///
/// With a known total, lines are written each time progress crosses a 5%
/// step and on the last frame; otherwise every hundredth frame.
fn should_report_frame(index: u64, total_frames: Option<u64>) -> bool {
    match total_frames {
        Some(total) if total > 0 => {
            let done = index + 1;
            if done >= total {
                return true;
            }
            let step = |n: u64| n * 20 / total;
            step(done) != step(index)
        }
        _ => (index + 1) % UNKNOWN_TOTAL_INTERVAL == 0,
    }
}

impl EventHandler for JsonProgressHandler {
    fn handle(&self, event: &Event) {
        let timestamp = Self::get_timestamp();

        match event {
            Event::PipelineStarted {
                input_file,
                output_file,
                detector,
                width,
                height,
                frame_rate,
                total_frames,
            } => {
                self.write_json(json!({
                    "type": "initialization",
                    "input_file": input_file.display().to_string(),
                    "output_file": output_file.display().to_string(),
                    "detector": detector,
                    "resolution": format!("{}x{}", width, height),
                    "frame_rate": frame_rate,
                    "total_frames": total_frames,
                    "timestamp": timestamp
                }));
            }

            Event::FrameProcessed {
                index,
                regions,
                total_frames,
            } => {
                if should_report_frame(*index, *total_frames) {
                    let percent = total_frames
                        .filter(|&t| t > 0)
                        .map(|t| ((index + 1) as f64 / t as f64 * 100.0).min(100.0));
                    self.write_json(json!({
                        "type": "frame_progress",
                        "stage": "redaction",
                        "current_frame": index + 1,
                        "total_frames": total_frames,
                        "percent": percent,
                        "regions": regions,
                        "timestamp": timestamp
                    }));
                }
            }

            Event::EncodingStarted {
                frames,
                frame_rate,
                codec,
            } => {
                self.write_json(json!({
                    "type": "encoding_started",
                    "stage": "encoding",
                    "frames": frames,
                    "frame_rate": frame_rate,
                    "codec": codec,
                    "timestamp": timestamp
                }));
            }

            Event::Completed { report } => {
                let mut value = serde_json::to_value(report).unwrap_or_default();
                if let Some(map) = value.as_object_mut() {
                    map.insert("type".to_string(), json!("complete"));
                    map.insert("timestamp".to_string(), json!(timestamp));
                }
                self.write_json(value);
            }

            Event::Failed {
                category,
                message,
                exit_code,
                retained_staging,
            } => {
                self.write_json(json!({
                    "type": "error",
                    "category": category,
                    "message": message,
                    "exit_code": exit_code,
                    "retained_staging": retained_staging.as_ref().map(|p| p.display().to_string()),
                    "timestamp": timestamp
                }));
            }

            Event::Warning { message } => {
                self.write_json(json!({
                    "type": "warning",
                    "message": message,
                    "timestamp": timestamp
                }));
            }

            Event::StateChanged { .. } => {}
        }
    }
}

impl Default for JsonProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineReport;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct MockWriter {
        content: Arc<Mutex<Vec<u8>>>,
    }

    impl MockWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let content = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    content: content.clone(),
                },
                content,
            )
        }
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.content.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn lines(content: &Arc<Mutex<Vec<u8>>>) -> Vec<serde_json::Value> {
        let output = String::from_utf8(content.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_frame_progress_is_throttled() {
        let (writer, content) = MockWriter::new();
        let handler = JsonProgressHandler::with_writer(Box::new(writer));

        for index in 0..40 {
            handler.handle(&Event::FrameProcessed {
                index,
                regions: 1,
                total_frames: Some(40),
            });
        }

        let parsed = lines(&content);
        assert_eq!(parsed.len(), 20);
        assert_eq!(parsed[0]["type"], "frame_progress");
        assert_eq!(parsed[0]["current_frame"], 2);
        let last = parsed.last().unwrap();
        assert_eq!(last["current_frame"], 40);
        assert_eq!(last["percent"], 100.0);
    }

    #[test]
    fn test_unknown_total_reports_every_hundred_frames() {
        assert!(!should_report_frame(0, None));
        assert!(should_report_frame(99, None));
        assert!(!should_report_frame(100, None));
        assert!(should_report_frame(0, Some(1)));
    }

    #[test]
    fn test_completion_carries_report_fields() {
        let (writer, content) = MockWriter::new();
        let handler = JsonProgressHandler::with_writer(Box::new(writer));

        let report = PipelineReport {
            frames_processed: 10,
            regions_redacted: 4,
            frames_with_regions: 4,
            discarded_regions: 1,
            frame_rate: 24.0,
            output_path: PathBuf::from("out.mp4"),
            elapsed: Duration::from_secs(3),
        };
        handler.handle(&Event::Completed { report });

        let parsed = lines(&content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["type"], "complete");
        assert_eq!(parsed[0]["frames_processed"], 10);
        assert_eq!(parsed[0]["regions_redacted"], 4);
        assert_eq!(parsed[0]["output_path"], "out.mp4");
    }

    #[test]
    fn test_failure_json() {
        let (writer, content) = MockWriter::new();
        let handler = JsonProgressHandler::with_writer(Box::new(writer));

        handler.handle(&Event::Failed {
            category: "encode".to_string(),
            message: "encoder exited with status 1".to_string(),
            exit_code: 4,
            retained_staging: Some(PathBuf::from("/tmp/redacto_frames_abc")),
        });
        handler.handle(&Event::StateChanged {
            from: "Streaming".to_string(),
            to: "Finalizing".to_string(),
        });

        let parsed = lines(&content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["type"], "error");
        assert_eq!(parsed[0]["exit_code"], 4);
        assert_eq!(parsed[0]["retained_staging"], "/tmp/redacto_frames_abc");
    }
}
