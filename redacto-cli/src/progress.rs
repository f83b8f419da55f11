// ============================================================================
// redacto-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Terminal progress bar for a redaction run
//
// ProgressBarHandler turns pipeline events into an indicatif bar: a frame
// bar while streaming (a spinner when the frame count is unknown), then a
// spinner while the encoder runs. Warnings are printed above the bar so
// they do not tear it.
//
// AI-ASSISTANT-INFO: indicatif progress bar driven by pipeline events

// ---- External crate imports ----
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use redacto_core::{Event, EventHandler};

// ---- Standard library imports ----
use std::sync::Mutex;
use std::time::Duration;

const FRAME_TEMPLATE: &str =
    "  Redacting: {percent:>3}% [{bar:30}] {pos}/{len} frames ({elapsed} / {eta})";
const SPINNER_TEMPLATE: &str = "  {spinner} {msg} ({elapsed})";

pub struct ProgressBarHandler {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl ProgressBarHandler {
    /// A handler drawing to stderr.
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A handler that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn draw_target(&self) -> ProgressDrawTarget {
        if self.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        }
    }

    fn frame_bar(&self, total_frames: Option<u64>) -> ProgressBar {
        let bar = match total_frames {
            Some(total) => {
                let bar = ProgressBar::with_draw_target(Some(total), self.draw_target());
                bar.set_style(
                    ProgressStyle::with_template(FRAME_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("##."),
                );
                bar
            }
            None => self.spinner("Redacting frames"),
        };
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        let bar = ProgressBar::with_draw_target(None, self.draw_target());
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message);
        bar
    }

    /// Position of the current bar, if one is active.
    pub fn position(&self) -> Option<u64> {
        self.bar
            .lock()
            .ok()
            .and_then(|bar| bar.as_ref().map(ProgressBar::position))
    }
}

impl Default for ProgressBarHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for ProgressBarHandler {
    fn handle(&self, event: &Event) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };

        match event {
            Event::PipelineStarted { total_frames, .. } => {
                *slot = Some(self.frame_bar(*total_frames));
            }
            Event::FrameProcessed { index, .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_position(index + 1);
                }
            }
            Event::EncodingStarted { frames, .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
                let spinner = self.spinner("Encoding");
                spinner.set_message(format!("Encoding {frames} frames"));
                spinner.enable_steady_tick(Duration::from_millis(100));
                *slot = Some(spinner);
            }
            Event::Warning { message } => {
                let line = format!("{} {}", style("Warning:").yellow(), message);
                match slot.as_ref() {
                    Some(bar) => bar.println(line),
                    None => eprintln!("{line}"),
                }
            }
            Event::Completed { .. } | Event::Failed { .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
            Event::StateChanged { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn started(total_frames: Option<u64>) -> Event {
        Event::PipelineStarted {
            input_file: PathBuf::from("in.mp4"),
            output_file: PathBuf::from("out.mp4"),
            detector: "cascade".to_string(),
            width: 64,
            height: 48,
            frame_rate: 24.0,
            total_frames,
        }
    }

    #[test]
    fn test_bar_follows_frames() {
        let handler = ProgressBarHandler::hidden();
        assert_eq!(handler.position(), None);

        handler.handle(&started(Some(10)));
        for index in 0..4 {
            handler.handle(&Event::FrameProcessed {
                index,
                regions: 0,
                total_frames: Some(10),
            });
        }
        assert_eq!(handler.position(), Some(4));

        handler.handle(&Event::EncodingStarted {
            frames: 10,
            frame_rate: 24.0,
            codec: "libx265".to_string(),
        });
        assert_eq!(handler.position(), Some(0));

        handler.handle(&Event::Failed {
            category: "Encode error".to_string(),
            message: "boom".to_string(),
            exit_code: 4,
            retained_staging: None,
        });
        assert_eq!(handler.position(), None);
    }

    #[test]
    fn test_unknown_total_uses_spinner() {
        let handler = ProgressBarHandler::hidden();
        handler.handle(&started(None));
        handler.handle(&Event::FrameProcessed {
            index: 0,
            regions: 1,
            total_frames: None,
        });
        assert_eq!(handler.position(), Some(1));
    }
}
