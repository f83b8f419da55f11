// ============================================================================
// redacto-core/src/events/mod.rs
// ============================================================================
//
// EVENTS: Progress and lifecycle notifications from a pipeline run
//
// The pipeline never prints. It emits Events through an EventDispatcher and
// each registered EventHandler decides how to present them: the CLI draws a
// progress bar, JsonProgressHandler writes one JSON object per line for
// external tools.
//
// AI-ASSISTANT-INFO: Event types, handler trait and dispatcher

use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::PipelineReport;

pub mod json_handler;

pub use json_handler::JsonProgressHandler;

#[derive(Debug, Clone)]
pub enum Event {
    // Initialization events
    PipelineStarted {
        input_file: PathBuf,
        output_file: PathBuf,
        detector: String,
        width: u32,
        height: u32,
        frame_rate: f64,
        total_frames: Option<u64>,
    },

    StateChanged {
        from: String,
        to: String,
    },

    // Streaming events
    FrameProcessed {
        index: u64,
        regions: usize,
        total_frames: Option<u64>,
    },

    // Encoding events
    EncodingStarted {
        frames: u64,
        frame_rate: f64,
        codec: String,
    },

    // Terminal events
    Completed {
        report: PipelineReport,
    },

    Failed {
        category: String,
        message: String,
        exit_code: i32,
        retained_staging: Option<PathBuf>,
    },

    Warning {
        message: String,
    },
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }

    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}
