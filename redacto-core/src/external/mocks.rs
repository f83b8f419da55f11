// redacto-core/src/external/mocks.rs
//
// Scripted stand-in for ffmpeg, used wherever a test needs the encoder to
// succeed, fail with diagnostics, or fail to start.

// Compiled for this crate's unit tests and for downstream suites that enable
// the "test-mocks" feature.
#![cfg(any(test, feature = "test-mocks"))]

use super::{FfmpegProcess, FfmpegSpawner};
use crate::error::{CoreError, CoreResult, command_start_error};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::rc::Rc;

/// A finished ffmpeg process: replays `events_to_emit`, then reports
/// `exit_status`.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    pub events_to_emit: Vec<FfmpegEvent>,
    pub exit_status: ExitStatus,
}

impl MockFfmpegProcess {
    /// Process that exited with `code`. The code sits in the high byte of
    /// the raw wait status.
    pub fn exited(code: i32, events: Vec<FfmpegEvent>) -> Self {
        Self {
            events_to_emit: events,
            exit_status: ExitStatus::from_raw(code << 8),
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        self.events_to_emit
            .drain(..)
            .try_for_each(|event| handler(event))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

enum ScriptedOutcome {
    /// Exit 0 after writing a placeholder file at the output argument
    Encoded(MockFfmpegProcess),
    Exited(MockFfmpegProcess),
    NotStarted(CoreError),
}

struct ScriptedRun {
    /// Some argument of the invocation must contain this
    arg_pattern: String,
    outcome: ScriptedOutcome,
}

/// [`FfmpegSpawner`] that answers each invocation from a script.
///
/// Every spawn consumes the first scripted run whose pattern occurs in one
/// of the arguments. An invocation nothing was scripted for fails to start.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    script: Rc<RefCell<VecDeque<ScriptedRun>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, arg_pattern: &str, outcome: ScriptedOutcome) {
        self.script.borrow_mut().push_back(ScriptedRun {
            arg_pattern: arg_pattern.to_string(),
            outcome,
        });
    }

    /// Scripts an encode that succeeds and writes `b"encoded"` as its output.
    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
        self.push(
            arg_pattern,
            ScriptedOutcome::Encoded(MockFfmpegProcess::exited(0, events)),
        );
    }

    /// Scripts a run that emits `events` and exits with `exit_code`.
    pub fn add_exit_error_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32) {
        self.push(
            arg_pattern,
            ScriptedOutcome::Exited(MockFfmpegProcess::exited(exit_code, events)),
        );
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.push(arg_pattern, ScriptedOutcome::NotStarted(error));
    }

    /// Argument lists of every spawn so far, in order.
    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args: Vec<String> = cmd
            .as_inner()
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        self.received_calls.borrow_mut().push(args.clone());

        let run = {
            let mut script = self.script.borrow_mut();
            script
                .iter()
                .position(|run| args.iter().any(|arg| arg.contains(&run.arg_pattern)))
                .and_then(|index| script.remove(index))
        };
        let Some(run) = run else {
            log::warn!("No scripted ffmpeg run for {:?}", args);
            return Err(command_start_error(
                "ffmpeg (mock)",
                io::Error::new(io::ErrorKind::NotFound, "no scripted run matches"),
            ));
        };
        log::debug!("Scripted ffmpeg run '{}' matched", run.arg_pattern);

        match run.outcome {
            ScriptedOutcome::Encoded(process) => {
                if let Some(output) = args.last() {
                    std::fs::write(output, b"encoded")?;
                }
                Ok(process)
            }
            ScriptedOutcome::Exited(process) => Ok(process),
            ScriptedOutcome::NotStarted(error) => Err(error),
        }
    }
}
