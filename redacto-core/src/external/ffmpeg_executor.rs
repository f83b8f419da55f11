// ============================================================================
// redacto-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// Traits for spawning ffmpeg and consuming its event stream, with the
// production implementation backed by ffmpeg-sidecar. The encoder is written
// against these traits so tests can substitute a mock process.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - run_collecting_diagnostics: Drives a process to exit, keeping its
//   warning and error output verbatim
//
// AI-ASSISTANT-INFO: FFmpeg process management and execution abstraction

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::process::ExitStatus;

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error("ffmpeg (sidecar - get iter)", ExitStatus::default(), e.to_string())
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

/// Output of a finished ffmpeg process.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    /// Warning, error and fatal log lines plus error events, in order
    pub diagnostics: Vec<String>,
}

/// Consumes every event of `process`, then waits for it to exit.
///
/// Progress events are logged at debug level; anything at warning level or
/// above is kept verbatim for error reporting.
pub fn run_collecting_diagnostics<P: FfmpegProcess>(process: &mut P) -> CoreResult<ProcessOutcome> {
    let mut diagnostics = Vec::new();
    process.handle_events(|event| {
        match event {
            FfmpegEvent::Log(LogLevel::Warning | LogLevel::Error | LogLevel::Fatal, line) => {
                log::debug!("ffmpeg: {}", line);
                diagnostics.push(line);
            }
            FfmpegEvent::Error(line) => {
                log::debug!("ffmpeg error: {}", line);
                diagnostics.push(line);
            }
            FfmpegEvent::Progress(progress) => {
                log::debug!("ffmpeg progress: frame {} ({} fps)", progress.frame, progress.fps);
            }
            _ => {}
        }
        Ok(())
    })?;
    let status = process.wait()?;
    Ok(ProcessOutcome {
        status,
        diagnostics,
    })
}
