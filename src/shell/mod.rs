//! Push-to-talk shell around the command loop
//!
//! One button drives the cycle: press to start recording, press again to
//! stop, process the utterance, and speak the answer. Only one cycle runs
//! at a time since every transition takes `&mut self`.

use crate::agent::CommandLoop;
use crate::voice::{Recorder, Speaker};
use crate::{Error, Result};

/// Where the shell is in the record/process cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    Idle,
    Listening,
    Processing,
    Done,
    Error,
}

/// Which step of the cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailedStep {
    StartRecording,
    Processing,
}

#[derive(Debug, Clone)]
struct Failure {
    step: FailedStep,
    detail: String,
}

/// Record/process/speak cycle driver
pub struct Shell<R, S> {
    command_loop: CommandLoop,
    recorder: R,
    speaker: S,
    status: ShellStatus,
    last_response: Option<String>,
    failure: Option<Failure>,
}

impl<R: Recorder, S: Speaker> Shell<R, S> {
    #[must_use]
    pub const fn new(command_loop: CommandLoop, recorder: R, speaker: S) -> Self {
        Self {
            command_loop,
            recorder,
            speaker,
            status: ShellStatus::Idle,
            last_response: None,
            failure: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> ShellStatus {
        self.status
    }

    /// Text to show for the current status
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.status {
            ShellStatus::Idle => "Press the button and tell me what to do",
            ShellStatus::Listening => "Listening...",
            ShellStatus::Processing => "Processing...",
            ShellStatus::Done => "Done",
            ShellStatus::Error => match self.failure.as_ref().map(|f| f.step) {
                Some(FailedStep::StartRecording) => "Error starting recording",
                _ => "Error processing command",
            },
        }
    }

    /// The most recent spoken answer
    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Detail of the current error, if any
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.detail.as_str())
    }

    /// Begin recording an utterance
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] unless the shell is idle or done, or the
    /// recorder's error if the microphone cannot start
    pub fn start_recording(&mut self) -> Result<()> {
        match self.status {
            ShellStatus::Idle | ShellStatus::Done => {}
            ShellStatus::Listening => return Err(Error::Busy("already listening".to_string())),
            ShellStatus::Processing => {
                return Err(Error::Busy("still processing the last command".to_string()));
            }
            ShellStatus::Error => {
                return Err(Error::Busy("retry before recording again".to_string()));
            }
        }

        if let Err(e) = self.recorder.start() {
            tracing::error!(error = %e, "failed to start recording");
            self.fail(FailedStep::StartRecording, format!("Start recording error: {e}"));
            return Err(e);
        }

        self.failure = None;
        self.status = ShellStatus::Listening;
        tracing::info!("listening");
        Ok(())
    }

    /// Stop recording, run the command, and speak the answer
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] when not listening; otherwise any recorder or
    /// command loop error, which also moves the shell to
    /// [`ShellStatus::Error`]
    #[allow(clippy::future_not_send)]
    pub async fn stop_and_process(&mut self) -> Result<String> {
        if self.status != ShellStatus::Listening {
            return Err(Error::Busy("not listening".to_string()));
        }
        self.status = ShellStatus::Processing;

        let outcome = match self.recorder.stop() {
            Ok(utterance) => self.command_loop.run(utterance).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => {
                tracing::info!(response = %text, "command answered");
                self.last_response = Some(text.clone());
                self.status = ShellStatus::Done;

                // The answer stands even if it cannot be voiced
                if let Err(e) = self.speaker.speak(&text).await {
                    tracing::warn!(error = %e, "failed to speak response");
                }

                Ok(text)
            }
            Err(e) => {
                if e.is_terminal() {
                    tracing::error!(error = %e, "command abandoned");
                } else {
                    tracing::error!(error = %e, "failed to process recording");
                }
                self.fail(FailedStep::Processing, format!("Processing error: {e}"));
                Err(e)
            }
        }
    }

    /// Leave the error screen; returns whether anything changed
    pub fn retry(&mut self) -> bool {
        if self.status != ShellStatus::Error {
            return false;
        }
        self.failure = None;
        self.status = ShellStatus::Idle;
        true
    }

    fn fail(&mut self, step: FailedStep, detail: String) {
        self.failure = Some(Failure { step, detail });
        self.status = ShellStatus::Error;
    }
}
