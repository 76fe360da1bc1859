//! Voice input and output
//!
//! Recording goes through [`Recorder`] and speaking through [`Speaker`] so
//! the shell can run against real devices or test doubles. Audio devices
//! are owned by the thread that opened them, hence the non-`Send` seams.

mod capture;
mod playback;
mod speaker;
mod tts;

use async_trait::async_trait;

use crate::Result;
use crate::conversation::Utterance;

pub use capture::{AudioCapture, MicrophoneRecorder, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, decode_mp3, resample, test_tone};
pub use speaker::{CloudSpeaker, ConsoleSpeaker};
pub use tts::{TextToSpeech, TtsProvider};

/// Captures one utterance between `start` and `stop`
pub trait Recorder {
    /// Begin capturing
    ///
    /// # Errors
    ///
    /// Returns error if the microphone is unavailable
    fn start(&mut self) -> Result<()>;

    /// Finish capturing and hand back the encoded recording
    ///
    /// # Errors
    ///
    /// Returns error if nothing was recorded or encoding fails
    fn stop(&mut self) -> Result<Utterance>;
}

/// Speaks a reply aloud
#[async_trait(?Send)]
pub trait Speaker {
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}

#[async_trait(?Send)]
impl<T: Speaker + ?Sized> Speaker for Box<T> {
    async fn speak(&mut self, text: &str) -> Result<()> {
        (**self).speak(text).await
    }
}
