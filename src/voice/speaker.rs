//! [`Speaker`] implementations

use async_trait::async_trait;

use super::{AudioPlayback, Speaker, TextToSpeech};
use crate::Result;

/// Synthesizes replies in the cloud and plays them locally
pub struct CloudSpeaker {
    tts: TextToSpeech,
    playback: Option<AudioPlayback>,
}

impl CloudSpeaker {
    #[must_use]
    pub const fn new(tts: TextToSpeech) -> Self {
        Self {
            tts,
            playback: None,
        }
    }
}

#[async_trait(?Send)]
impl Speaker for CloudSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;

        let playback = match self.playback.take() {
            Some(playback) => playback,
            None => AudioPlayback::new()?,
        };
        self.playback.insert(playback).play_mp3(&audio)
    }
}

/// Prints replies to stdout
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

#[async_trait(?Send)]
impl Speaker for ConsoleSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        println!("Assistant: {text}");
        Ok(())
    }
}
