//! Speaker output for synthesized replies.
//!
//! Only one reply is audible at a time: starting a new one stops whatever is
//! playing. Audio for a reply older than the one already playing is dropped,
//! since TTS requests can finish out of order.

use std::io::Cursor;
use std::sync::Mutex;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("cannot decode audio: {0}")]
    Decode(String),
}

struct Playing {
    message_id: u64,
    sink: Sink,
}

/// Whether audio for `incoming` may start, given the current reply's id and
/// whether it is still audible.
fn should_play(current: Option<(u64, bool)>, incoming: u64) -> bool {
    match current {
        Some((id, audible)) => !(audible && id > incoming),
        None => true,
    }
}

pub struct AudioPlayer {
    // Kept alive for the player's lifetime; dropping it silences every sink.
    stream: OutputStream,
    current: Mutex<Option<Playing>>,
}

impl AudioPlayer {
    pub fn open() -> Result<Self, PlayerError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlayerError::Output(e.to_string()))?;
        info!("Audio output opened");
        Ok(Self {
            stream,
            current: Mutex::new(None),
        })
    }

    /// Play MP3 bytes for `message_id`, cutting off the previous reply.
    pub fn play(&self, message_id: u64, mp3: Vec<u8>) -> Result<(), PlayerError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());

        let state = current.as_ref().map(|p| (p.message_id, !p.sink.empty()));
        if !should_play(state, message_id) {
            debug!("Dropping stale audio for message {message_id}");
            return Ok(());
        }

        let source = Decoder::new(Cursor::new(mp3)).map_err(|e| PlayerError::Decode(e.to_string()))?;

        if let Some(previous) = current.take() {
            previous.sink.stop();
        }

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(source);
        debug!("Playing audio for message {message_id}");
        *current = Some(Playing { message_id, sink });
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(playing) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            playing.sink.stop();
        }
    }

    /// Id of the reply currently audible, if any.
    pub fn now_playing(&self) -> Option<u64> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|p| !p.sink.empty())
            .map(|p| p.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_when_idle() {
        assert!(should_play(None, 1));
    }

    #[test]
    fn newer_reply_replaces_current() {
        assert!(should_play(Some((3, true)), 5));
    }

    #[test]
    fn older_reply_dropped_while_newer_plays() {
        assert!(!should_play(Some((5, true)), 3));
    }

    #[test]
    fn older_reply_plays_after_newer_finished() {
        assert!(should_play(Some((5, false)), 3));
    }

    #[test]
    fn same_reply_restarts() {
        assert!(should_play(Some((4, true)), 4));
    }
}
