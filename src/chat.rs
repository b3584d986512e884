//! Interactive terminal session.
//!
//! Reads one message per line from stdin. `/end` (or EOF) ends the session
//! and prints the day's summary; `/stop` silences the current reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::gateway::llm::LlmGateway;
use crate::gateway::tts::TtsGateway;
use crate::player::AudioPlayer;
use crate::reflection::{Reflection, Reflector};
use crate::session::{Message, Session, SessionError};
use crate::storage::Store;

/// Speaks replies in the background; never blocks the conversation.
pub struct Voice {
    tts: Arc<TtsGateway>,
    player: Arc<AudioPlayer>,
}

impl Voice {
    pub fn new(tts: Arc<TtsGateway>, player: Arc<AudioPlayer>) -> Self {
        Self { tts, player }
    }

    fn speak(&self, message: &Message) {
        let tts = self.tts.clone();
        let player = self.player.clone();
        let id = message.id;
        let text = message.content.clone();

        tokio::spawn(async move {
            let audio = match tts.synthesize(&text).await.and_then(|a| a.decode()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("TTS for message {id} failed: {e}");
                    return;
                }
            };
            if let Err(e) = player.play(id, audio) {
                warn!("Playback for message {id} failed: {e}");
            }
        });
    }

    fn stop(&self) {
        if let Some(id) = self.player.now_playing() {
            debug!("Stopping audio for message {id}");
        }
        self.player.stop();
    }
}

fn print_message(message: &Message) {
    println!("[{}] AI: {}", message.timestamp, message.content);
}

fn print_reflection(reflection: &Reflection) {
    println!();
    println!("오늘의 기분: {}", reflection.mood);
    println!("감사한 일:");
    if reflection.gratitude_points.is_empty() {
        println!("  (없음)");
    }
    for (i, point) in reflection.gratitude_points.as_slice().iter().enumerate() {
        println!("  {}. {point}", i + 1);
    }
    println!("오늘의 발견: {}", reflection.advice.discovery);
    println!(
        "대화 시간 {} · 메시지 {}개{}",
        reflection.entry.session_time,
        reflection.entry.conversation_count,
        if reflection.created { "" } else { " (오늘 기록이 이미 있어요)" }
    );
}

pub async fn run(
    gateway: LlmGateway,
    reflector: &Reflector,
    store: &Store,
    max_duration: Duration,
    voice: Option<Voice>,
) -> Result<(), SessionError> {
    let mut session = Session::new(gateway, max_duration);

    let greeting = session.start().await?;
    print_message(&greeting);
    if let Some(v) = &voice {
        v.speak(&greeting);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read input: {e}");
                break;
            }
        };

        match line.trim() {
            "" => continue,
            "/end" => break,
            "/stop" => {
                if let Some(v) = &voice {
                    v.stop();
                }
                continue;
            }
            _ => {}
        }

        match session.send(&line).await {
            Ok(reply) => {
                print_message(&reply);
                if let Some(v) = &voice {
                    v.speak(&reply);
                }
            }
            Err(SessionError::Expired(limit)) => {
                println!("(대화 시간 {}분이 지나 세션을 마칠게요)", limit.as_secs() / 60);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(v) = &voice {
        v.stop();
    }

    session.end(store)?;
    let today = Local::now().date_naive();
    match session.summarize(reflector, store, today).await? {
        Some(reflection) => print_reflection(&reflection),
        None => println!("요약할 대화가 없어요."),
    }
    Ok(())
}
