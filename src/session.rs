//! Conversation session with state machine.
//!
//! IDLE → GREETING → ACTIVE → ENDING → SUMMARIZED
//!
//! Gateway failures never surface to the user: the greeting and each reply
//! fall back to fixed text, and the failure is only logged.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::gateway::llm::LlmGateway;
use crate::gateway::GatewayError;
use crate::prompts::{GREETING_FALLBACK, REPLY_FALLBACK, SESSION_MARKER};
use crate::reflection::{Reflection, Reflector};
use crate::storage::{StorageError, Store, TRANSCRIPT_KEY};
use crate::transcript::{Transcript, Utterance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Greeting,
    Active,
    Ending,
    Summarized,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Greeting => write!(f, "GREETING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Ending => write!(f, "ENDING"),
            Self::Summarized => write!(f, "SUMMARIZED"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
    #[error("message is empty")]
    EmptyMessage,
    #[error("session exceeded its {0:?} limit")]
    Expired(Duration),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Ai,
    User,
}

/// A displayed chat bubble. Ids are 1-based and sequential across speakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: u64,
    pub speaker: Speaker,
    pub content: String,
    /// Local `HH:MM` at creation.
    pub timestamp: String,
}

/// What the journal needs to know about a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub elapsed: Duration,
    pub conversation_count: usize,
}

/// Fixed text instead of an error; empty replies count as failures too.
fn or_fallback(result: Result<String, GatewayError>, fallback: &str, call: &str) -> String {
    match result {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("LLM {call} returned empty text, using fallback");
            fallback.to_string()
        }
        Err(e) => {
            warn!("LLM {call} failed: {e}; using fallback");
            fallback.to_string()
        }
    }
}

pub struct Session {
    gateway: LlmGateway,
    state: SessionState,
    transcript: Transcript,
    messages: Vec<Message>,
    started_at: Option<Instant>,
    /// Set once the transcript is persisted; the session clock stops here.
    ended_at: Option<Instant>,
    max_duration: Duration,
}

impl Session {
    pub fn new(gateway: LlmGateway, max_duration: Duration) -> Self {
        Self {
            gateway,
            state: SessionState::Idle,
            transcript: Transcript::new(),
            messages: Vec::new(),
            started_at: None,
            ended_at: None,
            max_duration,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn elapsed(&self) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        self.ended_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(started)
    }

    pub fn is_expired(&self) -> bool {
        self.started_at.is_some() && self.elapsed() > self.max_duration
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            elapsed: self.elapsed(),
            conversation_count: self.transcript.user_utterances().count(),
        }
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!("Session: {} → {next}", self.state);
        self.state = next;
    }

    fn push_message(&mut self, speaker: Speaker, content: String) -> Message {
        let message = Message {
            id: self.messages.len() as u64 + 1,
            speaker,
            content,
            timestamp: Local::now().format("%H:%M").to_string(),
        };
        self.messages.push(message.clone());
        message
    }

    /// Ask for the opening line. Always yields a message.
    pub async fn start(&mut self) -> Result<Message, SessionError> {
        self.expect_state(SessionState::Idle)?;
        self.started_at = Some(Instant::now());
        self.transition(SessionState::Greeting);

        let greeting = or_fallback(self.gateway.greet().await, GREETING_FALLBACK, "greeting");

        self.transcript.push(Utterance::system(SESSION_MARKER));
        self.transcript.push(Utterance::assistant(greeting.clone()));
        self.transition(SessionState::Active);
        Ok(self.push_message(Speaker::Ai, greeting))
    }

    /// Append the user's message and wait for the assistant's answer.
    pub async fn send(&mut self, text: &str) -> Result<Message, SessionError> {
        self.expect_state(SessionState::Active)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.is_expired() {
            return Err(SessionError::Expired(self.max_duration));
        }

        self.transcript.push(Utterance::user(text));
        self.push_message(Speaker::User, text.to_string());
        debug!("User message #{} ({} chars)", self.messages.len(), text.chars().count());

        let reply = or_fallback(
            self.gateway.reply(&self.transcript).await,
            REPLY_FALLBACK,
            "reply",
        );

        self.transcript.push(Utterance::assistant(reply.clone()));
        Ok(self.push_message(Speaker::Ai, reply))
    }

    /// Persist the transcript, replacing whatever the previous session left.
    ///
    /// A failed write leaves the session `Active`, so nothing can be
    /// summarized from an older stored transcript.
    pub fn end(&mut self, store: &Store) -> Result<SessionStats, SessionError> {
        self.expect_state(SessionState::Active)?;
        store.set(TRANSCRIPT_KEY, &self.transcript)?;
        self.ended_at = Some(Instant::now());
        self.transition(SessionState::Ending);
        info!(
            "Saved transcript ({} utterances, {:.0}s)",
            self.transcript.len(),
            self.elapsed().as_secs_f64()
        );
        Ok(self.stats())
    }

    /// Run the journal pipeline for the persisted transcript.
    pub async fn summarize(
        &mut self,
        reflector: &Reflector,
        store: &Store,
        today: NaiveDate,
    ) -> Result<Option<Reflection>, SessionError> {
        self.expect_state(SessionState::Ending)?;
        let reflection = reflector.reflect(store, today, Some(self.stats())).await?;
        self.transition(SessionState::Summarized);
        Ok(reflection)
    }
}
