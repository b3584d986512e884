//! End-of-session pipeline: gratitude points, discovery line, and mood,
//! combined into the day's journal entry.
//!
//! Runs at most once per calendar day. If today already has an entry it is
//! returned as-is and no LLM call is made.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::advice::{Advice, AdviceGenerator};
use crate::gateway::llm::LlmGateway;
use crate::gateway::GatewayError;
use crate::journal::{format_session_time, Journal, JournalEntry};
use crate::mood::{Mood, MoodTagger};
use crate::session::SessionStats;
use crate::storage::{StorageError, Store, TRANSCRIPT_KEY};
use crate::summarizer::{GratitudePoints, Summarizer};
use crate::transcript::Transcript;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub date: NaiveDate,
    pub mood: Mood,
    pub gratitude_points: GratitudePoints,
    pub advice: Advice,
    pub entry: JournalEntry,
    /// False when today's entry already existed.
    pub created: bool,
}

impl Reflection {
    fn existing(entry: JournalEntry) -> Self {
        Self {
            date: entry.date,
            mood: entry.mood,
            gratitude_points: entry.gratitude_points.clone(),
            advice: Advice::with_discovery(entry.discovery.clone()),
            entry,
            created: false,
        }
    }
}

fn points_or_fallback(result: Result<GratitudePoints, GatewayError>) -> GratitudePoints {
    result.unwrap_or_else(|e| {
        warn!("Summary failed: {e}; using fallback points");
        GratitudePoints::fallback()
    })
}

fn advice_or_fallback(result: Result<Advice, GatewayError>) -> Advice {
    result.unwrap_or_else(|e| {
        warn!("Advice failed: {e}; using fallback discovery");
        Advice::fallback()
    })
}

pub struct Reflector {
    summarizer: Summarizer,
    advisor: AdviceGenerator,
    tagger: MoodTagger,
}

impl Reflector {
    pub fn new(gateway: LlmGateway, tagger: MoodTagger) -> Self {
        Self {
            summarizer: Summarizer::new(gateway.clone()),
            advisor: AdviceGenerator::new(gateway),
            tagger,
        }
    }

    /// `Ok(None)` when there is no entry for today and no saved conversation
    /// to build one from.
    pub async fn reflect(
        &self,
        store: &Store,
        today: NaiveDate,
        stats: Option<SessionStats>,
    ) -> Result<Option<Reflection>, StorageError> {
        let mut journal = Journal::load(store)?;
        if let Some(entry) = journal.get(today) {
            info!("Journal entry for {today} already exists, skipping summary");
            return Ok(Some(Reflection::existing(entry.clone())));
        }

        let transcript: Transcript = store.get(TRANSCRIPT_KEY)?.unwrap_or_default();
        if transcript.is_empty() {
            info!("No saved conversation to summarize");
            return Ok(None);
        }

        let gratitude_points = points_or_fallback(self.summarizer.summarize(&transcript).await);
        let advice = advice_or_fallback(self.advisor.advise(&gratitude_points).await);
        let mood = self.tagger.tag(&transcript);

        let entry = JournalEntry {
            date: today,
            mood,
            gratitude_points: gratitude_points.clone(),
            discovery: advice.discovery.clone(),
            session_time: format_session_time(stats.map(|s| s.elapsed).unwrap_or(Duration::ZERO)),
            conversation_count: stats
                .map(|s| s.conversation_count)
                .unwrap_or_else(|| transcript.user_utterances().count()),
        };

        journal.insert_if_absent(entry.clone());
        journal.save(store)?;

        Ok(Some(Reflection {
            date: today,
            mood,
            gratitude_points,
            advice,
            entry,
            created: true,
        }))
    }
}
