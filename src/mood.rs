//! Keyword mood tally over the user's side of a transcript.
//!
//! Matching is raw, case-sensitive substring counting: a keyword embedded in
//! a longer word still counts. Korean inflects by suffix, so stems such as
//! `행복` are meant to hit `행복했어요`.

use serde::{Deserialize, Serialize};

use crate::config::MoodConfig;
use crate::transcript::Transcript;

pub const POSITIVE_WORDS: &[&str] = &[
    "행복", "감사", "고마", "기쁘", "기뻤", "즐거", "좋았", "좋아", "뿌듯", "설레", "편안", "사랑",
    "신나", "웃",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "슬프", "슬펐", "힘들", "힘든", "우울", "짜증", "화나", "화가", "불안", "걱정", "피곤", "외로",
    "속상", "스트레스",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Negative,
    Neutral,
}

impl Mood {
    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoodTally {
    pub positive: usize,
    pub negative: usize,
}

impl MoodTally {
    pub fn mood(self) -> Mood {
        use std::cmp::Ordering::*;
        match self.positive.cmp(&self.negative) {
            Greater => Mood::Positive,
            Less => Mood::Negative,
            Equal => Mood::Neutral,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoodTagger {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for MoodTagger {
    fn default() -> Self {
        Self::new(
            POSITIVE_WORDS.iter().map(|w| w.to_string()).collect(),
            NEGATIVE_WORDS.iter().map(|w| w.to_string()).collect(),
        )
    }
}

impl MoodTagger {
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        // An empty keyword would match everywhere.
        let keep = |words: Vec<String>| -> Vec<String> {
            words.into_iter().filter(|w| !w.is_empty()).collect()
        };
        Self {
            positive: keep(positive),
            negative: keep(negative),
        }
    }

    pub fn from_config(config: &MoodConfig) -> Self {
        let defaults = Self::default();
        Self::new(
            config.positive_words.clone().unwrap_or(defaults.positive),
            config.negative_words.clone().unwrap_or(defaults.negative),
        )
    }

    pub fn tally(&self, transcript: &Transcript) -> MoodTally {
        let count = |words: &[String], text: &str| -> usize {
            words.iter().map(|w| text.matches(w.as_str()).count()).sum()
        };

        transcript
            .user_utterances()
            .fold(MoodTally::default(), |acc, u| MoodTally {
                positive: acc.positive + count(self.positive.as_slice(), &u.content),
                negative: acc.negative + count(self.negative.as_slice(), &u.content),
            })
    }

    pub fn tag(&self, transcript: &Transcript) -> Mood {
        self.tally(transcript).mood()
    }
}
