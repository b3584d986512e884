//! Gratitude point extraction.
//!
//! Renders the dialogue into the summary prompt, asks the LLM for a numbered
//! list, and keeps at most three list items from the reply. Lines that don't
//! look like list items are dropped; a reply with none yields an empty list.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::gateway::llm::LlmGateway;
use crate::gateway::GatewayError;
use crate::prompts::{FALLBACK_POINTS, SUMMARY_PROMPT};
use crate::transcript::Transcript;

pub const MAX_POINTS: usize = 3;

/// ASCII `1.` / `2)` style numbering or a `•` / `·` bullet at line start.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+[.)]|[•·])\s*").expect("valid list marker regex"));

/// At most three short highlights, in reply order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GratitudePoints(Vec<String>);

impl<'de> Deserialize<'de> for GratitudePoints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::new)
    }
}

impl GratitudePoints {
    /// Keep the first `MAX_POINTS` entries.
    pub fn new(points: impl IntoIterator<Item = String>) -> Self {
        Self(points.into_iter().take(MAX_POINTS).collect())
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_POINTS.iter().map(|p| p.to_string()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `1. first\n2. second` rendering used by the advice prompt.
    pub fn numbered(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {p}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Pull list items out of a model reply.
pub fn parse_points(reply: &str) -> GratitudePoints {
    GratitudePoints::new(
        reply
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                LIST_MARKER
                    .find(line)
                    .map(|m| line[m.end()..].trim().to_string())
            }),
    )
}

pub struct Summarizer {
    gateway: LlmGateway,
}

impl Summarizer {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// One LLM call per invocation; nothing is cached.
    pub async fn summarize(&self, transcript: &Transcript) -> Result<GratitudePoints, GatewayError> {
        let prompt = SUMMARY_PROMPT.replace("{conversation}", &transcript.render_dialogue());
        let reply = self.gateway.complete(&prompt).await?;
        debug!("Summary reply: {reply:?}");

        let points = parse_points(&reply);
        info!("Extracted {} gratitude points", points.len());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::llm::testing::{gateway, ScriptedTransport};
    use crate::transcript::Utterance;

    #[test]
    fn parses_numbered_and_bulleted_lines() {
        let reply = "감사 포인트:\n1. 친구와의 통화\n2) 따뜻한 점심\n• 저녁 산책\n";
        assert_eq!(
            parse_points(reply).as_slice(),
            ["친구와의 통화", "따뜻한 점심", "저녁 산책"]
        );
    }

    #[test]
    fn never_more_than_three() {
        let reply = (1..=7).map(|i| format!("{i}. point {i}")).collect::<Vec<_>>().join("\n");
        let points = parse_points(&reply);
        assert_eq!(points.len(), MAX_POINTS);
        assert_eq!(points.as_slice()[2], "point 3");
    }

    #[test]
    fn reply_without_markers_yields_empty_list() {
        let reply = "오늘은 좋은 하루였네요.\n- 대시는 목록으로 치지 않아요\n  1. 들여쓴 줄도 마찬가지";
        assert!(parse_points(reply).is_empty());
    }

    #[test]
    fn multi_digit_numbers_are_markers() {
        assert_eq!(parse_points("12.열두 번째").as_slice(), ["열두 번째"]);
    }

    #[test]
    fn only_ascii_digits_number_items() {
        assert!(parse_points("１. 전각 숫자\n٣) arabic-indic").is_empty());
    }

    #[test]
    fn stored_lists_are_capped_on_load() {
        let points: GratitudePoints = serde_json::from_str(r#"["a","b","c","d"]"#).unwrap();
        assert_eq!(points.len(), MAX_POINTS);
    }

    #[test]
    fn numbered_rendering() {
        let points = GratitudePoints::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(points.numbered(), "1. a\n2. b");
    }

    #[tokio::test]
    async fn summary_prompt_contains_dialogue() {
        let transport = ScriptedTransport::replying(&["1. 산책\n2. 커피"]);
        let summarizer = Summarizer::new(gateway(transport.clone()));

        let mut t = Transcript::new();
        t.push(Utterance::system("대화 시작"));
        t.push(Utterance::assistant("안녕하세요"));
        t.push(Utterance::user("산책했어요"));

        let points = summarizer.summarize(&t).await.unwrap();
        assert_eq!(points.as_slice(), ["산책", "커피"]);

        let sent = transport.requests.lock().unwrap()[0].clone();
        assert!(sent.system_instruction.is_none());
        let prompt = &sent.contents[0].parts[0].text;
        assert!(prompt.contains("AI: 안녕하세요\n사용자: 산책했어요"));
        assert!(!prompt.contains("대화 시작"));
    }

    #[tokio::test]
    async fn gateway_failure_is_returned_not_masked() {
        let transport = ScriptedTransport::new(vec![Err(GatewayError::Status {
            status: 500,
            body: String::new(),
        })]);
        let summarizer = Summarizer::new(gateway(transport));
        assert!(summarizer.summarize(&Transcript::new()).await.is_err());
    }
}
