//! Encouragement line generated from the day's gratitude points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gateway::llm::LlmGateway;
use crate::gateway::GatewayError;
use crate::prompts::{ADVICE_PROMPT, DISCOVERY_FALLBACK, DISCOVERY_MARKER};
use crate::summarizer::GratitudePoints;

/// Only `discovery` is ever filled; the other two fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub discovery: String,
    pub suggestion: String,
    pub encouragement: String,
}

impl Advice {
    pub fn with_discovery(discovery: impl Into<String>) -> Self {
        Self {
            discovery: discovery.into(),
            ..Self::default()
        }
    }

    pub fn fallback() -> Self {
        Self::with_discovery(DISCOVERY_FALLBACK)
    }
}

/// Text after the first colon of the last line mentioning the marker.
/// A marker line without a colon is taken whole.
pub fn parse_discovery(reply: &str) -> Option<String> {
    reply
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.contains(DISCOVERY_MARKER))
        .map(|line| match line.split_once(':') {
            Some((_, rest)) => rest.trim().to_string(),
            None => line.trim().to_string(),
        })
        .last()
        .filter(|d| !d.is_empty())
}

pub struct AdviceGenerator {
    gateway: LlmGateway,
}

impl AdviceGenerator {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    pub async fn advise(&self, points: &GratitudePoints) -> Result<Advice, GatewayError> {
        let prompt = ADVICE_PROMPT.replace("{summary}", &points.numbered());
        let reply = self.gateway.complete(&prompt).await?;
        debug!("Advice reply: {reply:?}");

        Ok(match parse_discovery(&reply) {
            Some(discovery) => Advice::with_discovery(discovery),
            None => Advice::fallback(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::llm::testing::{gateway, ScriptedTransport};

    #[test]
    fn takes_text_after_first_colon() {
        let reply = "좋아요!\n오늘의 발견: 작은 친절이 하루를 바꿔요: 정말로\n";
        assert_eq!(
            parse_discovery(reply).as_deref(),
            Some("작은 친절이 하루를 바꿔요: 정말로")
        );
    }

    #[test]
    fn last_marker_line_wins() {
        let reply = "**오늘의 발견**: 첫 번째\n오늘의 발견: 두 번째";
        assert_eq!(parse_discovery(reply).as_deref(), Some("두 번째"));
    }

    #[test]
    fn no_marker_means_none() {
        assert_eq!(parse_discovery("그냥 격려의 말"), None);
        assert_eq!(parse_discovery("오늘의 발견:   "), None);
    }

    #[tokio::test]
    async fn fills_only_discovery() {
        let transport = ScriptedTransport::replying(&["오늘의 발견: 당신은 이미 충분해요"]);
        let generator = AdviceGenerator::new(gateway(transport.clone()));

        let points = GratitudePoints::new(vec!["산책".to_string(), "커피".to_string()]);
        let advice = generator.advise(&points).await.unwrap();

        assert_eq!(advice.discovery, "당신은 이미 충분해요");
        assert!(advice.suggestion.is_empty());
        assert!(advice.encouragement.is_empty());

        let sent = transport.requests.lock().unwrap()[0].clone();
        assert!(sent.contents[0].parts[0].text.contains("1. 산책\n2. 커피"));
    }

    #[tokio::test]
    async fn unparseable_reply_uses_default_discovery() {
        let transport = ScriptedTransport::replying(&["멋진 하루였어요!"]);
        let generator = AdviceGenerator::new(gateway(transport));

        let advice = generator.advise(&GratitudePoints::default()).await.unwrap();
        assert_eq!(advice, Advice::fallback());
    }
}
