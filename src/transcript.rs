//! Conversation transcript: ordered, role-tagged utterances for one session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Speaker label used when a transcript is rendered into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "시스템",
            Self::User => "사용자",
            Self::Assistant => "AI",
        }
    }
}

/// One turn of the conversation. Stored verbatim; never edited once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

impl Utterance {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Append-only sequence of utterances. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    utterances: Vec<Utterance>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, utterance: Utterance) {
        self.utterances.push(utterance);
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn user_utterances(&self) -> impl Iterator<Item = &Utterance> {
        self.utterances.iter().filter(|u| u.role == Role::User)
    }

    /// Render the user/assistant turns as `label: content` lines.
    pub fn render_dialogue(&self) -> String {
        self.utterances
            .iter()
            .filter(|u| u.role != Role::System)
            .map(|u| format!("{}: {}", u.role.label(), u.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<Utterance>> for Transcript {
    fn from(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        let mut t = Transcript::new();
        t.push(Utterance::system("대화 시작"));
        t.push(Utterance::assistant("안녕하세요! 오늘 하루는 어떠셨나요?"));
        t.push(Utterance::user("산책을 했어요"));
        t.push(Utterance::assistant("좋네요. 어디로 가셨어요?"));
        t
    }

    #[test]
    fn serialized_reload_preserves_order() {
        let t = sample();
        let json = serde_json::to_string(&t).unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.utterances()[2].content, "산책을 했어요");
    }

    #[test]
    fn serializes_as_plain_array_with_lowercase_roles() {
        let mut t = Transcript::new();
        t.push(Utterance::user("hi"));
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"[{"role":"user","content":"hi"}]"#);
    }

    #[test]
    fn dialogue_skips_system_turns() {
        let rendered = sample().render_dialogue();
        assert!(!rendered.contains("대화 시작"));
        assert!(rendered.starts_with("AI: 안녕하세요!"));
        assert!(rendered.contains("\n사용자: 산책을 했어요\n"));
    }

    #[test]
    fn user_utterances_filters_by_role() {
        let t = sample();
        let users: Vec<_> = t.user_utterances().map(|u| u.content.as_str()).collect();
        assert_eq!(users, vec!["산책을 했어요"]);
    }
}
