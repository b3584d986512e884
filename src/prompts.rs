//! Fixed instruction templates and the fallback text substituted on failure.

pub const CHAT_PROMPT: &str = r#"당신은 "Thanks to Me"의 따뜻한 대화 상대입니다. 사용자가 오늘 하루를 돌아보며 감사한 순간을 스스로 발견하도록 돕습니다.

- 짧고 다정한 한국어 구어체로 1~3문장만 말하세요.
- 한 번에 질문은 하나만 하세요.
- 사용자의 감정을 먼저 인정하고, 판단하거나 훈계하지 마세요.
- 작은 일에서도 고마운 점을 찾을 수 있도록 부드럽게 이끌어 주세요."#;

/// Sent as the user turn of the greeting call.
pub const START_REQUEST: &str = "대화를 시작해주세요.";

/// Marker stored as the first utterance of a session transcript.
pub const SESSION_MARKER: &str = "대화 시작";

pub const SUMMARY_PROMPT: &str = r#"다음은 사용자와 AI의 대화입니다. 대화에서 사용자가 감사함을 느꼈거나 소중히 여긴 순간을 최대 3개 찾아 주세요.

각 항목은 한 줄의 짧은 문장으로, 반드시 "1.", "2.", "3." 형식의 번호 목록으로만 출력하세요. 다른 설명은 쓰지 마세요.

대화:
{conversation}

감사 포인트:"#;

pub const ADVICE_PROMPT: &str = r#"다음은 사용자가 오늘 발견한 감사 포인트입니다.

{summary}

이 감사 포인트를 바탕으로 사용자를 격려하는 한 문장을 아래 형식으로 작성하세요.

오늘의 발견: (한 문장)"#;

/// Line marker the advice reply is scanned for.
pub const DISCOVERY_MARKER: &str = "오늘의 발견";

pub const GREETING_FALLBACK: &str = "안녕하세요! 오늘 하루는 어떠셨나요?";

pub const REPLY_FALLBACK: &str = "죄송해요, 잠시 문제가 생겼어요. 다시 말씀해주시겠어요?";

pub const DISCOVERY_FALLBACK: &str =
    "오늘의 감사 포인트를 통해 당신의 하루가 얼마나 소중했는지 알 수 있었어요.";

pub const FALLBACK_POINTS: [&str; 3] = [
    "오늘 하루를 마무리한 당신의 노력",
    "작은 순간들을 소중히 여기는 마음",
    "자신을 돌아보는 용기",
];
