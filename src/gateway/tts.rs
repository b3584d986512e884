//! Cloud Text-to-Speech gateway.
//!
//! Synthesizes one utterance into a base64 MP3 payload using a fixed Korean
//! voice, and lists the vendor's voice catalog filtered to that language.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::GatewayError;
use crate::config::TtsConfig;

/// Synthesized speech as returned by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechAudio {
    pub audio_content: String,
}

impl SpeechAudio {
    /// Raw MP3 bytes.
    pub fn decode(&self) -> Result<Vec<u8>, GatewayError> {
        BASE64
            .decode(self.audio_content.as_bytes())
            .map_err(|e| GatewayError::Decode(format!("audioContent is not base64: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub name: String,
    #[serde(default)]
    pub language_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_sample_rate_hertz: Option<u32>,
}

#[derive(Deserialize)]
struct VoiceList {
    #[serde(default)]
    voices: Vec<Voice>,
}

pub struct TtsGateway {
    client: Client,
    config: TtsConfig,
}

impl TtsGateway {
    pub fn new(config: TtsConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        if self.config.api_key.is_empty() {
            Err(GatewayError::MissingApiKey("GOOGLE_CLOUD_TTS_API_KEY"))
        } else {
            Ok(&self.config.api_key)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Turn text into an MP3 payload. Independent of the LLM gateway.
    pub async fn synthesize(&self, text: &str) -> Result<SpeechAudio, GatewayError> {
        let key = self.api_key()?;
        let preview: String = text.chars().take(50).collect();
        debug!("TTS request: \"{}\" ({} chars)", preview.replace('\n', " "), text.chars().count());

        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.config.language_code,
                "name": self.config.voice,
                "ssmlGender": self.config.ssml_gender,
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "speakingRate": self.config.speaking_rate,
                "pitch": self.config.pitch,
                "effectsProfileId": [self.config.effects_profile],
            }
        });

        let resp = self
            .client
            .post(self.url("text:synthesize"))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, text));
        }

        let audio: SpeechAudio = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        if audio.audio_content.is_empty() {
            return Err(GatewayError::Decode("empty audioContent".into()));
        }
        Ok(audio)
    }

    /// Voices that speak the configured language.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, GatewayError> {
        let key = self.api_key()?;

        let resp = self
            .client
            .get(self.url("voices"))
            .query(&[("key", key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, text));
        }

        let list: VoiceList = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let voices = filter_language(list.voices, &self.config.language_code);
        info!("Voice catalog: {} {} voices", voices.len(), self.config.language_code);
        Ok(voices)
    }
}

pub fn filter_language(voices: Vec<Voice>, language_code: &str) -> Vec<Voice> {
    voices
        .into_iter()
        .filter(|v| v.language_codes.iter().any(|c| c == language_code))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;

    fn voice(name: &str, langs: &[&str]) -> Voice {
        Voice {
            name: name.into(),
            language_codes: langs.iter().map(|s| s.to_string()).collect(),
            ssml_gender: None,
            natural_sample_rate_hertz: None,
        }
    }

    #[test]
    fn keeps_only_matching_language() {
        let voices = vec![
            voice("en-US-Standard-A", &["en-US"]),
            voice("ko-KR-Chirp3-HD-Achernar", &["ko-KR"]),
            voice("multi", &["en-US", "ko-KR"]),
        ];
        let names: Vec<_> = filter_language(voices, "ko-KR").into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["ko-KR-Chirp3-HD-Achernar", "multi"]);
    }

    #[test]
    fn decodes_base64_audio() {
        let audio = SpeechAudio {
            audio_content: BASE64.encode(b"ID3fake"),
        };
        assert_eq!(audio.decode().unwrap(), b"ID3fake");
        assert!(SpeechAudio { audio_content: "***".into() }.decode().is_err());
    }

    type Seen = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn fake_synthesize(
        State(seen): State<Seen>,
        uri: Uri,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        seen.lock().unwrap().push((uri.to_string(), body));
        Json(json!({ "audioContent": BASE64.encode(b"mp3") })).into_response()
    }

    async fn fake_voices() -> axum::response::Response {
        Json(json!({
            "voices": [
                { "name": "en-US-Standard-A", "languageCodes": ["en-US"], "ssmlGender": "FEMALE" },
                { "name": "ko-KR-Standard-A", "languageCodes": ["ko-KR"], "ssmlGender": "FEMALE" }
            ]
        }))
        .into_response()
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base_url: String) -> TtsConfig {
        TtsConfig {
            api_key: "tts-key".into(),
            base_url,
            ..TtsConfig::default()
        }
    }

    #[tokio::test]
    async fn synthesize_requests_korean_mp3() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/text:synthesize", post(fake_synthesize))
            .with_state(seen.clone());
        let gw = TtsGateway::new(config(spawn(router).await)).unwrap();

        let audio = gw.synthesize("오늘도 수고했어요").await.unwrap();
        assert_eq!(audio.decode().unwrap(), b"mp3");

        let seen = seen.lock().unwrap();
        let (uri, body) = &seen[0];
        assert!(uri.contains("key=tts-key"));
        assert_eq!(body["voice"]["languageCode"], "ko-KR");
        assert_eq!(body["voice"]["name"], "ko-KR-Chirp3-HD-Achernar");
        assert_eq!(body["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(body["input"]["text"], "오늘도 수고했어요");
    }

    #[tokio::test]
    async fn vendor_errors_keep_status() {
        let router = Router::new().route(
            "/text:synthesize",
            post(|| async { (StatusCode::FORBIDDEN, "quota").into_response() }),
        );
        let gw = TtsGateway::new(config(spawn(router).await)).unwrap();

        let err = gw.synthesize("hi").await.unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn lists_korean_voices_only() {
        let router = Router::new().route("/voices", get(fake_voices));
        let gw = TtsGateway::new(config(spawn(router).await)).unwrap();

        let voices = gw.list_voices().await.unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "ko-KR-Standard-A");
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let gw = TtsGateway::new(TtsConfig::default()).unwrap();
        assert!(matches!(
            gw.synthesize("hi").await,
            Err(GatewayError::MissingApiKey(_))
        ));
    }
}
