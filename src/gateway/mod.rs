//! Vendor gateways: Gemini text generation and Cloud Text-to-Speech.
//!
//! Components:
//! - `llm`: transcript → one generated utterance, retry-with-backoff on 503
//! - `tts`: utterance → base64 MP3 payload, Korean voice catalog
//! - `error`: failure taxonomy shared by both

pub mod error;
pub mod llm;
pub mod tts;

pub use error::GatewayError;
