//! Text-to-speech over `/audio/speech`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::audio::AudioPayload;
use crate::config::{SpeechConfig, Voice};
use crate::service::client::{speech_error, OpenAiClient};
use crate::service::error::ServiceError;

/// Synthesize speech for a piece of text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// `speed` is clamped to `[0.25, 4.0]` before it reaches the backend.
    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
    ) -> Result<AudioPayload, ServiceError>;
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
    ) -> Result<AudioPayload, ServiceError> {
        let key = self.require_key()?;
        let cfg = self.speech_config();

        let body = json!({
            "model": cfg.model.as_str(),
            "voice": voice.as_str(),
            "input": text,
            "speed": SpeechConfig::clamp_speed(speed),
            "response_format": cfg.format,
        });

        let response = self
            .http()
            .post(self.endpoint("audio/speech"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let err = speech_error(status.as_u16(), &body);
            log::warn!("speech: API error {status}: {err}");
            return Err(err);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ServiceError::Unknown("TTS returned no audio".into()));
        }
        log::debug!("speech: {} bytes for {} chars", bytes.len(), text.len());
        Ok(AudioPayload::new(bytes.to_vec()))
    }
}
