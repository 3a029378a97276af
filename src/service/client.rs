//! `OpenAiClient`: shared HTTP plumbing for the OpenAI-compatible backend.
//!
//! The capability traits are implemented in [`crate::service::translator`]
//! and [`crate::service::speech`]; this module owns the `reqwest` client,
//! the endpoint/key handling, the HTTP-status → [`ServiceError`] mapping and
//! the [`KeyValidator`] capability.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AppConfig, SpeechConfig, TranslationConfig};
use crate::service::error::ServiceError;

const MISSING_KEY: &str = "API key is required";
const INVALID_KEY: &str = "Invalid API key. Please check your API key.";
const RATE_LIMITED: &str = "Rate limit exceeded. Please wait a moment and try again.";
const BAD_REQUEST: &str = "Bad request - check model name or input";
const MODEL_NOT_FOUND: &str = "Model not found. The model may not be available for your account.";

// ---------------------------------------------------------------------------
// KeyValidator trait
// ---------------------------------------------------------------------------

/// Setup-time check that the configured API key is accepted.
#[async_trait]
pub trait KeyValidator: Send + Sync {
    /// `true` when the service accepts the key.  Never errors: transport
    /// failures and a missing key both yield `false`.
    async fn validate(&self) -> bool;
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

/// Client for any OpenAI-compatible `/chat/completions` + `/audio/speech`
/// provider.  All connection details come from [`AppConfig`].
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    translation: TranslationConfig,
    speech: SpeechConfig,
}

impl OpenAiClient {
    /// Build a client from application config.
    ///
    /// The API key is resolved with
    /// [`TranslationConfig::effective_api_key`].  A default client without a
    /// timeout is used if the builder fails.
    pub fn from_config(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.translation.timeout_secs,
            ))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            api_key: config.translation.effective_api_key(),
            translation: config.translation.clone(),
            speech: config.speech.clone(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn translation_config(&self) -> &TranslationConfig {
        &self.translation
    }

    pub(crate) fn speech_config(&self) -> &SpeechConfig {
        &self.speech
    }

    /// `base_url` joined with `path`, tolerating a trailing slash.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.translation.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The API key, or `Unauthorized` before any request is sent.
    pub(crate) fn require_key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Unauthorized(MISSING_KEY.into()))
    }
}

#[async_trait]
impl KeyValidator for OpenAiClient {
    async fn validate(&self) -> bool {
        let Ok(key) = self.require_key() else {
            return false;
        };

        match self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("service: key validation request failed: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

/// `error.message` from an OpenAI-style error body, when present.
pub(crate) fn server_message(body: &Value) -> Option<String> {
    body["error"]["message"]
        .as_str()
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Map a failed chat-completions response onto the translation taxonomy.
pub(crate) fn translation_error(status: u16, body: &Value) -> ServiceError {
    match status {
        401 => ServiceError::Unauthorized(INVALID_KEY.into()),
        429 => ServiceError::RateLimited(RATE_LIMITED.into()),
        400 => ServiceError::BadRequest(server_message(body).unwrap_or_else(|| BAD_REQUEST.into())),
        404 => ServiceError::NotFound(MODEL_NOT_FOUND.into()),
        _ => ServiceError::Unknown(
            server_message(body).unwrap_or_else(|| format!("Translation failed: {status}")),
        ),
    }
}

/// Map a failed speech response.  400 and 404 fold into `Unknown`.
pub(crate) fn speech_error(status: u16, body: &Value) -> ServiceError {
    match status {
        401 => ServiceError::Unauthorized(INVALID_KEY.into()),
        429 => ServiceError::RateLimited(RATE_LIMITED.into()),
        _ => ServiceError::Unknown(
            server_message(body).unwrap_or_else(|| format!("TTS generation failed: {status}")),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::error::ServiceErrorKind;
    use serde_json::json;

    fn client_with_key(key: Option<&str>) -> OpenAiClient {
        let mut config = AppConfig::default();
        config.translation.api_key = key.map(str::to_string);
        let mut client = OpenAiClient::from_config(&config);
        // Keep tests independent of the developer's environment.
        client.api_key = key.map(str::to_string);
        client
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let mut config = AppConfig::default();
        config.translation.base_url = "http://localhost:8080/v1/".into();
        let client = OpenAiClient::from_config(&config);
        assert_eq!(
            client.endpoint("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(client.endpoint("models"), "http://localhost:8080/v1/models");
    }

    #[test]
    fn missing_key_is_unauthorized() {
        let client = client_with_key(None);
        let err = client.require_key().unwrap_err();
        assert_eq!(err, ServiceError::Unauthorized("API key is required".into()));
    }

    #[test]
    fn configured_key_is_used() {
        let client = client_with_key(Some("sk-test"));
        assert_eq!(client.require_key(), Ok("sk-test"));
    }

    #[tokio::test]
    async fn validate_without_key_is_false() {
        assert!(!client_with_key(None).validate().await);
    }

    #[test]
    fn translation_status_mapping() {
        let empty = Value::Null;
        assert_eq!(
            translation_error(401, &empty).kind(),
            ServiceErrorKind::Unauthorized
        );
        assert_eq!(
            translation_error(429, &empty).kind(),
            ServiceErrorKind::RateLimited
        );
        assert_eq!(
            translation_error(404, &empty),
            ServiceError::NotFound(MODEL_NOT_FOUND.into())
        );
        assert_eq!(
            translation_error(400, &empty),
            ServiceError::BadRequest(BAD_REQUEST.into())
        );
        assert_eq!(
            translation_error(503, &empty),
            ServiceError::Unknown("Translation failed: 503".into())
        );
    }

    #[test]
    fn server_message_is_preferred_when_present() {
        let body = json!({ "error": { "message": "max_tokens is too large" } });
        assert_eq!(
            translation_error(400, &body),
            ServiceError::BadRequest("max_tokens is too large".into())
        );
        assert_eq!(
            translation_error(500, &body),
            ServiceError::Unknown("max_tokens is too large".into())
        );
        // 401 always uses the fixed message.
        assert_eq!(
            translation_error(401, &body),
            ServiceError::Unauthorized(INVALID_KEY.into())
        );
    }

    #[test]
    fn speech_folds_400_and_404_into_unknown() {
        let empty = Value::Null;
        assert_eq!(
            speech_error(400, &empty),
            ServiceError::Unknown("TTS generation failed: 400".into())
        );
        assert_eq!(speech_error(404, &empty).kind(), ServiceErrorKind::Unknown);
        assert_eq!(speech_error(429, &empty).kind(), ServiceErrorKind::RateLimited);
        assert_eq!(speech_error(401, &empty).kind(), ServiceErrorKind::Unauthorized);
    }

    #[test]
    fn blank_server_message_is_ignored() {
        let body = json!({ "error": { "message": "   " } });
        assert_eq!(server_message(&body), None);
    }
}
