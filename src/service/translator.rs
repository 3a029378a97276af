//! Sentence translation over `/chat/completions`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::service::client::{translation_error, OpenAiClient};
use crate::service::error::ServiceError;
use crate::service::prompt::translation_instruction;

/// Translate one source-language sentence into the target language.
///
/// Implementations must be `Send + Sync` so they can be shared with the
/// pipeline as `Arc<dyn Translator>`.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Returns the trimmed translation.  A blank reply is `Ok("")`, which
    /// the pipeline treats as "no translation".
    async fn translate(&self, text: &str) -> Result<String, ServiceError>;
}

#[async_trait]
impl Translator for OpenAiClient {
    async fn translate(&self, text: &str) -> Result<String, ServiceError> {
        let key = self.require_key()?;
        let cfg = self.translation_config();

        let body = json!({
            "model": cfg.model.as_str(),
            "messages": [
                {
                    "role": "system",
                    "content": translation_instruction(&cfg.source_language, &cfg.target_language),
                },
                { "role": "user", "content": text },
            ],
            "temperature": cfg.temperature,
            "max_tokens": cfg.max_tokens,
        });

        let response = self
            .http()
            .post(self.endpoint("chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let err = translation_error(status.as_u16(), &body);
            log::warn!("translator: API error {status}: {err}");
            return Err(err);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Unknown(format!("Invalid translation response: {e}")))?;

        extract_translation(&json)
    }
}

/// `choices[0].message.content`, trimmed.  Only a missing or non-string
/// content is an error.
pub(crate) fn extract_translation(json: &Value) -> Result<String, ServiceError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ServiceError::Unknown("No translation received".into()))
}
