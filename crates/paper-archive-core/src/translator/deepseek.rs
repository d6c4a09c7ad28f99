use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::batch::split_batches;
use super::isolate::SpanVault;
use super::traits::{Translator, TranslatorInfo};
use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};

/// DeepSeek / OpenAI-compatible chat API translator.
///
/// Satisfies the one-logical-request contract while internally splitting the
/// document on paragraph boundaries and issuing bounded-concurrency requests
/// in order. Protected spans (code, images, tables, math, page markers) are
/// vaulted per batch so the model can never corrupt them.
pub struct DeepSeekTranslator {
    client: Client,
    config: TranslatorConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl DeepSeekTranslator {
    /// Create a new translator from configuration.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(config: TranslatorConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn system_prompt(target: &Lang) -> String {
        format!(
            "You are an academic translator working on scholarly markdown documents. \
             Translate the user's text into {} with precise technical terminology.\n\
             Rules:\n\
             - The text contains placeholders like [[__IMG_0__]], [[__TBL_1__]], \
               [[__EQ_BLOCK_2__]], [[__EQ_INLINE_3__]] and [[__PB_4__]]. Keep every \
               placeholder exactly as written, never translate or reformat one, and \
               keep it at the position the target language's word order requires.\n\
             - Preserve markdown structure: heading levels, list markers and emphasis.\n\
             - Never emit $$, \\[, \\] or \\begin{{...}}; formulas only ever appear as \
               placeholders.\n\
             - Ignore isolated page numbers, years and OCR artifacts.\n\
             - Output only the translation, no explanations.",
            target_language_name(target)
        )
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, batch: &str, target: &Lang) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: Self::system_prompt(target),
                },
                Message {
                    role: "user".to_string(),
                    content: batch.to_string(),
                },
            ],
            // Low temperature keeps placeholders in place
            temperature: Some(0.1),
        };

        let mut last_error = None;

        for attempt in 0..self.config.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.config.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(&request);

            if let Some(ref key) = self.config.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.first() {
                                    return Ok(choice.message.content.trim().to_string());
                                }
                                last_error = Some(Error::TranslationInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                        continue;
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error = Some(Error::TranslationRequest(format!(
                            "HTTP {status}: {body}"
                        )));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if e.is_timeout() {
                        last_error = Some(Error::TranslationTimeout);
                    } else {
                        last_error = Some(Error::TranslationRequest(e.to_string()));
                    }
                }
            }

            if attempt < self.config.retry_count - 1 {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", self.config.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }

    /// Translate one batch with its spans vaulted.
    async fn translate_batch(&self, batch: String, target: &Lang) -> Result<String> {
        if batch.trim().is_empty() {
            return Ok(batch);
        }

        let mut vault = SpanVault::new();
        let protected = vault.protect_all(&batch);
        let translated = self.request_with_retry(&protected, target).await?;
        Ok(vault.restore(&translated))
    }
}

#[async_trait]
impl Translator for DeepSeekTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "deepseek-chat",
            requires_api_key: true,
        }
    }

    async fn translate(&self, text: &str, target: &Lang) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let batches = split_batches(text, self.config.max_batch_chars);
        info!(
            "Translating {} batch(es) into {} with {}",
            batches.len(),
            target,
            self.config.model
        );

        // Bounded-concurrency, order-preserving fan-out over the batches.
        let translated: Vec<String> = stream::iter(batches)
            .map(|batch| self.translate_batch(batch, target))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(translated.join("\n\n"))
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }
}

/// Convert language code to human-readable name for prompts
fn target_language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "en" => "English",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        // For unknown languages, the LLM should still understand most ISO codes
        _ => "the specified language",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_language_name() {
        assert_eq!(target_language_name(&Lang::new("zh-CN")), "Simplified Chinese");
        assert_eq!(target_language_name(&Lang::new("en")), "English");
        assert_eq!(target_language_name(&Lang::new("unknown")), "the specified language");
    }

    #[test]
    fn test_system_prompt_names_target() {
        let prompt = DeepSeekTranslator::system_prompt(&Lang::new("zh-CN"));
        assert!(prompt.contains("Simplified Chinese"));
        assert!(prompt.contains("[[__EQ_BLOCK_2__]]"));
    }

    #[test]
    fn test_availability_requires_key() {
        let without = DeepSeekTranslator::new(TranslatorConfig::default());
        assert!(!without.is_available());

        let with = DeepSeekTranslator::new(TranslatorConfig::new(
            "https://api.deepseek.com/v1",
            Some("sk-test".to_string()),
            "deepseek-chat",
        ));
        assert!(with.is_available());
    }
}
