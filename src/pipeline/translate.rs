//! Page translation through an external language model.
//!
//! ## Two layers
//!
//! A [`TranslationBackend`] performs one model call and reports what happened
//! as a typed [`BackendReply`]. The [`TranslationClient`] wraps a backend and
//! is what the orchestrator calls: it builds the prompt, skips empty input,
//! and collapses every reply into plain text. Backend faults become a fixed
//! diagnostic sentence in the target language, so a page that could not be
//! translated still occupies its slot in the output document and the job
//! carries on.
//!
//! ## Backends
//!
//! * [`OllamaChatBackend`]: `POST {base_url}/api/chat`, non-streaming. This
//!   is the default and what `TRANSLATION_LLM_BASE_URL` configures.
//! * [`ProviderBackend`]: any `edgequake-llm` provider (OpenAI, Anthropic,
//!   Gemini, a local Ollama through the factory, ...).

use crate::config::OllamaConfig;
use crate::error::TranslateError;
use crate::pipeline::postprocess::clean_translation;
use crate::prompts::{malformed_response_notice, transport_failure_notice, translation_prompt};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    /// The model produced text.
    Text(String),
    /// The call succeeded but the reply had no usable text.
    Malformed(String),
    /// The call itself failed (connection, timeout, HTTP status, body read).
    TransportFailure(String),
}

/// One model call per page. Implementations never return `Err`; every fault
/// is a [`BackendReply`] variant.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> BackendReply;

    /// Short identifier for logs.
    fn name(&self) -> String;
}

// ── Ollama-style /api/chat ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

/// HTTP backend speaking the Ollama chat API.
pub struct OllamaChatBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaChatBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranslateError::InvalidConfig(format!("HTTP client: {e}")))?;
        let endpoint = format!("{}/api/chat", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: config.model,
        })
    }

    /// Backend configured from `TRANSLATION_LLM_*` environment variables.
    pub fn from_env() -> Result<Self, TranslateError> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationBackend for OllamaChatBackend {
    async fn complete(&self, prompt: &str) -> BackendReply {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatTurn {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return BackendReply::TransportFailure(e.to_string()),
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return BackendReply::TransportFailure(e.to_string()),
        };
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return BackendReply::TransportFailure(e.to_string()),
        };
        parse_chat_reply(&bytes)
    }

    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

/// Read `message.content`, falling back to a top-level `response`.
///
/// Fields of the wrong type are treated as absent.
pub fn parse_chat_reply(body: &[u8]) -> BackendReply {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return BackendReply::Malformed(format!("invalid JSON: {e}")),
    };

    let content = value
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .or_else(|| value.get("response").and_then(Value::as_str));

    match content {
        Some(text) => BackendReply::Text(text.to_string()),
        None => BackendReply::Malformed("reply has neither message.content nor response".into()),
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────────

/// Backend delegating to an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(0.1),
                ..Default::default()
            },
        }
    }

    /// Resolve a provider by name, the environment pair, or auto-detection.
    pub fn resolve(provider_name: Option<&str>, model: Option<&str>) -> Result<Self, TranslateError> {
        resolve_provider(provider_name, model).map(Self::new)
    }
}

#[async_trait]
impl TranslationBackend for ProviderBackend {
    async fn complete(&self, prompt: &str) -> BackendReply {
        let messages = vec![ChatMessage::user(prompt)];
        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) if response.content.trim().is_empty() => {
                BackendReply::Malformed("provider returned empty content".into())
            }
            Ok(response) => {
                debug!(
                    "{} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                BackendReply::Text(response.content)
            }
            Err(e) => BackendReply::TransportFailure(e.to_string()),
        }
    }

    fn name(&self) -> String {
        format!("{}:{}", self.provider.name(), self.provider.model())
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Named provider** (`provider_name`), with `model` or a small default.
/// 2. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    used only when both are set.
/// 3. **OpenAI** when `OPENAI_API_KEY` is set.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or("gpt-4.1-nano"));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model.unwrap_or("gpt-4.1-nano"));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Translate page text; never fails.
#[derive(Clone)]
pub struct TranslationClient {
    backend: Arc<dyn TranslationBackend>,
}

impl TranslationClient {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Translated text, or a diagnostic placeholder in the target language.
    ///
    /// Empty input returns empty output without calling the backend.
    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let prompt = translation_prompt(text, source_lang, target_lang);
        match self.backend.complete(&prompt).await {
            BackendReply::Text(raw) => clean_translation(&raw),
            BackendReply::Malformed(detail) => {
                warn!("{}: unusable reply — {}", self.backend.name(), detail);
                malformed_response_notice(target_lang)
            }
            BackendReply::TransportFailure(err) => {
                warn!("{}: request failed — {}", self.backend.name(), err);
                transport_failure_notice(target_lang, &err)
            }
        }
    }

    /// English to Brazilian Portuguese, the service's default pair.
    pub async fn translate_en_to_pt_br(&self, text: &str) -> String {
        self.translate(text, "en", "pt-BR").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: BackendReply,
        calls: AtomicUsize,
        last_prompt: std::sync::Mutex<String>,
    }

    impl Scripted {
        fn new(reply: BackendReply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_prompt: std::sync::Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl TranslationBackend for Scripted {
        async fn complete(&self, prompt: &str) -> BackendReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            self.reply.clone()
        }

        fn name(&self) -> String {
            "scripted".into()
        }
    }

    #[tokio::test]
    async fn empty_text_skips_the_backend() {
        let backend = Scripted::new(BackendReply::Text("never".into()));
        let client = TranslationClient::new(backend.clone());
        assert_eq!(client.translate("", "en", "pt-BR").await, "");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_reply_is_cleaned() {
        let backend = Scripted::new(BackendReply::Text("```\nOlá mundo  \n```".into()));
        let client = TranslationClient::new(backend.clone());
        assert_eq!(client.translate_en_to_pt_br("Hello world").await, "Olá mundo");
        assert!(backend
            .last_prompt
            .lock()
            .unwrap()
            .ends_with("into Brazilian Portuguese:\n\nHello world"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_localised_notice() {
        let backend = Scripted::new(BackendReply::TransportFailure("connection refused".into()));
        let client = TranslationClient::new(backend);
        let out = client.translate("Hello", "en", "pt-BR").await;
        assert_eq!(
            out,
            "Falha ao traduzir este trecho com o modelo de tradução. Mensagem técnica: connection refused"
        );
    }

    #[tokio::test]
    async fn malformed_reply_becomes_second_notice() {
        let backend = Scripted::new(BackendReply::Malformed("{}".into()));
        let client = TranslationClient::new(backend);
        let out = client.translate("Hello", "en", "de").await;
        assert_eq!(out, malformed_response_notice("de"));
    }

    #[test]
    fn chat_reply_prefers_message_content() {
        let body = br#"{"message":{"role":"assistant","content":"Bonjour"},"response":"ignored"}"#;
        assert_eq!(parse_chat_reply(body), BackendReply::Text("Bonjour".into()));
    }

    #[test]
    fn chat_reply_falls_back_to_response_field() {
        let body = br#"{"message":{"content":42},"response":"Hallo"}"#;
        assert_eq!(parse_chat_reply(body), BackendReply::Text("Hallo".into()));
        let body = br#"{"response":"Hola"}"#;
        assert_eq!(parse_chat_reply(body), BackendReply::Text("Hola".into()));
    }

    #[test]
    fn chat_reply_without_text_is_malformed() {
        assert!(matches!(parse_chat_reply(br#"{"done":true}"#), BackendReply::Malformed(_)));
        assert!(matches!(parse_chat_reply(b"<html>"), BackendReply::Malformed(_)));
        assert!(matches!(parse_chat_reply(br#"[1,2]"#), BackendReply::Malformed(_)));
    }

    #[test]
    fn request_body_matches_chat_api() {
        let body = ChatRequest {
            model: "translategemma",
            messages: [ChatTurn {
                role: "user",
                content: "hi",
            }],
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "translategemma",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": false
            })
        );
    }

    #[test]
    fn endpoint_joins_base_url() {
        let backend = OllamaChatBackend::new(OllamaConfig {
            base_url: "http://localhost:11534/".into(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:11534/api/chat");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        let backend = OllamaChatBackend::new(OllamaConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
            ..OllamaConfig::default()
        })
        .unwrap();
        assert!(matches!(
            backend.complete("hello").await,
            BackendReply::TransportFailure(_)
        ));
    }
}
