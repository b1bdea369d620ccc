//! Blocking OpenAI-compatible chat adapter.
//!
//! Works with OpenAI itself and with any endpoint that follows the chat
//! completions contract (Ollama, vLLM, LM Studio, local gateways). The model
//! list is fetched once at startup and held for the lifetime of the mount.

use std::time::Duration;

use serde_json::{json, Value};

use llmfs_domain::config::{ModelParameters, MountConfig};
use llmfs_domain::error::{Error, Result};
use llmfs_domain::message::Conversation;

use crate::traits::ChatBackend;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A chat client for one OpenAI-compatible endpoint.
pub struct OpenAiChatClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl OpenAiChatClient {
    /// Build the client and fetch the upstream model list.
    ///
    /// Fails when the endpoint is unreachable or advertises no models; the
    /// filesystem is useless without at least one.
    pub fn new(cfg: &MountConfig) -> Result<Self> {
        if cfg.api_key.is_empty() {
            tracing::warn!("no api_key configured; the endpoint may reject requests");
        }

        let base_url = if cfg.base_url.is_empty() {
            OPENAI_BASE_URL.to_owned()
        } else {
            cfg.base_url.clone()
        };

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(from_reqwest)?;

        let models = fetch_models(&http, &base_url, &cfg.api_key)?;
        if models.is_empty() {
            return Err(Error::backend("llm", "endpoint advertises no models"));
        }
        tracing::info!(endpoint = %base_url, count = models.len(), "model list loaded");

        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
            models,
        })
    }

    fn post_chat(&self, body: &Value) -> Result<String> {
        let url = format!("{}chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(from_reqwest)?;
        let value: Value = resp.json().map_err(from_reqwest)?;
        extract_content(&value)
    }
}

impl ChatBackend for OpenAiChatClient {
    fn models(&self) -> &[String] {
        &self.models
    }

    fn simple_query(
        &self,
        model: &str,
        prompt: &str,
        params: &ModelParameters,
    ) -> Result<String> {
        let messages = simple_messages(prompt, params);
        let body = build_request_body(model, params, messages);
        tracing::debug!(model = %model, "sending stateless query");
        self.post_chat(&body)
    }

    fn conversation_query(
        &self,
        model: &str,
        params: &ModelParameters,
        conversation: &Conversation,
    ) -> Result<String> {
        let messages = conversation_messages(params, conversation);
        let body = build_request_body(model, params, messages);
        tracing::debug!(
            model = %model,
            turns = conversation.len(),
            "sending conversation query"
        );
        self.post_chat(&body)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

fn fetch_models(
    http: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<String>> {
    let url = format!("{base_url}models");
    let resp = http
        .get(&url)
        .bearer_auth(api_key)
        .send()
        .map_err(from_reqwest)?;
    let value: Value = resp.json().map_err(from_reqwest)?;

    let data = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::backend("llm", "model list response has no 'data' array"))?;

    Ok(data
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(str::to_owned)
        .collect())
}

fn simple_messages(prompt: &str, params: &ModelParameters) -> Vec<Value> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = params.system_prompt.as_deref().filter(|s| !s.is_empty()) {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": prompt}));
    messages
}

/// The static system prompt and the per-conversation context are folded into
/// a single system message; the full history follows in insertion order.
fn conversation_messages(params: &ModelParameters, conversation: &Conversation) -> Vec<Value> {
    let mut system = params.system_prompt.clone().unwrap_or_default();
    if !conversation.context.is_empty() {
        if !system.is_empty() {
            system.push_str("\n\n");
        }
        system.push_str("ADDITIONAL CONTEXT FOR THIS CONVERSATION:\n");
        system.push_str(&conversation.context);
    }

    let mut messages = Vec::with_capacity(conversation.len() + 1);
    if !system.is_empty() {
        messages.push(json!({"role": "system", "content": system}));
    }
    for msg in &conversation.messages {
        messages.push(json!({"role": msg.role.as_str(), "content": msg.content}));
    }
    messages
}

fn build_request_body(model: &str, params: &ModelParameters, messages: Vec<Value>) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
    });
    if let Some(t) = params.temperature {
        body["temperature"] = json!(t);
    }
    body
}

fn extract_content(response: &Value) -> Result<String> {
    if let Some(content) = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return Ok(content.to_owned());
    }

    if let Some(err) = response.get("error") {
        return Err(Error::backend("llm", err.to_string()));
    }
    Err(Error::backend(
        "llm",
        "response carries no choices[0].message.content",
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use llmfs_domain::message::{Message, Role};

    fn params(prompt: Option<&str>, temperature: Option<f64>) -> ModelParameters {
        ModelParameters {
            temperature,
            system_prompt: prompt.map(str::to_owned),
        }
    }

    #[test]
    fn simple_messages_omit_empty_system_prompt() {
        let msgs = simple_messages("hi", &params(None, None));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");

        let msgs = simple_messages("hi", &params(Some(""), None));
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn conversation_context_is_folded_into_system_message() {
        let mut conv = Conversation::default();
        conv.context = "project X".into();
        conv.push(Message::now(Role::User, "q"));
        conv.push(Message::now(Role::Assistant, "a"));

        let msgs = conversation_messages(&params(Some("be kind"), None), &conv);
        assert_eq!(msgs.len(), 3);
        let system = msgs[0]["content"].as_str().unwrap();
        assert!(system.starts_with("be kind"));
        assert!(system.contains("ADDITIONAL CONTEXT FOR THIS CONVERSATION:\nproject X"));
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[2]["role"], "assistant");
    }

    #[test]
    fn context_alone_still_produces_a_system_message() {
        let mut conv = Conversation::default();
        conv.context = "ctx".into();
        let msgs = conversation_messages(&params(None, None), &conv);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0]["content"]
            .as_str()
            .unwrap()
            .starts_with("ADDITIONAL CONTEXT"));
    }

    #[test]
    fn body_includes_temperature_only_when_set() {
        let body = build_request_body("m", &params(None, Some(0.5)), vec![]);
        assert_eq!(body["temperature"], 0.5);

        let body = build_request_body("m", &params(None, None), vec![]);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn content_extraction_handles_each_reply_shape() {
        let ok = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        });
        assert_eq!(extract_content(&ok).unwrap(), "4");

        let err = serde_json::json!({"error": {"message": "quota"}});
        assert!(extract_content(&err).is_err());

        let empty = serde_json::json!({"choices": []});
        assert!(extract_content(&empty).is_err());
    }
}
