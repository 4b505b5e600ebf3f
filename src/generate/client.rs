//! Generative text service client: provider trait + OpenAI-backed
//! implementation + scripted stand-in for tests and local runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A structured prompt for one completion call.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.8,
            max_tokens: 2048,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = n;
        self
    }
}

/// Black-box capability mapping a structured prompt to text. Implementations
/// do the remote call; callers own parsing and failure policy.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// OpenAI provider (Chat Completions API). Requires `OPENAI_API_KEY`.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("dream-content-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &prompt.system,
                },
                Msg {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("completion request failed")?
            .error_for_status()
            .context("completion returned error status")?;

        let body: Resp = resp.json().await.context("completion body unreadable")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("completion returned no choices"))?;
        if content.trim().is_empty() {
            bail!("completion returned empty content");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Replays a fixed sequence of replies, one per `complete` call. Used by
/// tests and local smoke runs; an exhausted or `Err` slot fails the call.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedGenerator {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    pub fn of_ok<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|s| Ok(s.into())))
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        let next = self
            .replies
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        match next {
            Some(Ok(s)) => Ok(s),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => Err(anyhow!("scripted generator exhausted")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Strip common markdown code-fence wrapping from a model reply.
/// Handles ```json ... ``` and bare ``` fences; anything else passes through.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a model reply as a JSON value of `T`, tolerating fence wrapping.
/// Unparsable output is an error — garbage is never allowed further down
/// the pipeline.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).with_context(|| {
        let head: String = cleaned.chars().take(120).collect();
        format!("generator reply is not valid JSON: {head}")
    })
}
