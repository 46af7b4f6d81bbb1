// Answer generation module
// Turns a question plus retrieved passages into a natural-language answer


use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::http::{build_agent, endpoint, send_once};
use crate::retriever::Passage;
use crate::{QaError, Result};

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

const SYSTEM_PROMPT: &str = "Use the following pieces of context to answer the user's question. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Produces an answer from a question and its supporting passages
pub trait AnswerEngine {
    fn generate(&self, question: &str, passages: &[Passage]) -> Result<String>;
}

impl<T: AnswerEngine + ?Sized> AnswerEngine for &T {
    #[inline]
    fn generate(&self, question: &str, passages: &[Passage]) -> Result<String> {
        (**self).generate(question, passages)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenAI chat-completions answerer; all passages go into a single system message
#[derive(Clone)]
pub struct OpenAiChat {
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    agent: ureq::Agent,
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .openai_url()
            .map_err(|e| QaError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: config.openai.api_key.clone(),
            model: config.openai.chat_model.clone(),
            temperature: config.openai.temperature,
            agent: build_agent(Duration::from_secs(config.openai.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }
}

impl AnswerEngine for OpenAiChat {
    #[inline]
    fn generate(&self, question: &str, passages: &[Passage]) -> Result<String> {
        debug!(
            "Generating answer with {} using {} passages",
            self.model,
            passages.len()
        );

        let url = endpoint(&self.base_url, CHAT_COMPLETIONS_PATH)?;
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: build_messages(question, passages),
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| anyhow::anyhow!("Failed to serialize chat request: {}", e))?;

        let response_text = send_once(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Upstream(format!("Failed to parse chat response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| QaError::Upstream("Chat response contained no answer".to_string()))
    }
}

fn build_messages(question: &str, passages: &[Passage]) -> Vec<ChatMessage> {
    let context: Vec<String> = passages
        .iter()
        .enumerate()
        .map(|(position, passage)| {
            format!(
                "\n[{}] ({}, id {})\n{}\n",
                position + 1,
                passage.source,
                passage.id,
                passage.text
            )
        })
        .collect();

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: format!("{}\n----------------{}", SYSTEM_PROMPT, context.concat()),
        },
        ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        },
    ]
}
