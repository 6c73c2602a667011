use serde::{Deserialize, Serialize};

use crate::config::TogetherConfig;
use crate::sessions::ChatMessage;

/// Together AI chat-completion client.
///
/// One blocking round trip per call turn: the full conversation history
/// goes out, one reply comes back. No streaming.
pub struct TogetherClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repetition_penalty: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repetition_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

impl TogetherClient {
    pub fn new(config: &TogetherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
        }
    }

    /// Send the conversation history and return the reply text, trimmed.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            repetition_penalty: self.repetition_penalty,
        };

        let resp = self
            .client
            .post("https://api.together.xyz/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Api(format!("{status}: {body}")));
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        chat_resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ChatError::Parse("Response contained no choices".into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("Together API error: {0}")]
    Api(String),
    #[error("Failed to parse completion response: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::Role;

    #[test]
    fn request_serializes_history_in_order() {
        let messages = vec![
            ChatMessage::new(Role::System, "You are concise."),
            ChatMessage::new(Role::User, "hi"),
        ];
        let body = ChatRequest {
            model: "meta-llama/Llama-3-70b-chat-hf",
            messages: &messages,
            max_tokens: 150,
            temperature: 0.3,
            top_p: 0.7,
            top_k: 50,
            repetition_penalty: 1.0,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "meta-llama/Llama-3-70b-chat-hf");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 150);
    }

    #[test]
    fn response_parses_first_choice() {
        let raw = r#"{
            "id": "8f0e6f-fake",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "finish_reason": "stop",
                    "message": { "role": "assistant", "content": "  Hello there.  " }
                }
            ],
            "usage": { "prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24 }
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let content = parsed.choices[0].message.content.trim();
        assert_eq!(content, "Hello there.");
    }

    #[test]
    fn empty_choices_is_an_error_shape() {
        let raw = r#"{ "choices": [] }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
