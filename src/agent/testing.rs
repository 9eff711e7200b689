//! Scripted [`ChatClient`] for exercising the loop and the diagnosis
//! pipeline without an endpoint.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{AssistantMessage, ChatClient, ChatMessage, ToolCall, ToolSpec};
use crate::error::Result;

/// Replays canned replies in order and records every request it receives.
/// Once the script runs out it answers `"script exhausted"`.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<AssistantMessage>>>,
    requests: Mutex<Vec<Request>>,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub messages: Vec<ChatMessage>,
    pub tool_count: usize,
}

impl Request {
    /// Content of the first user turn.
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == super::client::Role::User)
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default()
    }
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<AssistantMessage>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<AssistantMessage> {
        self.requests.lock().unwrap().push(Request {
            messages: messages.to_vec(),
            tool_count: tools.len(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(answer("script exhausted")))
    }
}

pub fn answer(text: &str) -> AssistantMessage {
    AssistantMessage {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn calling(calls: Vec<ToolCall>) -> AssistantMessage {
    AssistantMessage {
        content: None,
        tool_calls: calls,
    }
}
