//! Mock model for testing purposes.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{GenerateRequest, LlmError, ModelClient};
use crate::config::Credential;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Status(u16, String),
    Network(String),
    Empty,
}

/// A model that returns a fixed reply and records every request it sees.
#[derive(Debug)]
pub struct MockModel {
    reply: Mutex<Reply>,
    requests: Mutex<Vec<GenerateRequest>>,
    keys: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockModel {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `text` on every call
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Text(text.into()))
    }

    /// Fail every call as the server would with this status and message
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Status(status, message.into()))
    }

    /// Fail every call with a transport error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Network(message.into()))
    }

    /// Succeed without any text
    pub fn empty() -> Self {
        Self::with_reply(Reply::Empty)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Keys presented so far, oldest first
    pub fn keys_seen(&self) -> Vec<String> {
        lock(&self.keys).clone()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        lock(&self.requests).push(request.clone());
        lock(&self.keys).push(credential.expose().to_string());

        let reply = lock(&self.reply).clone();
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Status(status, message) => Err(LlmError::from_status(status, message)),
            Reply::Network(message) => Err(LlmError::Network(message)),
            Reply::Empty => Err(LlmError::EmptyResponse),
        }
    }
}
