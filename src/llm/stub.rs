use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::CompletionClient;

/// Completion client that replays a script of canned replies
///
/// Once the script runs out every further call fails.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client whose every call fails
    pub fn failing() -> Self {
        Self::new(vec![])
    }

    /// User payloads received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.requests.lock().unwrap().push(user.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => anyhow::bail!("script exhausted"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Completion client that echoes each batch back with `。` appended
pub struct EchoClient;

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        let batch: Vec<String> = serde_json::from_str(user)?;
        let punctuated: Vec<String> = batch.into_iter().map(|t| format!("{}。", t)).collect();
        Ok(format!("结果：{}", serde_json::to_string(&punctuated)?))
    }

    fn name(&self) -> &str {
        "echo"
    }
}
