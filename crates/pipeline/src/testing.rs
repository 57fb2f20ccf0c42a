//! Test doubles for the [`LlmProvider`] port.
//!
//! Available to this crate's unit tests and, through the `test-support`
//! feature, to the tests of downstream crates.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::LlmError;
use crate::provider::{Completion, CompletionRequest, LlmProvider};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(LlmError),
}

#[derive(Debug, Clone)]
struct Rule {
    needles: Vec<String>,
    reply: Reply,
    delay: Option<Duration>,
}

/// A provider that answers prompts from substring rules.
///
/// Rules are checked in insertion order; the first whose needles all occur in
/// the prompt wins. Prompts matching no rule receive the default reply (empty text
/// unless changed). Every prompt is recorded in arrival order.
///
/// Matching on prompt content rather than call order keeps the double
/// deterministic when a stage issues calls concurrently.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    rules: Vec<Rule>,
    default_reply: Option<Reply>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers prompts containing `needle` with `response`.
    #[must_use]
    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needles: vec![needle.into()],
            reply: Reply::Text(response.into()),
            delay: None,
        });
        self
    }

    /// Answers prompts containing every one of `needles` with `response`.
    #[must_use]
    pub fn on_all(mut self, needles: &[&str], response: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Reply::Text(response.into()),
            delay: None,
        });
        self
    }

    /// Like [`ScriptedProvider::on`], but sleeps for `delay` before answering.
    #[must_use]
    pub fn on_delayed(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.rules.push(Rule {
            needles: vec![needle.into()],
            reply: Reply::Text(response.into()),
            delay: Some(delay),
        });
        self
    }

    /// Fails prompts containing `needle` with `error`.
    #[must_use]
    pub fn fail_on(mut self, needle: impl Into<String>, error: LlmError) -> Self {
        self.rules.push(Rule {
            needles: vec![needle.into()],
            reply: Reply::Fail(error),
            delay: None,
        });
        self
    }

    /// Never answers prompts containing `needle` (sleeps for an hour).
    #[must_use]
    pub fn hang_on(mut self, needle: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needles: vec![needle.into()],
            reply: Reply::Text(String::new()),
            delay: Some(Duration::from_secs(3600)),
        });
        self
    }

    /// Sets the reply for prompts that match no rule.
    #[must_use]
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.default_reply = Some(Reply::Text(response.into()));
        self
    }

    /// Every prompt received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let rule = self
            .rules
            .iter()
            .find(|r| r.needles.iter().all(|n| request.prompt.contains(n.as_str())));
        let (reply, delay) = match rule {
            Some(r) => (r.reply.clone(), r.delay),
            None => (
                self.default_reply
                    .clone()
                    .unwrap_or_else(|| Reply::Text(String::new())),
                None,
            ),
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Text(text) => Ok(Completion::text(text)),
            Reply::Fail(err) => Err(err),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
