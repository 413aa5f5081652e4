//! Scripted inference service for tests.
//!
//! Replies are chosen by the system prompt of the request (every agent has a
//! distinct one in [`crate::prompts`]) and optionally by a substring of the
//! user message.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::embedder::Embedder;
use crate::inference::{ChatMessage, GenerationParams, InferenceError, InferenceService, Role};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Fails with [`InferenceError::Timeout`].
    Unavailable,
    /// Fails with [`InferenceError::Unauthorized`].
    Unauthorized,
    /// Sleeps, then answers with the inner reply.
    Delayed(Duration, Box<Reply>),
    /// Panics inside the call.
    Panic,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn json(value: Value) -> Self {
        Self::Text(value.to_string())
    }

    pub fn unavailable() -> Self {
        Self::Unavailable
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn delayed(self, by: Duration) -> Self {
        Self::Delayed(by, Box::new(self))
    }
}

struct Rule {
    system: String,
    user_contains: Option<String>,
    /// Replies are consumed in order; the last one repeats.
    replies: VecDeque<Reply>,
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub params: GenerationParams,
}

pub struct ScriptedInference {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
    healthy: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedInference {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answer every request with this system prompt.
    pub fn when(self, system: &str, reply: Reply) -> Self {
        self.push_rule(system, None, vec![reply])
    }

    /// Answer requests with this system prompt whose user message contains `needle`.
    /// Checked in insertion order, so add specific rules before general ones.
    pub fn when_user(self, system: &str, needle: &str, reply: Reply) -> Self {
        self.push_rule(system, Some(needle), vec![reply])
    }

    /// Answer successive matching requests with `replies` in order.
    pub fn when_sequence(self, system: &str, needle: Option<&str>, replies: Vec<Reply>) -> Self {
        self.push_rule(system, needle, replies)
    }

    pub fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }

    fn push_rule(self, system: &str, needle: Option<&str>, replies: Vec<Reply>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                system: system.to_string(),
                user_contains: needle.map(str::to_string),
                replies: replies.into(),
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made with this system prompt.
    pub fn calls_for(&self, system: &str) -> usize {
        self.calls().iter().filter(|c| c.system == system).count()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, system: &str, user: &str) -> Option<Reply> {
        let mut rules = self.rules.lock().ok()?;
        let rule = rules.iter_mut().find(|r| {
            r.system == system && r.user_contains.as_deref().is_none_or(|n| user.contains(n))
        })?;
        if rule.replies.len() > 1 {
            rule.replies.pop_front()
        } else {
            rule.replies.front().cloned()
        }
    }

    async fn play(reply: Reply) -> Result<String, InferenceError> {
        let mut reply = reply;
        loop {
            match reply {
                Reply::Text(s) => return Ok(s),
                Reply::Unavailable => return Err(InferenceError::Timeout(Duration::from_secs(60))),
                Reply::Unauthorized => return Err(InferenceError::Unauthorized { status: 401 }),
                Reply::Panic => panic!("scripted panic"),
                Reply::Delayed(by, inner) => {
                    tokio::time::sleep(by).await;
                    reply = *inner;
                }
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        let find = |role: Role| {
            messages
                .iter()
                .find(|m| m.role == role)
                .map(|m| m.content.clone())
                .unwrap_or_default()
        };
        let (system, user) = (find(Role::System), find(Role::User));

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system.clone(),
                user: user.clone(),
                params: params.clone(),
            });
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.next_reply(&system, &user) {
            Some(reply) => Self::play(reply).await,
            None => Err(InferenceError::Server {
                status: 404,
                body: "no scripted reply".into(),
            }),
        }
    }

    async fn health(&self) -> Result<(), InferenceError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(InferenceError::Transport("scripted outage".into()))
        }
    }
}

#[async_trait]
impl Embedder for ScriptedInference {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(InferenceError::Transport("scripted outage".into()));
        }
        Ok(vec![text.len() as f32, 1.0, 0.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "m".into(),
            temperature: 0.0,
            json_mode: true,
        }
    }

    #[tokio::test]
    async fn sequence_then_repeat_last() {
        let s = ScriptedInference::new().when_sequence(
            "sys",
            None,
            vec![Reply::unavailable(), Reply::text("ok")],
        );
        let msgs = [ChatMessage::system("sys"), ChatMessage::user("u")];
        assert!(s.complete(&msgs, &params()).await.is_err());
        assert_eq!(s.complete(&msgs, &params()).await.unwrap(), "ok");
        assert_eq!(s.complete(&msgs, &params()).await.unwrap(), "ok");
        assert_eq!(s.calls_for("sys"), 3);
    }

    #[tokio::test]
    async fn user_specific_rules_win_when_first() {
        let s = ScriptedInference::new()
            .when_user("sys", "special", Reply::text("a"))
            .when("sys", Reply::text("b"));
        let special = [ChatMessage::system("sys"), ChatMessage::user("a special rule")];
        let plain = [ChatMessage::system("sys"), ChatMessage::user("plain")];
        assert_eq!(s.complete(&special, &params()).await.unwrap(), "a");
        assert_eq!(s.complete(&plain, &params()).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn unscripted_prompt_fails() {
        let s = ScriptedInference::new();
        let msgs = [ChatMessage::system("other"), ChatMessage::user("u")];
        assert!(matches!(
            s.complete(&msgs, &params()).await,
            Err(InferenceError::Server { status: 404, .. })
        ));
    }
}
