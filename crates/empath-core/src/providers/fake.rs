//! Scripted in-process client for dry runs and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::GenerationClient;
use crate::error::GenerationResult;
use crate::model::ScenarioInput;

/// Replies are queued per `data_idx`; once a queue is drained the client
/// answers with a canned response naming the index.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    model: String,
    script: Mutex<HashMap<usize, VecDeque<GenerationResult<String>>>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Queue one reply for `data_idx`.
    pub fn with_reply(self, data_idx: usize, reply: GenerationResult<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(data_idx)
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue the same reply `times` times.
    pub fn with_replies(
        mut self,
        data_idx: usize,
        reply: GenerationResult<String>,
        times: usize,
    ) -> Self {
        for _ in 0..times {
            self = self.with_reply(data_idx, reply.clone());
        }
        self
    }

    /// Every `data_idx` passed to `generate`, in call order.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn canned_response(data_idx: usize) -> String {
        format!("scripted response #{}", data_idx)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, input: &ScenarioInput, _prompt: &str) -> GenerationResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(input.data_idx);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(&input.data_idx)
            .and_then(|q| q.pop_front());

        next.unwrap_or_else(|| Ok(Self::canned_response(input.data_idx)))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
