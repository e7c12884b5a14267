use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::Retriever;
use lumi_core::types::Chunk;

use crate::generator::AnswerGenerator;
use crate::prompts::{format_context, format_history, render, ANALYSIS_PROMPT, CONTEXT_PROMPT};
use crate::short_circuit::{default_short_circuits, ShortCircuit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self { Self { role: Role::User, content: content.into() } }

    pub fn assistant(content: impl Into<String>) -> Self { Self { role: Role::Assistant, content: content.into() } }
}

/// Turns kept in a conversation and rendered into the context prompt.
pub const HISTORY_TURNS: usize = 12;

/// Append one question/reply exchange, dropping the oldest turns past [`HISTORY_TURNS`].
pub fn remember(history: &mut Vec<ChatTurn>, question: impl Into<String>, reply: impl Into<String>) {
    history.push(ChatTurn::user(question));
    history.push(ChatTurn::assistant(reply));
    let overflow = history.len().saturating_sub(HISTORY_TURNS);
    history.drain(..overflow);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub context_answer: String,
    pub analysis_answer: String,
    /// The chunks the context answer was generated from, in order.
    pub source_documents: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QaOutcome {
    /// Answered by a short-circuit check; nothing was retrieved.
    Identity { answer: String },
    Answered(Answer),
}

impl QaOutcome {
    pub fn is_identity(&self) -> bool { matches!(self, QaOutcome::Identity { .. }) }
}

pub struct QaOrchestrator {
    generator: Arc<dyn AnswerGenerator>,
    short_circuits: Vec<Box<dyn ShortCircuit>>,
}

impl QaOrchestrator {
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { generator, short_circuits: default_short_circuits() }
    }

    #[must_use]
    pub fn with_short_circuits(mut self, short_circuits: Vec<Box<dyn ShortCircuit>>) -> Self {
        self.short_circuits = short_circuits;
        self
    }

    /// Answer `question` from the top `k` chunks `retriever` returns.
    pub async fn answer<R: Retriever>(&self, question: &str, history: &[ChatTurn], retriever: &R, k: usize) -> Result<QaOutcome> {
        if let Some(outcome) = self.short_circuit(question)? {
            return Ok(outcome);
        }
        let chunks = retriever.query(question, k).await?;
        tracing::debug!(retrieved = chunks.len(), k, "context retrieved");
        self.generate(question, history, chunks).await.map(QaOutcome::Answered)
    }

    /// Answer `question` from chunks the caller picked, used as given.
    pub async fn answer_from_chunks(&self, question: &str, history: &[ChatTurn], chunks: Vec<Chunk>) -> Result<QaOutcome> {
        if let Some(outcome) = self.short_circuit(question)? {
            return Ok(outcome);
        }
        tracing::debug!(selected = chunks.len(), "using selected chunks");
        self.generate(question, history, chunks).await.map(QaOutcome::Answered)
    }

    fn short_circuit(&self, question: &str) -> Result<Option<QaOutcome>> {
        if question.trim().is_empty() {
            return Err(Error::operation(Stage::Generation, "question is empty"));
        }
        for check in &self.short_circuits {
            if let Some(answer) = check.answer(question) {
                tracing::debug!(check = check.name(), "short-circuited");
                return Ok(Some(QaOutcome::Identity { answer }));
            }
        }
        Ok(None)
    }

    async fn generate(&self, question: &str, history: &[ChatTurn], chunks: Vec<Chunk>) -> Result<Answer> {
        let context = format_context(&chunks);
        let history = format_history(history);
        let prompt = render(CONTEXT_PROMPT, &[("context", &context), ("question", question), ("history", &history)]);
        let context_answer = self.generator.generate(&prompt).await?;

        let prompt = render(ANALYSIS_PROMPT, &[("question", question), ("context_answer", &context_answer)]);
        let analysis_answer = self.generator.generate(&prompt).await?;
        tracing::info!(model = self.generator.model_id(), sources = chunks.len(), "answer generated");
        Ok(Answer { context_answer, analysis_answer, source_documents: chunks })
    }
}
