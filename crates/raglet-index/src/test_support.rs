//! Deterministic fakes for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use raglet_llm::LlmError;

use crate::capability::{AnswerComposer, EmbeddingGateway};

/// Embeds text as a keyword-presence vector with a constant bias term.
pub(crate) struct KeywordEmbedder {
    keywords: Vec<&'static str>,
    pub(crate) calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingGateway for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        Ok(vector)
    }
}

/// Answers whole batches at once and records the size of each request.
#[derive(Default)]
pub(crate) struct BatchRecordingEmbedder {
    batches: Mutex<Vec<usize>>,
}

impl BatchRecordingEmbedder {
    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EmbeddingGateway for BatchRecordingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(texts.len());
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

pub(crate) struct FailingEmbedder;

impl EmbeddingGateway for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(LlmError::Other("embedding service unavailable".into()))
    }
}

/// Records every `(context, question)` pair and answers with a fixed string.
pub(crate) struct RecordingComposer {
    answer: String,
    pub(crate) calls: Mutex<Vec<(String, String)>>,
}

impl RecordingComposer {
    pub(crate) fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_owned(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AnswerComposer for RecordingComposer {
    async fn compose(&self, context: &str, question: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((context.to_owned(), question.to_owned()));
        Ok(self.answer.clone())
    }
}
