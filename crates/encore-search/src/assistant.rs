//! Question answering: retrieve, format, generate.

use std::sync::Arc;

use crate::chat::{generate_response, ChatModel};
use crate::context::format_context;
use crate::error::SearchResult;
use crate::retriever::{RetrievedSetlist, Retriever, DEFAULT_TOP_K};

/// An answer together with the setlists it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedSetlist>,
}

#[derive(Debug)]
pub struct Assistant {
    retriever: Retriever,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
}

impl Assistant {
    #[must_use]
    pub fn new(retriever: Retriever, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            chat,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Answer `question` from the most relevant stored setlists.
    ///
    /// Retrieval failures are returned as errors. Generation failures are
    /// folded into the answer text.
    ///
    /// # Errors
    /// Returns an error if the question cannot be embedded or the stores
    /// cannot be read.
    pub async fn answer(&self, question: &str) -> SearchResult<Answer> {
        let sources = self.retriever.retrieve(question, self.top_k).await?;
        log::info!("Answering with {} retrieved setlist(s)", sources.len());

        let context = format_context(&sources);
        let text = generate_response(self.chat.as_ref(), question, &context).await;

        Ok(Answer { text, sources })
    }
}
