//! The answer assembler: search, prompt, completion, references.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::PaperCache;
use crate::completion::{ChatService, CompletionClient};
use crate::error::QaError;
use crate::prompt::{build_prompt, format_references};
use crate::search::{SearchClient, SearchService};
use crate::Result;

/// Returned verbatim when a search yields no papers.
pub const NO_PAPERS_MESSAGE: &str =
    "I couldn't find any relevant research papers to answer your question.";

pub const DEFAULT_MAX_RESULTS: usize = 3;

/// How the search query is chosen from the user's two inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryStrategy {
    /// Search the topic when one is given, otherwise reuse the question
    /// text verbatim as the query.
    #[default]
    TopicOrQuestion,
    /// Refuse to search without an explicit topic.
    RequireTopic,
}

impl QueryStrategy {
    pub fn effective_query<'a>(&self, question: &'a str, topic: Option<&'a str>) -> Result<&'a str> {
        match self {
            QueryStrategy::TopicOrQuestion => Ok(topic.unwrap_or(question)),
            QueryStrategy::RequireTopic => topic.ok_or_else(|| {
                QaError::Query("a research topic is required to search for papers".to_string())
            }),
        }
    }
}

/// Composes the search client, prompt builder, and completion client into
/// the single question-answering operation.
pub struct QaPipeline<S, C> {
    search: SearchClient<S>,
    completion: CompletionClient<C>,
    strategy: QueryStrategy,
    max_results: usize,
}

impl<S: SearchService, C: ChatService> QaPipeline<S, C> {
    pub fn new(search: SearchClient<S>, completion: CompletionClient<C>) -> Self {
        Self {
            search,
            completion,
            strategy: QueryStrategy::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn cache(&self) -> &PaperCache {
        self.search.cache()
    }

    /// Answer `question` using papers retrieved for the effective query.
    ///
    /// Zero search results short-circuit to [`NO_PAPERS_MESSAGE`] without a
    /// completion call. Search faults that survive retry are returned as
    /// errors for the presentation layer to render; completion faults never
    /// escape the completion client. The prompt is always built from the
    /// original question, not the effective query.
    #[instrument(skip(self))]
    pub async fn answer(&mut self, question: &str, topic: Option<&str>) -> Result<String> {
        let query = self.strategy.effective_query(question, topic)?;
        let papers = self.search.search(query, self.max_results).await?;
        if papers.is_empty() {
            debug!(query, "Search returned no papers");
            return Ok(NO_PAPERS_MESSAGE.to_string());
        }

        let prompt = build_prompt(question, &papers);
        let response = self.completion.complete(&prompt).await;
        Ok(format!("{}{}", response, format_references(&papers)))
    }
}
