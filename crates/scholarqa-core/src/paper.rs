use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about one publication returned by a paper search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title.
    pub title: String,

    /// Author names, in the order the search provider returned them.
    pub authors: Vec<String>,

    /// Abstract text.
    pub abstract_text: String,

    /// Body text used for context assembly. Always a copy of the abstract;
    /// the pipeline never fetches the actual document.
    pub full_text: String,

    /// Publication timestamp, if the provider supplied one.
    pub published: Option<DateTime<Utc>>,

    /// Provider-assigned canonical identifier (e.g. an arXiv entry URL).
    /// Used as the cache key when present.
    pub id: Option<String>,

    /// Subject classification tags.
    pub categories: Vec<String>,
}

impl PaperRecord {
    /// Comma-joined author list as it appears in prompts and references.
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}
