//! End-to-end pipeline tests against in-process mock services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use scholarqa_core::qa::NO_PAPERS_MESSAGE;
use scholarqa_core::{
    Backoff, ChatService, CompletionClient, PaperCache, PaperRecord, QaError, QaPipeline, Result,
    RetryPolicy, SearchClient, SearchService,
};

fn paper(title: &str, authors: &[&str], id: &str) -> PaperRecord {
    PaperRecord {
        title: title.to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        abstract_text: format!("Abstract of {title}."),
        full_text: format!("Abstract of {title}."),
        published: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        id: Some(id.to_string()),
        categories: vec!["cs.LG".to_string()],
    }
}

struct FixedSearch {
    papers: Vec<PaperRecord>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchService for FixedSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<PaperRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.papers.clone())
    }
}

/// Returns a different batch on each call, for overwrite tests.
struct SequencedSearch {
    batches: Mutex<VecDeque<Vec<PaperRecord>>>,
}

#[async_trait]
impl SearchService for SequencedSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<PaperRecord>> {
        let batch = self.batches.lock().unwrap().pop_front();
        Ok(batch.unwrap_or_default())
    }
}

struct FailingSearch {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchService for FailingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<PaperRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(QaError::Search("provider unreachable".to_string()))
    }
}

struct FixedChat {
    reply: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatService for FixedChat {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyChat {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatService for FlakyChat {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            Err(QaError::Completion(format!("transient fault {n}")))
        } else {
            Ok("recovered answer".to_string())
        }
    }
}

struct FailingChat {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatService for FailingChat {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(QaError::Completion("connection reset".to_string()))
    }
}

fn pipeline<S: SearchService, C: ChatService>(
    search: S,
    chat: C,
    policy: RetryPolicy,
) -> QaPipeline<S, C> {
    QaPipeline::new(
        SearchClient::new(search, policy, PaperCache::default()),
        CompletionClient::new(chat, policy),
    )
}

#[tokio::test]
async fn answer_appends_reference_footer() {
    let search_calls = Arc::new(AtomicUsize::new(0));
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let mut qa = pipeline(
        FixedSearch {
            papers: vec![
                paper("Paper A", &["Alice"], "id1"),
                paper("Paper B", &["Bob", "Carol"], "id2"),
            ],
            calls: search_calls.clone(),
        },
        FixedChat {
            reply: "ANSWER".to_string(),
            calls: chat_calls.clone(),
        },
        RetryPolicy::default(),
    );

    let answer = qa.answer("What is X?", Some("topic")).await.unwrap();

    assert_eq!(
        answer,
        "ANSWER\n\nReferences:\n- Paper A (Alice)\n- Paper B (Bob, Carol)"
    );
    assert_eq!(search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn search_results_are_cached_verbatim() {
    let mut qa = pipeline(
        FixedSearch {
            papers: vec![
                paper("Paper A", &["Alice"], "id1"),
                paper("Paper B", &["Bob", "Carol"], "id2"),
            ],
            calls: Arc::new(AtomicUsize::new(0)),
        },
        FixedChat {
            reply: "ANSWER".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        },
        RetryPolicy::default(),
    );

    qa.answer("What is X?", Some("topic")).await.unwrap();

    let cache = qa.cache();
    assert_eq!(cache.len(), 2);
    let cached = cache.get("id2").unwrap();
    assert_eq!(cached.title, "Paper B");
    assert_eq!(cached.authors, vec!["Bob", "Carol"]);
    assert_eq!(cached.abstract_text, "Abstract of Paper B.");
    assert_eq!(cached.full_text, cached.abstract_text);
    assert_eq!(cached.categories, vec!["cs.LG"]);
}

#[tokio::test]
async fn repeated_search_overwrites_on_identifier() {
    let first = vec![paper("Old title", &["Alice"], "id1")];
    let mut updated = paper("New title", &["Alice", "Dan"], "id1");
    updated.abstract_text = "Revised abstract.".to_string();
    updated.full_text = updated.abstract_text.clone();

    let mut qa = pipeline(
        SequencedSearch {
            batches: Mutex::new(VecDeque::from([first, vec![updated]])),
        },
        FixedChat {
            reply: "ANSWER".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        },
        RetryPolicy::default(),
    );

    qa.answer("What is X?", Some("topic")).await.unwrap();
    qa.answer("What is X, again?", Some("topic")).await.unwrap();

    let cache = qa.cache();
    assert_eq!(cache.len(), 1);
    let cached = cache.get("id1").unwrap();
    assert_eq!(cached.title, "New title");
    assert_eq!(cached.abstract_text, "Revised abstract.");
}

#[tokio::test]
async fn empty_search_short_circuits_without_completion() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let mut qa = pipeline(
        FixedSearch {
            papers: vec![],
            calls: Arc::new(AtomicUsize::new(0)),
        },
        FixedChat {
            reply: "ANSWER".to_string(),
            calls: chat_calls.clone(),
        },
        RetryPolicy::default(),
    );

    let answer = qa.answer("What is X?", Some("topic")).await.unwrap();

    assert_eq!(answer, NO_PAPERS_MESSAGE);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
    assert!(qa.cache().is_empty());
}

#[tokio::test]
async fn completion_recovers_within_retry_budget() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let mut qa = pipeline(
        FixedSearch {
            papers: vec![paper("Paper A", &["Alice"], "id1")],
            calls: Arc::new(AtomicUsize::new(0)),
        },
        FlakyChat {
            failures: 2,
            calls: chat_calls.clone(),
        },
        RetryPolicy::new(3, Backoff::None),
    );

    let answer = qa.answer("What is X?", None).await.unwrap();

    assert!(answer.starts_with("recovered answer"));
    assert_eq!(chat_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_completion_degrades_to_error_text() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let mut qa = pipeline(
        FixedSearch {
            papers: vec![paper("Paper A", &["Alice"], "id1")],
            calls: Arc::new(AtomicUsize::new(0)),
        },
        FailingChat {
            calls: chat_calls.clone(),
        },
        RetryPolicy::new(3, Backoff::None),
    );

    let answer = qa.answer("What is X?", None).await.unwrap();

    assert!(answer.starts_with("Error generating response after 3 attempts:"));
    assert!(answer.contains("connection reset"));
    // The interaction still renders sources even when generation failed.
    assert!(answer.contains("\n\nReferences:\n- Paper A (Alice)"));
    assert_eq!(chat_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn search_faults_are_retried_then_returned_as_errors() {
    let search_calls = Arc::new(AtomicUsize::new(0));
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let mut qa = pipeline(
        FailingSearch {
            calls: search_calls.clone(),
        },
        FixedChat {
            reply: "ANSWER".to_string(),
            calls: chat_calls.clone(),
        },
        RetryPolicy::new(2, Backoff::None),
    );

    let err = qa.answer("What is X?", Some("topic")).await.unwrap_err();

    assert!(matches!(err, QaError::Search(_)));
    assert_eq!(search_calls.load(Ordering::SeqCst), 2);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
}
