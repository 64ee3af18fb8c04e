//! arXiv search client over the export Atom API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use scholarqa_core::{PaperRecord, QaError, Result, SearchService};

const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";

/// Results per request accepted by the export API without paging.
const MAX_PAGE_SIZE: usize = 50;

#[derive(Clone)]
pub struct ArxivSearch {
    http: Client,
    base: String,
}

impl Default for ArxivSearch {
    fn default() -> Self {
        let http = Client::builder()
            .user_agent(concat!("scholarqa/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base: ARXIV_API_BASE.to_string(),
        }
    }
}

impl ArxivSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base(base: &str) -> Self {
        let mut s = Self::default();
        s.base = base.to_string();
        s
    }
}

#[async_trait]
impl SearchService for ArxivSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        use reqwest::header::{ACCEPT, CONTENT_TYPE};

        let max_results = max_results.clamp(1, MAX_PAGE_SIZE);
        let resp = self
            .http
            .get(&self.base)
            .query(&[("search_query", format!("all:{query}").as_str())])
            .query(&[("start", 0usize), ("max_results", max_results)])
            .query(&[("sortBy", "relevance"), ("sortOrder", "descending")])
            .header(
                ACCEPT,
                "application/atom+xml, application/xml;q=0.9, text/xml;q=0.8",
            )
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QaError::Search(format!("arXiv API error: HTTP {status}")));
        }
        let ctype = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !(ctype.contains("xml") || ctype.contains("atom")) {
            return Err(QaError::Search(format!(
                "arXiv API unexpected content-type: {ctype}"
            )));
        }

        let text = resp.text().await?;
        let papers = parse_atom_feed(&text)?;
        tracing::debug!(query, count = papers.len(), "Parsed arXiv feed");
        Ok(papers)
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip any namespace prefix from an element name.
fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b':') {
        Some(ix) => &raw[ix + 1..],
        None => raw,
    }
}

fn category_term(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    for a in e.attributes().flatten() {
        if a.key.as_ref().ends_with(b"term") {
            return Some(String::from_utf8_lossy(&a.value).to_string());
        }
    }
    None
}

fn parse_atom_feed(xml: &str) -> Result<Vec<PaperRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut out: Vec<PaperRecord> = vec![];

    let mut in_entry = false;
    let mut cur_id = String::new();
    let mut cur_title = String::new();
    let mut cur_published = String::new();
    let mut cur_summary = String::new();
    let mut cur_authors: Vec<String> = vec![];
    let mut cur_categories: Vec<String> = vec![];
    let mut text_target: Option<&'static str> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name_buf: Vec<u8> = e.name().as_ref().to_vec();
                match local_name(&name_buf) {
                    b"entry" => {
                        in_entry = true;
                        cur_id.clear();
                        cur_title.clear();
                        cur_published.clear();
                        cur_summary.clear();
                        cur_authors.clear();
                        cur_categories.clear();
                        text_target = None;
                    }
                    b"id" if in_entry => text_target = Some("id"),
                    b"title" if in_entry => text_target = Some("title"),
                    b"published" if in_entry => text_target = Some("published"),
                    b"summary" if in_entry => text_target = Some("summary"),
                    b"name" if in_entry => text_target = Some("author"),
                    b"category" if in_entry => {
                        if let Some(term) = category_term(&e) {
                            cur_categories.push(term);
                        }
                    }
                    _ => {}
                }
            }
            // <category term="..."/> is self-closing in arXiv feeds.
            Ok(Event::Empty(e)) => {
                let name_buf: Vec<u8> = e.name().as_ref().to_vec();
                if in_entry && local_name(&name_buf) == b"category" {
                    if let Some(term) = category_term(&e) {
                        cur_categories.push(term);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(tag) = text_target.take() {
                    let txt = t.unescape().unwrap_or_default().to_string();
                    match tag {
                        "id" => cur_id = txt.trim().to_string(),
                        "title" => cur_title = normalize_ws(&txt),
                        "published" => cur_published = txt.trim().to_string(),
                        "summary" => cur_summary = txt.trim().to_string(),
                        "author" => cur_authors.push(txt.trim().to_string()),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name_buf: Vec<u8> = e.name().as_ref().to_vec();
                if local_name(&name_buf) == b"entry" && in_entry {
                    in_entry = false;
                    let abstract_text = cur_summary.clone();
                    out.push(PaperRecord {
                        title: cur_title.clone(),
                        authors: cur_authors.clone(),
                        full_text: abstract_text.clone(),
                        abstract_text,
                        published: parse_timestamp(&cur_published),
                        id: (!cur_id.is_empty()).then(|| cur_id.clone()),
                        categories: cur_categories.clone(),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(QaError::Search(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
