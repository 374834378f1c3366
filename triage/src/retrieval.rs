//! Syllabus retrieval contract and the in-memory index behind it.
//!
//! The pipeline sees only the [`RetrievalGateway`] contract: ranked passages
//! scoped to an exact (subject, chapter) pair, or nothing. A gateway never
//! errors; no usable signal and a retrieval malfunction both come back as an
//! empty result, because the pipeline's downstream policy is the same either
//! way.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default number of passages returned by a search.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 3;

/// Read-side contract for syllabus content.
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    /// Ranked passages for `query`, scoped to an exact match of both
    /// `subject` and `chapter`, most relevant first, at most `limit`.
    async fn search(&self, query: &str, subject: &str, chapter: &str, limit: usize)
        -> Vec<String>;
}

/// One ingested syllabus passage.
#[derive(Debug, Clone, Deserialize)]
pub struct SyllabusDoc {
    pub id: String,
    pub subject: String,
    pub chapter: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct SyllabusFile {
    #[serde(default)]
    document: Vec<SyllabusDoc>,
}

/// In-memory syllabus index with deterministic keyword-overlap ranking.
///
/// Stands behind the gateway contract where a production deployment would
/// put a vector store. Ranking is the count of query terms appearing in the
/// passage; ties keep ingestion order.
pub struct SyllabusIndex {
    docs: Vec<SyllabusDoc>,
}

impl SyllabusIndex {
    /// Build an index, skipping documents that cannot be served.
    ///
    /// Malformed documents (blank id, subject, chapter, or text) and
    /// duplicate ids are dropped with a warning; ingestion never fails
    /// startup.
    pub fn new(docs: Vec<SyllabusDoc>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(docs.len());

        for doc in docs {
            if doc.id.trim().is_empty()
                || doc.subject.trim().is_empty()
                || doc.chapter.trim().is_empty()
                || doc.text.trim().is_empty()
            {
                warn!(id = %doc.id, "skipping malformed syllabus document");
                continue;
            }
            if !seen.insert(doc.id.clone()) {
                warn!(id = %doc.id, "skipping duplicate syllabus document");
                continue;
            }
            kept.push(doc);
        }

        Self { docs: kept }
    }

    /// Load an index from a TOML file of `[[document]]` tables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading syllabus file {}", path.display()))?;
        let file: SyllabusFile = toml::from_str(&raw)
            .with_context(|| format!("parsing syllabus file {}", path.display()))?;
        Ok(Self::new(file.document))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn terms(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn score(query_terms: &HashSet<String>, text: &str) -> usize {
        let doc_terms = Self::terms(text);
        query_terms.intersection(&doc_terms).count()
    }
}

#[async_trait]
impl RetrievalGateway for SyllabusIndex {
    async fn search(
        &self,
        query: &str,
        subject: &str,
        chapter: &str,
        limit: usize,
    ) -> Vec<String> {
        if query.trim().is_empty() || subject.trim().is_empty() || chapter.trim().is_empty() {
            return Vec::new();
        }

        let query_terms = Self::terms(query);

        let mut scored: Vec<(usize, &SyllabusDoc)> = self
            .docs
            .iter()
            .filter(|d| d.subject == subject && d.chapter == chapter)
            .map(|d| (Self::score(&query_terms, &d.text), d))
            .collect();

        // Stable sort: ties keep ingestion order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let passages: Vec<String> = scored
            .into_iter()
            .take(limit)
            .map(|(_, d)| d.text.clone())
            .collect();

        debug!(
            subject,
            chapter,
            returned = passages.len(),
            "syllabus search"
        );
        passages
    }
}
