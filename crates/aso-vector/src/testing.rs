//! In-memory stand-ins for the remote services
//!
//! Compiled for unit tests and behind the `test-utils` feature so that
//! downstream crates can exercise the solution store without network access.

use crate::{EmbeddingClient, IndexMatch, IndexQuery, IndexRecord, MetadataFilter, VectorIndex};
use async_trait::async_trait;
use aso_core::{AsoError, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic bag-of-words embedder
pub struct FakeEmbedder {
    dimension: usize,
    authenticated: bool,
    calls: AtomicUsize,
    last_input: Mutex<Option<String>>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            authenticated: true,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    /// Behaves like a client configured without an API key
    pub fn unauthenticated(dimension: usize) -> Self {
        Self {
            authenticated: false,
            ..Self::new(dimension)
        }
    }

    /// Number of `embed` calls that reached the provider
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<String> {
        self.last_input.lock().ok().and_then(|last| last.clone())
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % self.dimension] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.authenticated {
            return Err(AsoError::Authentication(
                "OPENAI_API_KEY is required".to_string(),
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = texts.last().cloned();
        }
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Default)]
struct Failures {
    upsert: Option<String>,
    query: Option<String>,
    fetch: Option<String>,
}

/// Vector index kept in a `Vec`, ranked by dot product
pub struct FakeIndex {
    name: String,
    namespace: String,
    records: Mutex<Vec<IndexRecord>>,
    failures: Mutex<Failures>,
    last_filter: Mutex<Option<MetadataFilter>>,
    upserts: AtomicUsize,
    queries: AtomicUsize,
}

impl FakeIndex {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            records: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
            last_filter: Mutex::new(None),
            upserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn fail_upserts(&self, message: &str) {
        self.failures.lock().unwrap().upsert = Some(message.to_string());
    }

    pub fn fail_queries(&self, message: &str) {
        self.failures.lock().unwrap().query = Some(message.to_string());
    }

    pub fn fail_fetches(&self, message: &str) {
        self.failures.lock().unwrap().fetch = Some(message.to_string());
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&self, id: &str) -> Option<IndexRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<MetadataFilter> {
        self.last_filter.lock().unwrap().clone()
    }

    fn check(&self, failure: impl Fn(&Failures) -> Option<String>) -> Result<()> {
        match failure(&self.failures.lock().unwrap()) {
            Some(message) => Err(AsoError::Index(message)),
            None => Ok(()),
        }
    }
}

fn matches_filter(record: &IndexRecord, filter: &MetadataFilter) -> bool {
    record.metadata.language == filter.language
        && record.metadata.library.as_deref() == Some(filter.library.as_str())
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        self.check(|f| f.upsert.clone())?;
        self.upserts.fetch_add(1, Ordering::SeqCst);

        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record);
        }
        Ok(())
    }

    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexMatch>> {
        self.check(|f| f.query.clone())?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = query.filter.clone();

        let stored = self.records.lock().unwrap();
        let mut scored: Vec<(f32, &IndexRecord)> = stored
            .iter()
            .filter(|r| query.filter.as_ref().map_or(true, |f| matches_filter(r, f)))
            .map(|r| {
                let score = r
                    .values
                    .iter()
                    .zip(&query.vector)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (score, r)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(query.top_k)
            .map(|(score, r)| IndexMatch {
                id: r.id.clone(),
                score: Some(score),
                metadata: query.include_metadata.then(|| r.metadata.clone()),
            })
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexMatch>> {
        self.check(|f| f.fetch.clone())?;
        Ok(self.record(id).map(|r| IndexMatch {
            id: r.id,
            score: None,
            metadata: Some(r.metadata),
        }))
    }

    fn index_name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
