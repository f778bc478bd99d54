//! In-memory store answering from canned responses.
//!
//! Useful for tests and for running the dashboard without a database.
//! Responders are checked in registration order; the first one whose
//! predicate matches answers the query. Unmatched queries return no rows.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{FluxRecord, StoreClient, StoreError};
use crate::query::FluxQuery;

type Responder =
    Box<dyn Fn(&FluxQuery) -> Option<Result<Vec<FluxRecord>, StoreError>> + Send + Sync>;

/// A store backed by registered responders.
///
/// # Example
///
/// ```
/// use plcwatch::{FluxRecord, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.on(
///     |q| q.param("var0") == Some("Temp"),
///     vec![FluxRecord::from_pairs([("_value", "21.5")])],
/// );
/// store.fail_on(|q| q.param("var0") == Some("Broken"), "sensor offline");
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    responders: Arc<Mutex<Vec<Responder>>>,
    log: Arc<Mutex<Vec<FluxQuery>>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer, to simulate a slow store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register a responder computing the answer from the query.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&FluxQuery) -> Option<Result<Vec<FluxRecord>, StoreError>> + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(responder));
    }

    /// Answer matching queries with fixed records.
    pub fn on<P>(&self, predicate: P, records: Vec<FluxRecord>)
    where
        P: Fn(&FluxQuery) -> bool + Send + Sync + 'static,
    {
        self.respond_with(move |q| predicate(q).then(|| Ok(records.clone())));
    }

    /// Fail matching queries with a query error.
    pub fn fail_on<P>(&self, predicate: P, message: impl Into<String>)
    where
        P: Fn(&FluxQuery) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.respond_with(move |q| predicate(q).then(|| Err(StoreError::Query(message.clone()))));
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<FluxQuery> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of queries received so far.
    pub fn query_count(&self) -> usize {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn answer(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>, StoreError> {
        let responders = self.responders.lock().unwrap_or_else(|e| e.into_inner());
        responders
            .iter()
            .find_map(|respond| respond(query))
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn query(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>, StoreError> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.answer(query)
    }

    fn description(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("queries", &self.query_count())
            .field("latency", &self.latency)
            .finish()
    }
}
