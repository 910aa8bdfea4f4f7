//! Streaming execution.
//!
//! One producer worker task per query, connected to the consumer through a
//! bounded channel: the producer blocks on `send` when the consumer lags
//! (backpressure) and stops as soon as the consumer goes away (the failed
//! send is the cancellation signal). SQL runs sequentially on the worker
//! through the database's shared connection handle; cursors are closed on
//! exhaustion, cancellation, and error paths alike.
//!
//! Result order is statement order, then bridge order within a merged
//! statement, then the database's row order — never globally re-sorted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use oxrdf::Triple;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::database::{ResultRow, RowCursor};
use crate::mapping::GraphMapping;
use crate::query_planner::{
    Binding, BindingFilter, CompileError, CompiledQuery, CompiledStatement, Decoder,
    GraphPattern, PatternCompiler, TriplePattern,
};

pub mod errors;
pub mod metrics;
pub mod result_cache;

pub use errors::{ErrorCode, ExecutionError};
pub use metrics::{ExecutionMetrics, MetricsHandle};
pub use result_cache::{CacheMetrics, FindCache, FindCacheConfig};

/// Per-query execution knobs.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Cap on delivered results; `None` streams everything.
    pub limit: Option<u64>,
    /// External deadline for the whole pipeline.
    pub timeout: Option<Duration>,
    /// Bounded channel capacity between producer and consumer.
    pub buffer: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            limit: None,
            timeout: None,
            buffer: 64,
        }
    }
}

/// A lazy, cancellable sequence of query results. Dropping or closing the
/// stream propagates to the producing worker, which closes any open
/// cursor.
#[derive(Debug)]
pub struct ResultStream<T> {
    rx: mpsc::Receiver<Result<T, ExecutionError>>,
    metrics: MetricsHandle,
    _worker: Option<JoinHandle<()>>,
}

pub type TripleStream = ResultStream<Triple>;
pub type BindingStream = ResultStream<Binding>;

impl<T> ResultStream<T> {
    /// Stop consuming early; the producer observes the closed channel on
    /// its next send and shuts down.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Snapshot of the execution counters so far.
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics.snapshot()
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T, ExecutionError>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// What the worker produces and how it deduplicates.
pub trait QueryResultItem: Clone + Send + 'static {
    fn decode(decoder: &Decoder, row: &ResultRow) -> Option<Self>;
    /// Canonical text; the duplicate filter keys on it because SQL
    /// DISTINCT cannot guarantee distinctness of *decoded* results.
    fn dedup_key(&self) -> String;
    fn passes(&self, filters: &[Arc<dyn BindingFilter>]) -> bool;
}

impl QueryResultItem for Triple {
    fn decode(decoder: &Decoder, row: &ResultRow) -> Option<Self> {
        decoder.decode_triple(row)
    }

    fn dedup_key(&self) -> String {
        self.to_string()
    }

    fn passes(&self, _filters: &[Arc<dyn BindingFilter>]) -> bool {
        true
    }
}

impl QueryResultItem for Binding {
    fn decode(decoder: &Decoder, row: &ResultRow) -> Option<Self> {
        decoder.decode_binding(row)
    }

    fn dedup_key(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .map(|(variable, term)| format!("{}={}", variable, term))
            .collect();
        parts.join(";")
    }

    /// Post-join filters run when fully bound; a filter that cannot
    /// evaluate here passes the row through for the consuming engine.
    fn passes(&self, filters: &[Arc<dyn BindingFilter>]) -> bool {
        filters
            .iter()
            .all(|filter| filter.evaluate(self).unwrap_or(true))
    }
}

/// Match a single triple pattern against the mapping. Compilation happens
/// up front (zero statements for provably empty requests); execution is
/// lazy on a spawned worker. Must be called within a tokio runtime.
pub fn find(
    mapping: &GraphMapping,
    pattern: &TriplePattern,
    options: QueryOptions,
) -> Result<TripleStream, CompileError> {
    let compiled = PatternCompiler::new(mapping).compile_find(pattern)?;
    Ok(spawn_worker(compiled, Vec::new(), options, None))
}

/// Match a conjunction of triple patterns, producing variable bindings.
pub fn query(
    mapping: &GraphMapping,
    bgp: &GraphPattern,
    options: QueryOptions,
) -> Result<BindingStream, CompileError> {
    let compiled = PatternCompiler::new(mapping).compile_bgp(bgp)?;
    let mut options = options;
    options.limit = match (options.limit, bgp.limit) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    Ok(spawn_worker(compiled, bgp.filters.clone(), options, None))
}

impl GraphMapping {
    /// Convenience wrapper over [`find`].
    pub fn find(
        &self,
        pattern: &TriplePattern,
        options: QueryOptions,
    ) -> Result<TripleStream, CompileError> {
        find(self, pattern, options)
    }

    /// Convenience wrapper over [`query`].
    pub fn query(
        &self,
        bgp: &GraphPattern,
        options: QueryOptions,
    ) -> Result<BindingStream, CompileError> {
        query(self, bgp, options)
    }
}

/// A mapping fronted by the LRU result cache: at most one compile+execute
/// per distinct triple-match request until [`CachedGraph::invalidate`].
#[derive(Debug)]
pub struct CachedGraph {
    mapping: Arc<GraphMapping>,
    cache: Arc<FindCache>,
}

impl CachedGraph {
    pub fn new(mapping: Arc<GraphMapping>, config: FindCacheConfig) -> Self {
        CachedGraph {
            mapping,
            cache: Arc::new(FindCache::new(config)),
        }
    }

    pub fn with_defaults(mapping: Arc<GraphMapping>) -> Self {
        Self::new(mapping, FindCacheConfig::default())
    }

    pub fn mapping(&self) -> &Arc<GraphMapping> {
        &self.mapping
    }

    /// Like [`find`], but replayed from the cache when this request was
    /// already drained once. Only streams that complete naturally
    /// populate the cache; the request limit is part of the key.
    pub fn find(
        &self,
        pattern: &TriplePattern,
        options: QueryOptions,
    ) -> Result<TripleStream, CompileError> {
        let key = format!("{}|limit={:?}", pattern.cache_key(), options.limit);
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("result cache hit for {}", pattern);
            return Ok(replay(cached, options.buffer));
        }
        let compiled = PatternCompiler::new(&self.mapping).compile_find(pattern)?;
        let cache = Arc::clone(&self.cache);
        let recorder: Recorder<Triple> = Box::new(move |triples| cache.insert(key, triples));
        Ok(spawn_worker(compiled, Vec::new(), options, Some(recorder)))
    }

    /// Explicit invalidation for callers who mutate the database out of
    /// band.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }
}

/// Called with the complete result set when a stream drains naturally.
type Recorder<T> = Box<dyn FnOnce(Vec<T>) + Send>;

fn spawn_worker<T: QueryResultItem>(
    compiled: CompiledQuery,
    filters: Vec<Arc<dyn BindingFilter>>,
    options: QueryOptions,
    recorder: Option<Recorder<T>>,
) -> ResultStream<T> {
    let (tx, rx) = mpsc::channel(options.buffer.max(1));
    let metrics = MetricsHandle::new();
    let worker_metrics = metrics.clone();
    let worker = tokio::spawn(async move {
        run_statements(compiled.statements, filters, options, tx, worker_metrics, recorder).await;
    });
    ResultStream {
        rx,
        metrics,
        _worker: Some(worker),
    }
}

/// Stream a cached result set without touching the compiler or database.
fn replay(triples: Arc<Vec<Triple>>, buffer: usize) -> TripleStream {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let metrics = MetricsHandle::new();
    let worker_metrics = metrics.clone();
    let worker = tokio::spawn(async move {
        for triple in triples.iter() {
            if tx.send(Ok(triple.clone())).await.is_err() {
                return;
            }
            worker_metrics.add_delivered();
        }
    });
    ResultStream {
        rx,
        metrics,
        _worker: Some(worker),
    }
}

enum Flow {
    Continue,
    LimitReached,
    Cancelled,
}

async fn run_statements<T: QueryResultItem>(
    statements: Vec<CompiledStatement>,
    filters: Vec<Arc<dyn BindingFilter>>,
    options: QueryOptions,
    tx: mpsc::Sender<Result<T, ExecutionError>>,
    metrics: MetricsHandle,
    recorder: Option<Recorder<T>>,
) {
    let started = tokio::time::Instant::now();
    let deadline = options.timeout.map(|t| started + t);
    let mut seen: HashSet<String> = HashSet::new();
    let mut delivered: u64 = 0;
    let mut recorded: Vec<T> = Vec::new();
    let record = recorder.is_some();

    'statements: for statement in &statements {
        metrics.add_statement();
        match &statement.sql {
            None => {
                // Constant statement: one empty pseudo-row, no database.
                let row = ResultRow::empty();
                match process_row(
                    &row, statement, &filters, &mut seen, record, &mut recorded, &tx, &metrics,
                    &mut delivered, options.limit,
                )
                .await
                {
                    Flow::Continue => {}
                    Flow::LimitReached => break 'statements,
                    Flow::Cancelled => return,
                }
            }
            Some(sql) => {
                let Some(database) = &statement.database else {
                    continue;
                };
                let connection = database.connection();
                log::debug!("executing: {}", sql);
                let mut cursor = match connection.execute(sql).await {
                    Ok(cursor) => cursor,
                    Err(error) => {
                        let _ = tx.send(Err(ExecutionError::driver(error))).await;
                        return;
                    }
                };
                loop {
                    if let Some(deadline) = deadline {
                        if tokio::time::Instant::now() >= deadline {
                            let _ = tx
                                .send(Err(ExecutionError::Timeout {
                                    elapsed_ms: started.elapsed().as_millis(),
                                }))
                                .await;
                            close_cursor(&mut cursor).await;
                            return;
                        }
                    }
                    let values = match cursor.next_row().await {
                        Ok(Some(values)) => values,
                        Ok(None) => break,
                        Err(error) => {
                            let _ = tx.send(Err(ExecutionError::driver(error))).await;
                            close_cursor(&mut cursor).await;
                            return;
                        }
                    };
                    metrics.add_row();
                    let row = ResultRow::new(Arc::clone(&statement.column_index), values);
                    match process_row(
                        &row, statement, &filters, &mut seen, record, &mut recorded, &tx,
                        &metrics, &mut delivered, options.limit,
                    )
                    .await
                    {
                        Flow::Continue => {}
                        Flow::LimitReached => {
                            close_cursor(&mut cursor).await;
                            break 'statements;
                        }
                        Flow::Cancelled => {
                            close_cursor(&mut cursor).await;
                            return;
                        }
                    }
                }
                close_cursor(&mut cursor).await;
            }
        }
    }

    // Natural completion (including a reached limit, which is part of the
    // request): hand the full answer to the recorder. Cancellation and
    // errors returned above and never record.
    if let Some(recorder) = recorder {
        recorder(recorded);
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_row<T: QueryResultItem>(
    row: &ResultRow,
    statement: &CompiledStatement,
    filters: &[Arc<dyn BindingFilter>],
    seen: &mut HashSet<String>,
    record: bool,
    recorded: &mut Vec<T>,
    tx: &mpsc::Sender<Result<T, ExecutionError>>,
    metrics: &MetricsHandle,
    delivered: &mut u64,
    limit: Option<u64>,
) -> Flow {
    for decoder in &statement.decoders {
        if !decoder.enabled(row) {
            continue;
        }
        let Some(item) = T::decode(decoder, row) else {
            continue;
        };
        if !item.passes(filters) {
            continue;
        }
        if !seen.insert(item.dedup_key()) {
            metrics.add_duplicate();
            continue;
        }
        if record {
            recorded.push(item.clone());
        }
        if tx.send(Ok(item)).await.is_err() {
            return Flow::Cancelled;
        }
        metrics.add_delivered();
        *delivered += 1;
        if let Some(limit) = limit {
            if *delivered >= limit {
                return Flow::LimitReached;
            }
        }
    }
    Flow::Continue
}

async fn close_cursor(cursor: &mut Box<dyn RowCursor>) {
    if let Err(error) = cursor.close().await {
        log::warn!("closing cursor failed: {}", error);
    }
}
