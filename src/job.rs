//! Compilation job scheduler.
//!
//! Drives the parse/compile pipeline over a batch of sources on a
//! background tokio task, off the caller's critical path. The caller polls
//! the returned handle for fractional progress, the source currently being
//! read, and accumulated diagnostics. Only one job may be in flight per
//! scheduler; a second `run` is rejected rather than serialized.

use crate::engine::{Interpreter, ScriptBackend};
use crate::error::JobError;
use crate::parser::BlockParser;
use crate::pool::SharedPool;
use crate::registry::ContextRegistry;
use crate::source::ScriptSource;
use crate::translate::Translator;
use crate::unit::Diagnostic;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

/// Progress starts just above the previous source boundary as soon as a
/// source is marked current, before its lines are read.
const READ_EPSILON: f32 = 0.01;

/// One source identity to compile: a path read during the job, or an
/// in-memory source (tests, embedded scripts).
#[derive(Debug, Clone)]
pub enum SourceSpec {
    File(PathBuf),
    Memory(ScriptSource),
}

impl SourceSpec {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceSpec::File(path.into())
    }

    pub fn memory(source: ScriptSource) -> Self {
        SourceSpec::Memory(source)
    }

    fn identity(&self) -> String {
        match self {
            SourceSpec::File(path) => path.display().to_string(),
            SourceSpec::Memory(source) => source.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum JobState {
    Running,
    Completed,
    /// Top-level failure; progress is frozen below 1. Distinct from the
    /// per-method diagnostics, which never fail a job.
    Failed(String),
}

/// Snapshot of a job, serializable for host-side progress UIs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStatus {
    pub progress: f32,
    pub current_source: Option<String>,
    pub state: JobState,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            progress: 0.0,
            current_source: None,
            state: JobState::Running,
            diagnostics: Vec::new(),
        }
    }
}

/// Handle to a running (or finished) job.
pub struct JobHandle {
    status: Arc<RwLock<JobStatus>>,
    join: tokio::task::JoinHandle<()>,
}

impl JobHandle {
    pub async fn status(&self) -> JobStatus {
        self.status.read().await.clone()
    }

    pub async fn progress(&self) -> f32 {
        self.status.read().await.progress
    }

    /// Waits for the job task to finish and returns the final status.
    pub async fn wait(self) -> JobStatus {
        // The task never panics in normal operation; a join error is
        // reported as a job failure rather than propagated.
        if let Err(e) = self.join.await {
            let mut status = self.status.write().await;
            status.state = JobState::Failed(format!("job task aborted: {}", e));
        }
        self.status.read().await.clone()
    }
}

/// Clears the in-flight flag when the job task ends, including by panic,
/// so an aborted job never wedges the scheduler in AlreadyRunning.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the pieces a job needs and guards against overlapping runs.
pub struct CompileScheduler {
    pool: SharedPool,
    registry: Arc<ContextRegistry>,
    translator: Arc<Translator>,
    backend: Arc<dyn ScriptBackend>,
    in_flight: Arc<AtomicBool>,
    register_tx: broadcast::Sender<String>,
}

impl CompileScheduler {
    pub fn new(pool: SharedPool, registry: Arc<ContextRegistry>) -> Self {
        let (register_tx, _) = broadcast::channel(64);
        Self {
            pool,
            registry,
            translator: Arc::new(Translator::new()),
            backend: Arc::new(Interpreter::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            register_tx,
        }
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ScriptBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Subscribers receive the pool key of every object entry as it is
    /// inserted during a job.
    pub fn subscribe_registrations(&self) -> broadcast::Receiver<String> {
        self.register_tx.subscribe()
    }

    /// Starts a job over `sources`, additive to the current pool contents.
    pub fn run(&self, sources: Vec<SourceSpec>) -> Result<JobHandle, JobError> {
        self.start(sources, false)
    }

    /// Full recompile: clears the pool before compiling.
    pub fn run_full(&self, sources: Vec<SourceSpec>) -> Result<JobHandle, JobError> {
        self.start(sources, true)
    }

    fn start(&self, sources: Vec<SourceSpec>, clear_first: bool) -> Result<JobHandle, JobError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(JobError::AlreadyRunning);
        }

        let status = Arc::new(RwLock::new(JobStatus::default()));
        let task_status = Arc::clone(&status);
        let pool = Arc::clone(&self.pool);
        let registry = Arc::clone(&self.registry);
        let translator = Arc::clone(&self.translator);
        let backend = Arc::clone(&self.backend);
        let in_flight = Arc::clone(&self.in_flight);
        let register_tx = self.register_tx.clone();

        let join = tokio::spawn(async move {
            let _in_flight = InFlightGuard(in_flight);
            info!(sources = sources.len(), "compilation job started");
            let result = execute_job(
                &sources,
                clear_first,
                &pool,
                &registry,
                &translator,
                backend.as_ref(),
                &register_tx,
                &task_status,
            )
            .await;

            let mut status = task_status.write().await;
            match result {
                Ok(()) => {
                    status.progress = 1.0;
                    status.current_source = None;
                    status.state = JobState::Completed;
                    info!(
                        diagnostics = status.diagnostics.len(),
                        "compilation job completed"
                    );
                }
                Err(reason) => {
                    // Progress stays frozen below 1.
                    status.state = JobState::Failed(reason.clone());
                    warn!(reason = %reason, "compilation job failed");
                }
            }
        });

        Ok(JobHandle { status, join })
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_job(
    sources: &[SourceSpec],
    clear_first: bool,
    pool: &SharedPool,
    registry: &ContextRegistry,
    translator: &Translator,
    backend: &dyn ScriptBackend,
    register_tx: &broadcast::Sender<String>,
    status: &Arc<RwLock<JobStatus>>,
) -> Result<(), String> {
    if clear_first {
        pool.write().await.clear();
    }

    let count = sources.len();
    for (index, spec) in sources.iter().enumerate() {
        let identity = spec.identity();
        {
            let mut status = status.write().await;
            status.current_source = Some(identity.clone());
            status.progress = (index as f32 + READ_EPSILON) / count as f32;
        }

        let source = match spec {
            SourceSpec::File(path) => ScriptSource::read(path)
                .await
                .map_err(|e| format!("failed to read '{}': {}", identity, e))?,
            SourceSpec::Memory(source) => source.clone(),
        };
        status.write().await.progress = (index as f32 + 0.5) / count as f32;

        let parser = BlockParser::new(translator, registry, backend);
        let outcome = parser.parse_source(&source);

        let mut inserted = Vec::new();
        {
            let mut pool = pool.write().await;
            let mut status = status.write().await;
            status.diagnostics.extend(outcome.diagnostics);
            for entry in outcome.objects {
                let key = entry.key();
                match pool.insert(Arc::new(entry)) {
                    Ok(()) => inserted.push(key),
                    Err(e) => {
                        warn!(key = %key, source = %identity, "duplicate object key");
                        status
                            .diagnostics
                            .push(Diagnostic::error(e.to_string()).with_source(identity.as_str()));
                    }
                }
            }
        }
        for key in inserted {
            // No receivers is fine; registration events are best-effort.
            let _ = register_tx.send(key);
        }

        status.write().await.progress = (index as f32 + 1.0) / count as f32;
    }
    Ok(())
}
