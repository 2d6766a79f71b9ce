//! Main test runner that orchestrates upload, workers, sessions and listeners

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use gridrun_common::{CapabilityTuple, Credentials, HarnessConfig, SessionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::listener::{JobStatusReporter, SessionIdLogger, TestListener};
use crate::matrix::Matrix;
use crate::session::{SessionFactory, SessionHandle};
use crate::storage::{ArtifactStore, SauceStorage};
use crate::uploader::{ArtifactReference, ArtifactUploader};
use crate::webdriver::{SessionDriver, WebDriverClient};
use crate::worker::WorkerContext;

/// The body of a test, run once per matrix tuple against an open session
#[async_trait]
pub trait TestBody: Send + Sync {
    async fn run(&self, session: &SessionHandle) -> E2eResult<()>;
}

/// Verifies the app launches: the session is opened and closed by the runner
#[derive(Debug, Default)]
pub struct LaunchTest;

#[async_trait]
impl TestBody for LaunchTest {
    async fn run(&self, session: &SessionHandle) -> E2eResult<()> {
        debug!("Session {} launched", session.id());
        Ok(())
    }
}

/// A named test body; the name becomes the session's job name
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    pub body: Arc<dyn TestBody>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, body: impl TestBody + 'static) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }
}

/// Result of running a single tuple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub device: CapabilityTuple,
    pub session_id: Option<SessionId>,
    pub worker: usize,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Result of running all tuples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub artifact: String,
    pub results: Vec<TestResult>,
}

struct Job {
    index: usize,
    tuple: CapabilityTuple,
    body: Arc<dyn TestBody>,
}

struct RunState {
    factory: Arc<SessionFactory>,
    listeners: Vec<Arc<dyn TestListener>>,
    artifact: ArtifactReference,
    queue: Mutex<VecDeque<Job>>,
}

/// Main device-grid test runner
pub struct TestRunner {
    config: HarnessConfig,
    credentials: Arc<Credentials>,
    matrix: Matrix,
    uploader: ArtifactUploader,
    factory: Arc<SessionFactory>,
    listeners: Vec<Arc<dyn TestListener>>,
    output_dir: PathBuf,
}

impl TestRunner {
    /// Create a runner talking to the real storage API and grid
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let timeout = config.request_timeout;
        let store = Arc::new(SauceStorage::new(
            config.rest_endpoint.clone(),
            config.credentials.clone(),
            timeout,
        )?);
        let driver = Arc::new(WebDriverClient::new(timeout)?);
        let reporter = Arc::new(JobStatusReporter::new(config.rest_endpoint.clone(), timeout)?);

        Ok(Self::with_parts(config, store, driver)
            .with_listener(Arc::new(SessionIdLogger))
            .with_listener(reporter))
    }

    /// Create a runner over arbitrary storage and grid transports
    pub fn with_parts(
        config: HarnessConfig,
        store: Arc<dyn ArtifactStore>,
        driver: Arc<dyn SessionDriver>,
    ) -> Self {
        let factory = Arc::new(SessionFactory::from_config(driver, &config));
        Self {
            credentials: Arc::new(config.credentials.clone()),
            config,
            matrix: Matrix::hard_coded(),
            uploader: ArtifactUploader::new(store),
            factory,
            listeners: Vec::new(),
            output_dir: PathBuf::from("test-results"),
        }
    }

    pub fn with_matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TestListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Upload and verify the artifact. Runs once; later calls reuse the result.
    pub async fn pre_run(&self) -> E2eResult<ArtifactReference> {
        self.uploader
            .upload(self.config.artifact_path.as_deref())
            .await
    }

    /// Run every case against every device in the matrix
    pub async fn run(&self, cases: &[TestCase]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();

        // nothing may reach the grid before the artifact is verified
        let artifact = self.pre_run().await?;

        let jobs: VecDeque<Job> = cases
            .iter()
            .flat_map(|case| {
                self.matrix
                    .enumerate(&case.name)
                    .into_iter()
                    .map(move |tuple| (tuple, case.body.clone()))
            })
            .enumerate()
            .map(|(index, (tuple, body))| Job { index, tuple, body })
            .collect();
        let total = jobs.len();
        let workers = self.config.workers.clamp(1, total.max(1));

        info!("Running {} test(s) on {} worker(s)...", total, workers);

        let state = Arc::new(RunState {
            factory: self.factory.clone(),
            listeners: self.listeners.clone(),
            artifact: artifact.clone(),
            queue: Mutex::new(jobs),
        });

        let handles: Vec<_> = (0..workers)
            .map(|worker| tokio::spawn(worker_loop(worker, state.clone(), self.credentials.clone())))
            .collect();

        let mut indexed = Vec::with_capacity(total);
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(done) => indexed.extend(done),
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<TestResult> = indexed.into_iter().map(|(_, result)| result).collect();

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let skipped = total - results.len();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(TestSuiteResult {
            total,
            passed,
            failed,
            skipped,
            duration_ms,
            artifact: artifact.to_string(),
            results,
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn worker_loop(
    worker: usize,
    state: Arc<RunState>,
    credentials: Arc<Credentials>,
) -> Vec<(usize, TestResult)> {
    let mut ctx = WorkerContext::new(worker, credentials);
    let mut results = Vec::new();

    loop {
        let job = state.queue.lock().pop_front();
        let Some(job) = job else {
            break;
        };
        let index = job.index;
        results.push((index, run_job(&mut ctx, &state, job).await));
    }

    results
}

async fn run_job(ctx: &mut WorkerContext, state: &RunState, job: Job) -> TestResult {
    let start = Instant::now();

    for listener in &state.listeners {
        listener.on_test_start(&job.tuple).await;
    }

    if let Some(stale) = ctx.clear() {
        warn!("Worker {} still held session {}; closing it", ctx.worker(), stale.id());
        if let Err(e) = stale.quit().await {
            warn!("Closing stale session failed: {}", e);
        }
    }

    let outcome = run_body(ctx, state, &job).await;

    let result = TestResult {
        name: job.tuple.test_name.clone(),
        device: job.tuple.clone(),
        session_id: ctx.id().cloned(),
        worker: ctx.worker(),
        success: outcome.is_ok(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: outcome.err().map(|e| e.to_string()),
        finished_at: Utc::now(),
    };

    match &result.error {
        None => info!("✓ {} ({} ms)", job.tuple, result.duration_ms),
        Some(e) => error!("✗ {} - {}", job.tuple, e),
    }

    for listener in &state.listeners {
        listener.on_test_finish(&*ctx, &result).await;
    }

    result
}

async fn run_body(ctx: &mut WorkerContext, state: &RunState, job: &Job) -> E2eResult<()> {
    let handle = state.factory.create_session(&job.tuple, &state.artifact).await?;
    if let Some(displaced) = ctx.set(handle) {
        if let Err(e) = displaced.quit().await {
            warn!("Closing displaced session failed: {}", e);
        }
    }

    // a panicking body fails its own tuple, not the worker
    let outcome = match ctx.get() {
        Some(session) => AssertUnwindSafe(job.body.run(session))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(E2eError::AssertionFailed(panic_message(panic.as_ref())))),
        None => Err(E2eError::SessionCreation("session missing from worker context".into())),
    };

    // close on every path, then report the body's failure ahead of the close's
    let closed = ctx.close_current().await;
    match (outcome, closed) {
        (Err(e), Err(close)) => {
            warn!("Session close after failure also failed: {}", close);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test body panicked".to_string()
    }
}
