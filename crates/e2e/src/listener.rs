//! Test listeners
//!
//! Listeners observe each tuple's lifecycle through the worker context's
//! read accessors. They never influence a test's outcome.

use std::time::Duration;

use async_trait::async_trait;
use gridrun_common::{CapabilityTuple, SessionId};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::runner::TestResult;
use crate::storage::rest_url;
use crate::worker::{AuthenticationProvider, SessionIdProvider};

/// What a listener may read from a worker
pub trait ListenerContext: SessionIdProvider + AuthenticationProvider + Sync {}

impl<T: SessionIdProvider + AuthenticationProvider + Sync> ListenerContext for T {}

#[async_trait]
pub trait TestListener: Send + Sync {
    async fn on_test_start(&self, _tuple: &CapabilityTuple) {}

    async fn on_test_finish(&self, ctx: &dyn ListenerContext, result: &TestResult);
}

/// Prints the session/job line CI plugins scrape from stdout
#[derive(Debug, Default)]
pub struct SessionIdLogger;

#[async_trait]
impl TestListener for SessionIdLogger {
    async fn on_test_finish(&self, ctx: &dyn ListenerContext, result: &TestResult) {
        if let Some(id) = ctx.session_id() {
            println!("{}", session_line(id, &result.name));
        }
    }
}

/// The exact line CI plugins match to link a build to its grid job
pub fn session_line(id: &SessionId, job_name: &str) -> String {
    format!("SauceOnDemandSessionID={} job-name={}", id, job_name)
}

#[derive(Serialize)]
struct JobUpdate {
    passed: bool,
}

/// Marks the grid job passed or failed through the job REST API
pub struct JobStatusReporter {
    client: reqwest::Client,
    rest_endpoint: String,
}

impl JobStatusReporter {
    pub fn new(rest_endpoint: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rest_endpoint: rest_endpoint.into(),
        })
    }

    async fn publish(&self, ctx: &dyn ListenerContext, passed: bool) -> E2eResult<()> {
        let Some(id) = ctx.session_id() else {
            debug!("No session to report on");
            return Ok(());
        };
        let creds = ctx.credentials();
        let url = rest_url(
            &self.rest_endpoint,
            &["rest", "v1", &creds.username, "jobs", id.as_str()],
        )?;

        let response = self
            .client
            .put(url)
            .basic_auth(&creds.username, Some(&creds.access_key))
            .json(&JobUpdate { passed })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::Reporting(format!("job {} update returned {}", id, status)));
        }
        debug!("Job {} marked passed={}", id, passed);
        Ok(())
    }
}

#[async_trait]
impl TestListener for JobStatusReporter {
    async fn on_test_finish(&self, ctx: &dyn ListenerContext, result: &TestResult) {
        if let Err(e) = self.publish(ctx, result.success).await {
            warn!("Could not report status of {}: {}", result.name, e);
        }
    }
}
