//! Session factory and session handles

use std::sync::Arc;

use gridrun_common::{Capabilities, CapabilityTuple, Error, HarnessConfig, SessionId};
use tracing::{debug, info, warn};

use crate::error::E2eResult;
use crate::uploader::ArtifactReference;
use crate::webdriver::{GridEndpoint, SessionDriver};

/// A live remote session.
///
/// Call [`SessionHandle::quit`] to close it. A handle dropped while still open
/// schedules a best-effort close on the current runtime.
pub struct SessionHandle {
    id: SessionId,
    endpoint: GridEndpoint,
    driver: Arc<dyn SessionDriver>,
    open: bool,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn endpoint(&self) -> &GridEndpoint {
        &self.endpoint
    }

    /// Close the remote session
    pub async fn quit(mut self) -> E2eResult<()> {
        self.open = false;
        info!("Closing session {}", self.id);
        self.driver.delete_session(&self.endpoint, &self.id).await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("open", &self.open)
            .finish()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        warn!("Session {} dropped without quit; closing in background", self.id);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available to close session {}", self.id);
            return;
        };
        let driver = self.driver.clone();
        let endpoint = self.endpoint.clone();
        let id = self.id.clone();
        runtime.spawn(async move {
            if let Err(e) = driver.delete_session(&endpoint, &id).await {
                warn!("Background close of session {} failed: {}", id, e);
            }
        });
    }
}

/// Builds capability sets and opens sessions against the resolved endpoint
pub struct SessionFactory {
    driver: Arc<dyn SessionDriver>,
    endpoint: GridEndpoint,
    build_tag: Option<String>,
}

impl SessionFactory {
    pub fn new(driver: Arc<dyn SessionDriver>, endpoint: GridEndpoint, build_tag: Option<String>) -> Self {
        Self {
            driver,
            endpoint,
            build_tag,
        }
    }

    pub fn from_config(driver: Arc<dyn SessionDriver>, config: &HarnessConfig) -> Self {
        Self::new(driver, GridEndpoint::resolve(config), config.build_tag.clone())
    }

    pub fn endpoint(&self) -> &GridEndpoint {
        &self.endpoint
    }

    /// Capability set for one tuple
    pub fn capabilities(&self, tuple: &CapabilityTuple, artifact: &ArtifactReference) -> E2eResult<Capabilities> {
        let app = artifact.remote_uri().ok_or_else(|| {
            Error::InvalidConfig(format!("artifact {} has not been uploaded", artifact.local_path().display()))
        })?;
        Ok(Capabilities::from_tuple(tuple, app, self.build_tag.as_deref()))
    }

    /// Open a session for `tuple`. Failures are not retried.
    pub async fn create_session(
        &self,
        tuple: &CapabilityTuple,
        artifact: &ArtifactReference,
    ) -> E2eResult<SessionHandle> {
        let capabilities = self.capabilities(tuple, artifact)?;
        debug!("Requesting session for {}", tuple);

        let id = self.driver.create_session(&self.endpoint, &capabilities).await?;
        info!("Session {} opened for {}", id, tuple);

        Ok(SessionHandle {
            id,
            endpoint: self.endpoint.clone(),
            driver: self.driver.clone(),
            open: true,
        })
    }
}
