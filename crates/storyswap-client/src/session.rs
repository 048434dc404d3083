//! Session resolution as an injected capability.
//!
//! Identity is passed explicitly to whatever needs it instead of being
//! looked up from ambient shared state, so tests can substitute a fake
//! session without touching anything process-wide.

use async_trait::async_trait;
use tracing::{debug, warn};

use storyswap_core::Session;

use crate::http::ApiClient;

/// Resolves the authenticated identity from the stored credential.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the session, or `None` when there is no usable credential.
    ///
    /// Failures are logged and swallowed; there is no retry. A `None`
    /// leaves the conversation stuck in its first gate.
    async fn resolve(&self) -> Option<Session>;
}

/// Production provider backed by the profile endpoint.
#[derive(Debug, Clone)]
pub struct ApiSessionProvider {
    api: ApiClient,
}

impl ApiSessionProvider {
    /// Wrap an API client carrying the bearer token.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SessionProvider for ApiSessionProvider {
    async fn resolve(&self) -> Option<Session> {
        if self.api.token().is_none() {
            debug!("no stored credential, session unresolved");
            return None;
        }

        match self.api.profile().await {
            Ok(profile) => Some(profile.into()),
            Err(e) => {
                warn!(error = %e, "failed to resolve session");
                None
            }
        }
    }
}
