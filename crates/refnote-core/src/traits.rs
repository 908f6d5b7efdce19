//! Collaborator traits injected by the hosting application.
//!
//! Authentication and profile lookup are external concerns: the api crate
//! receives implementations at construction time and the library never
//! probes for them at runtime. The "absent" arm of an optional collaborator
//! is an explicit no-op implementation, not a dynamic fallback.

use async_trait::async_trait;
use http::HeaderMap;

use crate::error::Result;
use crate::models::UserProfile;

/// Resolves the calling user's ID from request headers.
///
/// Returning `Ok(None)` means the caller is unauthenticated; write
/// operations map that to a 401 response.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<String>>;
}

/// Looks up author display information for note enrichment.
///
/// Failures are absorbed by callers: a note whose author cannot be resolved
/// renders with the "Unknown User" placeholder, never as a fetch failure.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, author_id: &str) -> Result<Option<UserProfile>>;
}

/// Profile lookup that resolves nobody.
///
/// Used when the hosting application provides no profile service; every
/// note renders with placeholder author fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProfileLookup;

#[async_trait]
impl ProfileLookup for NullProfileLookup {
    async fn lookup(&self, _author_id: &str) -> Result<Option<UserProfile>> {
        Ok(None)
    }
}
