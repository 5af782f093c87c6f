//! Issue tracker port for batch-fetching issue data.

use std::future::Future;
use std::pin::Pin;

use crate::error::PortError;
use crate::issue::{IssueRecord, TrackerKind};

/// Boxed future returned by [`TrackerClient::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<IssueRecord>, PortError>> + Send + 'a>>;

/// Reads issue data from one external tracker.
///
/// Abstracting the tracker lets the resolver's cache and retry behaviour
/// be exercised without network access.
pub trait TrackerClient: Send + Sync {
    /// The tracker this client talks to.
    fn kind(&self) -> TrackerKind;

    /// Whether an API key is configured. Without one no request is made.
    fn has_credentials(&self) -> bool;

    /// Fetches every issue in `ids` with a single request.
    ///
    /// Issues unknown to the tracker are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, auth, bad response).
    fn fetch(&self, ids: &[String]) -> FetchFuture<'_>;
}

impl<T: TrackerClient + ?Sized> TrackerClient for std::sync::Arc<T> {
    fn kind(&self) -> TrackerKind {
        (**self).kind()
    }

    fn has_credentials(&self) -> bool {
        (**self).has_credentials()
    }

    fn fetch(&self, ids: &[String]) -> FetchFuture<'_> {
        (**self).fetch(ids)
    }
}
