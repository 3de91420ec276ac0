//! rancher-client — minimal client for the Rancher API.
//!
//! Covers the slice of the API an in-service upgrade needs: listing
//! stacks and services by filter, fetching a service by id, and the
//! `upgrade` / `finishupgrade` service actions. Nothing else.
//!
//! The [`RancherApi`] trait is the seam between callers and the wire;
//! [`RancherClient`] is the HTTP implementation, and tests substitute
//! in-memory mocks.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientOpts, DEFAULT_REQUEST_TIMEOUT, RancherClient};
pub use error::{ClientError, ClientResult};
pub use types::*;

/// Operations an upgrade run performs against a Rancher installation.
///
/// Implemented over HTTP by [`RancherClient`] — injected for testability.
#[allow(async_fn_in_trait)]
pub trait RancherApi {
    /// List stacks matching `filters`.
    async fn list_stacks(&self, filters: &StackFilters) -> ClientResult<Vec<Stack>>;

    /// List services matching `filters`.
    async fn list_services(&self, filters: &ServiceFilters) -> ClientResult<Vec<Service>>;

    /// Fetch a single service by id.
    async fn service_by_id(&self, id: &str) -> ClientResult<Service>;

    /// Request an in-service upgrade of service `id`.
    async fn upgrade_service(&self, id: &str, upgrade: &ServiceUpgrade) -> ClientResult<Service>;

    /// Commit a completed upgrade, returning the service to its active state.
    async fn finish_upgrade(&self, id: &str) -> ClientResult<Service>;
}
