//! Wire types for the subset of the Rancher API the upgrade flow touches.
//!
//! Field names follow the Rancher JSON convention (camelCase). Launch
//! configurations are opaque `serde_json::Value` payloads: the upgrade
//! flow copies them into the upgrade request unmodified, so nothing here
//! depends on their shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope for Rancher collection responses
/// (`{"type": "collection", "data": [...]}`). Only `data` is read.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(default)]
    pub data: Vec<T>,
}

// ── Resources ──────────────────────────────────────────────────────

/// A Rancher stack — the named grouping services live under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,
    pub name: String,
}

/// A Rancher service as returned by the API.
///
/// `state` is the free-form orchestration state string (`"active"`,
/// `"upgrading"`, `"upgraded"`, ...). Unknown response fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub state: String,
    /// Primary launch configuration (image, env, ports), passed through opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<Value>,
    /// Sidekick launch configurations, passed through opaque.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_launch_configs: Vec<Value>,
}

// ── Filters ────────────────────────────────────────────────────────

/// Query filters for a service listing.
///
/// Serializes to the query parameters Rancher expects; `stackId` is
/// omitted entirely when no stack scope applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFilters {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
}

/// Query filters for a stack listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFilters {
    pub name: String,
    /// Environment name, used only to disambiguate stacks sharing a name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

// ── Upgrade payloads ───────────────────────────────────────────────

/// Body of a service `upgrade` action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpgrade {
    pub in_service_strategy: InServiceStrategy,
}

/// Parameters of an in-service (rolling) upgrade.
///
/// Launch configurations are copied verbatim from the service being
/// upgraded; the remaining fields control how instances are replaced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InServiceStrategy {
    /// Instances replaced per batch.
    pub batch_size: u64,
    /// Pause between batches, in milliseconds.
    pub interval_millis: u64,
    /// Start replacement containers before stopping the old ones.
    pub start_first: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<Value>,
    pub secondary_launch_configs: Vec<Value>,
}
