//! In-service upgrade lifecycle for Rancher services.
//!
//! Drives a single service through one rolling upgrade: resolve the
//! target (optionally scoped to a stack), request an in-service upgrade
//! that reuses the service's own launch configuration, poll until the
//! service reports the `upgraded` state, then commit the result with
//! `finishupgrade`. Every run is one-shot: any failure along the way
//! aborts it, and nothing is retried or rolled back.
//!
//! # Components
//!
//! - **`target`** — Parsing of `name` / `stack/name` service references
//! - **`config`** — Per-run configuration and duration flag parsing
//! - **`deploy`** — The deploy controller that executes the lifecycle

pub mod config;
pub mod deploy;
pub mod target;

pub use config::{DEFAULT_UPGRADE_TIMEOUT, DeployConfig, POLL_INTERVAL};
pub use deploy::{Deploy, DeployError, DeployResult, STATE_UPGRADED, upgrade_request};
pub use target::Target;
