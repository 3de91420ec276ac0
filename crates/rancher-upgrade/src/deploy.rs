//! Deploy controller — drives one service through the upgrade lifecycle.
//!
//! The controller resolves the target to a service record, requests an
//! in-service upgrade built from that record, polls until the service
//! reports the `upgraded` state, and commits with `finishupgrade`. Each
//! step runs once; the first failure aborts the run.

use thiserror::Error;
use tracing::{debug, info};

use rancher_client::{
    ClientError, InServiceStrategy, RancherApi, Service, ServiceFilters, ServiceUpgrade,
    StackFilters,
};

use crate::config::DeployConfig;
use crate::target::Target;

/// Service state that marks an upgrade as complete server-side.
pub const STATE_UPGRADED: &str = "upgraded";

/// Instances replaced per upgrade batch.
const UPGRADE_BATCH_SIZE: u64 = 1;
/// Pause between upgrade batches, in milliseconds.
const UPGRADE_INTERVAL_MILLIS: u64 = 1000;
/// Whether replacement containers start before the old ones stop.
const UPGRADE_START_FIRST: bool = false;

/// Result type for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that abort an upgrade run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("couldn't retrieve stack list: {0}")]
    StackList(#[source] ClientError),

    #[error("couldn't retrieve service list: {0}")]
    ServiceList(#[source] ClientError),

    #[error("stack {0} not found")]
    StackNotFound(String),

    #[error("service {0} not found")]
    ServiceNotFound(String),

    #[error("couldn't upgrade service {service}: {source}")]
    UpgradeRequest {
        service: String,
        #[source]
        source: ClientError,
    },

    #[error("couldn't retrieve service {id}: {source}")]
    StatusFetch {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("couldn't finish upgrade of service {service}: {source}")]
    FinishUpgrade {
        service: String,
        #[source]
        source: ClientError,
    },

    #[error("timeout exceeded waiting for service {0} to upgrade")]
    Timeout(String),
}

/// Executes one upgrade run against a Rancher API.
///
/// Generic over the API so tests can drive the lifecycle against an
/// in-memory implementation.
pub struct Deploy<C> {
    client: C,
    config: DeployConfig,
}

impl<C: RancherApi> Deploy<C> {
    /// A controller for one run over the given client and configuration.
    pub fn new(client: C, config: DeployConfig) -> Self {
        Self { client, config }
    }

    fn target(&self) -> &Target {
        &self.config.target
    }

    /// Run the full lifecycle: resolve, upgrade, wait, finish.
    pub async fn run(&self) -> DeployResult<()> {
        let service = self.resolve().await?;
        self.upgrade(&service).await?;
        let upgraded = self.wait_until_upgraded(&service.id).await?;
        self.finish(&upgraded).await
    }

    /// Resolve the target to a service record.
    ///
    /// A stack-scoped target looks the stack up first and constrains the
    /// service query to it. Zero matches fail the run; on multiple
    /// matches the first record returned wins.
    pub async fn resolve(&self) -> DeployResult<Service> {
        let filters = self.service_filters().await?;
        let services = self
            .client
            .list_services(&filters)
            .await
            .map_err(DeployError::ServiceList)?;
        let service = services
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::ServiceNotFound(self.target().service.clone()))?;
        info!(
            service = %service.name,
            id = %service.id,
            state = %service.state,
            "resolved service"
        );
        Ok(service)
    }

    /// Build the service query, resolving the stack first when the
    /// target names one.
    async fn service_filters(&self) -> DeployResult<ServiceFilters> {
        let target = self.target();
        let Some(stack_name) = &target.stack else {
            return Ok(ServiceFilters {
                name: target.service.clone(),
                stack_id: None,
            });
        };

        let filters = StackFilters {
            name: stack_name.clone(),
            env: target.env.clone(),
        };
        let stacks = self
            .client
            .list_stacks(&filters)
            .await
            .map_err(DeployError::StackList)?;
        let stack = stacks
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::StackNotFound(stack_name.clone()))?;
        debug!(stack = %stack.name, id = %stack.id, "resolved stack");

        Ok(ServiceFilters {
            name: target.service.clone(),
            stack_id: Some(stack.id),
        })
    }

    /// Request an in-service upgrade of `service`.
    pub async fn upgrade(&self, service: &Service) -> DeployResult<()> {
        let upgrade = upgrade_request(service);
        self.client
            .upgrade_service(&service.id, &upgrade)
            .await
            .map_err(|source| DeployError::UpgradeRequest {
                service: service.name.clone(),
                source,
            })?;
        info!(
            service = %service.name,
            id = %service.id,
            image = %self.config.docker_image,
            "upgrade requested"
        );
        Ok(())
    }

    /// Poll the service until it reports [`STATE_UPGRADED`], bounded by
    /// the configured timeout.
    ///
    /// The first poll happens one interval after the upgrade request,
    /// giving Rancher time to leave the initial state. Intermediate
    /// states are not interpreted, so a stuck upgrade surfaces only as
    /// a timeout.
    pub async fn wait_until_upgraded(&self, service_id: &str) -> DeployResult<Service> {
        let name = &self.target().service;
        info!(service = %name, id = %service_id, "upgrading");

        let poll = async {
            loop {
                tokio::time::sleep(self.config.poll_interval).await;
                let service = self
                    .client
                    .service_by_id(service_id)
                    .await
                    .map_err(|source| DeployError::StatusFetch {
                        id: service_id.to_string(),
                        source,
                    })?;
                if service.state == STATE_UPGRADED {
                    info!(service = %name, id = %service_id, "done");
                    return Ok(service);
                }
                debug!(service = %name, state = %service.state, "waiting for upgrade");
            }
        };

        match tokio::time::timeout(self.config.upgrade_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(DeployError::Timeout(name.clone())),
        }
    }

    /// Commit a completed upgrade.
    pub async fn finish(&self, service: &Service) -> DeployResult<()> {
        self.client
            .finish_upgrade(&service.id)
            .await
            .map_err(|source| DeployError::FinishUpgrade {
                service: service.name.clone(),
                source,
            })?;
        info!(service = %service.name, id = %service.id, "upgrade finished");
        Ok(())
    }
}

/// Build the upgrade request for `service`.
///
/// The strategy is fixed: one instance per batch, one second between
/// batches, old containers stop before replacements start. The
/// service's launch configurations are copied into the request
/// verbatim.
pub fn upgrade_request(service: &Service) -> ServiceUpgrade {
    ServiceUpgrade {
        in_service_strategy: InServiceStrategy {
            batch_size: UPGRADE_BATCH_SIZE,
            interval_millis: UPGRADE_INTERVAL_MILLIS,
            start_first: UPGRADE_START_FIRST,
            launch_config: service.launch_config.clone(),
            secondary_launch_configs: service.secondary_launch_configs.clone(),
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
