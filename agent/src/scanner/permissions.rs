//! Background revocation of the deployment backend's asset permissions.
//!
//! The backend is granted `Commit` on a canister's asset storage for the
//! duration of a deployment. A scan narrows the user's canisters to those the
//! user controls, where the backend still holds `Commit`, and where no
//! deployment is running, then revokes the grant on each survivor.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candid::Principal;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::errors::AgentError;
use crate::ic::assets::AssetStorage;
use crate::ic::management::ManagementApi;
use crate::ic::types::Permission;
use crate::models::canister::{Canister, CanisterRecordId};

/// Source of the user's canisters
#[async_trait]
pub trait CanisterRegistry: Send + Sync {
    async fn list_canisters(&self) -> Result<Vec<Canister>, AgentError>;
}

/// Deployment activity lookup, keyed by the canister's database id
#[async_trait]
pub trait DeploymentMonitor: Send + Sync {
    async fn is_deployment_running(&self, canister: &CanisterRecordId) -> Result<bool, AgentError>;
}

/// Outcome of one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Canisters returned by the registry
    pub discovered: usize,
    /// Canisters the user controls
    pub controlled: usize,
    /// Controlled canisters where the backend holds `Commit`
    pub permitted: usize,
    /// Permitted canisters with no running deployment
    pub idle: usize,
    pub revoked: Vec<Principal>,
    pub revoke_failures: Vec<Principal>,
    /// Set when the scan stopped before completing
    pub aborted: Option<String>,
}

impl ScanReport {
    fn started(run_id: String) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            started_at: now,
            finished_at: now,
            discovered: 0,
            controlled: 0,
            permitted: 0,
            idle: 0,
            revoked: Vec::new(),
            revoke_failures: Vec::new(),
            aborted: None,
        }
    }
}

type InFlight = Shared<BoxFuture<'static, ScanReport>>;

/// Permission scanner; at most one scan runs at a time
pub struct PermissionScanner {
    registry: Arc<dyn CanisterRegistry>,
    management: Arc<dyn ManagementApi>,
    assets: Arc<dyn AssetStorage>,
    monitor: Arc<dyn DeploymentMonitor>,
    backend_principal: Principal,
    in_flight: Mutex<Option<InFlight>>,
    last_report: Mutex<Option<ScanReport>>,
}

impl PermissionScanner {
    pub fn new(
        registry: Arc<dyn CanisterRegistry>,
        management: Arc<dyn ManagementApi>,
        assets: Arc<dyn AssetStorage>,
        monitor: Arc<dyn DeploymentMonitor>,
        backend_principal: Principal,
    ) -> Self {
        Self {
            registry,
            management,
            assets,
            monitor,
            backend_principal,
            in_flight: Mutex::new(None),
            last_report: Mutex::new(None),
        }
    }

    pub fn backend_principal(&self) -> Principal {
        self.backend_principal
    }

    /// Report of the last completed scan
    pub fn last_report(&self) -> Option<ScanReport> {
        self.last_report.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run a scan, or join the one already in flight
    pub async fn run(self: &Arc<Self>) -> ScanReport {
        let scan = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(scan) => {
                    debug!("Permission scan already in flight, joining it");
                    scan.clone()
                }
                None => {
                    let this = Arc::clone(self);
                    let scan = async move { this.scan().await }.boxed().shared();
                    *slot = Some(scan.clone());
                    scan
                }
            }
        };

        let report = scan.clone().await;

        let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&scan)) {
            *slot = None;
            *self.last_report.lock().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        }
        report
    }

    async fn scan(&self) -> ScanReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("permission_scan", run_id = %run_id);
        let mut report = ScanReport::started(run_id);

        async {
            if let Err(e) = self.scan_impl(&mut report).await {
                error!("Permission scan aborted: {}", e);
                report.aborted = Some(e.to_string());
            }
        }
        .instrument(span)
        .await;

        report.finished_at = Utc::now();
        report
    }

    async fn scan_impl(&self, report: &mut ScanReport) -> Result<(), AgentError> {
        info!("Starting permission scan...");

        let canisters = self.registry.list_canisters().await?;
        report.discovered = canisters.len();

        let controlled = self.filter_controlled(canisters).await;
        report.controlled = controlled.len();

        let permitted = self.filter_backend_permitted(controlled).await;
        report.permitted = permitted.len();

        let idle = self.filter_idle(permitted).await;
        report.idle = idle.len();

        for canister in idle {
            match self
                .assets
                .revoke_permission(canister.ic_canister_id, self.backend_principal, Permission::Commit)
                .await
            {
                Ok(()) => {
                    info!("Revoked backend commit permission on {}", canister.ic_canister_id);
                    report.revoked.push(canister.ic_canister_id);
                }
                Err(e) => {
                    warn!("Failed to revoke commit permission on {}: {}", canister.ic_canister_id, e);
                    report.revoke_failures.push(canister.ic_canister_id);
                }
            }
        }

        info!(
            "Permission scan complete: {} discovered, {} controlled, {} permitted, {} idle, {} revoked",
            report.discovered,
            report.controlled,
            report.permitted,
            report.idle,
            report.revoked.len()
        );
        Ok(())
    }

    /// Canisters whose status the user's identity may read, i.e. controls
    async fn filter_controlled(&self, canisters: Vec<Canister>) -> Vec<Canister> {
        let mut kept = Vec::new();
        for canister in canisters {
            match self.management.canister_status(canister.ic_canister_id).await {
                Ok(_) => kept.push(canister),
                Err(e) => debug!("{} is not controlled by the user: {}", canister.ic_canister_id, e),
            }
        }
        kept
    }

    /// Canisters where the backend principal holds `Commit`
    async fn filter_backend_permitted(&self, canisters: Vec<Canister>) -> Vec<Canister> {
        let mut kept = Vec::new();
        for canister in canisters {
            match self
                .assets
                .list_permitted(canister.ic_canister_id, Permission::Commit)
                .await
            {
                Ok(principals) if principals.contains(&self.backend_principal) => kept.push(canister),
                Ok(_) => debug!("Backend holds no commit permission on {}", canister.ic_canister_id),
                Err(e) => debug!("Cannot list permissions of {}: {}", canister.ic_canister_id, e),
            }
        }
        kept
    }

    /// Canisters with no running deployment; a failed check counts as running
    async fn filter_idle(&self, canisters: Vec<Canister>) -> Vec<Canister> {
        let mut kept = Vec::new();
        for canister in canisters {
            match self.monitor.is_deployment_running(&canister.id).await {
                Ok(false) => kept.push(canister),
                Ok(true) => debug!("Deployment running on {}, keeping its grant", canister.ic_canister_id),
                Err(e) => warn!(
                    "Running check failed for {} ({}), keeping its grant: {}",
                    canister.ic_canister_id, canister.id, e
                ),
            }
        }
        kept
    }
}
