/*!
 * Module Lifecycle
 * Load and unload entry points of the hold module
 */

use super::controller::ProtectionController;
use super::stats::HoldStats;
use super::strategy::StrategyKind;
use crate::config::ModuleParams;
use crate::core::errors::HoldResult;
use crate::kernel::HostRef;
use crate::monitoring::span_lifecycle;
use log::{error, info, warn};

/// A loaded hold module
pub struct ProcHoldModule {
    controller: ProtectionController,
    params: ModuleParams,
}

impl ProcHoldModule {
    /// Start protection and hold the configured pid
    ///
    /// An unconfigured pid loads the module without holding anything. Any
    /// other hold failure tears protection down again and fails the load.
    pub fn on_load(host: HostRef, params: ModuleParams) -> HoldResult<Self> {
        let span = span_lifecycle("load", params.client_pid);
        let _entered = span.enter();

        info!("-----Start prochold, kernel-version: {}", host.release());
        let mut controller = ProtectionController::new(host);
        controller.start()?;

        if params.has_client() {
            if let Err(e) = controller.hold(params.client_pid) {
                error!("Failed to hold process {}: {} ({})", params.client_pid, e, e.errno());
                if let Err(teardown) = controller.finish() {
                    warn!("Teardown after failed load: {}", teardown);
                }
                return Err(e);
            }
        } else {
            warn!(
                "No client_pid configured ({}), loaded without a held process",
                params.client_pid
            );
        }

        Ok(Self { controller, params })
    }

    /// Release the held pid and restore the host
    ///
    /// Best effort: failures are logged and teardown carries on. Returns the
    /// final counters.
    pub fn on_unload(mut self) -> HoldStats {
        let span = span_lifecycle("unload", self.params.client_pid);
        let _entered = span.enter();

        if self.params.has_client() {
            if let Err(e) = self.controller.unhold(self.params.client_pid) {
                warn!("Failed to release process {}: {}", self.params.client_pid, e);
            }
        }
        match self.controller.finish() {
            Ok(()) => {}
            Err(e) if e.is_chain_fault() => {
                error!("task_kill chain left in place on unload: {}", e)
            }
            Err(e) => warn!("Failed to restore host on unload: {}", e),
        }

        info!("-----exit prochold-----");
        self.controller.stats()
    }

    pub fn params(&self) -> &ModuleParams {
        &self.params
    }

    pub fn controller(&self) -> &ProtectionController {
        &self.controller
    }

    pub fn strategy_kind(&self) -> Option<StrategyKind> {
        self.controller.strategy_kind()
    }

    pub fn stats(&self) -> HoldStats {
        self.controller.stats()
    }
}
