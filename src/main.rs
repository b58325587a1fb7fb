/*!
 * prochold - Simulation Entry Point
 *
 * Boots a simulated kernel, loads the hold module against it and keeps it
 * loaded until Ctrl+C.
 */

use miette::{miette, IntoDiagnostic};
use std::sync::Arc;
use tracing::{error, info, warn};

use prochold::{
    init_tracing, KernelHost, KernelVersion, ModuleParams, ProcHoldModule, SimulatedKernel,
};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let params = ModuleParams::from_env()?;
    init_tracing(params.trace_json);

    let version: KernelVersion = std::env::var("PROCHOLD_KERNEL_VERSION")
        .unwrap_or_else(|_| "5.15.0".to_string())
        .parse()
        .map_err(|e| miette!("PROCHOLD_KERNEL_VERSION: {}", e))?;
    let kernel = Arc::new(SimulatedKernel::builder().with_version(version).build());

    if params.has_client() {
        kernel.spawn(params.client_pid).into_diagnostic()?;
        info!(pid = params.client_pid, "Spawned client process");
    }

    // Load failures render as diagnostics with their code and help text
    let module = ProcHoldModule::on_load(kernel.clone(), params).map_err(|e| {
        error!(errno = %e.errno(), "Module load failed: {}", e);
        e
    })?;
    info!(
        strategy = ?module.strategy_kind(),
        release = %kernel.release(),
        "Module loaded"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&module.stats()).into_diagnostic()?
    );

    info!("Press Ctrl+C to unload");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, unloading now");
    }

    if !kernel.this_module().begin_unload() {
        warn!("Module still referenced, forcing unload");
        kernel.this_module().force_unload();
    }
    let stats = module.on_unload();
    println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
    Ok(())
}
