pub mod config;
pub mod handlers;
pub mod monitor;
pub mod scheduler;
pub mod server;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::CoordinatorConfig;
pub use scheduler::{Scheduler, DEFAULT_LEASE_TIMEOUT};
pub use server::serve_until;

/// Arma el job a partir de la configuración y atiende workers hasta que
/// termina (más el período de gracia) o llega Ctrl-C.
pub async fn run(config: CoordinatorConfig) -> Result<()> {
    let input_ref = config.input_ref()?;
    let files = config.resolve_inputs()?;
    let lease_timeout = config.lease_timeout()?;

    info!(
        "job con {} archivos de entrada en {}, {} particiones, lease de {:?}",
        files.len(),
        input_ref,
        config.n_reduce,
        lease_timeout
    );

    let scheduler = Arc::new(Scheduler::new(
        input_ref,
        files,
        config.n_reduce as usize,
        lease_timeout,
    ));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", config.bind))?;

    let watched = scheduler.clone();
    let (poll, linger) = (config.done_poll(), config.linger());
    let shutdown = async move {
        tokio::select! {
            _ = monitor::job_done_then_linger(watched, poll, linger) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C recibido; cerrando con el job sin terminar");
            }
        }
    };

    serve_until(listener, scheduler.clone(), shutdown).await?;

    let (map, reduce) = scheduler.remaining();
    if scheduler.is_job_done() {
        info!("coordinador terminado: job completo");
    } else {
        warn!("coordinador terminado: quedaban {} map y {} reduce", map, reduce);
    }
    Ok(())
}
