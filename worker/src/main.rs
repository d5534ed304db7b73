use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::{Agent, HttpCoordinator, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("worker=debug")),
        )
        .init();

    let config = WorkerConfig::parse();
    let app = config.application()?;
    let handle = config.handle()?;
    let output_dir = config.output_dir()?;

    std::fs::create_dir_all(handle.to_path_buf())
        .with_context(|| format!("no se pudo crear el directorio de trabajo {}", handle))?;

    let rpc = HttpCoordinator::new(&config.coordinator_url, config.rpc_timeout())?;
    info!("worker usando coordinador en {}", rpc.base_url());

    let agent = Agent::new(rpc, app, handle, output_dir, config.agent_options());
    let summary = agent.run().await?;

    info!(
        "worker terminado: {} map y {} reduce completados",
        summary.map_tasks, summary.reduce_tasks
    );
    Ok(())
}
