use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::handlers::build_router;
use crate::scheduler::Scheduler;
use crate::state::AppState;

/// Atiende pedidos RPC hasta que `shutdown` se resuelva; después deja
/// terminar los pedidos en curso y vuelve.
pub async fn serve_until<F>(listener: TcpListener, scheduler: Arc<Scheduler>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("dirección local del listener")?;
    let app = build_router(AppState::new(scheduler));

    info!("coordinador escuchando en {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("servidor HTTP")?;

    info!("servidor en {} cerrado", addr);
    Ok(())
}
