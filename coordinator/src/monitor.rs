use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::scheduler::Scheduler;

/// Vuelve cuando todas las tareas de reduce están completas.
pub async fn wait_for_job_done(scheduler: Arc<Scheduler>, poll: Duration) {
    loop {
        if scheduler.is_job_done() {
            return;
        }
        let (map, reduce) = scheduler.remaining();
        debug!("job en curso: quedan {} map y {} reduce", map, reduce);
        tokio::time::sleep(poll).await;
    }
}

/// Espera el fin del job y después `linger` más, para que los workers que
/// siguen preguntando vean la fase terminada antes de que el servidor cierre.
pub async fn job_done_then_linger(scheduler: Arc<Scheduler>, poll: Duration, linger: Duration) {
    wait_for_job_done(scheduler.clone(), poll).await;

    let status = scheduler.status();
    let elapsed = status
        .finished_at
        .map(|end| (end - status.started_at).num_milliseconds())
        .unwrap_or_default();
    info!(
        "job terminado: {} map y {} reduce en {} ms; cerrando en {:?}",
        status.map.total, status.reduce.total, elapsed, linger
    );

    tokio::time::sleep(linger).await;
}
