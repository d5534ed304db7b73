use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use common::{
    artifact, kv, Application, Assignment, MapTask, Phase, ReduceTask, TaskId, WorkerHandle,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backoff::{Backoff, DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MIN};
use crate::rpc::CoordinatorRpc;

pub const DEFAULT_MAX_ASK_FAILURES: u32 = 20;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    /// Fallos de transporte seguidos al pedir tarea antes de rendirse.
    pub max_ask_failures: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            backoff_min: DEFAULT_BACKOFF_MIN,
            backoff_max: DEFAULT_BACKOFF_MAX,
            max_ask_failures: DEFAULT_MAX_ASK_FAILURES,
        }
    }
}

impl AgentOptions {
    fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_min, self.backoff_max)
    }
}

/// Tareas que este worker completó y reportó.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub map_tasks: usize,
    pub reduce_tasks: usize,
}

/// Por qué falló un intento de tarea.
#[derive(Debug, Error)]
pub enum TaskError {
    /// La entrada de un map no se puede leer: ningún reintento lo arregla.
    #[error("no se pudo leer la entrada {}: {source}", .path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Falló leer o escribir un artefacto; el intento se abandona y el
    /// lease vencido hará que alguien lo reintente.
    #[error("fallo de artefacto en {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("la tarea en segundo plano no terminó: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TaskError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::InputUnavailable { .. })
    }
}

/* =========================
   Ejecución de tareas (bloqueante)
   ========================= */

/// Lee la entrada, aplica Map y deja una partición por reduce bajo `handle`.
pub fn run_map(app: &Application, task: &MapTask, handle: &WorkerHandle) -> Result<(), TaskError> {
    let path = task.input_path();
    let contents = artifact::read_input(&path)
        .map_err(|source| TaskError::InputUnavailable { path, source })?;

    let pairs = (app.map)(&task.file_name, &contents);
    let buckets = kv::partition(pairs, task.partition_count);

    for (partition, bucket) in buckets.iter().enumerate() {
        artifact::write_intermediate(handle, task.task_id, partition, bucket).map_err(|source| {
            TaskError::Artifact {
                path: artifact::intermediate_path(handle, task.task_id, partition),
                source,
            }
        })?;
    }
    Ok(())
}

/// Junta la partición `task.task_id` de cada map, agrupa por clave, aplica
/// Reduce y publica `mr-out-<id>` en `output_dir`.
pub fn run_reduce(
    app: &Application,
    task: &ReduceTask,
    output_dir: &Path,
) -> Result<PathBuf, TaskError> {
    let mut pairs = Vec::new();
    for (map_id, handle) in task.map_worker_handles.iter().enumerate() {
        let mut part = artifact::read_intermediate(handle, map_id, task.task_id).map_err(
            |source| TaskError::Artifact {
                path: artifact::intermediate_path(handle, map_id, task.task_id),
                source,
            },
        )?;
        pairs.append(&mut part);
    }

    let rows: Vec<(String, String)> = kv::group_by_key(pairs)
        .into_iter()
        .map(|(key, values)| {
            let out = (app.reduce)(&key, &values);
            (key, out)
        })
        .collect();

    artifact::publish_output(output_dir, task.task_id, &rows).map_err(|source| {
        TaskError::Artifact {
            path: artifact::output_path(output_dir, task.task_id),
            source,
        }
    })
}

/* =========================
   Loop del worker
   ========================= */

/// Worker: pide maps hasta que la fase termina, después reduces hasta que
/// el job termina.
pub struct Agent<C> {
    rpc: C,
    app: Application,
    handle: WorkerHandle,
    output_dir: PathBuf,
    options: AgentOptions,
}

impl<C: CoordinatorRpc> Agent<C> {
    pub fn new(
        rpc: C,
        app: Application,
        handle: WorkerHandle,
        output_dir: PathBuf,
        options: AgentOptions,
    ) -> Self {
        Self {
            rpc,
            app,
            handle,
            output_dir,
            options,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            "worker {} arrancando (app={}, salida={})",
            self.handle,
            self.app.name,
            self.output_dir.display()
        );

        let map_tasks = self.map_phase().await?;
        let reduce_tasks = self.reduce_phase().await?;

        Ok(RunSummary {
            map_tasks,
            reduce_tasks,
        })
    }

    async fn map_phase(&self) -> Result<usize> {
        let mut backoff = self.options.backoff();
        let mut failures = 0;
        let mut completed = 0;

        loop {
            match self.rpc.ask_map_task(&self.handle).await {
                Ok(Assignment::Task(task)) => {
                    failures = 0;
                    backoff.reset();
                    let id = task.task_id;
                    info!("tengo tarea map {} ({})", id, task.file_name);

                    match self.execute_map(task).await {
                        Ok(()) => {
                            self.report(Phase::Map, id).await;
                            completed += 1;
                        }
                        Err(e) if e.is_fatal() => {
                            return Err(anyhow!(e).context(format!("tarea map {id}")));
                        }
                        Err(e) => warn!("abandonando tarea map {}: {}", id, e),
                    }
                }
                Ok(Assignment::NoTaskNow) => {
                    failures = 0;
                    debug!("no hay map disponible, esperando");
                    backoff.wait().await;
                }
                Ok(Assignment::PhaseComplete) => {
                    info!("fase map terminada ({} tareas hechas por este worker)", completed);
                    return Ok(completed);
                }
                Err(err) => {
                    self.ask_failed(Phase::Map, &mut failures, err)?;
                    backoff.wait().await;
                }
            }
        }
    }

    async fn reduce_phase(&self) -> Result<usize> {
        let mut backoff = self.options.backoff();
        let mut failures = 0;
        let mut completed = 0;

        loop {
            match self.rpc.ask_reduce_task(&self.handle).await {
                Ok(Assignment::Task(task)) => {
                    failures = 0;
                    backoff.reset();
                    let id = task.task_id;
                    info!(
                        "tengo tarea reduce {} ({} salidas de map)",
                        id,
                        task.map_worker_handles.len()
                    );

                    match self.execute_reduce(task).await {
                        Ok(path) => {
                            debug!("reduce {} publicado en {}", id, path.display());
                            self.report(Phase::Reduce, id).await;
                            completed += 1;
                        }
                        Err(e) => warn!("abandonando tarea reduce {}: {}", id, e),
                    }
                }
                Ok(Assignment::NoTaskNow) => {
                    failures = 0;
                    debug!("no hay reduce disponible, esperando");
                    backoff.wait().await;
                }
                Ok(Assignment::PhaseComplete) => {
                    info!("fase reduce terminada ({} tareas hechas por este worker)", completed);
                    return Ok(completed);
                }
                Err(err) => {
                    self.ask_failed(Phase::Reduce, &mut failures, err)?;
                    backoff.wait().await;
                }
            }
        }
    }

    async fn execute_map(&self, task: MapTask) -> Result<(), TaskError> {
        let app = self.app;
        let handle = self.handle.clone();
        tokio::task::spawn_blocking(move || run_map(&app, &task, &handle)).await?
    }

    async fn execute_reduce(&self, task: ReduceTask) -> Result<PathBuf, TaskError> {
        let app = self.app;
        let output_dir = self.output_dir.clone();
        tokio::task::spawn_blocking(move || run_reduce(&app, &task, &output_dir)).await?
    }

    fn ask_failed(&self, phase: Phase, failures: &mut u32, err: anyhow::Error) -> Result<()> {
        *failures += 1;
        if *failures >= self.options.max_ask_failures {
            return Err(err.context(format!(
                "coordinador inalcanzable: {} fallos seguidos pidiendo tarea {}",
                failures, phase
            )));
        }
        warn!(
            "no se pudo pedir tarea {} ({}/{}): {:#}",
            phase, failures, self.options.max_ask_failures, err
        );
        Ok(())
    }

    /// Reporta el fin de una tarea, reintentando hasta que el coordinador
    /// lo reciba. El reporte es idempotente del otro lado.
    async fn report(&self, phase: Phase, task_id: TaskId) {
        let mut backoff = self.options.backoff();
        loop {
            let res = match phase {
                Phase::Map => self.rpc.map_task_over(task_id, &self.handle).await,
                Phase::Reduce => self.rpc.reduce_task_over(task_id, &self.handle).await,
            };
            match res {
                Ok(()) => {
                    info!("tarea {} {} reportada", phase, task_id);
                    return;
                }
                Err(err) => {
                    warn!("no se pudo reportar tarea {} {}: {:#}; reintentando", phase, task_id, err);
                    backoff.wait().await;
                }
            }
        }
    }
}
