#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::{Assignment, MapTask, ReduceTask, TaskId, WorkerHandle};
use coordinator::Scheduler;
use worker::{AgentOptions, CoordinatorRpc};

pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("worker_integration_tests").join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn fast_options() -> AgentOptions {
    AgentOptions {
        backoff_min: Duration::from_millis(5),
        backoff_max: Duration::from_millis(20),
        max_ask_failures: 5,
    }
}

pub fn write_inputs(dir: &Path, docs: &[(&str, &str)]) -> Vec<String> {
    docs.iter()
        .map(|(name, text)| {
            fs::write(dir.join(name), text).unwrap();
            name.to_string()
        })
        .collect()
}

/// Junta todos los `mr-out-*` de `dir` en un mapa clave -> valor.
/// Falla si alguna clave aparece en más de un archivo.
pub fn read_outputs(dir: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for entry in fs::read_dir(dir).unwrap().flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("mr-out-") {
            continue;
        }
        for line in fs::read_to_string(entry.path()).unwrap().lines() {
            let (k, v) = line.split_once(' ').unwrap();
            assert!(out.insert(k.to_string(), v.to_string()).is_none(), "clave {k} repetida");
        }
    }
    out
}

/// El scheduler llamado en el mismo proceso, sin transporte.
#[derive(Clone)]
pub struct InProcess {
    pub scheduler: Arc<Scheduler>,
}

impl InProcess {
    pub fn new(input_dir: &Path, files: Vec<String>, n_reduce: usize, lease: Duration) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(
                input_dir.to_string_lossy(),
                files,
                n_reduce,
                lease,
            )),
        }
    }
}

#[async_trait]
impl CoordinatorRpc for InProcess {
    async fn ask_map_task(&self, worker: &WorkerHandle) -> Result<Assignment<MapTask>> {
        Ok(self.scheduler.ask_map_task(worker))
    }

    async fn map_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        self.scheduler.map_task_over(task_id, Some(worker));
        Ok(())
    }

    async fn ask_reduce_task(&self, worker: &WorkerHandle) -> Result<Assignment<ReduceTask>> {
        Ok(self.scheduler.ask_reduce_task(worker))
    }

    async fn reduce_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        self.scheduler.reduce_task_over(task_id, Some(worker));
        Ok(())
    }
}

/// Igual que `InProcess`, pero las primeras llamadas fallan como si la red
/// se cortara. `ask_failures` afecta a los pedidos y `report_failures` a los
/// reportes de fin de tarea.
pub struct Flaky {
    pub inner: InProcess,
    ask_failures: AtomicU32,
    report_failures: AtomicU32,
    pub ask_calls: AtomicU32,
}

impl Flaky {
    pub fn new(inner: InProcess, ask_failures: u32, report_failures: u32) -> Self {
        Self {
            inner,
            ask_failures: AtomicU32::new(ask_failures),
            report_failures: AtomicU32::new(report_failures),
            ask_calls: AtomicU32::new(0),
        }
    }

    fn fail(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn ask(&self) -> Result<()> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        if Self::fail(&self.ask_failures) {
            bail!("conexión rechazada (simulada)");
        }
        Ok(())
    }

    fn report(&self) -> Result<()> {
        if Self::fail(&self.report_failures) {
            bail!("timeout (simulado)");
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinatorRpc for Flaky {
    async fn ask_map_task(&self, worker: &WorkerHandle) -> Result<Assignment<MapTask>> {
        self.ask()?;
        self.inner.ask_map_task(worker).await
    }

    async fn map_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        self.report()?;
        self.inner.map_task_over(task_id, worker).await
    }

    async fn ask_reduce_task(&self, worker: &WorkerHandle) -> Result<Assignment<ReduceTask>> {
        self.ask()?;
        self.inner.ask_reduce_task(worker).await
    }

    async fn reduce_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        self.report()?;
        self.inner.reduce_task_over(task_id, worker).await
    }
}
