use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{
    Assignment, JobStatus, MapTask, Phase, PhaseStatus, ReduceTask, TaskId, TaskState, TaskView,
    WorkerHandle,
};
use tracing::{debug, info, warn};

pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Entrada de la tabla de tareas.
#[derive(Debug, Clone)]
struct Task {
    state: TaskState,
    /// Sólo tiene sentido mientras está IN_PROGRESS.
    lease_start: Option<Instant>,
    worker: Option<WorkerHandle>,
}

impl Task {
    fn idle() -> Self {
        Self {
            state: TaskState::Idle,
            lease_start: None,
            worker: None,
        }
    }

    fn lease_age(&self, now: Instant) -> Option<Duration> {
        self.lease_start
            .map(|start| now.saturating_duration_since(start))
    }

    fn is_leasable(&self, now: Instant, timeout: Duration) -> bool {
        match self.state {
            TaskState::Idle => true,
            TaskState::InProgress => self.lease_age(now).map_or(true, |age| age > timeout),
            TaskState::Completed => false,
        }
    }

    fn view(&self, id: TaskId, now: Instant) -> TaskView {
        let lease_age_ms = match self.state {
            TaskState::InProgress => self.lease_age(now).map(|d| d.as_millis() as u64),
            _ => None,
        };
        TaskView {
            id,
            state: self.state,
            worker: self.worker.clone(),
            lease_age_ms,
        }
    }
}

/// Qué pasó al asignar, para loguearlo después de soltar el lock.
enum Lease {
    Fresh(TaskId),
    Relet {
        id: TaskId,
        previous: Option<WorkerHandle>,
    },
}

impl Lease {
    fn id(&self) -> TaskId {
        match self {
            Lease::Fresh(id) => *id,
            Lease::Relet { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Completed,
    /// Completada sin que nadie la tuviera asignada.
    CompletedUnleased,
    Duplicate,
    /// Map sin asignar reportado sin handle: no hay de dónde leer su salida.
    Unlocated,
    Unknown,
}

impl Completion {
    fn counts(self) -> bool {
        matches!(self, Completion::Completed | Completion::CompletedUnleased)
    }
}

/// Toma la primera tarea (por índice) Idle o con lease vencido y se la da a
/// `worker`. Un re-lease deja la tarea IN_PROGRESS: no vuelve a Idle.
fn lease_first(
    tasks: &mut [Task],
    worker: &WorkerHandle,
    now: Instant,
    timeout: Duration,
) -> Option<Lease> {
    let (id, task) = tasks
        .iter_mut()
        .enumerate()
        .find(|(_, t)| t.is_leasable(now, timeout))?;

    let relet = task.state == TaskState::InProgress;
    let previous = task.worker.replace(worker.clone());
    task.state = TaskState::InProgress;
    task.lease_start = Some(now);

    Some(if relet {
        Lease::Relet { id, previous }
    } else {
        Lease::Fresh(id)
    })
}

/// Una tarea pasa a Completed una sola vez; un reporte duplicado o con id
/// desconocido no cambia nada. Con `needs_location`, la tarea tiene que
/// quedar con algún handle (el del reporte o el del último lease).
fn complete(
    tasks: &mut [Task],
    task_id: TaskId,
    reporter: Option<&WorkerHandle>,
    needs_location: bool,
) -> Completion {
    let Some(task) = tasks.get_mut(task_id) else {
        return Completion::Unknown;
    };

    let outcome = match task.state {
        TaskState::Completed => return Completion::Duplicate,
        TaskState::Idle => Completion::CompletedUnleased,
        TaskState::InProgress => Completion::Completed,
    };
    if needs_location && reporter.is_none() && task.worker.is_none() {
        return Completion::Unlocated;
    }

    task.state = TaskState::Completed;
    task.lease_start = None;
    if let Some(h) = reporter {
        task.worker = Some(h.clone());
    }
    outcome
}

#[derive(Debug)]
struct JobState {
    input_ref: String,
    files: Vec<String>,
    map_tasks: Vec<Task>,
    reduce_tasks: Vec<Task>,
    remaining_map: usize,
    remaining_reduce: usize,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

/// Tabla de tareas del coordinador.
///
/// Toda lectura y escritura pasa por un único mutex y ninguna sección crítica
/// hace I/O (los logs se emiten después de soltar el lock). Así dos pedidos
/// concurrentes nunca reciben la misma tarea con lease vigente.
#[derive(Debug)]
pub struct Scheduler {
    state: Mutex<JobState>,
    lease_timeout: Duration,
}

impl Scheduler {
    /// Una tarea de map por archivo de entrada y `n_reduce` tareas de reduce.
    /// `input_ref` es la ubicación base contra la que se resuelven los archivos.
    pub fn new(
        input_ref: impl Into<String>,
        files: Vec<String>,
        n_reduce: usize,
        lease_timeout: Duration,
    ) -> Self {
        let n_map = files.len();
        let finished_at = if n_reduce == 0 { Some(Utc::now()) } else { None };

        Self {
            state: Mutex::new(JobState {
                input_ref: input_ref.into(),
                files,
                map_tasks: vec![Task::idle(); n_map],
                reduce_tasks: vec![Task::idle(); n_reduce],
                remaining_map: n_map,
                remaining_reduce: n_reduce,
                started_at: Utc::now(),
                finished_at,
            }),
            lease_timeout,
        }
    }

    // Ninguna sección crítica deja la tabla a medias, así que un lock
    // envenenado se puede seguir usando.
    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// (map restantes, reduce restantes)
    pub fn remaining(&self) -> (usize, usize) {
        let job = self.lock();
        (job.remaining_map, job.remaining_reduce)
    }

    /* ---------------- map ---------------- */

    pub fn ask_map_task(&self, worker: &WorkerHandle) -> Assignment<MapTask> {
        self.ask_map_task_at(worker, Instant::now())
    }

    pub fn ask_map_task_at(&self, worker: &WorkerHandle, now: Instant) -> Assignment<MapTask> {
        let (task, lease) = {
            let mut job = self.lock();
            // sin particiones el job ya está terminado: no hay map que valga la pena
            if job.remaining_map == 0 || job.reduce_tasks.is_empty() {
                return Assignment::PhaseComplete;
            }

            let Some(lease) = lease_first(&mut job.map_tasks, worker, now, self.lease_timeout)
            else {
                return Assignment::NoTaskNow;
            };

            let id = lease.id();
            let task = MapTask {
                task_id: id,
                input_ref: job.input_ref.clone(),
                file_name: job.files[id].clone(),
                partition_count: job.reduce_tasks.len(),
            };
            (task, lease)
        };

        log_lease(Phase::Map, worker, &lease);
        Assignment::Task(task)
    }

    pub fn map_task_over(&self, task_id: TaskId, reporter: Option<&WorkerHandle>) {
        let (outcome, remaining) = {
            let mut job = self.lock();
            let outcome = complete(&mut job.map_tasks, task_id, reporter, true);
            if outcome.counts() {
                job.remaining_map -= 1;
            }
            (outcome, job.remaining_map)
        };

        log_completion(Phase::Map, task_id, outcome, remaining);
    }

    /* ---------------- reduce ---------------- */

    pub fn ask_reduce_task(&self, worker: &WorkerHandle) -> Assignment<ReduceTask> {
        self.ask_reduce_task_at(worker, Instant::now())
    }

    /// Igual que map, pero nunca asigna mientras quede algún map sin
    /// completar: los datos de cada partición recién están todos en ese punto.
    pub fn ask_reduce_task_at(
        &self,
        worker: &WorkerHandle,
        now: Instant,
    ) -> Assignment<ReduceTask> {
        let (task, lease) = {
            let mut job = self.lock();
            if job.remaining_reduce == 0 {
                return Assignment::PhaseComplete;
            }
            if job.remaining_map > 0 {
                return Assignment::NoTaskNow;
            }

            let Some(lease) = lease_first(&mut job.reduce_tasks, worker, now, self.lease_timeout)
            else {
                return Assignment::NoTaskNow;
            };

            // uno por map, en orden de id; todo map completo tiene handle
            let map_worker_handles: Vec<WorkerHandle> = job
                .map_tasks
                .iter()
                .map(|t| t.worker.clone().unwrap_or_default())
                .collect();

            let task = ReduceTask {
                task_id: lease.id(),
                map_worker_handles,
            };
            (task, lease)
        };

        log_lease(Phase::Reduce, worker, &lease);
        Assignment::Task(task)
    }

    pub fn reduce_task_over(&self, task_id: TaskId, reporter: Option<&WorkerHandle>) {
        let (outcome, remaining) = {
            let mut job = self.lock();
            let outcome = complete(&mut job.reduce_tasks, task_id, reporter, false);
            if outcome.counts() {
                job.remaining_reduce -= 1;
                if job.remaining_reduce == 0 {
                    job.finished_at = Some(Utc::now());
                }
            }
            (outcome, job.remaining_reduce)
        };

        log_completion(Phase::Reduce, task_id, outcome, remaining);
    }

    /* ---------------- job ---------------- */

    pub fn is_job_done(&self) -> bool {
        self.lock().remaining_reduce == 0
    }

    pub fn status(&self) -> JobStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> JobStatus {
        let job = self.lock();

        let phase = |tasks: &[Task], remaining: usize| PhaseStatus {
            total: tasks.len(),
            remaining,
            tasks: tasks
                .iter()
                .enumerate()
                .map(|(id, t)| t.view(id, now))
                .collect(),
        };

        JobStatus {
            map: phase(&job.map_tasks, job.remaining_map),
            reduce: phase(&job.reduce_tasks, job.remaining_reduce),
            partition_count: job.reduce_tasks.len(),
            lease_timeout_ms: self.lease_timeout.as_millis() as u64,
            done: job.remaining_reduce == 0,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

fn log_lease(phase: Phase, worker: &WorkerHandle, lease: &Lease) {
    match lease {
        Lease::Fresh(id) => info!("asignando tarea {} {} a {}", phase, id, worker),
        Lease::Relet { id, previous } => warn!(
            "lease vencido: tarea {} {} reasignada de {} a {}",
            phase,
            id,
            previous.as_ref().map(WorkerHandle::as_str).unwrap_or("?"),
            worker
        ),
    }
}

fn log_completion(phase: Phase, task_id: TaskId, outcome: Completion, remaining: usize) {
    match outcome {
        Completion::Completed if remaining == 0 => {
            info!("tarea {} {} completada; fase {} terminada", phase, task_id, phase)
        }
        Completion::Completed => {
            info!("tarea {} {} completada (quedan {})", phase, task_id, remaining)
        }
        Completion::Duplicate => debug!(
            "reporte duplicado de tarea {} {}, ya estaba completada",
            phase, task_id
        ),
        Completion::CompletedUnleased => warn!(
            "tarea {} {} completada sin haber sido asignada (quedan {})",
            phase, task_id, remaining
        ),
        Completion::Unlocated => warn!(
            "tarea {} {} reportada sin handle y nunca asignada; se ignora",
            phase, task_id
        ),
        Completion::Unknown => warn!("reporte de tarea {} con id desconocido {}", phase, task_id),
    }
}
