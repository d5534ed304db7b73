use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::handle::WorkerHandle;
use crate::task::{Assignment, TaskId, TaskState};

/// `task_id` en las respuestas cuando no se asignó nada.
/// `phase_over` distingue "no hay nada ahora" de "la fase terminó".
pub const NO_TASK: i64 = -1;

pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const ASK_MAP: &str = "/api/v1/map/ask";
    pub const MAP_DONE: &str = "/api/v1/map/done";
    pub const ASK_REDUCE: &str = "/api/v1/reduce/ask";
    pub const REDUCE_DONE: &str = "/api/v1/reduce/done";
    pub const JOB_DONE: &str = "/api/v1/job/done";
    pub const JOB_STATUS: &str = "/api/v1/job/status";
}

/* --------- Pedido de tareas --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskTaskRequest {
    pub worker: WorkerHandle,
}

/// Tarea de map tal como la ve el worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTask {
    pub task_id: TaskId,
    /// Ubicación base de las entradas (directorio del coordinador).
    pub input_ref: String,
    pub file_name: String,
    pub partition_count: usize,
}

impl MapTask {
    pub fn input_path(&self) -> PathBuf {
        Path::new(&self.input_ref).join(&self.file_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskMapTaskReply {
    pub input_ref: String,
    pub file_name: String,
    pub task_id: i64,
    pub partition_count: usize,
    pub phase_over: bool,
}

impl From<Assignment<MapTask>> for AskMapTaskReply {
    fn from(a: Assignment<MapTask>) -> Self {
        match a {
            Assignment::Task(t) => Self {
                input_ref: t.input_ref,
                file_name: t.file_name,
                task_id: t.task_id as i64,
                partition_count: t.partition_count,
                phase_over: false,
            },
            Assignment::NoTaskNow => Self::empty(false),
            Assignment::PhaseComplete => Self::empty(true),
        }
    }
}

impl AskMapTaskReply {
    fn empty(phase_over: bool) -> Self {
        Self {
            input_ref: String::new(),
            file_name: String::new(),
            task_id: NO_TASK,
            partition_count: 0,
            phase_over,
        }
    }

    pub fn into_assignment(self) -> Assignment<MapTask> {
        match TaskId::try_from(self.task_id) {
            Ok(task_id) => Assignment::Task(MapTask {
                task_id,
                input_ref: self.input_ref,
                file_name: self.file_name,
                partition_count: self.partition_count,
            }),
            Err(_) if self.phase_over => Assignment::PhaseComplete,
            Err(_) => Assignment::NoTaskNow,
        }
    }
}

/// Tarea de reduce: su id es también la partición a leer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceTask {
    pub task_id: TaskId,
    /// Handle del worker que produjo cada map, indexado por id de map.
    pub map_worker_handles: Vec<WorkerHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskReduceTaskReply {
    pub map_worker_handles: Vec<WorkerHandle>,
    pub task_id: i64,
    pub phase_over: bool,
}

impl From<Assignment<ReduceTask>> for AskReduceTaskReply {
    fn from(a: Assignment<ReduceTask>) -> Self {
        match a {
            Assignment::Task(t) => Self {
                map_worker_handles: t.map_worker_handles,
                task_id: t.task_id as i64,
                phase_over: false,
            },
            Assignment::NoTaskNow => Self {
                map_worker_handles: Vec::new(),
                task_id: NO_TASK,
                phase_over: false,
            },
            Assignment::PhaseComplete => Self {
                map_worker_handles: Vec::new(),
                task_id: NO_TASK,
                phase_over: true,
            },
        }
    }
}

impl AskReduceTaskReply {
    pub fn into_assignment(self) -> Assignment<ReduceTask> {
        match TaskId::try_from(self.task_id) {
            Ok(task_id) => Assignment::Task(ReduceTask {
                task_id,
                map_worker_handles: self.map_worker_handles,
            }),
            Err(_) if self.phase_over => Assignment::PhaseComplete,
            Err(_) => Assignment::NoTaskNow,
        }
    }
}

/* --------- Reporte de fin de tarea --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOverRequest {
    pub task_id: TaskId,
    /// Handle del worker que terminó. Opcional en el protocolo; si viene,
    /// queda fijado como ubicación de la salida de la tarea.
    #[serde(default)]
    pub worker: Option<WorkerHandle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskOverReply {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDoneReply {
    pub done: bool,
}

/* --------- Estado del job (diagnóstico) --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub state: TaskState,
    pub worker: Option<WorkerHandle>,
    /// Antigüedad del lease, sólo mientras está IN_PROGRESS.
    pub lease_age_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub total: usize,
    pub remaining: usize,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub map: PhaseStatus,
    pub reduce: PhaseStatus,
    pub partition_count: usize,
    pub lease_timeout_ms: u64,
    pub done: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_reply_usa_menos_uno_sin_tarea() {
        let wait: AskMapTaskReply = Assignment::<MapTask>::NoTaskNow.into();
        assert_eq!(wait.task_id, NO_TASK);
        assert!(!wait.phase_over);
        assert_eq!(wait.into_assignment(), Assignment::NoTaskNow);

        let over: AskMapTaskReply = Assignment::<MapTask>::PhaseComplete.into();
        assert_eq!(over.task_id, NO_TASK);
        assert!(over.phase_over);
        assert_eq!(over.into_assignment(), Assignment::PhaseComplete);
    }

    #[test]
    fn map_reply_lleva_la_asignacion_en_json() {
        let task = MapTask {
            task_id: 3,
            input_ref: "/data/in".to_string(),
            file_name: "pg-3.txt".to_string(),
            partition_count: 5,
        };
        let reply: AskMapTaskReply = Assignment::Task(task.clone()).into();
        let json = serde_json::to_string(&reply).unwrap();
        let back: AskMapTaskReply = serde_json::from_str(&json).unwrap();

        assert_eq!(back.into_assignment(), Assignment::Task(task.clone()));
        assert_eq!(task.input_path(), PathBuf::from("/data/in/pg-3.txt"));
    }

    #[test]
    fn reduce_reply_respeta_orden_de_handles() {
        let task = ReduceTask {
            task_id: 1,
            map_worker_handles: vec![WorkerHandle::new("/w/b"), WorkerHandle::new("/w/a")],
        };
        let reply: AskReduceTaskReply = Assignment::Task(task.clone()).into();
        assert_eq!(reply.task_id, 1);
        assert_eq!(reply.into_assignment(), Assignment::Task(task));
    }

    #[test]
    fn task_over_campo_worker_es_opcional() {
        let req: TaskOverRequest = serde_json::from_str(r#"{"task_id": 4}"#).unwrap();
        assert_eq!(req.task_id, 4);
        assert!(req.worker.is_none());
        assert_eq!(serde_json::to_string(&TaskOverReply {}).unwrap(), "{}");
    }
}
