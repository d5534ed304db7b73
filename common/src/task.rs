use serde::{Deserialize, Serialize};

/// Índice denso (0-based) de una tarea dentro de su fase.
/// Para reduce también es el índice de partición.
pub type TaskId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Idle,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Map,
    Reduce,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Map => f.write_str("map"),
            Phase::Reduce => f.write_str("reduce"),
        }
    }
}

/// Respuesta del scheduler cuando un worker pide trabajo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment<T> {
    /// Tarea asignada (el lease empieza ahora).
    Task(T),
    /// Todo está tomado con lease vigente; hay que volver a preguntar.
    NoTaskNow,
    /// La fase terminó: no habrá más tareas de este tipo.
    PhaseComplete,
}

impl<T> Assignment<T> {
    pub fn is_task(&self) -> bool {
        matches!(self, Assignment::Task(_))
    }

    pub fn task(self) -> Option<T> {
        match self {
            Assignment::Task(t) => Some(t),
            _ => None,
        }
    }
}
