use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::rpc::routes;
use common::{
    AskMapTaskReply, AskReduceTaskReply, AskTaskRequest, JobDoneReply, JobStatus, TaskOverReply,
    TaskOverRequest,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::ASK_MAP, post(ask_map_task))
        .route(routes::MAP_DONE, post(map_task_over))
        .route(routes::ASK_REDUCE, post(ask_reduce_task))
        .route(routes::REDUCE_DONE, post(reduce_task_over))
        .route(routes::JOB_DONE, get(is_job_done))
        .route(routes::JOB_STATUS, get(job_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Entrega el próximo map disponible (o -1 si no hay)
async fn ask_map_task(
    State(state): State<AppState>,
    Json(req): Json<AskTaskRequest>,
) -> Json<AskMapTaskReply> {
    Json(state.scheduler.ask_map_task(&req.worker).into())
}

async fn map_task_over(
    State(state): State<AppState>,
    Json(req): Json<TaskOverRequest>,
) -> Json<TaskOverReply> {
    state.scheduler.map_task_over(req.task_id, req.worker.as_ref());
    Json(TaskOverReply::default())
}

// Entrega el próximo reduce; nunca antes de que terminen todos los map
async fn ask_reduce_task(
    State(state): State<AppState>,
    Json(req): Json<AskTaskRequest>,
) -> Json<AskReduceTaskReply> {
    Json(state.scheduler.ask_reduce_task(&req.worker).into())
}

async fn reduce_task_over(
    State(state): State<AppState>,
    Json(req): Json<TaskOverRequest>,
) -> Json<TaskOverReply> {
    state
        .scheduler
        .reduce_task_over(req.task_id, req.worker.as_ref());
    Json(TaskOverReply::default())
}

async fn is_job_done(State(state): State<AppState>) -> Json<JobDoneReply> {
    Json(JobDoneReply {
        done: state.scheduler.is_job_done(),
    })
}

async fn job_status(State(state): State<AppState>) -> Json<JobStatus> {
    Json(state.scheduler.status())
}
