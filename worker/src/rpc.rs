use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::rpc::routes;
use common::{
    AskMapTaskReply, AskReduceTaskReply, AskTaskRequest, Assignment, MapTask, ReduceTask, TaskId,
    TaskOverReply, TaskOverRequest, WorkerHandle,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// Llamadas del worker al coordinador.
///
/// Un `Err` es siempre un fallo de transporte; "no hay tarea ahora" y "la
/// fase terminó" llegan como `Ok` dentro de `Assignment`.
#[async_trait]
pub trait CoordinatorRpc: Send + Sync {
    async fn ask_map_task(&self, worker: &WorkerHandle) -> Result<Assignment<MapTask>>;

    async fn map_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()>;

    async fn ask_reduce_task(&self, worker: &WorkerHandle) -> Result<Assignment<ReduceTask>>;

    async fn reduce_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()>;
}

#[async_trait]
impl<T: CoordinatorRpc + ?Sized> CoordinatorRpc for Arc<T> {
    async fn ask_map_task(&self, worker: &WorkerHandle) -> Result<Assignment<MapTask>> {
        (**self).ask_map_task(worker).await
    }

    async fn map_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        (**self).map_task_over(task_id, worker).await
    }

    async fn ask_reduce_task(&self, worker: &WorkerHandle) -> Result<Assignment<ReduceTask>> {
        (**self).ask_reduce_task(worker).await
    }

    async fn reduce_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        (**self).reduce_task_over(task_id, worker).await
    }
}

/// Cliente HTTP + JSON contra el router del coordinador.
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    client: Client,
    base_url: String,
}

impl HttpCoordinator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("no se pudo crear el cliente HTTP")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn post<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let res = self
            .client
            .post(self.url(route))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {route}"))?
            .error_for_status()
            .with_context(|| format!("POST {route}"))?;

        res.json()
            .await
            .with_context(|| format!("respuesta inválida de {route}"))
    }
}

#[async_trait]
impl CoordinatorRpc for HttpCoordinator {
    async fn ask_map_task(&self, worker: &WorkerHandle) -> Result<Assignment<MapTask>> {
        let req = AskTaskRequest {
            worker: worker.clone(),
        };
        let reply: AskMapTaskReply = self.post(routes::ASK_MAP, &req).await?;
        Ok(reply.into_assignment())
    }

    async fn map_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        let req = TaskOverRequest {
            task_id,
            worker: Some(worker.clone()),
        };
        let _: TaskOverReply = self.post(routes::MAP_DONE, &req).await?;
        Ok(())
    }

    async fn ask_reduce_task(&self, worker: &WorkerHandle) -> Result<Assignment<ReduceTask>> {
        let req = AskTaskRequest {
            worker: worker.clone(),
        };
        let reply: AskReduceTaskReply = self.post(routes::ASK_REDUCE, &req).await?;
        Ok(reply.into_assignment())
    }

    async fn reduce_task_over(&self, task_id: TaskId, worker: &WorkerHandle) -> Result<()> {
        let req = TaskOverRequest {
            task_id,
            worker: Some(worker.clone()),
        };
        let _: TaskOverReply = self.post(routes::REDUCE_DONE, &req).await?;
        Ok(())
    }
}
