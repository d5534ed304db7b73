pub mod apps;
pub mod artifact;
pub mod handle;
pub mod indexer;
pub mod kv;
pub mod rpc;
pub mod task;
pub mod wordcount;

pub use apps::Application;
pub use handle::WorkerHandle;
pub use kv::{KeyValue, MapFn, ReduceFn};
pub use rpc::{
    AskMapTaskReply, AskReduceTaskReply, AskTaskRequest, JobDoneReply, JobStatus, MapTask,
    PhaseStatus, ReduceTask, TaskOverReply, TaskOverRequest, TaskView, NO_TASK,
};
pub use task::{Assignment, Phase, TaskId, TaskState};
