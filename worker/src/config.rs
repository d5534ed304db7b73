use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use common::{apps, Application, WorkerHandle};

use crate::agent::AgentOptions;

/// Configuración del worker (flags o variables de entorno).
#[derive(Debug, Clone, Parser)]
#[command(name = "worker", about = "Worker MapReduce: ejecuta tareas de map y reduce")]
pub struct WorkerConfig {
    /// URL base del coordinador
    #[arg(long = "coordinator-url", env = "MR_COORDINATOR_URL", default_value = "http://localhost:8080")]
    pub coordinator_url: String,

    /// Aplicación a ejecutar (wc, indexer)
    #[arg(long, env = "MR_APP", default_value = "wc")]
    pub app: String,

    /// Directorio donde este worker deja sus intermedios; es su handle.
    /// Por defecto, uno nuevo bajo el temporal del sistema.
    #[arg(long = "work-dir", env = "MR_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directorio donde se publican los mr-out-*
    #[arg(long = "output-dir", env = "MR_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long = "backoff-min-ms", env = "MR_BACKOFF_MIN_MS", default_value_t = 50)]
    pub backoff_min_ms: u64,

    #[arg(long = "backoff-max-ms", env = "MR_BACKOFF_MAX_MS", default_value_t = 1000)]
    pub backoff_max_ms: u64,

    /// Fallos seguidos pidiendo tarea antes de dar al coordinador por caído
    #[arg(long = "max-ask-failures", env = "MR_MAX_ASK_FAILURES", default_value_t = 20)]
    pub max_ask_failures: u32,

    /// Timeout de cada llamada HTTP
    #[arg(long = "rpc-timeout-secs", env = "MR_RPC_TIMEOUT_SECS", default_value_t = 5)]
    pub rpc_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn application(&self) -> Result<Application> {
        apps::lookup(&self.app).ok_or_else(|| {
            anyhow!(
                "aplicación desconocida {:?} (disponibles: {})",
                self.app,
                apps::names().join(", ")
            )
        })
    }

    /// Handle del worker: su directorio de trabajo, absoluto.
    pub fn handle(&self) -> Result<WorkerHandle> {
        let dir = match &self.work_dir {
            Some(dir) => absolute(dir)?,
            None => env::temp_dir().join(default_work_dir_name()),
        };
        Ok(WorkerHandle::from_path(&dir))
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        absolute(&self.output_dir)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs.max(1))
    }

    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            backoff_min: Duration::from_millis(self.backoff_min_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
            max_ask_failures: self.max_ask_failures.max(1),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("no se pudo leer el directorio actual")?;
    Ok(cwd.join(path))
}

/// `mr-worker-<host>-<pid>`: distinto por proceso aunque compartan máquina.
fn default_work_dir_name() -> String {
    let host = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let host = if host.is_empty() { "local".to_string() } else { host };
    format!("mr-worker-{}-{}", host, process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_coinciden_con_lo_documentado() {
        let cfg = WorkerConfig::try_parse_from(["worker"]).unwrap();
        assert_eq!(cfg.application().unwrap().name, "wc");

        let opts = cfg.agent_options();
        assert_eq!(opts.backoff_min, Duration::from_millis(50));
        assert_eq!(opts.backoff_max, Duration::from_secs(1));
        assert_eq!(opts.max_ask_failures, 20);

        let handle = cfg.handle().unwrap();
        assert!(handle.to_path_buf().is_absolute());
        assert!(handle.as_str().contains(&process::id().to_string()));
    }

    #[test]
    fn directorios_explicitos_quedan_absolutos() {
        let cfg = WorkerConfig::try_parse_from([
            "worker",
            "--app",
            "indexer",
            "--work-dir",
            "/tmp/w1",
            "--output-dir",
            "out",
        ])
        .unwrap();

        assert_eq!(cfg.application().unwrap().name, "indexer");
        assert_eq!(cfg.handle().unwrap(), WorkerHandle::new("/tmp/w1"));
        assert_eq!(cfg.output_dir().unwrap(), env::current_dir().unwrap().join("out"));
    }

    #[test]
    fn app_desconocida_lista_las_disponibles() {
        let cfg = WorkerConfig::try_parse_from(["worker", "--app", "grep"]).unwrap();
        let err = cfg.application().unwrap_err().to_string();
        assert!(err.contains("grep"));
        assert!(err.contains("wc, indexer"));
    }
}
