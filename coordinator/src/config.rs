use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::{glob, Pattern};

use crate::scheduler::DEFAULT_LEASE_TIMEOUT;

/// Configuración del coordinador (flags o variables de entorno).
#[derive(Debug, Clone, Parser)]
#[command(name = "coordinator", about = "Coordinador MapReduce: reparte tareas de map y reduce")]
pub struct CoordinatorConfig {
    /// Dirección donde escucha el servidor HTTP
    #[arg(long, env = "MR_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Cantidad de particiones intermedias (= tareas de reduce)
    #[arg(
        long = "n-reduce",
        env = "MR_N_REDUCE",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub n_reduce: u32,

    /// Segundos sin reporte tras los cuales una tarea en curso se reasigna
    #[arg(
        long = "lease-timeout-secs",
        env = "MR_LEASE_TIMEOUT_SECS",
        default_value_t = DEFAULT_LEASE_TIMEOUT.as_secs_f64()
    )]
    pub lease_timeout_secs: f64,

    /// Cada cuánto se revisa si el job terminó
    #[arg(long = "done-poll-ms", env = "MR_DONE_POLL_MS", default_value_t = 1000)]
    pub done_poll_ms: u64,

    /// Cuánto sigue atendiendo el servidor después de terminar el job
    #[arg(long = "linger-secs", env = "MR_LINGER_SECS", default_value_t = 3)]
    pub linger_secs: u64,

    /// Directorio base de las entradas (por defecto, el directorio actual)
    #[arg(long = "input-dir", env = "MR_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Archivos o patrones glob de entrada, relativos a --input-dir
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,
}

impl CoordinatorConfig {
    pub fn lease_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.lease_timeout_secs)
            .with_context(|| format!("lease timeout inválido: {}", self.lease_timeout_secs))
    }

    pub fn done_poll(&self) -> Duration {
        Duration::from_millis(self.done_poll_ms.max(1))
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }

    /// Directorio base absoluto, que viaja a los workers como `input_ref`.
    pub fn input_base(&self) -> Result<PathBuf> {
        let cwd = env::current_dir().context("no se pudo leer el directorio actual")?;
        Ok(match &self.input_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        })
    }

    pub fn input_ref(&self) -> Result<String> {
        Ok(self.input_base()?.to_string_lossy().to_string())
    }

    /// Expande los patrones contra el directorio base. Cada archivo queda
    /// como nombre relativo a la base; el orden es el de los patrones y,
    /// dentro de cada uno, alfabético.
    pub fn resolve_inputs(&self) -> Result<Vec<String>> {
        resolve_inputs(&self.input_base()?, &self.inputs)
    }
}

pub fn resolve_inputs(base: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let escaped_base = PathBuf::from(Pattern::escape(&base.to_string_lossy()));
    let mut files: Vec<String> = Vec::new();

    for pattern in patterns {
        let full = escaped_base.join(pattern);
        let full = full.to_string_lossy();
        let mut matched = 0;

        for entry in glob(&full).with_context(|| format!("patrón de entrada inválido: {pattern}"))? {
            let path = entry.with_context(|| format!("no se pudo leer una entrada de {pattern}"))?;
            if !path.is_file() {
                continue;
            }
            let name = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            matched += 1;
            if !files.contains(&name) {
                files.push(name);
            }
        }

        if matched == 0 {
            bail!("ningún archivo coincide con {pattern} en {}", base.display());
        }
    }

    Ok(files)
}
