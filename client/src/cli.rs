use std::fmt::Write as _;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::rpc::routes;
use common::{JobDoneReply, JobStatus, PhaseStatus, TaskState};
use reqwest::Client;

#[derive(Parser)]
#[command(name = "mrctl")]
#[command(about = "CLI simple para supervisar al coordinador MapReduce")]
struct Cli {
    /// URL base del coordinador
    #[arg(long = "coordinator-url", env = "MR_COORDINATOR_URL", default_value = "http://localhost:8080")]
    coordinator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Muestra el estado de las tareas de map y reduce
    Status {
        /// Imprime el JSON tal cual lo devuelve el coordinador
        #[arg(long)]
        json: bool,
    },
    /// Sale con código 0 si el job terminó y 1 si no
    Done,
    /// Espera a que el job termine
    Wait {
        #[arg(long = "interval-ms", default_value_t = 1000)]
        interval_ms: u64,

        /// Tiempo máximo de espera (sin límite si no se indica)
        #[arg(long = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("no se pudo crear el cliente HTTP")?;
    let base_url = cli.coordinator_url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Status { json } => {
            let status = fetch_status(&client, &base_url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", render_status(&status));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Done => {
            let done = fetch_done(&client, &base_url).await?;
            println!("{}", if done { "terminado" } else { "en curso" });
            Ok(if done { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Wait {
            interval_ms,
            timeout_secs,
        } => {
            let start = Instant::now();
            let deadline = timeout_secs.map(Duration::from_secs);
            loop {
                if fetch_done(&client, &base_url).await? {
                    println!("job terminado en {:.1}s", start.elapsed().as_secs_f64());
                    return Ok(ExitCode::SUCCESS);
                }
                if deadline.is_some_and(|d| start.elapsed() >= d) {
                    bail!("el job no terminó en {}s", timeout_secs.unwrap_or_default());
                }
                tokio::time::sleep(Duration::from_millis(interval_ms.max(1))).await;
            }
        }
    }
}

async fn fetch_status(client: &Client, base_url: &str) -> Result<JobStatus> {
    let url = format!("{}{}", base_url, routes::JOB_STATUS);
    client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo contactar al coordinador en {base_url}"))?
        .error_for_status()?
        .json()
        .await
        .context("respuesta de estado inválida")
}

async fn fetch_done(client: &Client, base_url: &str) -> Result<bool> {
    let url = format!("{}{}", base_url, routes::JOB_DONE);
    let reply: JobDoneReply = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo contactar al coordinador en {base_url}"))?
        .error_for_status()?
        .json()
        .await
        .context("respuesta inválida de job/done")?;
    Ok(reply.done)
}

fn render_status(status: &JobStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Job: {}",
        if status.done { "terminado" } else { "en curso" }
    );
    let _ = writeln!(out, "  particiones: {}", status.partition_count);
    let _ = writeln!(out, "  lease: {} ms", status.lease_timeout_ms);
    let _ = writeln!(out, "  iniciado: {}", status.started_at);
    if let Some(end) = status.finished_at {
        let ms = (end - status.started_at).num_milliseconds();
        let _ = writeln!(out, "  finalizado: {} ({} ms)", end, ms);
    }
    render_phase(&mut out, "map", &status.map);
    render_phase(&mut out, "reduce", &status.reduce);
    out
}

fn render_phase(out: &mut String, name: &str, phase: &PhaseStatus) {
    let done = phase.total - phase.remaining;
    if phase.total > 0 {
        let pct = done as f64 * 100.0 / phase.total as f64;
        let _ = writeln!(out, "  {}: {}/{} ({:.1}%)", name, done, phase.total, pct);
    } else {
        let _ = writeln!(out, "  {}: (sin tareas)", name);
    }

    for task in &phase.tasks {
        let state = match task.state {
            TaskState::Idle => "IDLE",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Completed => "COMPLETED",
        };
        let worker = task.worker.as_ref().map(|w| w.as_str()).unwrap_or("-");
        match task.lease_age_ms {
            Some(age) => {
                let _ = writeln!(out, "    {:>4} {:<11} {} ({} ms)", task.id, state, worker, age);
            }
            None => {
                let _ = writeln!(out, "    {:>4} {:<11} {}", task.id, state, worker);
            }
        }
    }
}
