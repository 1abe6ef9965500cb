//! tether - outbox を端末から操作するデモ CLI
//!
//! キューは `--data-dir` の下に保存され、配送先は同じディレクトリの
//! `delivered.jsonl` です。`--offline` で投入すると配送されずに残り、
//! 次に `flush` したときに順番どおり送られます。

mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use tether_core::config::OutboxConfig;
use tether_core::domain::{JobId, ReasonCode, VisitorRecord};
use tether_core::impls::FileStorage;
use tether_core::observability::init_tracing;
use tether_core::{DrainOutcome, Outbox, OutboxBuilder};

use remote::JsonlRemoteStore;

/// Offline outbox demo
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Queue records offline and deliver them in order once online")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the queue and the delivery sink
    #[arg(long, default_value = ".tether", global = true)]
    data_dir: PathBuf,

    /// JSON config file (see OutboxConfig)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat the remote store as unreachable
    #[arg(long, global = true)]
    offline: bool,

    /// Make every delivery fail with this reason
    #[arg(long, value_enum, global = true)]
    fail_with: Option<FailWith>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a visitor record
    Submit {
        /// Visit date (YYYY-MM-DD)
        fecha: String,
        nombre: String,
        localidad: String,
        #[arg(long, default_value_t = 0)]
        adultos: u32,
        #[arg(long, default_value_t = 0)]
        menores: u32,
        #[arg(long, default_value_t = 0)]
        jubi_pens: u32,
    },
    /// Show queue counters
    Status,
    /// List queued jobs in delivery order
    List,
    /// Run a manual drain (also retries quarantined jobs)
    Flush,
    /// Drop a job without delivering it
    Discard { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailWith {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Network,
    Timeout,
    Server,
}

impl From<FailWith> for ReasonCode {
    fn from(f: FailWith) -> Self {
        match f {
            FailWith::Unauthorized => ReasonCode::Unauthorized,
            FailWith::Forbidden => ReasonCode::Forbidden,
            FailWith::NotFound => ReasonCode::NotFound,
            FailWith::Validation => ReasonCode::ValidationRejected,
            FailWith::Network => ReasonCode::Network,
            FailWith::Timeout => ReasonCode::Timeout,
            FailWith::Server => ReasonCode::Server,
        }
    }
}

async fn open(cli: &Cli) -> Result<Outbox, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => OutboxConfig::from_path(path)?,
        None => OutboxConfig::default(),
    };
    // one-shot process: a transient failure is retried by the next invocation
    config.auto_retry = false;

    tokio::fs::create_dir_all(&cli.data_dir).await?;
    let remote = JsonlRemoteStore::new(
        cli.data_dir.join("delivered.jsonl"),
        cli.fail_with.map(ReasonCode::from),
    );

    let outbox = OutboxBuilder::new()
        .config(config)
        .storage(Arc::new(FileStorage::new(&cli.data_dir)))
        .remote_store(Arc::new(remote))
        .initially_online(!cli.offline)
        .build()
        .await?;
    debug!(data_dir = %cli.data_dir.display(), offline = cli.offline, "Outbox opened");
    Ok(outbox)
}

async fn print_status(outbox: &Outbox) -> Result<(), Box<dyn std::error::Error>> {
    let status = outbox.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let outbox = open(&cli).await?;

    match &cli.command {
        Command::Submit {
            fecha,
            nombre,
            localidad,
            adultos,
            menores,
            jubi_pens,
        } => {
            let fecha = VisitorRecord::parse_fecha(fecha)?;
            let record =
                VisitorRecord::new(fecha, nombre, localidad, *adultos, *menores, *jubi_pens)?;
            let id = outbox.submit(record).await;
            outbox.wait_idle().await;
            println!("queued {id}");
            print_status(&outbox).await?;
        }
        Command::Status => print_status(&outbox).await?,
        Command::List => {
            for job in outbox.jobs().await {
                let payload = job.payload();
                println!(
                    "{}  {:<11}  attempts={}  {} / {} ({})  {}",
                    job.id,
                    format!("{:?}", job.state()).to_lowercase(),
                    job.attempts,
                    payload.fecha,
                    payload.nombre,
                    payload.localidad,
                    job.last_error.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Flush => {
            let report = outbox.flush_now().await;
            match &report.outcome {
                DrainOutcome::Skipped(reason) => println!("skipped: {reason:?}"),
                DrainOutcome::Exhausted => println!("delivered {}, queue empty", report.delivered),
                DrainOutcome::Failed {
                    job_id,
                    class,
                    quarantined,
                } => println!(
                    "delivered {}, stopped at {job_id} ({class:?}, quarantined={quarantined})",
                    report.delivered
                ),
                DrainOutcome::Blocked { job_id } => println!("blocked at {job_id}"),
            }
            print_status(&outbox).await?;
        }
        Command::Discard { id } => {
            let id: JobId = id.parse()?;
            if outbox.discard(id).await {
                println!("discarded {id}");
            } else {
                println!("no such job: {id}");
            }
        }
    }

    outbox.shutdown().await;
    Ok(())
}
