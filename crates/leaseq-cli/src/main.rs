mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;

use leaseq_core::app::config::{
    DEFAULT_BACKLOG, DEFAULT_BACKUP_PATH, DEFAULT_HOST, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT,
    DEFAULT_READ_IDLE_TIMEOUT, DEFAULT_TASK_TIMEOUT,
};
use leaseq_core::impls::JsonFileSnapshotStore;
use leaseq_core::ports::SnapshotStore;
use leaseq_core::{BrokerBuilder, BrokerConfig, Client, Server};

#[derive(Debug, Parser)]
#[command(name = "leaseq", version, about = "Task queue broker with lease-based delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the broker
    Serve(ServeArgs),
    /// Send one request to a running broker and print the reply
    Call(CallArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(env = "LEASEQ_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, env = "LEASEQ_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Path of the JSON snapshot
    #[arg(long, env = "LEASEQ_BACKUP_PATH", default_value = DEFAULT_BACKUP_PATH)]
    backup_path: PathBuf,

    /// Seconds before an unacknowledged lease is reclaimed
    #[arg(long, env = "LEASEQ_TASK_TIMEOUT", default_value_t = DEFAULT_TASK_TIMEOUT.as_secs())]
    task_timeout: u64,

    /// Pending-connection backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,

    /// Milliseconds of read inactivity that end a request
    #[arg(long, default_value_t = DEFAULT_READ_IDLE_TIMEOUT.as_millis() as u64)]
    read_idle_ms: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_REQUEST_BYTES)]
    max_request_bytes: usize,

    /// Delete the snapshot on clean shutdown
    #[arg(long)]
    remove_backup_on_exit: bool,
}

impl ServeArgs {
    fn into_config(self) -> BrokerConfig {
        BrokerConfig {
            host: self.host,
            port: self.port,
            backup_path: self.backup_path,
            task_timeout: Duration::from_secs(self.task_timeout),
            backlog: self.backlog,
            read_idle_timeout: Duration::from_millis(self.read_idle_ms),
            max_request_bytes: self.max_request_bytes,
            remove_backup_on_exit: self.remove_backup_on_exit,
        }
    }
}

#[derive(Debug, Args)]
struct CallArgs {
    /// Broker address
    #[arg(long, env = "LEASEQ_ADDR", default_value = "127.0.0.1:5555")]
    addr: String,

    /// Request words, e.g. `ADD greetings 5 hello`
    #[arg(required = true)]
    words: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Serve(args) => serve(args.into_config()).await,
        Commands::Call(args) => call(args).await,
    }
}

async fn serve(config: BrokerConfig) -> Result<()> {
    let snapshots = Arc::new(JsonFileSnapshotStore::new(&config.backup_path));
    let broker = BrokerBuilder::new(snapshots.clone())
        .task_timeout(config.task_timeout)
        .build()
        .await
        .with_context(|| format!("failed to restore {}", config.backup_path.display()))?;

    let server = Server::bind(&config, broker)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen_addr()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("ctrl-c received");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for ctrl-c");
                // keep the sender alive so the server keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    server.run(shutdown_rx).await;

    if config.remove_backup_on_exit {
        snapshots
            .remove()
            .await
            .context("failed to remove backup")?;
    }
    tracing::info!("stopped");
    Ok(())
}

async fn call(args: CallArgs) -> Result<()> {
    let request = args.words.join(" ");
    let reply = Client::new(&args.addr)
        .send_raw(request.as_bytes())
        .await
        .with_context(|| format!("request to {} failed", args.addr))?;

    let reply = String::from_utf8_lossy(&reply);
    println!("{reply}");
    if reply.starts_with("ERR") {
        bail!("broker rejected the request");
    }
    Ok(())
}
