use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dashd::api::{App, AppOptions};
use dashd::inspect;
use dashd::metrics::SharedMetrics;
use dashd::server;
use dashd::store::{ConnectOptions, KillTarget, RedisStore, Store};

#[derive(Parser, Debug)]
#[clap(name = "dashd", about = "Backend of the Redis inspection dashboard")]
struct Opt {
    /// URL of the Redis server to inspect
    #[clap(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Host to bind to
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[clap(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// How many times to try to reach Redis at startup
    #[clap(long, default_value = "10")]
    connect_attempts: u32,

    /// Skip writing the test:connection probe key after connecting
    #[clap(long)]
    no_probe: bool,

    /// Add sample keys of every type when a stats request finds the store empty
    #[clap(long, env = "SEED_SAMPLE_DATA")]
    seed_sample_data: bool,

    /// Maximum log level
    #[clap(long, default_value = "info")]
    log_level: Level,

    /// Inspect the store from the terminal instead of serving the API
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show server statistics
    Stats,
    /// List connected clients
    Clients,
    /// List keys, one page at a time
    Keys {
        /// Only show keys containing this text (case-insensitive)
        #[clap(long, default_value = "")]
        search: String,

        #[clap(long, default_value = "1")]
        page: usize,

        #[clap(long, default_value = "10")]
        per_page: usize,
    },
    /// Show type, value and TTL of a key
    Key { name: String },
    /// Disconnect a client by id, or by address when no id is given
    Kill {
        #[clap(long)]
        id: Option<String>,

        #[clap(long)]
        addr: Option<String>,
    },
}

pub fn setup_tracing(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let opt = Opt::parse();

    setup_tracing(opt.log_level);

    let connect = ConnectOptions {
        attempts: opt.connect_attempts,
        probe: !opt.no_probe && opt.command.is_none(),
    };
    let store = RedisStore::connect(&opt.redis_url, &connect).await;

    match opt.command {
        None => serve(opt.host, opt.port, opt.seed_sample_data, store).await,
        Some(command) => {
            println!("{}", run_command(command, &store).await?);
            Ok(())
        }
    }
}

async fn serve(host: String, port: u16, seed_sample_data: bool, store: RedisStore) -> Result<()> {
    let metrics = SharedMetrics::new()?;
    let app = App::new(Arc::new(store), metrics, AppOptions { seed_sample_data });

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Starting dashd on {}:{}", host, port);

    server::run(listener, app, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_command(command: Command, store: &dyn Store) -> Result<String> {
    match command {
        Command::Stats => inspect::stats_report(store).await,
        Command::Clients => inspect::clients_report(store).await,
        Command::Keys {
            search,
            page,
            per_page,
        } => inspect::keys_report(store, &search, page, per_page).await,
        Command::Key { name } => inspect::key_report(store, &name).await,
        Command::Kill { id, addr } => {
            let target = match (id, addr) {
                (Some(id), _) => KillTarget::Id(id),
                (None, Some(addr)) => KillTarget::Addr(addr),
                (None, None) => anyhow::bail!("either --id or --addr is required"),
            };
            inspect::kill_report(store, &target).await
        }
    }
}
