mod api;
mod cli;
mod config;
mod gateway;
mod guard;
mod logging;
mod session;
mod storage;
mod transport;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(
    name = "gold-admin",
    about = "Back-office console for the gold marketplace"
)]
pub struct Args {
    #[arg(long, env = "GOLD_ADMIN_BASE_URL", help = "API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Directory holding the saved session")]
    pub storage_dir: Option<PathBuf>,

    #[arg(long, help = "Keep the session in memory only")]
    pub ephemeral: bool,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<cli::Command>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init_logging(args.debug)?;

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI and environment override files
    if let Some(base_url) = &args.base_url {
        cfg.base_url = Some(base_url.clone());
    }
    if let Some(dir) = &args.storage_dir {
        cfg.storage_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error {}", e);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} problem(s))",
            errors.len()
        ));
    }

    tracing::debug!(
        base_url = cfg.base_url(),
        content_base_url = cfg.content_base_url(),
        with_credentials = cfg.with_credentials(),
        allowed_roles = ?cfg.allowed_roles(),
        "configuration loaded"
    );

    let storage: Box<dyn storage::Storage> = if args.ephemeral {
        Box::new(storage::MemoryStorage::new())
    } else {
        match &cfg.storage_dir {
            Some(dir) => Box::new(storage::FileStorage::new(dir)),
            None => Box::new(storage::FileStorage::default_location()),
        }
    };

    let session = Rc::new(session::SessionStore::open(storage));
    let gateway = gateway::Gateway::new(
        cfg.base_url(),
        session.clone(),
        Box::new(transport::UreqTransport::new(cfg.with_credentials())),
    );
    let guard = guard::RouteGuard::new(session, guard::RoleAllowList::new(cfg.allowed_roles()));

    let ctx = cli::Context {
        config: cfg,
        gateway,
        guard,
        json: args.json,
    };

    match args.command {
        None | Some(cli::Command::Shell) => cli::run_repl(ctx),
        Some(command) => cli::run_once(&ctx, command),
    }
}
