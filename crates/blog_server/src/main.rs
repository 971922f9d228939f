//! Blog RPC server entry point.
//!
//! # Responsibility
//! - Resolve configuration from `BLOG_*` variables and command-line flags.
//! - Open the store once and serve until an interrupt arrives.

use blog_core::init_logging;
use blog_rpc::{BlogServer, ServerConfig, Store};
use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Blog post RPC server.
#[derive(Parser)]
#[command(name = "blog_server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on (overrides BLOG_LISTEN_ADDR)
    #[arg(short, long)]
    listen: Option<String>,

    /// SQLite database file (overrides BLOG_DB_PATH)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (overrides BLOG_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute log directory (overrides BLOG_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, Box<dyn Error>> {
        let mut config = ServerConfig::from_env()?;
        if let Some(addr) = self.listen {
            config = config.with_listen_addr(&addr)?;
        }
        if let Some(path) = self.db {
            config = config.with_db_path(path);
        }
        if let Some(level) = self.log_level {
            config = config.with_log_level(level);
        }
        if let Some(dir) = self.log_dir {
            config = config.with_log_dir(dir);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Args::parse().into_config()?;
    init_logging(&config.log_level, &config.log_dir)?;

    let store = match Store::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(
                "event=store_open module=server status=error path={} error={}",
                config.db_path.display(),
                err
            );
            return Err(err.into());
        }
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    println!("Server started on {}...", listener.local_addr()?);

    BlogServer::new(store)
        .serve_with_shutdown(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("event=signal module=server status=error error={}", err);
                return;
            }
            info!("event=signal module=server status=ok signal=interrupt");
            println!("Received interrupt signal, commencing graceful shutdown.");
        })
        .await?;

    println!("Shutdown complete, goodbye.");
    Ok(())
}
