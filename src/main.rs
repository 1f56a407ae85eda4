use clap::Parser;
use tracing::{debug, error, info, warn};

use livelite::config::Config;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let cfg = match Config::parse(args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    livelite::log::set(format!(
        "livelite={},livekit={},storage={},signal={},tower_http={}",
        cfg.log.level, cfg.log.level, cfg.log.level, cfg.log.level, cfg.log.level
    ));

    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = match tokio::net::TcpListener::bind(cfg.http.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bind {} failed: {}", cfg.http.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = livelite::serve(cfg, listener, signal::shutdown_signal()).await {
        error!("Application error: {e:#}");
        std::process::exit(1);
    }
    info!("Server shutdown");
}
