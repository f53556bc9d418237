use clap::error::ErrorKind;
use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "UDP server for two-player Prší", long_about = None)]
struct Args {
    /// IP address to bind to
    address: IpAddr,

    /// UDP port to listen on
    port: u16,

    /// Seconds of silence before a player is marked disconnected
    #[arg(long, default_value_t = 10)]
    short_timeout: u64,

    /// Seconds of silence before a disconnected player forfeits
    #[arg(long, default_value_t = 60)]
    long_timeout: u64,

    /// Seconds between liveness sweeps
    #[arg(long, default_value_t = 5)]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        short_threshold: Duration::from_secs(args.short_timeout),
        long_threshold: Duration::from_secs(args.long_timeout),
        sweep_interval: Duration::from_secs(args.sweep_interval),
        ..ServerConfig::default()
    };
    let addr = SocketAddr::new(args.address, args.port);

    let server = match Server::bind(addr, config).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
