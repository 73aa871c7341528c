use log::{error, info};
use std::env;
use std::path::Path;
use std::process;
use webby::{logging, FileHandler, Router, Server, ServerConfig, ServerResult};

fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("webby: {}", e);
        process::exit(1);
    }
}

fn run() -> ServerResult<()> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let config = if args.len() > 1 && Path::new(&args[1]).exists() {
        // Load configuration from file
        ServerConfig::from_json_file(&args[1])?
    } else {
        // Use default configuration
        ServerConfig::new()
    };

    logging::init(config.level_filter()?)?;

    // The loop never returns on its own, so Ctrl-C just ends the process
    ctrlc::set_handler(|| {
        info!("Received shutdown signal. Stopping server...");
        process::exit(0);
    })
    .map_err(|e| webby::ServerError::Config(format!("signal handler: {}", e)))?;

    let mut router = Router::new();
    router.add("/", FileHandler::new(&config.document_root));

    info!(
        "Starting server on {} serving {}",
        config.socket_address(),
        config.document_root.display()
    );
    let server = Server::new(config, router)?;
    server.run()
}
