use mio::Poll;
use server_proxy::{config, error::Result, server_manager::ServerManager, signal};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!(
            "usage: {} <config-file>",
            args.first().map(String::as_str).unwrap_or("server")
        );
        std::process::exit(1);
    }

    let configs = match config::load_config(std::path::Path::new(&args[1])) {
        Ok(configs) => configs,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    config::display_config(&configs);
    signal::install();

    let poll = Poll::new()?;
    let mut manager = ServerManager::new(configs, &poll)?;
    manager.run(poll)
}
