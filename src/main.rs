use clap::Parser;
use serial_line_relay::config::{Config, ConfigError, ConfigLoader, DeletePolicy};
use serial_line_relay::port::{list_ports, SystemPortOpener};
use serial_line_relay::queue::append_lines;
use serial_line_relay::{logging, LineRelay, RelaySettings};
use std::path::PathBuf;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Relays queued lines from a text file to a serial device.",
    long_about = "Reads the queue file, sends each line followed by a newline to the serial port, and rewrites the file after every line so it only holds what is still pending."
)]
struct Args {
    /// Configuration file. Overrides the standard lookup locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Queue file to relay.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Serial port name, e.g. COM9 or /dev/ttyUSB0.
    #[arg(short, long)]
    port: Option<String>,

    /// When to drop a line from the queue file: after-attempt or after-success.
    #[arg(long)]
    delete_policy: Option<DeletePolicy>,

    /// Append these lines to the queue file and exit without relaying.
    #[arg(long, value_name = "LINE", num_args = 1..)]
    enqueue: Vec<String>,

    /// List the serial ports visible to the system and exit.
    #[arg(long)]
    list_ports: bool,

    /// Enable debug logging for the relay.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let loader = match args.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();

    if let Some(ref file) = args.file {
        config.relay.queue_file = file.clone();
    }
    if let Some(ref port) = args.port {
        config.serial.port = port.clone();
    }
    if let Some(policy) = args.delete_policy {
        config.relay.delete_policy = policy;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A broken config aborts before any queue file is touched.
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.logging, args.verbose) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    if args.list_ports {
        for name in list_ports()? {
            println!("{}", name);
        }
        return Ok(());
    }

    if !args.enqueue.is_empty() {
        let queue_file = &config.relay.queue_file;
        if let Err(e) = append_lines(queue_file, args.enqueue.iter().map(String::as_str)) {
            tracing::error!(error = %e, "enqueue failed");
            std::process::exit(1);
        }
        tracing::info!(
            path = %queue_file.display(),
            lines = args.enqueue.len(),
            "lines enqueued"
        );
        return Ok(());
    }

    let mut relay = LineRelay::new(SystemPortOpener, RelaySettings::from(&config));
    let report = relay.run();
    tracing::debug!(?report, "run complete");

    Ok(())
}
