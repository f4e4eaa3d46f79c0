mod http_client;
mod image_io;
mod server;

use http_client::HttpTransport;
use server::HttpServer;

use anyhow::{Context, Result};
use blind_sobel::EdgeConfig;
use blind_sobel::crypto::Encoding;
use blind_sobel::crypto::paillier::{PaillierPublic, PaillierSecret};
use blind_sobel::protocol::{DetectionMode, EdgeClient, EdgeWorker};
use blind_sobel::telemetry::LogTelemetry;
use clap::{Args, Parser, Subcommand, ValueEnum};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "blind-sobel-node",
    about = "Sobel edge detection, optionally over encrypted pixels"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an edge detection worker over HTTP
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,

        /// Reject encrypted requests with 501
        #[arg(long)]
        plaintext_only: bool,

        #[command(flatten)]
        tuning: Tuning,
    },
    /// Detect the edges of a local image with a remote worker
    Detect {
        /// Worker base URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,

        /// Square input image
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "result.png")]
        output: PathBuf,

        /// Keep pixels hidden from the worker
        #[arg(long)]
        encrypted: bool,

        /// Numeric encoding of encrypted pixels
        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,

        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args)]
struct Tuning {
    /// JSON file with an EdgeConfig; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    chunk_size: Option<usize>,

    /// Dedicated worker threads instead of one per core
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    modulus_bits: Option<u32>,
}

impl Tuning {
    fn resolve(&self) -> Result<EdgeConfig> {
        let mut config = match &self.config {
            Some(path) => EdgeConfig::from_json_file(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => EdgeConfig::default(),
        };
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if let Some(bits) = self.modulus_bits {
            config.modulus_bits = bits;
        }
        Ok(config.try_with()?)
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum EncodingArg {
    Integer,
    Fractional,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Integer => Encoding::Integer,
            EncodingArg::Fractional => Encoding::Fractional,
        }
    }
}

fn main() -> Result<()> {
    // Log to stderr (if you run with `RUST_LOG=debug`).
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            addr,
            plaintext_only,
            tuning,
        } => {
            let config = tuning.resolve()?;
            let telemetry = Arc::new(LogTelemetry);
            let worker = if plaintext_only {
                EdgeWorker::<PaillierPublic>::plaintext_only(&config, telemetry)?
            } else {
                EdgeWorker::<PaillierPublic>::new(&config, telemetry)?
            };

            let server = HttpServer::new(&addr, worker)?;
            log::info!(
                "listening on {} (encrypted requests {})",
                server.addr().map(|a| a.to_string()).unwrap_or(addr),
                if plaintext_only { "disabled" } else { "enabled" }
            );
            server.serve();
            Ok(())
        }
        Command::Detect {
            server,
            input,
            output,
            encrypted,
            encoding,
            tuning,
        } => {
            let config = tuning.resolve()?;
            let mode = if encrypted {
                DetectionMode::Encrypted(encoding.map(Encoding::from).unwrap_or(config.encoding))
            } else {
                DetectionMode::Plaintext
            };

            let grid = image_io::load_grid(&input)?;
            let client: EdgeClient<_, PaillierSecret> =
                EdgeClient::new(HttpTransport::new(&server), config, Arc::new(LogTelemetry))?;

            let started = Instant::now();
            let edges = client.detect(&grid, mode)?;
            log::info!(
                "{}x{} image processed in {:?} ({:?})",
                grid.side(),
                grid.side(),
                started.elapsed(),
                mode
            );

            image_io::save_pixels(&output, grid.side(), edges)?;
            Ok(())
        }
    }
}
