//! Context binary tool
//!
//! Inspect, build and unpack context binary containers on disk.
//!
//! Usage:
//!   accel_ctx_tool inspect <FILE> [--json]
//!   accel_ctx_tool wrap <RAW> <OUT> [--signature SIG]
//!   accel_ctx_tool extract <CONTAINER> <OUT>

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};

use accel_context::binary;

/// Context binary container utility
#[derive(Parser)]
#[command(name = "accel_ctx_tool")]
#[command(about = "Inspect, build and unpack accelerator context binaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a container and print its header
    Inspect {
        file: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Wrap a raw native context binary into a container
    Wrap {
        raw: PathBuf,
        out: PathBuf,
        /// Signature to embed (default: "manual")
        #[arg(long, default_value = "manual")]
        signature: String,
    },
    /// Write the payload of a container to a file
    Extract { container: PathBuf, out: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: &Commands) -> Result<(), String> {
    match command {
        Commands::Inspect { file, json } => {
            let report = inspect(file)?;
            if *json {
                let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
                println!("{}", text);
            } else {
                println!("File:           {}", file.display());
                println!("Container size: {} bytes", report["container_size"]);
                println!("Signature:      {}", report["signature"].as_str().unwrap_or_default());
                println!("Payload size:   {} bytes", report["payload_size"]);
                println!(
                    "Payload SHA256: {}",
                    report["payload_sha256"].as_str().unwrap_or_default()
                );
            }
        }
        Commands::Wrap { raw, out, signature } => {
            let payload = read(raw)?;
            let container = binary::encode(signature, &payload);
            write(out, &container)?;
            log::info!(
                "Wrapped {} bytes into {} ({} bytes)",
                payload.len(),
                out.display(),
                container.len()
            );
        }
        Commands::Extract { container, out } => {
            let data = read(container)?;
            let info =
                binary::decode(&data).map_err(|e| format!("{}: {}", container.display(), e))?;
            write(out, info.payload)?;
            log::info!("Extracted {} payload bytes to {}", info.payload.len(), out.display());
        }
    }
    Ok(())
}

/// Decode a container file into a summary of its header and payload.
fn inspect(file: &Path) -> Result<serde_json::Value, String> {
    let data = read(file)?;
    let info = binary::decode(&data).map_err(|e| format!("{}: {}", file.display(), e))?;

    Ok(serde_json::json!({
        "file": file.display().to_string(),
        "container_size": data.len(),
        "signature": info.signature,
        "payload_size": info.payload.len(),
        "payload_sha256": hex(&Sha256::digest(info.payload)),
    }))
}

fn read(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn write(path: &Path, data: &[u8]) -> Result<(), String> {
    fs::write(path, data).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
