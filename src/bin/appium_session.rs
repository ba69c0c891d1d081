//! Appium session negotiation CLI binary.
//!
//! Dialect-negotiating WebDriver/Appium session client.
//!
//! # Commands
//!
//! - `negotiate` - Create a session against a running server
//! - `inspect` - Print the candidate request bodies without network contact
//! - `routes` - List the command routes for a dialect

use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use appium_session::{
    negotiate::{CandidateStream, Dialect},
    Capabilities, CommandCodec, Config, Handshake, PayloadStore, TransformPipeline, VERSION,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "appium-session")]
#[command(author = "Appium Session Contributors")]
#[command(version = VERSION)]
#[command(about = "WebDriver/Appium session negotiation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate a session against a running server
    Negotiate {
        /// Capability JSON (or - for stdin)
        input: Option<String>,

        /// Input file path
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Server base URL (overrides config)
        #[arg(short, long)]
        server: Option<String>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pin negotiation to one dialect (oss, w3c)
        #[arg(short = 'd', long)]
        force_dialect: Option<String>,

        /// Request timeout in seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Treat input as a complete new-session document, not a flat map
        #[arg(long)]
        raw: bool,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the candidate request bodies without network contact
    Inspect {
        /// Capability JSON (or - for stdin)
        input: Option<String>,

        /// Input file path
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Pin to one dialect (oss, w3c)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Treat input as a complete new-session document, not a flat map
        #[arg(long)]
        raw: bool,

        /// Pretty-print the request bodies
        #[arg(long)]
        pretty: bool,
    },

    /// List the command routes for a dialect
    Routes {
        /// Dialect to list (oss, w3c)
        #[arg(default_value = "w3c")]
        dialect: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Negotiate {
            input,
            file,
            server,
            config,
            force_dialect,
            timeout,
            raw,
            json,
            verbose,
        } => cmd_negotiate(
            input,
            file,
            server,
            config,
            force_dialect,
            timeout,
            raw,
            json,
            verbose,
        ),

        Commands::Inspect {
            input,
            file,
            dialect,
            raw,
            pretty,
        } => cmd_inspect(input, file, dialect, raw, pretty),

        Commands::Routes { dialect } => cmd_routes(&dialect),
    }
}

#[allow(clippy::too_many_arguments)]
#[allow(clippy::fn_params_excessive_bools)]
fn cmd_negotiate(
    input: Option<String>,
    file: Option<PathBuf>,
    server: Option<String>,
    config_path: Option<PathBuf>,
    force_dialect: Option<String>,
    timeout: Option<u64>,
    raw: bool,
    json: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    // Initialize logging
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(url) = server {
        config.server.url = url;
    }
    if let Some(secs) = timeout {
        config.server.request_timeout_secs = secs;
    }
    let server_url = config.server.url.clone();

    let content = read_input(input, file)?;

    let mut builder = Handshake::builder().config(config);
    if let Some(d) = force_dialect {
        builder = builder.force_dialect(parse_dialect(&d)?);
    }
    let handshake = builder.build()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let session = runtime.block_on(async {
        if raw {
            let store = PayloadStore::from_json(&content)?;
            handshake.negotiate_payload(store).await
        } else {
            let caps: Capabilities = serde_json::from_str(&content)?;
            handshake.negotiate(&caps).await
        }
    })?;

    if json {
        let output = serde_json::json!({
            "sessionId": session.session_id,
            "dialect": session.dialect.name(),
            "capabilities": session.capabilities,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Session created on {server_url}");
        println!("  Dialect:    {}", session.dialect);
        println!("  Session ID: {}", session.session_id);
        println!("  Capabilities:");
        let caps = serde_json::to_string_pretty(&session.capabilities)?;
        for line in caps.lines() {
            println!("    {line}");
        }
    }

    Ok(())
}

fn cmd_inspect(
    input: Option<String>,
    file: Option<PathBuf>,
    dialect: Option<String>,
    raw: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let content = read_input(input, file)?;

    let mut store = if raw {
        PayloadStore::from_json(&content)?
    } else {
        let caps: Capabilities = serde_json::from_str(&content)?;
        PayloadStore::from_capabilities(&caps)?
    };

    let pipeline = TransformPipeline::standard();
    let stream = match dialect {
        Some(d) => CandidateStream::pinned(&mut store, &pipeline, parse_dialect(&d)?),
        None => CandidateStream::new(&mut store, &pipeline),
    };

    for candidate in stream {
        let candidate = candidate?;
        match candidate.validate(pipeline.registry()) {
            Ok(()) => println!("--- {}", candidate.encoding()),
            Err(err) => println!("--- {} (INVALID: {err})", candidate.encoding()),
        }

        let body = candidate.encode()?;
        if pretty {
            let value: serde_json::Value = serde_json::from_slice(&body)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", String::from_utf8_lossy(&body));
        }
        println!();
    }

    Ok(())
}

fn cmd_routes(dialect: &str) -> anyhow::Result<()> {
    let codec = CommandCodec::new(parse_dialect(dialect)?);
    let routes = codec.routes();

    println!("Command routes ({} dialect, {} commands):", codec.dialect(), routes.len());
    println!();
    println!("{:<24} {:<8} {}", "Command", "Method", "Path");
    println!("{}", "-".repeat(76));

    for (name, route) in routes {
        println!("{:<24} {:<8} {}", name, route.method.as_str(), route.path);
    }

    Ok(())
}

// Helper functions

fn parse_dialect(s: &str) -> anyhow::Result<Dialect> {
    Dialect::from_str(s).map_err(|_| anyhow::anyhow!("Invalid dialect: {s}. Use: oss, w3c"))
}

fn read_input(input: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(path) = file {
        Ok(std::fs::read_to_string(path)?)
    } else if let Some(s) = input {
        if s == "-" {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        } else {
            Ok(s)
        }
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}
