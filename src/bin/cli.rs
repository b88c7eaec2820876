//! EchoRS CLI Client
//!
//! Command-line interface for interacting with an EchoRS server.

use clap::{Parser, Subcommand};
use echors::{Client, ClientConfig, Response};
use tracing_subscriber::{fmt, EnvFilter};

/// EchoRS CLI
#[derive(Parser, Debug)]
#[command(name = "echors-cli")]
#[command(about = "CLI for the EchoRS key-value server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    /// Read/write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Size of the response read buffer in bytes
    #[arg(long, default_value_t = echors::config::DEFAULT_MAX_RESPONSE_SIZE)]
    max_response_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show server statistics
    Info,

    /// Check that the server answers
    Test,

    /// Set a string value
    Set { key: String, value: String },

    /// Set an integer value
    #[command(name = "seti")]
    SetI { key: String, value: u32 },

    /// Set a float value
    #[command(name = "setf")]
    SetF { key: String, value: f32 },

    /// Get a value by key
    Get { key: String },

    /// Delete one or more keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Increment an integer counter
    Incr {
        key: String,

        /// Amount to add (server default: 1)
        #[arg(short, long)]
        by: Option<u32>,
    },

    /// Increment a float counter
    #[command(name = "incrf")]
    IncrF {
        key: String,

        /// Amount to add (server default: 1.0)
        #[arg(short, long)]
        by: Option<f32>,
    },

    /// Append members to a list
    #[command(name = "lpush")]
    LPush {
        key: String,

        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Pop members from the end of a list
    #[command(name = "lpop")]
    LPop {
        key: String,

        /// Number of members (server default: 1)
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Read list members in [start, end)
    #[command(name = "lrange")]
    LRange { key: String, start: u32, end: u32 },

    /// Remove and return list members in [start, end)
    #[command(name = "lextract")]
    LExtract { key: String, start: u32, end: u32 },

    /// Length of a list
    #[command(name = "llen")]
    LLen { key: String },

    /// Add members to a HyperLogLog
    #[command(name = "hlladd")]
    HllAdd {
        key: String,

        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Estimated HyperLogLog cardinality
    #[command(name = "hllcount")]
    HllCount { key: String },

    /// Reset a HyperLogLog
    #[command(name = "hllreset")]
    HllReset { key: String },
}

fn main() {
    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .server_addr(&args.server)
        .connect_timeout_ms(args.timeout_ms)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .max_response_size(args.max_response_size)
        .build();

    let mut client = match Client::connect(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match run(&mut client, args.command) {
        Ok(response) => println!("{}", response),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(client: &mut Client, command: Commands) -> echors::Result<Response> {
    match command {
        Commands::Info => client.info(),
        Commands::Test => client.test(),
        Commands::Set { key, value } => client.set_string(key, value),
        Commands::SetI { key, value } => client.set_int(key, value),
        Commands::SetF { key, value } => client.set_float(key, value),
        Commands::Get { key } => client.get(key),
        Commands::Del { keys } => client.delete(keys),
        Commands::Incr { key, by } => client.increment_int(key, by),
        Commands::IncrF { key, by } => client.increment_float(key, by),
        Commands::LPush { key, values } => client.list_push(key, values),
        Commands::LPop { key, count } => client.list_pop(key, count),
        Commands::LRange { key, start, end } => client.list_range(key, start, end),
        Commands::LExtract { key, start, end } => client.list_extract(key, start, end),
        Commands::LLen { key } => client.list_length(key),
        Commands::HllAdd { key, values } => client.hll_add(key, values),
        Commands::HllCount { key } => client.hll_count(key),
        Commands::HllReset { key } => client.hll_reset(key),
    }
}
