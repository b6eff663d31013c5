//! poly-schema CLI
//!
//! Command-line interface for checking registries, synthesizing schema
//! graphs and encoding/decoding polymorphic records.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use poly_schema::{
    load_config_auto, load_json, Configured, MemoryStore, PolymorphicCodec, Synthesizer,
    TypeHierarchy,
};

#[derive(Parser)]
#[command(name = "poly-schema")]
#[command(about = "Polymorphic record encoding and discriminated schema synthesis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a registry and list its variants
    Check {
        /// Registry config: file path or URL (http:// or https://)
        config: String,
    },

    /// Print the schema graph for a registry
    Synthesize {
        /// Registry config: file path or URL (http:// or https://)
        config: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Encode a record resolved by its discriminator field
    Encode {
        /// Registry config: file path or URL (http:// or https://)
        config: String,

        /// Record file
        record: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Encode every entity in a store dump, resolved by type tag
    List {
        /// Registry config: file path or URL (http:// or https://)
        config: String,

        /// Store dump: JSON array of {id, type, attributes}
        store: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a payload against the variant its discriminator names
    Decode {
        /// Registry config: file path or URL (http:// or https://)
        config: String,

        /// Payload file to validate
        payload: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { config } => run_check(&config),
        Commands::Synthesize {
            config,
            output,
            pretty,
        } => run_synthesize(&config, output, pretty),
        Commands::Encode {
            config,
            record,
            pretty,
        } => run_encode(&config, &record, pretty),
        Commands::List {
            config,
            store,
            pretty,
        } => run_list(&config, &store, pretty),
        Commands::Decode {
            config,
            payload,
            json,
        } => run_decode(&config, &payload, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn configure(source: &str) -> Result<Configured, u8> {
    let config = load_config_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    config.build().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_input(path: &Path, what: &str) -> Result<Value, u8> {
    load_json(path).map_err(|e| {
        eprintln!("Error loading {}: {}", what, e);
        e.exit_code() as u8
    })
}

fn render(value: &Value, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

fn run_check(source: &str) -> Result<(), u8> {
    let Configured { registry, .. } = configure(source)?;

    println!(
        "{} (discriminator: {})",
        registry.base_type(),
        registry.discriminator_field()
    );
    for entry in registry.entries() {
        let contract = entry.contract().map(|c| c.name()).unwrap_or("-");
        println!(
            "  {} -> {} [{}]",
            entry.discriminator(),
            entry.type_name(),
            contract
        );
    }
    Ok(())
}

fn run_synthesize(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let Configured {
        registry,
        mut definitions,
        ..
    } = configure(source)?;

    Synthesizer::new()
        .synthesize_into(&registry, &mut definitions)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let json_output = render(&definitions.to_value(), pretty)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_encode(source: &str, record_path: &Path, pretty: bool) -> Result<(), u8> {
    let Configured { registry, .. } = configure(source)?;
    let record = load_input(record_path, "record")?;

    let store = MemoryStore::new(TypeHierarchy::new());
    let codec = PolymorphicCodec::new(&registry, &store);
    let encoded = codec.encode(&record).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    println!("{}", render(&Value::Object(encoded), pretty)?);
    Ok(())
}

fn run_list(source: &str, store_path: &Path, pretty: bool) -> Result<(), u8> {
    let Configured {
        registry,
        hierarchy,
        ..
    } = configure(source)?;
    let dump = load_input(store_path, "store")?;
    let store = MemoryStore::from_dump(hierarchy, &dump).map_err(|e| {
        eprintln!("Error loading store: {}", e);
        e.exit_code() as u8
    })?;

    let codec = PolymorphicCodec::new(&registry, &store);
    let rows = codec.encode_all().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut records = Vec::new();
    for row in rows {
        let record = row.map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
        records.push(Value::Object(record));
    }

    println!("{}", render(&Value::Array(records), pretty)?);
    Ok(())
}

fn run_decode(source: &str, payload_path: &Path, json_output: bool) -> Result<(), u8> {
    let Configured { registry, .. } = configure(source)?;
    let payload = load_input(payload_path, "payload")?;

    let store = MemoryStore::new(TypeHierarchy::new());
    let codec = PolymorphicCodec::new(&registry, &store);

    match codec.decode(&payload).into_result() {
        Ok(decoded) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": true,
                    "variant": decoded.variant,
                    "data": decoded.data
                });
                println!("{}", output);
            } else {
                println!("Valid {}", decoded.variant);
            }
            Ok(())
        }
        Err(failure) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": failure.errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for line in failure.messages() {
                    eprintln!("  {}", line);
                }
            }
            Err(failure.exit_code() as u8)
        }
    }
}
