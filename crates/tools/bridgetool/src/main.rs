use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use script_bridge::{resolve, to_camel, BridgeConfig, LuaEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "BRIDGE_CONFIG";

#[derive(Parser)]
#[command(name = "bridgetool")]
#[command(about = "Run Lua scripts and JSON lookups through the script bridge", long_about = None)]
struct Cli {
    /// Bridge config file (KDL). Falls back to the BRIDGE_CONFIG environment variable
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Lua script with the bridge globals registered
    Run {
        /// Script to execute
        script: PathBuf,

        /// Expose a JSON file to the script as a document global (name=path, repeatable)
        #[arg(short, long = "json", value_parser = parse_json_binding)]
        json: Vec<(String, PathBuf)>,
    },

    /// Print the value at a path in a JSON file
    Get {
        /// JSON file to read
        file: PathBuf,

        /// Path expression, e.g. users[0].name
        path: String,

        /// Pretty-print the result
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the CamelCase form of snake_case identifiers
    Camel {
        /// Identifiers to convert
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Evaluate a Lua script and print the markup of the tag tree it returns
    Markup {
        /// Script returning a tag table
        script: PathBuf,

        /// Expose a JSON file to the script as a document global (name=path, repeatable)
        #[arg(short, long = "json", value_parser = parse_json_binding)]
        json: Vec<(String, PathBuf)>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { script, json } => {
            let engine = build_engine(cli.config.as_deref(), &json)?;
            engine
                .exec_file(&script)
                .with_context(|| format!("running {}", script.display()))?;
        }
        Commands::Get { file, path, pretty } => {
            let doc = read_json(&file)?;
            let value = resolve(&doc, &path)?;
            let text = if pretty {
                serde_json::to_string_pretty(value)?
            } else {
                serde_json::to_string(value)?
            };
            println!("{}", text);
        }
        Commands::Camel { identifiers } => {
            for identifier in identifiers {
                println!("{}", to_camel(&identifier));
            }
        }
        Commands::Markup { script, json } => {
            let engine = build_engine(cli.config.as_deref(), &json)?;
            let markup = engine
                .render_file(&script)
                .with_context(|| format!("rendering {}", script.display()))?;
            println!("{}", markup);
        }
    }

    Ok(())
}

/// Load the bridge config from the CLI argument, then BRIDGE_CONFIG, then defaults
fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    };

    match path {
        Some(path) => BridgeConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

fn build_engine(config: Option<&Path>, json: &[(String, PathBuf)]) -> Result<LuaEngine> {
    let engine = LuaEngine::with_config(load_config(config)?)?;

    for (name, path) in json {
        engine.set_json(name, read_json(path)?)?;
        tracing::info!("Loaded {} from {}", name, path.display());
    }

    Ok(engine)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("decoding {}", path.display()))
}

/// Parse a `name=path` pair
fn parse_json_binding(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=path, got {:?}", s))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected name=path, got {:?}", s));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}
