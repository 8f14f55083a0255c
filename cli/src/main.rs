use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fieldgen_compiler::config::{DEFAULT_HEADER, DEFAULT_INPUT, DEFAULT_SOURCE};
use fieldgen_compiler::{compile_header, render_artifacts, write_artifacts, FieldGenError, GenConfig};

#[derive(Parser)]
#[command(name = "fieldgen")]
#[command(about = "Generate field enums, size tables and accessors from C structure headers", long_about = None)]
struct Cli {
    /// JSON file with naming and vocabulary settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Namespace prefix stripped from structure names (overrides the config file)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Extra primitive type name accepted in declarations, may be repeated
    #[arg(long = "type", global = true)]
    types: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the enum header and the size-table/accessor source (the default)
    Generate {
        /// Input header with the structure declarations
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Output enum header
        #[arg(long, default_value = DEFAULT_HEADER)]
        header: PathBuf,

        /// Output source with size tables and accessors
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: PathBuf,
    },

    /// Print the flattened structure model as JSON
    Model {
        /// Input header with the structure declarations
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,
    },
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn load_config(cli: &Cli) -> Result<GenConfig, FieldGenError> {
    let mut config = match &cli.config {
        Some(path) => GenConfig::load(path)?,
        None => GenConfig::default(),
    };
    if let Some(prefix) = &cli.prefix {
        config.namespace_prefix = prefix.clone();
    }
    config.extra_types.extend(cli.types.iter().cloned());
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), FieldGenError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    let command = cli.command.unwrap_or(Commands::Generate {
        input:  PathBuf::from(DEFAULT_INPUT),
        header: PathBuf::from(DEFAULT_HEADER),
        source: PathBuf::from(DEFAULT_SOURCE),
    });

    match command {
        Commands::Generate { input, header, source } => {
            // Without a config file, the source includes the files actually used
            if cli.config.is_none() {
                if let Some(name) = file_name(&header) {
                    config.header_name = name;
                }
                if let Some(name) = file_name(&input) {
                    config.struct_header = name;
                }
            }
            // Read the structure header
            let text = fs::read_to_string(&input)?;
            // Parse, verify and flatten before anything is rendered
            let model = compile_header(&text, &config)?;
            if model.header().is_empty() {
                warn!(input = %input.display(), "no structures found, generating empty artifacts");
            }
            let artifacts = render_artifacts(&model, &config);
            write_artifacts(&artifacts, &header, &source)?;
            info!(structures = model.header().len(), "generation complete");
            println!(
                "Generated {} → {}, {}",
                input.display(),
                header.display(),
                source.display()
            );
            Ok(())
        }

        Commands::Model { input } => {
            let text = fs::read_to_string(&input)?;
            let model = compile_header(&text, &config)?;
            let json = serde_json::to_string_pretty(&model)
                .map_err(|e| FieldGenError::Config(format!("cannot serialize model: {}", e)))?;
            println!("{}", json);
            Ok(())
        }
    }
}
