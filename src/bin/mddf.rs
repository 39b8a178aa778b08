//! MDDF Structure CLI
//!
//! Inspects rule catalogs and the format translation graph.

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mddf_structure::{EngineConfig, FormatId, FormatVersion, RuleCatalog, TranslationPlanner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mddf")]
#[command(about = "Structural validation and translation of MDDF documents")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a rule catalog and list its usage keys
    Rules {
        /// Catalog file, catalog directory, or a format id (e.g. MANIFEST_1_8)
        catalog: String,
    },

    /// List the formats a document can be translated to
    Targets {
        /// Source format id (e.g. AVAILS_2_3)
        format: String,
    },

    /// List all registered formats
    Formats,
}

fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &EngineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Rules { catalog } => {
            let rules = load_catalog(&catalog, config)?;
            println!("{} rule(s) in {}", rules.len(), catalog);
            for rule in rules.iter() {
                let target = rule.target_path.as_deref().unwrap_or("(no targetPath)");
                println!("  {:<28} {:>2} constraint(s)  {}", rule.usage, rule.constraints.len(), target);
            }
        }

        Commands::Targets { format } => {
            let source: FormatId = format.parse()?;
            let planner = TranslationPlanner::default();
            let targets = planner.supported_targets(source);
            if targets.is_empty() {
                println!("No translations from {}", source.info());
                return Ok(());
            }

            println!("Translations from {}:", source.info());
            for target in targets {
                let plan = planner.plan(source, target.id)?;
                println!("  {:<20} {}", target.id, plan.describe());
            }
        }

        Commands::Formats => {
            for format in FormatVersion::all() {
                let basis = match (format.is_tabular(), format.xml_basis) {
                    (true, Some(basis)) => format!("  (via {})", basis),
                    (true, None) => "  (unsupported)".to_string(),
                    (false, _) => String::new(),
                };
                println!("  {:<20} {}{}", format.id, format, basis);
            }
        }
    }

    Ok(())
}

fn load_catalog(catalog: &str, config: &EngineConfig) -> anyhow::Result<RuleCatalog> {
    let path = Path::new(catalog);
    if path.is_dir() {
        return RuleCatalog::from_directory(path).with_context(|| format!("loading catalogs under {}", catalog));
    }
    if path.is_file() {
        return RuleCatalog::from_file(path).with_context(|| format!("loading catalog {}", catalog));
    }

    let format: FormatId = catalog.parse()?;
    let info = format.info();
    Ok(config.rule_catalog(info.family, info.version)?)
}
