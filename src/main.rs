use anyhow::{Context, Result};
use clap::Parser;
use ctrepo_guard::breaking::{BreakingChangeDetector, BreakingConfig};
use ctrepo_guard::{GuardConfig, ProtocolDocument, ProtocolValidator, telemetry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "ctrepo-guard")]
#[command(about = "Validate clinical trial protocol updates and detect breaking changes")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Validate a protocol update against its repository")]
    Validate {
        #[arg(help = "Path to the candidate protocol file")]
        file: PathBuf,
        #[arg(long, help = "Repository name (without the .ctrepo suffix)")]
        repo: String,
        #[arg(long, help = "Directory containing .ctrepo repositories")]
        repo_root: Option<PathBuf>,
        #[arg(long, help = "JSON-Schema file (defaults to the built-in protocol schema)")]
        schema: Option<PathBuf>,
        #[arg(long, help = "Path to ctrepo.yaml")]
        config: Option<PathBuf>,
        #[arg(long, help = "Output format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
    #[command(about = "Print the integrity hash of a protocol file")]
    Hash {
        #[arg(help = "Path to the protocol file")]
        file: PathBuf,
    },
    #[command(about = "Check two protocol revisions for breaking changes")]
    Breaking {
        #[arg(help = "Path to the previously accepted protocol")]
        old_file: PathBuf,
        #[arg(help = "Path to the candidate protocol")]
        new_file: PathBuf,
        #[arg(long, help = "Output format", value_enum, default_value = "text")]
        format: OutputFormat,
        #[arg(long, help = "Rules to exclude (comma-separated)")]
        except_rules: Option<String>,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(args.json_logs, level);

    match args.command {
        Commands::Validate {
            file,
            repo,
            repo_root,
            schema,
            config,
            format,
        } => {
            let mut config = match config {
                Some(path) => GuardConfig::from_yaml_file(path)?,
                None => GuardConfig::default(),
            };
            if let Some(repo_root) = repo_root {
                config.repo_root = repo_root;
            }
            if let Some(schema) = schema {
                config.schema = Some(schema);
            }

            let content = read_file(&file)?;
            let schema = config.load_schema()?;
            let history = config.git_history();
            let result = ProtocolValidator::new(&schema, &history)
                .with_detector(BreakingChangeDetector::new(config.breaking.clone()))
                .validate(&repo, &content);

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                OutputFormat::Text => {
                    if result.valid {
                        println!(
                            "Protocol validation passed for {} (version {})",
                            result.document_id.as_deref().unwrap_or("unknown"),
                            result.document_version.as_deref().unwrap_or("unversioned")
                        );
                        if let Some(hash) = &result.integrity_hash {
                            println!("Integrity hash: {hash}");
                        }
                        if result.warnings().is_empty() {
                            println!("No breaking changes detected.");
                        } else {
                            println!("Breaking changes:");
                            for warning in result.warnings() {
                                println!("  - {warning}");
                            }
                        }
                    } else {
                        println!(
                            "Protocol validation failed: {}",
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
            }

            if !result.valid {
                std::process::exit(1);
            }
        }
        Commands::Hash { file } => {
            let content = read_file(&file)?;
            println!("{}", ctrepo_guard::integrity_hash(&content));
        }
        Commands::Breaking {
            old_file,
            new_file,
            format,
            except_rules,
        } => {
            let old_doc = ProtocolDocument::parse(&read_file(&old_file)?)
                .with_context(|| format!("Invalid protocol '{}'", old_file.display()))?;
            let new_doc = ProtocolDocument::parse(&read_file(&new_file)?)
                .with_context(|| format!("Invalid protocol '{}'", new_file.display()))?;

            let mut config = BreakingConfig::default();
            if let Some(except) = except_rules {
                config.except_rules = except.split(',').map(|s| s.trim().to_string()).collect();
            }

            let changes = BreakingChangeDetector::new(config)
                .check(&new_doc, &old_doc)
                .context("Breaking change check could not compare the revisions")?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&changes)?);
                }
                OutputFormat::Text => {
                    if changes.is_empty() {
                        println!("No breaking changes detected.");
                    } else {
                        println!("Breaking changes detected:");
                        for change in &changes {
                            println!("  [{}] {}", change.rule_id, change.message);
                            println!("    Level: {}", change.level);
                        }
                    }
                }
            }

            if !changes.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
