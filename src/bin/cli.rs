use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use stackwarden::config::Config;
use stackwarden::error::WardenError;
use stackwarden::output::{self, OutputFormat};
use stackwarden::rules::RuleProcessor;

#[derive(Parser)]
#[command(
    name = "stackwarden",
    about = "Policy checks for resolved CloudFormation templates",
    version,
    author
)]
struct Cli {
    /// Verbose rule diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check resolved templates against the configured rules
    Check {
        /// Template file, or a directory scanned for *.json templates
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the built-in rules
    ListRules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter stackwarden.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            path,
            config,
            format,
            output,
        } => cmd_check(path, config, format, output),
        Commands::ListRules { format } => cmd_list_rules(format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("stackwarden=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackwarden=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_check(
    path: PathBuf,
    config_path: Option<PathBuf>,
    format_str: String,
    output_path: Option<PathBuf>,
) -> Result<i32, WardenError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let config_path = config_path.unwrap_or_else(|| PathBuf::from("stackwarden.toml"));
    let config = Config::load(&config_path)?;

    let templates = collect_templates(&path);
    if templates.is_empty() {
        eprintln!("No template files found under {}", path.display());
        return Ok(0);
    }

    let mut all_valid = true;
    let mut rendered = String::new();
    for (index, template_path) in templates.iter().enumerate() {
        let verdict = stackwarden::check_file(template_path, &config)?;
        if !verdict.valid {
            all_valid = false;
        }
        let target_name = template_path.display().to_string();
        if index > 0 {
            rendered.push('\n');
        }
        rendered.push_str(&output::render(&verdict, format, &target_name)?);
    }

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = all templates valid, 1 = blocking violations
    Ok(if all_valid { 0 } else { 1 })
}

/// A file argument is taken as-is; a directory is walked for `*.json`,
/// sorted for reproducible report order.
fn collect_templates(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .map(|e| e.into_path())
        .collect()
}

fn cmd_list_rules(format_str: String) -> Result<i32, WardenError> {
    let processor = RuleProcessor::default();
    let rules = processor.list_rules();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<26} {:<10} {:<8} {:<10} DESCRIPTION",
                "ID", "MODE", "RISK", "SCOPE"
            );
            println!("{}", "-".repeat(90));
            for rule in &rules {
                println!(
                    "{:<26} {:<10} {:<8} {:<10} {}",
                    rule.id,
                    rule.default_mode.to_string(),
                    rule.default_risk.to_string(),
                    rule.granularity.to_string(),
                    rule.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, WardenError> {
    let path = PathBuf::from("stackwarden.toml");

    if path.exists() && !force {
        eprintln!("stackwarden.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created stackwarden.toml");

    Ok(0)
}
