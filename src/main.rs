use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use rusty_pbix::AnalysisResult;
use rusty_pbix::Config;
use rusty_pbix::InputFormat;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "rusty_pbix")]
#[command(about = "Analyze business data and export it as a BI project archive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Analyze a data file and print the analysis as JSON")]
    Analyze {
        #[arg(help = "Path to a CSV, Excel or JSON file")]
        file: PathBuf,
        #[arg(long, short, help = "Declared input format (csv, excel, xlsx, xls, json); defaults to the file extension")]
        format: Option<String>,
        #[arg(long, short, value_name = "TOML", help = "Configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Print compact JSON")]
        compact: bool,
    },
    #[command(about = "Analyze a data file and write the archive")]
    Export {
        #[arg(help = "Path to a data file, or an analysis JSON with --from-analysis")]
        file: PathBuf,
        #[arg(long, short, value_name = "PBIX", help = "Archive to write")]
        output: PathBuf,
        #[arg(long, short, help = "Declared input format; defaults to the file extension")]
        format: Option<String>,
        #[arg(long, short, value_name = "TOML", help = "Configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Treat FILE as previously printed analysis JSON")]
        from_analysis: bool,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_path(path).with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn analyze_file(file: &Path, format: Option<&str>, config: &Config) -> Result<AnalysisResult> {
    let format = match format {
        Some(format) => format.to_owned(),
        None => InputFormat::from_path(file)?.to_string(),
    };
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let result = rusty_pbix::analyze_bytes(&bytes, &format, config)
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    Ok(result)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze { file, format, config, compact } => {
            let config = load_config(config.as_deref())?;
            let result = analyze_file(&file, format.as_deref(), &config)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", result.to_json(!compact)?)?;
        }
        Commands::Export { file, output, format, config, from_analysis } => {
            let result = if from_analysis {
                let text = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
                AnalysisResult::from_json(&text).with_context(|| format!("{} is not an analysis result", file.display()))?
            } else {
                let config = load_config(config.as_deref())?;
                analyze_file(&file, format.as_deref(), &config)?
            };
            let package = rusty_pbix::export_package(&result).context("Failed to build the package")?;
            let sink = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
            rusty_pbix::package::write_archive(&package, BufWriter::new(sink))?
                .flush()
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(output = %output.display(), entries = package.len(), "archive written");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
