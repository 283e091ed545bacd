//! transclude command-line entry point.
//!
//! Resolves the content importers of one document and writes the result.
//! Diagnostics and logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use transclude_client::transclude_location;
use transclude_core::{AppConfig, TracingSink};
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "transclude",
    version,
    about = "Resolve the content importers of an HTML document"
)]
struct Cli {
    /// Location of the host document: a URL, or a path on the local filesystem.
    location: String,

    /// Write the resolved HTML here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum nesting depth of imports (0 for unbounded).
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Treat the requester as the author of the content (default: true for local files).
    #[arg(long, value_name = "BOOL")]
    author_mode: Option<bool>,

    /// Exit with a failure status if any importer stays unresolved.
    #[arg(long)]
    strict: bool,
}

impl Cli {
    fn config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load()?;
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if self.author_mode.is_some() {
            config.author_mode = self.author_mode;
        }
        Ok(config)
    }
}

/// Reads a location argument as a URL, or failing that as a file path.
fn location_of(argument: &str) -> Result<Url> {
    // A one-letter scheme is a Windows drive letter.
    if let Ok(url) = Url::parse(argument)
        && url.scheme().len() > 1
    {
        return Ok(url);
    }

    let path = std::path::absolute(argument).with_context(|| format!("invalid path: {argument}"))?;
    Url::from_file_path(&path).map_err(|()| anyhow!("not a usable file path: {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    let location = location_of(&cli.location)?;

    let transcluded = transclude_location(&config, location.as_str(), Box::new(TracingSink)).await?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &transcluded.html).with_context(|| format!("failed to write {}", path.display()))?
        }
        None => println!("{}", transcluded.html),
    }

    let report = transcluded.report;
    tracing::info!(
        location = %transcluded.location,
        imported = report.imported,
        unresolved = report.unresolved,
        "transclusion finished"
    );

    if cli.strict && report.unresolved > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
