use anyhow::Result;
use clap::Parser;
use serially::cli::{Cli, OutputFormat};
use serially::config::{resolve_ingest_config, resolve_layout};
use serially::extract::Unzip;
use serially::ingest::Ingestor;
use serially::serialver::Serialver;
use serially::store::{ClassRow, IndexStore};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let layout = resolve_layout(&cli)?;
    layout.ensure()?;
    let config = resolve_ingest_config(&cli)?;

    let store = IndexStore::open(&layout.db_file)?;
    let unzip = Unzip::new(config.unzip.clone(), config.tool_timeout);
    let serialver = Serialver::new(config.serialver.clone(), config.tool_timeout);
    let ingestor = Ingestor::new(store, unzip, serialver, config.jobs)?;

    let progress = |row: &ClassRow| {
        println!(
            "Adding to database: archive_id: {}, class: {}, serialVersionUID: {}",
            row.archive_id,
            row.fqn,
            row.fingerprint.as_deref().unwrap_or("None")
        );
    };
    let silent = |_: &ClassRow| {};

    match cli.format {
        OutputFormat::Text => {
            let report = ingestor.run(&layout.jars_dir, &progress)?;
            if !report.found_new_jars() {
                println!("No new jar files found in {}", layout.jars_dir.display());
            }
        }
        OutputFormat::Json => {
            let report = ingestor.run(&layout.jars_dir, &silent)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}
