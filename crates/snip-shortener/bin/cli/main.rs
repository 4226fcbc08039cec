mod cli;

use crate::cli::{Command, LogFormat, StorageBackendArg, CLI};
use anyhow::{Context, Result};
use clap::Parser;
use snip_core::codec;
use snip_generator::RandomGenerator;
use snip_shortener::{CommitterSettings, Shortener, ShortenerService};
use snip_storage::{InMemoryRepository, MySqlRepository, Repository};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format)?;
    info!(storage_backend = %config.storage, "starting snip");

    let settings = CommitterSettings::builder()
        .integrity_error_limit(config.integrity_error_limit)
        .build();
    let (min_length, max_length) = (config.min_new_alias_length, config.max_new_alias_length);

    match config.storage {
        StorageBackendArg::InMemory => {
            let service =
                ShortenerService::configure(InMemoryRepository::new(), min_length, max_length, settings)
                    .context("invalid alias length configuration")?;
            run(&service, &config.command, &config.base_url).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            repository
                .create_schema()
                .await
                .context("failed to create the target_urls table")?;
            let service = ShortenerService::configure(repository, min_length, max_length, settings)
                .context("invalid alias length configuration")?;
            run(&service, &config.command, &config.base_url).await
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    tracing_log::LogTracer::init()
        .map_err(|err| anyhow::anyhow!("failed to install log bridge: {err}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("failed to install tracing subscriber")
}

async fn run<R: Repository>(
    service: &ShortenerService<R, RandomGenerator>,
    command: &Command,
    base_url: &str,
) -> Result<()> {
    let generator = service.generator();
    info!(
        min_length = generator.min_length(),
        max_length = generator.max_length(),
        min_new_int = generator.min_new_int(),
        max_new_int = generator.max_new_int(),
        alphabet = codec::ALPHABET,
        "alias generator configured"
    );

    match command {
        Command::Shorten { urls } => {
            for url in urls {
                let record = service
                    .shorten(url)
                    .await
                    .with_context(|| format!("failed to shorten {url}"))?;
                println!(
                    "{}\t{}\t{}",
                    record.short_url(base_url),
                    record.preview_url(base_url),
                    record.value
                );
            }
            info!(
                total_conflicts = service.committer().total_conflicts(),
                "shortening finished"
            );
        }
        Command::Resolve { aliases } => {
            let mut missing = 0usize;
            for alias in aliases {
                match service
                    .resolve(alias)
                    .await
                    .with_context(|| format!("failed to resolve {alias}"))?
                {
                    Some(record) => println!("{}\t{}", alias, record.value),
                    None => {
                        warn!(alias = %alias, "alias not found");
                        missing += 1;
                    }
                }
            }
            if missing > 0 {
                anyhow::bail!("{missing} of {} aliases not found", aliases.len());
            }
        }
    }
    Ok(())
}
