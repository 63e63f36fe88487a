use std::fs;
use std::path::Path;

use clap::Parser;

use feedpipe::cli::{Cli, Commands, ImporterCommands};
use feedpipe::config::Config;
use feedpipe::domain::{BatchReport, Feed, ImporterConfig};
use feedpipe::errors::{ImportError, ImportResult};
use feedpipe::importer::Importer;
use feedpipe::logging;
use feedpipe::processor::{Processor, RecordWriter, WriterRegistry};
use feedpipe::services::FeedService;
use feedpipe::sources::{FetchCache, SourceRegistry};
use feedpipe::storage::sqlite::{
    SqliteEntityRepository, SqliteFeedLock, SqliteFeedRepository, SqliteImporterRepository,
    SqliteItemInfoRepository, SqliteStorage,
};

type FeedImporter = Importer<
    SqliteFeedRepository,
    SqliteImporterRepository,
    SqliteFeedLock,
    SqliteItemInfoRepository,
>;
type Service = FeedService<SqliteFeedRepository, SqliteImporterRepository>;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> ImportResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    logging::init(&config.log_level, cli.verbose);

    // Initialize storage
    let storage = SqliteStorage::new(&config.db_path)?;
    let service = FeedService::new(
        SqliteFeedRepository::new(storage.clone()),
        SqliteImporterRepository::new(storage.clone()),
        SourceRegistry::with_http_timeout(config.http_timeout),
    );

    match cli.command {
        Commands::Importer { command } => match command {
            ImporterCommands::Add { config: raw } => cmd_importer_add(&service, &raw),
            ImporterCommands::List => cmd_importer_list(&service),
        },
        Commands::Add { source, importer } => cmd_add(&service, &source, &importer),
        Commands::List => cmd_list(&service),
        Commands::Remove { id } => {
            cmd_remove(&service, &build_importer(&storage, &config), id)
        }
        Commands::Import {
            id,
            all,
            until_done,
        } => {
            let feeds = select_feeds(&service, id, all)?;
            cmd_import(&build_importer(&storage, &config), &feeds, until_done)
        }
        Commands::Clear { id } => cmd_clear(&service, &build_importer(&storage, &config), id),
        Commands::Expire { id, all } => {
            let feeds = select_feeds(&service, id, all)?;
            cmd_expire(&build_importer(&storage, &config), &feeds)
        }
    }
}

fn build_importer(storage: &SqliteStorage, config: &Config) -> FeedImporter {
    let writers = WriterRegistry::new().with(Box::new(RecordWriter::new(
        SqliteEntityRepository::new(storage.clone()),
    )));
    let processor = Processor::new(
        SqliteItemInfoRepository::new(storage.clone()),
        writers,
        config.import_limit,
    );

    Importer::new(
        SqliteFeedRepository::new(storage.clone()),
        SqliteImporterRepository::new(storage.clone()),
        SqliteFeedLock::new(storage.clone()),
        SourceRegistry::with_http_timeout(config.http_timeout),
        processor,
        config.import_limit,
    )
    .with_lock_ttl(config.lock_ttl)
}

/// The feed named by `id`, or every feed with `all`.
fn select_feeds(service: &Service, id: Option<i64>, all: bool) -> ImportResult<Vec<Feed>> {
    match (id, all) {
        (Some(id), _) => service
            .get(id)?
            .map(|feed| vec![feed])
            .ok_or_else(|| ImportError::FeedNotFound(id.to_string())),
        (None, true) => service.list(),
        (None, false) => Err(ImportError::InvalidInput(
            "Give a feed id or --all".to_string(),
        )),
    }
}

fn feed_id(feed: &Feed) -> ImportResult<i64> {
    feed.id
        .ok_or_else(|| ImportError::FeedNotFound("Feed has no ID".to_string()))
}

fn percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

fn cmd_importer_add(service: &Service, raw: &str) -> ImportResult<()> {
    let json = if Path::new(raw).is_file() {
        fs::read_to_string(raw)?
    } else {
        raw.to_string()
    };
    let config: ImporterConfig = serde_json::from_str(&json)?;

    service.add_importer(&config)?;
    println!("Importer saved: {}", config.id);
    println!("  Fetcher: {}", config.fetcher);
    println!("  Parser: {}", config.parser.kind);
    println!("  Entity type: {}", config.processor.entity_type);
    Ok(())
}

fn cmd_importer_list(service: &Service) -> ImportResult<()> {
    let importers = service.list_importers()?;

    if importers.is_empty() {
        println!("No importers configured.");
        return Ok(());
    }

    println!("Configured importers:\n");
    for importer in importers {
        println!(
            "  {} [{} -> {} -> {}]",
            importer.id, importer.fetcher, importer.parser.kind, importer.processor.entity_type
        );
        if !importer.name.is_empty() {
            println!("    Name: {}", importer.name);
        }
        println!("    Mappings: {}", importer.processor.mappings.len());
    }

    Ok(())
}

fn cmd_add(service: &Service, source: &str, importer: &str) -> ImportResult<()> {
    match service.add(source, importer) {
        Ok(feed) => {
            println!("Feed added successfully!");
            println!("  ID: {}", feed_id(&feed)?);
            println!("  Source: {}", feed.source);
            println!("  Importer: {}", feed.importer);
            Ok(())
        }
        Err(ImportError::FeedAlreadyExists(_)) => {
            println!("Feed already exists: {}", source);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn cmd_list(service: &Service) -> ImportResult<()> {
    let feeds = service.list()?;

    if feeds.is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    println!("Configured feeds:\n");
    for feed in feeds {
        println!("  {}. {} [{}]", feed_id(&feed)?, feed.source, feed.importer);
        if let Some(imported) = feed.imported.and_then(|t| chrono::DateTime::from_timestamp(t, 0)) {
            println!("    Last import: {}", imported.to_rfc3339());
        }
        if feed.fetch_result.is_some() {
            println!("    Import in progress");
        }
        if feed.locked {
            println!("    Locked");
        }
        println!();
    }

    Ok(())
}

fn cmd_remove(service: &Service, importer: &FeedImporter, id: i64) -> ImportResult<()> {
    let feed = service
        .get(id)?
        .ok_or_else(|| ImportError::FeedNotFound(id.to_string()))?;

    // Entities go first; the feed row takes its side index with it
    while importer.clear(id)? < 1.0 {}

    service.remove(id)?;
    println!("Removed: {}", feed.source);
    Ok(())
}

fn cmd_import(importer: &FeedImporter, feeds: &[Feed], until_done: bool) -> ImportResult<()> {
    if feeds.is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    let mut cache = FetchCache::new();
    for feed in feeds {
        let id = feed_id(feed)?;
        let mut totals = BatchReport::default();

        loop {
            let status = match importer.import_with_cache(id, &mut cache) {
                Ok(status) => status,
                Err(ImportError::Locked(_)) if feeds.len() > 1 => {
                    println!("{}: locked by another run, skipped", feed.source);
                    break;
                }
                Err(e) => return Err(e),
            };
            totals.absorb(&status.report);

            if status.is_complete() {
                println!("{}: complete ({})", feed.source, totals);
                break;
            }
            if !until_done {
                println!("{}: {} ({})", feed.source, percent(status.progress), totals);
                break;
            }
        }
    }

    Ok(())
}

fn cmd_clear(service: &Service, importer: &FeedImporter, id: i64) -> ImportResult<()> {
    let feed = service
        .get(id)?
        .ok_or_else(|| ImportError::FeedNotFound(id.to_string()))?;

    let fraction = importer.clear(id)?;
    if fraction >= 1.0 {
        println!("{}: cleared", feed.source);
    } else {
        println!("{}: clearing, {}", feed.source, percent(fraction));
    }
    Ok(())
}

fn cmd_expire(importer: &FeedImporter, feeds: &[Feed]) -> ImportResult<()> {
    if feeds.is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    for feed in feeds {
        let fraction = importer.expire(feed_id(feed)?)?;
        if fraction >= 1.0 {
            println!("{}: expired entities removed", feed.source);
        } else {
            println!("{}: expiring, {}", feed.source, percent(fraction));
        }
    }

    Ok(())
}
