use clap::Parser;
use tracing_subscriber::EnvFilter;

use docdex::{
    DataDir,
    HttpFetcher,
    RecordStore,
    SearchService,
    TantivyEngine,
    cli::{self, Cli, Command, IndexAction},
    error::{Error, Result},
    record::IndexRecord,
    service::UpdateOutcome,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCDEX_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = RecordStore::open(&data_dir.records_db())?;

    match cli.command {
        Command::Index { action } => match action {
            IndexAction::Add { name, url } => {
                let record = store.add(&name, url.as_deref())?;
                println!("Added index {} '{}'", record.id, record.name);
            }
            IndexAction::Remove { id } => {
                if !store.remove(id)? {
                    return Err(Error::NotFound {
                        kind: "index",
                        name: id.to_string(),
                    });
                }
                println!("Removed index {id}");
            }
            IndexAction::List { json } => index_list(&store, json)?,
        },
        Command::Search(args) => {
            let record = load_record(&store, args.id)?;
            let service = SearchService::new(
                data_dir,
                TantivyEngine::new(),
                HttpFetcher::new(),
            );
            let hits = service.search(&record, &args.query, args.count)?;

            if args.json {
                println!("{}", serde_json::to_string(&hits)?);
            } else if hits.is_empty() {
                println!("No results found.");
            } else {
                for (i, hit) in hits.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, hit.title);
                    println!("     {}", hit.url);
                }
                println!("\n{} result(s)", hits.len());
            }
        }
        Command::Update(args) => {
            let record = load_record(&store, args.id)?;
            let service = SearchService::new(
                data_dir,
                TantivyEngine::new(),
                HttpFetcher::new(),
            );
            let outcome = service.update(&record)?;

            if args.json {
                let body = match outcome {
                    UpdateOutcome::Updated => {
                        serde_json::json!({"id": record.id, "updated": true})
                    }
                    UpdateOutcome::NotUpdated(reason) => serde_json::json!({
                        "id": record.id,
                        "updated": false,
                        "reason": reason.as_str(),
                    }),
                };
                println!("{body}");
            } else {
                match outcome {
                    UpdateOutcome::Updated => {
                        println!("Index {} updated.", record.id);
                    }
                    UpdateOutcome::NotUpdated(reason) => {
                        println!("Index {} not updated: {reason}.", record.id);
                    }
                }
            }
        }
        Command::Status(args) => status(&store, &data_dir, args.json)?,
        Command::Completions(args) => cli::print_completions(args.shell),
    }

    Ok(())
}

fn load_record(store: &RecordStore, id: u64) -> Result<IndexRecord> {
    store.get(id)?.ok_or_else(|| Error::NotFound {
        kind: "index",
        name: id.to_string(),
    })
}

fn index_list(store: &RecordStore, json: bool) -> Result<()> {
    let records = store.list()?;

    if json {
        println!("{}", serde_json::to_string(&records)?);
    } else if records.is_empty() {
        println!("No indices registered.");
    } else {
        for record in &records {
            println!(
                "{}\t{}\t{}",
                record.id,
                record.name,
                record.url.as_deref().unwrap_or("(local only)")
            );
        }
    }
    Ok(())
}

fn status(store: &RecordStore, data_dir: &DataDir, json: bool) -> Result<()> {
    let records = store.list()?;

    if json {
        let mut entries = Vec::new();
        for record in &records {
            entries.push(serde_json::json!({
                "id": record.id,
                "name": record.name,
                "updateable": record.updateable(),
                "on_disk": data_dir.index_dir(record.id)?.is_dir(),
            }));
        }
        let body = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "indices": entries,
        });
        println!("{body}");
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Indices: {}", records.len());
        for record in &records {
            let on_disk = if data_dir.index_dir(record.id)?.is_dir() {
                "on disk"
            } else {
                "not yet downloaded"
            };
            let remote = if record.updateable() {
                "remote"
            } else {
                "local only"
            };
            println!("  {} {} ({remote}, {on_disk})", record.id, record.name);
        }
    }
    Ok(())
}
