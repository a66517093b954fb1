//! mgq - run facade queries from the shell
//!
//! Usage:
//!   mgq ping
//!   mgq find users --filter '{"age": {"$gt": 30}}' --sort=-age,name
//!   mgq find users --projection '{"name": 1}' --limit 10
//!   mgq find-one users --filter '{"name": "Alice"}'
//!   mgq by-id users '{"$oid": "65f0c0ffee0000000000beef"}'
//!   mgq count users --filter '{"active": true}'
//!   mgq distinct users city
//!   mgq aggregate users '[{"$group": {"_id": "$city", "n": {"$sum": 1}}}]'
//!   mgq insert users '[{"name": "Dave"}]'
//!   mgq update users --selector '{"name": "Dave"}' --update '{"$set": {"age": 52}}'
//!   mgq delete-fields users --selector '{"name": "Dave"}' nickname age
//!   mgq upsert users --selector '{"name": "Eve"}' --update '{"$set": {"age": 20}}'
//!   mgq remove users --selector '{"stale": true}' --all
//!   mgq find-and-modify counters --filter '{"_id": "orders"}' --update '{"$inc": {"seq": 1}}'
//!
//! Connection settings come from --config (TOML, `[mongodb]` table), then
//! MANGROVE_* environment variables, then --uri/--database/--test-db.

mod json;

use anyhow::{Context, Result};
use bson::{Bson, Document};
use clap::{Parser, Subcommand};
use mangrove_mongodb::{ChangeInfo, QueryFacade, QuerySpec, StoreConfig};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "mgq")]
#[command(about = "Query MongoDB collections through the mangrove facade", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file with a [mongodb] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection string (overrides hosts, credentials and the configured database)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Database to query (wins over a database path in the URI)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Query the configured test database instead
    #[arg(long, global = true)]
    test_db: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the server is reachable
    Ping,
    /// Find documents
    Find {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
        /// Comma separated fields, '-' prefix for descending
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        projection: Option<String>,
        /// Maximum documents to return (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },
    /// Find the first matching document
    FindOne {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
    },
    /// Find a document by _id (JSON value, bare text is taken as a string)
    ById { collection: String, id: String },
    /// Count matching documents
    Count {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
    },
    /// Distinct values of a field
    Distinct {
        collection: String,
        field: String,
        #[arg(long, default_value = "{}")]
        filter: String,
    },
    /// Run an aggregation pipeline (JSON array of stages)
    Aggregate { collection: String, pipeline: String },
    /// Insert a document or a JSON array of documents
    Insert { collection: String, documents: String },
    /// Update the first matching document
    Update {
        collection: String,
        #[arg(long)]
        selector: String,
        #[arg(long)]
        update: String,
    },
    /// Remove fields from the first matching document
    DeleteFields {
        collection: String,
        #[arg(long)]
        selector: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Update the first matching document or insert one
    Upsert {
        collection: String,
        #[arg(long)]
        selector: String,
        #[arg(long)]
        update: String,
    },
    /// Remove the first matching document, or all with --all
    Remove {
        collection: String,
        #[arg(long)]
        selector: String,
        #[arg(long)]
        all: bool,
    },
    /// Atomically update the first match and print it as modified
    FindAndModify {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
        #[arg(long)]
        update: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = load_config(&cli)?;
    let database = selected_database(&cli, &config);
    debug!(?config, ?database, "Resolved configuration");

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async {
        let mut facade = QueryFacade::connect(&config)
            .await
            .context("Failed to connect to MongoDB")?;
        if let Some(database) = &database {
            facade = facade.with_database(database);
        }
        run(&facade, cli.command).await
    })
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let mut config = config.with_env_overrides();
    if cli.test_db {
        config = config.use_test_database();
    }
    if let Some(uri) = &cli.uri {
        config.uri = Some(uri.clone());
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    Ok(config)
}

/// Database named on the command line, which wins over a path in the URI
fn selected_database(cli: &Cli, config: &StoreConfig) -> Option<String> {
    match (&cli.database, cli.test_db) {
        (Some(database), _) => Some(database.clone()),
        (None, true) => Some(config.test_database.clone()),
        (None, false) => None,
    }
}

async fn run(facade: &QueryFacade, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            facade.ping().await?;
            println!("ok");
        }

        Commands::Find {
            collection,
            filter,
            sort,
            projection,
            limit,
        } => {
            let filter = json::parse_document("--filter", &filter)?;
            let projection = projection
                .map(|p| json::parse_document("--projection", &p))
                .transpose()?;

            let docs = match (sort, projection, limit) {
                (None, None, 0) => facade.get_results(&collection, filter).await?,
                (Some(sort), None, 0) => facade.get_sorted_results(&collection, filter, &sort).await?,
                (None, Some(projection), 0) => facade.get_fields(&collection, filter, projection).await?,
                (Some(sort), Some(projection), 0) => {
                    facade
                        .get_sorted_fields(&collection, filter, projection, &sort)
                        .await?
                }
                (None, projection, limit) => {
                    facade
                        .get_fields_with_limit(&collection, filter, projection.unwrap_or_default(), limit)
                        .await?
                }
                (Some(sort), projection, limit) => {
                    let mut spec = QuerySpec::new(collection).filter(filter).sort_by(&sort)?.limit(limit);
                    if let Some(projection) = projection {
                        spec = spec.projection(projection);
                    }
                    facade.find(spec).await?
                }
            };
            print_documents(docs);
        }

        Commands::FindOne { collection, filter } => {
            let filter = json::parse_document("--filter", &filter)?;
            print_optional(facade.find_one_document(&collection, filter).await?);
        }

        Commands::ById { collection, id } => {
            let id = json::parse_value("id", &id).unwrap_or(Bson::String(id));
            print_optional(facade.get_result_by_id(&collection, id).await?);
        }

        Commands::Count { collection, filter } => {
            let filter = json::parse_document("--filter", &filter)?;
            println!("{}", facade.count(&collection, filter).await?);
        }

        Commands::Distinct {
            collection,
            field,
            filter,
        } => {
            let filter = json::parse_document("--filter", &filter)?;
            for value in facade.distinct(&collection, filter, &field).await? {
                println!("{}", json::render(value));
            }
        }

        Commands::Aggregate { collection, pipeline } => {
            let pipeline = json::parse_documents("pipeline", &pipeline)?;
            print_documents(facade.aggregate(&collection, pipeline).await?);
        }

        Commands::Insert {
            collection,
            documents,
        } => {
            let documents = json::parse_documents("documents", &documents)?;
            for id in facade.insert_documents(&collection, documents).await? {
                println!("{}", json::render(id));
            }
        }

        Commands::Update {
            collection,
            selector,
            update,
        } => {
            let selector = json::parse_document("--selector", &selector)?;
            let update = json::parse_document("--update", &update)?;
            print_change(facade.update_document(&collection, selector, update).await?);
        }

        Commands::DeleteFields {
            collection,
            selector,
            fields,
        } => {
            let selector = json::parse_document("--selector", &selector)?;
            print_change(facade.delete_fields(&collection, selector, fields.as_slice()).await?);
        }

        Commands::Upsert {
            collection,
            selector,
            update,
        } => {
            let selector = json::parse_document("--selector", &selector)?;
            let update = json::parse_document("--update", &update)?;
            print_change(facade.upsert_document(&collection, selector, update).await?);
        }

        Commands::Remove {
            collection,
            selector,
            all,
        } => {
            let selector = json::parse_document("--selector", &selector)?;
            let info = if all {
                facade.remove_all_documents(&collection, selector).await?
            } else {
                facade.remove_document(&collection, selector).await?
            };
            print_change(info);
        }

        Commands::FindAndModify {
            collection,
            filter,
            update,
        } => {
            let filter = json::parse_document("--filter", &filter)?;
            let update = json::parse_document("--update", &update)?;
            print_optional(facade.find_and_modify(&collection, filter, update).await?);
        }
    }

    Ok(())
}

fn print_documents(docs: Vec<Document>) {
    for doc in docs {
        println!("{}", json::render(Bson::Document(doc)));
    }
}

fn print_optional(doc: Option<Document>) {
    match doc {
        Some(doc) => println!("{}", json::render(Bson::Document(doc))),
        None => println!("null"),
    }
}

fn print_change(info: ChangeInfo) {
    let rendered = serde_json::json!({
        "matched": info.matched,
        "updated": info.updated,
        "removed": info.removed,
        "upserted_id": info.upserted_id.map(Bson::into_relaxed_extjson),
    });
    println!("{}", rendered);
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}
