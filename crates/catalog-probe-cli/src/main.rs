//! catalog-probe CLI - cross-dialect metadata introspection and validation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use catalog_probe::{
    drivers, scan_database, CatalogReader, Config, Database, DatabaseImpl, ProbeError, Validator,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "catalog-probe")]
#[command(about = "Cross-dialect metadata introspection and validation")]
#[command(version)]
struct Cli {
    /// Path to YAML (or .json) configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe tables: columns, constraints, unique indexes and partitions
    Metadata {
        /// Describe only this table
        #[arg(long)]
        table: Option<String>,

        /// Override source schema
        #[arg(long)]
        source_schema: Option<String>,

        /// Override number of scan connections
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Check whether a table exists
    FindTable {
        /// Table name
        table: String,
    },

    /// Count rows in a table
    Count {
        /// Table name
        table: String,

        /// Filter fragment appended to the count query (e.g. "WHERE id > 10")
        #[arg(long = "where")]
        where_clause: Option<String>,
    },

    /// Minimum and maximum value of a column
    MinMax {
        /// Table name
        table: String,

        /// Column name
        column: String,
    },

    /// Storage used by a table, in the dialect's own unit
    TableSpace {
        /// Table name
        table: String,
    },

    /// Run a hash query and print the first column of every row
    Checksum {
        /// Query projecting one hash per row
        sql: String,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), ProbeError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // A full scan manages its own connections.
    if let Commands::Metadata {
        table: None,
        source_schema,
        workers,
    } = &cli.command
    {
        if let Some(schema) = source_schema {
            config.database.source_schema = Some(schema.clone());
        }
        let workers = workers.unwrap_or(config.scan.workers);
        if workers == 0 {
            return Err(ProbeError::Config("--workers must be at least 1".into()));
        }
        config.database.validate()?;

        let database = &config.database;
        let tables = scan_database(|| drivers::connect(database), None, workers).await?;

        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&tables)?);
        } else {
            for table in &tables {
                println!(
                    "{}.{}: {} columns, {} constraints, {} indexes, {} partitions",
                    table.table_schema,
                    table.table_name,
                    table.column_detail.len(),
                    table.constraint_details.len(),
                    table.index_details.len(),
                    table.partition_json.len()
                );
            }
            println!("\n{} tables", tables.len());
        }
        return Ok(());
    }

    if let Commands::Metadata {
        source_schema: Some(schema),
        ..
    } = &cli.command
    {
        config.database.source_schema = Some(schema.clone());
        config.database.validate()?;
    }

    let mut db = drivers::connect(&config.database).await?;
    let outcome = execute(&mut db, cli.command, cli.output_json).await;
    let closed = Database::close(&mut db).await;
    outcome?;
    closed
}

async fn execute(
    db: &mut DatabaseImpl,
    command: Commands,
    output_json: bool,
) -> Result<(), ProbeError> {
    match command {
        Commands::Metadata { table, .. } => {
            let tables = db.metadata_details(table.as_deref()).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}.{}", table.table_schema, table.table_name);
                    for column in &table.column_detail {
                        println!(
                            "  {} {} nullable={} default={} length={} precision={} scale={}",
                            column.column_name,
                            column.data_type,
                            column.is_nullable,
                            column.column_default,
                            column.data_length,
                            column.data_precision,
                            column.data_scale
                        );
                    }
                    for constraint in &table.constraint_details {
                        println!(
                            "  {} {} ({} #{})",
                            constraint.constraint_type,
                            constraint.constraint_name,
                            constraint.column_name,
                            constraint.position
                        );
                    }
                    for index in &table.index_details {
                        println!(
                            "  index {} {} ({})",
                            index.index_name, index.index_type, index.column_name
                        );
                    }
                    for partition in &table.partition_json {
                        println!(
                            "  partition {} #{} ({} .. {})",
                            partition.partition_name,
                            partition.partition_position,
                            partition.min_value,
                            partition.max_value
                        );
                    }
                }
            }
        }

        Commands::FindTable { table } => {
            let missing = db.find_table(&table).await?;
            if output_json {
                println!("{}", json!({ "table": table, "missing": missing }));
            } else if missing {
                println!("{}: not found", table);
            } else {
                println!("{}: exists", table);
            }
        }

        Commands::Count {
            table,
            where_clause,
        } => {
            let count = db.table_count(&table, where_clause.as_deref()).await?;
            if output_json {
                println!("{}", json!({ "table": table, "count": count }));
            } else {
                println!("{}: {} rows", table, count);
            }
        }

        Commands::MinMax { table, column } => {
            let bounds = db.find_min_max(&table, &column).await?;
            if output_json {
                // An empty table yields an empty object.
                match bounds {
                    Some(bounds) => println!("{}", serde_json::to_string(&bounds)?),
                    None => println!("{{}}"),
                }
            } else {
                match bounds {
                    Some(bounds) => println!(
                        "{}.{}: min={} max={}",
                        table, column, bounds.min_value, bounds.max_value
                    ),
                    None => println!("{}.{}: no rows", table, column),
                }
            }
        }

        Commands::TableSpace { table } => {
            let space = db.table_space(&table).await?;
            if output_json {
                println!(
                    "{}",
                    json!({ "table": table, "size": space, "unit": space.unit() })
                );
            } else {
                println!("{}: {}", table, space);
            }
        }

        Commands::Checksum { sql } => {
            let hashes = db.calculate_checksum(&sql).await?;
            if output_json {
                println!("{}", serde_json::to_string(&hashes)?);
            } else {
                for hash in &hashes {
                    println!("{}", hash);
                }
            }
        }

        Commands::HealthCheck => {
            let start = Instant::now();
            db.ping().await?;
            let latency_ms = start.elapsed().as_millis() as u64;
            let kind = db.kind();
            if output_json {
                println!(
                    "{}",
                    json!({ "dialect": kind.name(), "connected": true, "latency_ms": latency_ms })
                );
            } else {
                println!("Health Check Results:");
                println!("  {}: OK ({}ms)", kind.display_name(), latency_ms);
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Results go to stdout; logs stay on stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
