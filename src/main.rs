//! Exprdb CLI - Load and inspect gene-expression datasets

use clap::{Parser, Subcommand};
use exprdb::cluster::DEFAULT_CLUSTER_FILE;
use exprdb::config::{self, ExprdbConfig};
use exprdb::loader::{self, EmptyIdPolicy, LoadOptions};
use exprdb::matrix::DEFAULT_BATCH_SIZE;
use exprdb::storage::{ExprStore, DEFAULT_SCAN_LIMIT};
use exprdb::ui::{self, Icons};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "exprdb")]
#[command(version = "0.1.0")]
#[command(about = "Gene-expression MTX ingest into an embedded SQLite store")]
#[command(long_about = r#"
Exprdb loads sparse single-cell expression data into SQLite, enabling:
  • Streaming ingest of MTX-formatted expression matrices
  • Cluster-assignment loading from per-dataset TSV files
  • Ad-hoc SQL over the loaded tables

Example usage:
  exprdb init
  exprdb load --dir resources/ebi/E-GEOD-100618 --base E-GEOD-100618 --with-clusters
  exprdb scan --table expr --limit 20
  exprdb query --sql "SELECT COUNT(*) FROM expr"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or replace) the expression and cluster tables
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Replace the tables even if the database file already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Load a dataset's expression matrix from MTX files
    Load {
        /// Dataset directory holding the MTX files
        #[arg(short = 'D', long)]
        dir: PathBuf,

        /// Dataset name; also the file-name prefix of its MTX files
        #[arg(short, long)]
        base: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Triples per batch (and per bulk insert)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Also load the directory's cluster assignments afterwards
        #[arg(long)]
        with_clusters: bool,

        /// Fail on empty resolved gene identifiers instead of warning
        #[arg(long)]
        reject_empty: bool,
    },

    /// Load a dataset's cluster assignments
    LoadClusters {
        /// Dataset directory holding the cluster file
        #[arg(short = 'D', long)]
        dir: PathBuf,

        /// Cluster file name inside the dataset directory
        #[arg(short, long, default_value = DEFAULT_CLUSTER_FILE)]
        file: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show rows from a table
    Scan {
        /// Table to scan (expr or clusters)
        #[arg(short, long)]
        table: String,

        /// Maximum number of rows
        #[arg(short, long, default_value_t = DEFAULT_SCAN_LIMIT)]
        limit: usize,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Run arbitrary SQL and print the result set
    Query {
        /// SQL text to execute
        #[arg(short, long)]
        sql: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,
    },

    /// Show row counts for the loaded tables
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,
    },
}

fn resolve_database(flag: Option<PathBuf>, config: &Option<ExprdbConfig>) -> PathBuf {
    flag.or_else(|| {
        config
            .as_ref()
            .and_then(|c| c.database.as_ref())
            .map(PathBuf::from)
    })
    .unwrap_or_else(config::default_database_path)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = config::load_config(None)?;

    match cli.command {
        Commands::Init { database, force } => {
            let db_path = resolve_database(database, &config);
            if ExprStore::exists(&db_path) && !force {
                anyhow::bail!(
                    "database already exists at {} (use --force to replace its tables)",
                    db_path.display()
                );
            }

            config::ensure_db_dir(&db_path)?;
            let store = ExprStore::open(&db_path)?;
            store.create_tables()?;

            ui::success(&format!("Initialized database at {}", db_path.display()));
        }

        Commands::Load {
            dir,
            base,
            database,
            batch_size,
            with_clusters,
            reject_empty,
        } => {
            let db_path = resolve_database(database, &config);
            config::ensure_db_dir(&db_path)?;

            // A fresh database file gets its schema created up front
            let fresh = !ExprStore::exists(&db_path);
            let mut store = ExprStore::open(&db_path)?;
            if fresh {
                tracing::info!("creating schema in new database {:?}", db_path);
                store.create_tables()?;
            }

            let empty_gene_id = if reject_empty {
                EmptyIdPolicy::Reject
            } else {
                config
                    .as_ref()
                    .and_then(|c| c.on_empty_gene_id.as_deref())
                    .map(|s| s.parse::<EmptyIdPolicy>())
                    .transpose()?
                    .unwrap_or_default()
            };
            let options = LoadOptions {
                batch_size: batch_size
                    .or_else(|| config.as_ref().and_then(|c| c.batch_size))
                    .unwrap_or(DEFAULT_BATCH_SIZE),
                empty_gene_id,
            };

            ui::header(&format!("Loading dataset: {}", base));
            ui::status(Icons::FILE, "Directory", &dir.display().to_string());
            ui::status(Icons::DATABASE, "Database", &db_path.display().to_string());

            let spinner = ui::Spinner::new("Streaming matrix batches...");
            let start = Instant::now();
            let summary = loader::load_mtx(&mut store, &dir, &base, &options)?;
            spinner.finish(format!(
                "{} records in {} batches",
                summary.records, summary.batches
            ));
            ui::timing(&format!("Expression load took {:.2?}", start.elapsed()));

            if with_clusters {
                let start = Instant::now();
                let inserted = loader::load_clusters(&mut store, &dir, DEFAULT_CLUSTER_FILE)?;
                ui::timing(&format!(
                    "Cluster load took {:.2?} ({} assignments)",
                    start.elapsed(),
                    inserted
                ));
            }

            ui::success("Load complete!");

            let stats = store.stats()?;
            ui::section("Database");
            ui::summary_row("Expression records:", &stats.expr.to_string());
            ui::summary_row("Cluster records:", &stats.clusters.to_string());
        }

        Commands::LoadClusters { dir, file, database } => {
            let db_path = resolve_database(database, &config);
            let mut store = ExprStore::open(&db_path)?;

            ui::header(&format!("Loading clusters from {}", dir.display()));
            let inserted = loader::load_clusters(&mut store, &dir, &file)?;
            ui::success(&format!("Inserted {} cluster assignments", inserted));
        }

        Commands::Scan { table, limit, database } => {
            let db_path = resolve_database(database, &config);
            let store = ExprStore::open(&db_path)?;

            let (columns, rows) = match table.as_str() {
                "expr" => {
                    let records = store.scan_expr(limit)?;
                    let rows = records
                        .iter()
                        .map(|r| vec![r.gene_id.clone(), r.cell_id.clone(), r.expr.to_string()])
                        .collect::<Vec<_>>();
                    (
                        vec!["gene_id".to_string(), "cell_id".to_string(), "expr".to_string()],
                        rows,
                    )
                }
                "clusters" => {
                    let records = store.scan_clusters(limit)?;
                    let rows = records
                        .iter()
                        .map(|r| {
                            vec![
                                r.metacluster_id.to_string(),
                                r.cluster_id.to_string(),
                                r.cell_id.clone(),
                                r.dataset_name.clone(),
                            ]
                        })
                        .collect::<Vec<_>>();
                    (
                        vec![
                            "metacluster_id".to_string(),
                            "cluster_id".to_string(),
                            "cell_id".to_string(),
                            "dataset_name".to_string(),
                        ],
                        rows,
                    )
                }
                other => anyhow::bail!("unknown table '{}' (expected 'expr' or 'clusters')", other),
            };

            if rows.is_empty() {
                println!("∅ No rows in {}.", table);
            } else {
                println!("{}", ui::records_table(&columns, &rows));
            }
        }

        Commands::Query { sql, database, format } => {
            let db_path = resolve_database(database, &config);
            let store = ExprStore::open(&db_path)?;
            let (columns, rows) = store.query(&sql)?;

            if format == "json" {
                let data = serde_json::json!({
                    "columns": columns,
                    "rows": rows,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if rows.is_empty() {
                println!("{} Ran: {}", Icons::SEARCH, sql);
                println!("∅ Empty result set.");
            } else {
                println!("{} Ran: {}", Icons::SEARCH, sql);
                println!("{}", ui::records_table(&columns, &rows));
            }
        }

        Commands::Stats { database, format } => {
            let db_path = resolve_database(database, &config);
            let store = ExprStore::open(&db_path)?;
            let stats = store.stats()?;

            if format == "json" {
                let data = serde_json::json!({
                    "expr": stats.expr,
                    "clusters": stats.clusters,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                let expr_count = stats.expr.to_string();
                let cluster_count = stats.clusters.to_string();

                println!("{} Exprdb Statistics ({})", Icons::STATS, db_path.display());
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Expression records", expr_count.as_str()),
                        ("Cluster records", cluster_count.as_str()),
                    ])
                );
            }
        }
    }

    Ok(())
}
