use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use rust_sqlbrowse::catalog::snapshot::{read_snapshot, write_snapshot};
use rust_sqlbrowse::catalog::IndexDirection;
use rust_sqlbrowse::extent::OrderColumn;
use rust_sqlbrowse::query::{dummy_entity, make_entities};
use rust_sqlbrowse::types::ColumnType;
use rust_sqlbrowse::{
    compile_overview, compile_request, BrowseOptions, CircularModel, Extent, ExtentRequest,
    Flavor,
};

/// Command-line spelling of a NULL filter value.
const NULL_VALUE: &str = "<null>";

#[derive(Parser)]
#[command(name = "rust-sqlbrowse")]
#[command(author, version, about = "Browse a SQL Server database through its relation graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tables, keys and relations of a catalog snapshot
    Describe {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the query for a table, or the overview of all tables
    Sql {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Read a saved query result back into entities
    Materialize {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        request: RequestArgs,

        /// XML document the query returned
        #[arg(short, long)]
        result: PathBuf,
    },
    /// Print the empty entity shape of a request
    Template {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Check a search value against a column type
    Validate {
        /// SQL type name, e.g. datetime2
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Value to check
        value: String,
    },
    /// Load a catalog snapshot and write it back normalized
    Snapshot {
        /// Catalog snapshot to read
        #[arg(short, long)]
        catalog: PathBuf,

        /// Where to write the result
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Catalog snapshot file
    #[arg(short, long)]
    catalog: PathBuf,

    /// Leave views out of the model
    #[arg(long)]
    exclude_views: bool,

    /// Row limit for flavors without a fixed one
    #[arg(long)]
    default_limit: Option<usize>,

    /// Flavor of each table in the overview, e.g. existence or block:1
    #[arg(long, default_value = "existence:0")]
    top_flavor: Flavor,
}

#[derive(Args)]
struct RequestArgs {
    /// Table to query; the overview of all tables when omitted
    #[arg(long)]
    table: Option<String>,

    /// Flavor of the requested table, e.g. page or blocklist:2
    #[arg(short, long, default_value = "page:1")]
    flavor: Flavor,

    /// Index to order by and force
    #[arg(long)]
    index: Option<String>,

    /// Order column, `name` or `name:desc`; repeatable
    #[arg(long)]
    order: Vec<String>,

    /// Filter value aligned with the order columns; `<null>` for NULL; repeatable
    #[arg(long = "value")]
    values: Vec<String>,

    /// How many leading values are bound key components
    #[arg(long, default_value_t = 0)]
    key_values: usize,

    /// Free-text search
    #[arg(long)]
    scan: Option<String>,

    /// Row limit of the requested table
    #[arg(long)]
    limit: Option<usize>,
}

impl ModelArgs {
    fn options(&self) -> BrowseOptions {
        BrowseOptions {
            exclude_views: self.exclude_views,
            default_limit: self.default_limit,
            top_flavor: self.top_flavor,
        }
    }

    fn load(&self) -> Result<(CircularModel, BrowseOptions)> {
        let options = self.options();
        let catalog = read_snapshot(&self.catalog)?;
        let model = CircularModel::build(&catalog, &options)
            .with_context(|| format!("Failed to model {}", self.catalog.display()))?;
        Ok((model, options))
    }
}

impl RequestArgs {
    fn to_request(&self, table: &str) -> ExtentRequest {
        let mut request = ExtentRequest::new(table, self.flavor).with_values(
            self.values
                .iter()
                .map(|v| (v != NULL_VALUE).then(|| v.clone()))
                .collect(),
            self.key_values,
        );
        request.index = self.index.clone();
        request.order = self
            .order
            .iter()
            .map(|item| match item.rsplit_once(':') {
                Some((name, direction)) => {
                    OrderColumn::new(name, IndexDirection::parse(direction))
                }
                None => OrderColumn::ascending(item.as_str()),
            })
            .collect();
        request.scan = self.scan.clone();
        request.limit = self.limit;
        request
    }

    fn compile(&self, model: &CircularModel, options: &BrowseOptions) -> Result<(Extent, String)> {
        match &self.table {
            Some(table) => compile_request(model, options, &self.to_request(table)),
            None => compile_overview(model, options),
        }
    }
}

#[derive(Serialize)]
struct TableSummary {
    name: String,
    abbreviation: String,
    hue: u16,
    is_view: bool,
    primary_name: Option<String>,
    columns: Vec<ColumnSummary>,
    indexes: Vec<IndexSummary>,
    relations: Vec<RelationSummary>,
}

#[derive(Serialize)]
struct ColumnSummary {
    name: String,
    sql_type: String,
    nullable: bool,
}

#[derive(Serialize)]
struct IndexSummary {
    name: String,
    unique: bool,
    primary: bool,
    columns: Vec<String>,
    unsupported: Option<String>,
}

#[derive(Serialize)]
struct RelationSummary {
    name: String,
    target: String,
    many: bool,
    uniquely_typed: bool,
}

fn describe(model: &CircularModel) -> Vec<TableSummary> {
    model
        .tables()
        .map(|table| TableSummary {
            name: table.name.simple().to_string(),
            abbreviation: table.abbreviation.clone(),
            hue: table.hue,
            is_view: table.is_view,
            primary_name: table.primary_name().map(|c| c.name.clone()),
            columns: table
                .columns
                .iter()
                .map(|c| ColumnSummary {
                    name: c.name.clone(),
                    sql_type: c.sql_type.clone(),
                    nullable: c.is_nullable,
                })
                .collect(),
            indexes: table
                .indexes
                .iter()
                .map(|i| IndexSummary {
                    name: i.name().to_string(),
                    unique: i.is_unique,
                    primary: i.is_primary,
                    columns: table
                        .column_names(&i.tuple)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    unsupported: i.unsupported.as_ref().map(|r| r.to_string()),
                })
                .collect(),
            relations: table
                .relations
                .iter()
                .map(|(name, &end)| RelationSummary {
                    name: name.clone(),
                    target: model.target_table(end).name.simple().to_string(),
                    many: model.navigates_to_many(end),
                    uniquely_typed: model.is_uniquely_typed(end),
                })
                .collect(),
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Describe { model } => {
            let (model, _) = model.load()?;
            print_json(&describe(&model))?;
        }
        Commands::Sql { model, request } => {
            let (model, options) = model.load()?;
            let (_, sql) = request.compile(&model, &options)?;
            println!("{}", sql);
        }
        Commands::Materialize {
            model,
            request,
            result,
        } => {
            let (model, options) = model.load()?;
            let (extent, _) = request.compile(&model, &options)?;
            let result = make_entities(&model, &extent, &read_text(&result)?)?;
            if model.is_stale(result.fingerprint.as_deref()) {
                tracing::warn!("result was produced by a different schema version");
            }
            print_json(&result.root.to_debug_json())?;
        }
        Commands::Template { model, request } => {
            let (model, options) = model.load()?;
            let (extent, _) = request.compile(&model, &options)?;
            print_json(&dummy_entity(&model, &extent)?.to_debug_json())?;
        }
        Commands::Validate { type_name, value } => {
            let Some(column_type) = ColumnType::from_sql_name(&type_name) else {
                bail!("Unsupported column type: {}", type_name);
            };
            match column_type.validate(&value) {
                Ok(range) => print_json(&range)?,
                Err(err) => bail!("Invalid value for {}: {}", type_name, err),
            }
        }
        Commands::Snapshot { catalog, output } => {
            let schema = read_snapshot(&catalog)?;
            write_snapshot(&schema, &output)?;
            if cli.verbose {
                println!("Wrote {} tables to {}", schema.tables.len(), output.display());
            }
        }
    }

    Ok(())
}
