//! End-to-end tests against a live SQL Server catalog
//!
//! Environment variables (with defaults):
//! - SQL_SERVER_HOST (default: localhost)
//! - SQL_SERVER_PORT (default: 1433)
//! - SQL_SERVER_USER (default: sa)
//! - SQL_SERVER_PASSWORD (default: Password1)

use std::sync::LazyLock;

use anyhow::Context;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use rust_sqlbrowse::catalog::IndexDirection;
use rust_sqlbrowse::extent::OrderColumn;
use rust_sqlbrowse::query::make_entities;
use rust_sqlbrowse::schema::{ModelHandle, SchemaBuilder, XmlSource};
use rust_sqlbrowse::{compile_overview, compile_request, BrowseOptions, ExtentRequest, Flavor, FlavorType};

use crate::common::shape;

/// Load environment variables from .env file (if present)
fn load_env() {
    let _ = dotenvy::dotenv();
}

static SQL_CONFIG: LazyLock<SqlServerConfig> = LazyLock::new(|| {
    load_env();
    SqlServerConfig {
        host: std::env::var("SQL_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("SQL_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433),
        user: std::env::var("SQL_SERVER_USER").unwrap_or_else(|_| "sa".to_string()),
        password: std::env::var("SQL_SERVER_PASSWORD").unwrap_or_else(|_| "Password1".to_string()),
    }
});

struct SqlServerConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
}

const TEST_DATABASE: &str = "SqlBrowse_E2E";

type SqlClient = Client<Compat<TcpStream>>;

fn create_config(database: Option<&str>) -> Config {
    let mut config = Config::new();
    config.host(&SQL_CONFIG.host);
    config.port(SQL_CONFIG.port);
    config.authentication(AuthMethod::sql_server(&SQL_CONFIG.user, &SQL_CONFIG.password));
    config.trust_cert();

    if let Some(db) = database {
        config.database(db);
    }

    config
}

async fn connect(database: Option<&str>) -> anyhow::Result<SqlClient> {
    let config = create_config(database);
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    let client = Client::connect(config, tcp.compat_write()).await?;
    Ok(client)
}

/// Runs queries on a blocking runtime. `for xml` results arrive as one row per
/// chunk of the document.
struct LiveSource {
    runtime: Runtime,
    client: SqlClient,
}

impl LiveSource {
    fn connect(database: &str) -> anyhow::Result<Self> {
        let runtime = Runtime::new()?;
        let client = runtime.block_on(connect(Some(database)))?;
        Ok(Self { runtime, client })
    }

    fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        let client = &mut self.client;
        self.runtime.block_on(async { client.execute(sql, &[]).await })?;
        Ok(())
    }
}

impl XmlSource for LiveSource {
    fn query_xml(&mut self, sql: &str) -> anyhow::Result<String> {
        let client = &mut self.client;
        let rows = self.runtime.block_on(async {
            client.simple_query(sql).await?.into_first_result().await
        })?;
        let mut xml = String::new();
        for row in &rows {
            let chunk: Option<&str> = row.get(0);
            xml.push_str(chunk.context("expected an nvarchar xml chunk")?);
        }
        Ok(xml)
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE dbo.customer (id int NOT NULL CONSTRAINT PK_customer PRIMARY KEY, email nvarchar(200) NULL, name nvarchar(100) NOT NULL)",
    "CREATE TABLE dbo.[order] (id int NOT NULL CONSTRAINT PK_order PRIMARY KEY, customer_id int NOT NULL CONSTRAINT FK_order_customer REFERENCES dbo.customer (id), order_date datetime2 NOT NULL, note nvarchar(400) NULL)",
    "CREATE INDEX IX_order_customer ON dbo.[order] (customer_id, order_date DESC)",
    "CREATE TABLE dbo.employee (id int NOT NULL CONSTRAINT PK_employee PRIMARY KEY, full_name nvarchar(100) NOT NULL, manager_id int NULL CONSTRAINT FK_employee_manager REFERENCES dbo.employee (id))",
    "CREATE INDEX IX_employee_manager ON dbo.employee (manager_id)",
    "INSERT INTO dbo.customer VALUES (1, N'alice@example.com', N'Alice'), (2, NULL, N'Bob')",
    "INSERT INTO dbo.[order] VALUES (10, 1, '2024-01-01', NULL), (11, 1, '2024-02-01', N'rush'), (12, 2, '2024-03-01', NULL)",
    "INSERT INTO dbo.employee VALUES (1, N'Grace', NULL), (2, N'Alan', 1)",
];

/// Recreate the test database with the shop schema and return a source bound to it.
fn prepare_database() -> anyhow::Result<LiveSource> {
    let mut master = LiveSource::connect("master")?;
    master.execute(&format!(
        "IF DB_ID('{0}') IS NOT NULL BEGIN ALTER DATABASE [{0}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; DROP DATABASE [{0}]; END; CREATE DATABASE [{0}];",
        TEST_DATABASE
    ))?;

    let mut source = LiveSource::connect(TEST_DATABASE)?;
    for statement in SCHEMA {
        source.execute(statement)?;
    }
    Ok(source)
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_live_catalog_model() {
    let mut source = prepare_database().expect("Should prepare test database");
    let builder = SchemaBuilder::new(BrowseOptions::default()).unwrap();
    let model = builder.build(&mut source).expect("Should read the live catalog");

    assert!(model.fingerprint().is_some());
    let order = model.require_table("dbo.order").unwrap();
    let fk = order.foreign_key("FK_order_customer").unwrap();
    assert_eq!(fk.backing_indexes, vec!["IX_order_customer"]);
    let index = order.index("IX_order_customer").unwrap();
    assert_eq!(index.tuple.columns[1].direction, IndexDirection::Descending);

    let employee = model.require_table("dbo.employee").unwrap();
    assert_eq!(employee.primary_name().map(|c| c.name.as_str()), Some("full_name"));
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_compiled_queries_round_trip() {
    let mut source = prepare_database().expect("Should prepare test database");
    let options = BrowseOptions::default();
    let model = SchemaBuilder::new(options.clone())
        .unwrap()
        .build(&mut source)
        .unwrap();

    let (extent, sql) = compile_overview(&model, &options).unwrap();
    let overview = make_entities(&model, &extent, &source.query_xml(&sql).unwrap()).unwrap();
    assert!(!model.is_stale(overview.fingerprint.as_deref()));
    assert_eq!(overview.entities("dbo.customer").len(), 1);

    let request = ExtentRequest::new("dbo.order", Flavor::new(FlavorType::Table, 0))
        .with_order(vec![
            OrderColumn::ascending("customer_id"),
            OrderColumn::new("order_date", IndexDirection::Descending),
        ])
        .with_values(vec![Some("1".to_string())], 1)
        .with_limit(10);
    let (extent, sql) = compile_request(&model, &options, &request).unwrap();
    let result = make_entities(&model, &extent, &source.query_xml(&sql).unwrap()).unwrap();
    let ids: Vec<_> = result
        .entities("dbo.order")
        .iter()
        .map(|o| o.value("id").unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["11", "10"]);
    assert!(result.entities("dbo.order").iter().all(|o| o.is_matching == Some(true)));

    let request = ExtentRequest::new("dbo.employee", Flavor::new(FlavorType::PageList, 2));
    let (extent, sql) = compile_request(&model, &options, &request).unwrap();
    let result = make_entities(&model, &extent, &source.query_xml(&sql).unwrap()).unwrap();
    let alan = result
        .entities("dbo.employee")
        .iter()
        .find(|e| e.value("full_name") == Some("Alan"))
        .unwrap();
    let manager = alan.related("D_FK_employee_manager").unwrap();
    assert_eq!(manager.entities[0].value("full_name"), Some("Grace"));
    assert!(!shape(&result.root).is_empty());
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_refresh_after_schema_change() {
    let mut source = prepare_database().expect("Should prepare test database");
    let builder = SchemaBuilder::new(BrowseOptions::default()).unwrap();
    let handle = ModelHandle::new(builder.build(&mut source).unwrap());

    assert!(!handle.refresh(&builder, &mut source).unwrap());

    // modify_date has a resolution finer than this sleep.
    std::thread::sleep(std::time::Duration::from_millis(50));
    source
        .execute("CREATE TABLE dbo.product (id int NOT NULL CONSTRAINT PK_product PRIMARY KEY, code varchar(20) NOT NULL)")
        .unwrap();

    assert!(handle.refresh(&builder, &mut source).unwrap());
    assert!(handle.current().find_table("dbo.product").is_some());
}
