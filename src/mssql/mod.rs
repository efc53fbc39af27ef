// MSSQL module - SQL Server driver for the catalog connection
//
// - config: connection options, environment loading, Tiberius config
// - client: raw client creation
// - params: typed parameter binding
// - query: row decoding and error classification
// - driver: `DatabaseDriver` implementation and the one-shot connect

pub mod client;
pub mod config;
pub mod driver;
pub mod params;
pub mod query;

pub use client::{MssqlClient, create_mssql_client};
pub use config::{MssqlOptions, MssqlOptionsBuilder};
pub use driver::{MssqlDriver, connect};
pub use params::bind_query_params;
