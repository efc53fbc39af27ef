use async_trait::async_trait;
use futures_util::TryStreamExt;
use tiberius::QueryItem;

use super::client::{MssqlClient, create_mssql_client};
use super::config::MssqlOptions;
use super::params::bind_query_params;
use super::query::{build_row, classify_error, column_names, is_invocation_error};
use crate::aggregate::ResultShape;
use crate::connection::{ConnectionHandle, DatabaseDriver, EventSink};
use crate::error::CatalogDbError;
use crate::request::Request;

/// [`DatabaseDriver`] over a single Tiberius client.
pub struct MssqlDriver {
    client: MssqlClient,
}

impl MssqlDriver {
    #[must_use]
    pub fn new(client: MssqlClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns `CatalogDbError::ConnectionError` if the server cannot be
    /// reached or rejects the login.
    pub async fn connect(opts: &MssqlOptions) -> Result<Self, CatalogDbError> {
        create_mssql_client(opts).await.map(Self::new)
    }

    async fn stream_rows(
        &mut self,
        sql: &str,
        request: &Request,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        let query = bind_query_params(sql, request.params())?;
        let mut stream = match query.query(&mut self.client).await {
            Ok(stream) => stream,
            Err(err) => return report(err, sink),
        };

        let mut names = None;
        let mut rows = 0_u64;
        loop {
            match stream.try_next().await {
                Ok(Some(QueryItem::Metadata(meta))) => names = Some(column_names(meta.columns())),
                Ok(Some(QueryItem::Row(row))) => {
                    let names = names
                        .get_or_insert_with(|| column_names(row.columns()))
                        .clone();
                    match build_row(names, &row) {
                        Ok(row) => {
                            rows += 1;
                            sink.on_row(row);
                        }
                        Err(err) => {
                            sink.on_error(err);
                            return Ok(());
                        }
                    }
                }
                Ok(None) => {
                    sink.on_done(rows);
                    return Ok(());
                }
                Err(err) => return report(err, sink),
            }
        }
    }

    async fn execute(
        &mut self,
        sql: &str,
        request: &Request,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        let query = bind_query_params(sql, request.params())?;
        match query.execute(&mut self.client).await {
            Ok(result) => {
                sink.on_done(result.rows_affected().iter().sum());
                Ok(())
            }
            Err(err) => report(err, sink),
        }
    }
}

/// Route a tiberius failure: requests that never went out fail the call
/// itself, anything the server or the transport reported is an error event.
fn report(err: tiberius::error::Error, sink: &mut dyn EventSink) -> Result<(), CatalogDbError> {
    if is_invocation_error(&err) {
        return Err(CatalogDbError::SynchronousInvocation(err.to_string()));
    }
    sink.on_error(classify_error(err));
    Ok(())
}

impl std::fmt::Debug for MssqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlDriver")
            .field("client", &"<MssqlClient>")
            .finish()
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    async fn run(
        &mut self,
        request: &Request,
        shape: ResultShape,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        let sql = request.to_sql();
        match shape {
            ResultShape::Rows => self.stream_rows(&sql, request, sink).await,
            ResultShape::RowCount => self.execute(&sql, request, sink).await,
        }
    }

    async fn close(self: Box<Self>) -> Result<(), CatalogDbError> {
        self.client.close().await.map_err(CatalogDbError::from)
    }
}

/// Connect to SQL Server once and wrap the result in a [`ConnectionHandle`].
///
/// A failed connect does not return an error: the handle records it and every
/// request made through it fails with a connection error.
pub async fn connect(opts: &MssqlOptions) -> ConnectionHandle {
    tracing::debug!(server = %opts.server, database = %opts.database, "connecting to SQL Server");
    ConnectionHandle::connect(MssqlDriver::connect(opts)).await
}
