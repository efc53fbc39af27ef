use crate::aggregate::ResultAggregator;
use crate::completion::CompletionGuard;
use crate::connection::{ConnectionHandle, EventSink};
use crate::error::CatalogDbError;
use crate::request::Request;
use crate::results::Row;

/// Where a request is in its life. `Completed` and `Failed` are terminal and
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Executing,
    RowArriving,
    Completed,
    Failed,
}

impl RequestState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Run `request` and resolve with the aggregated payload.
///
/// # Errors
/// Returns the first error reported for the request: a connection error if
/// the handle is not connected, otherwise whatever the driver reported.
pub async fn dispatch<A: ResultAggregator>(
    handle: &ConnectionHandle,
    request: Request,
    aggregator: A,
) -> Result<A::Output, CatalogDbError> {
    let (guard, completion) = CompletionGuard::channel();
    drive(handle, &request, aggregator, &guard).await;
    completion.await
}

/// Run `request` and hand its outcome to `callback`, exactly once.
///
/// Returns the state the request ended in.
pub async fn dispatch_with<A, F>(
    handle: &ConnectionHandle,
    request: Request,
    aggregator: A,
    callback: F,
) -> RequestState
where
    A: ResultAggregator,
    F: FnOnce(Result<A::Output, CatalogDbError>) + Send + 'static,
{
    let guard = CompletionGuard::new(callback);
    drive(handle, &request, aggregator, &guard).await
}

async fn drive<A: ResultAggregator>(
    handle: &ConnectionHandle,
    request: &Request,
    aggregator: A,
    guard: &CompletionGuard<A::Output>,
) -> RequestState {
    let mut handlers = RequestHandlers {
        label: request.label(),
        state: RequestState::Created,
        aggregator,
        guard,
    };

    let mut lease = match handle.acquire().await {
        Ok(lease) => lease,
        Err(err) => {
            handlers.fail(err);
            return handlers.state;
        }
    };
    let driver = match lease.driver() {
        Ok(driver) => driver,
        Err(err) => {
            handlers.fail(err);
            return handlers.state;
        }
    };

    handlers.state = RequestState::Executing;
    tracing::debug!(request = %handlers.label, shape = ?A::SHAPE, "submitting request");

    if let Err(err) = driver.run(request, A::SHAPE, &mut handlers).await {
        tracing::debug!(request = %handlers.label, error = %err, "request could not be issued");
        handlers.fail(err);
    }

    if !handlers.state.is_terminal() {
        handlers.fail(CatalogDbError::DriverError(format!(
            "{} finished without a completion event",
            handlers.label
        )));
    }
    handlers.state
}

/// Row, done and error handlers registered for one request. All terminal
/// paths go through the shared guard.
struct RequestHandlers<'g, A: ResultAggregator> {
    label: String,
    state: RequestState,
    aggregator: A,
    guard: &'g CompletionGuard<A::Output>,
}

impl<A: ResultAggregator> RequestHandlers<'_, A> {
    fn fail(&mut self, error: CatalogDbError) {
        if self.state.is_terminal() {
            tracing::debug!(
                request = %self.label,
                error = %error,
                "error after completion ignored"
            );
            return;
        }
        tracing::debug!(request = %self.label, error = %error, "request failed");
        if self.guard.deliver(Err(error)) {
            self.state = RequestState::Failed;
        }
    }
}

impl<A: ResultAggregator> EventSink for RequestHandlers<'_, A> {
    fn on_row(&mut self, row: Row) {
        if self.state.is_terminal() {
            tracing::trace!(request = %self.label, "row after completion dropped");
            return;
        }
        tracing::trace!(request = %self.label, "row");
        self.state = RequestState::RowArriving;
        self.aggregator.on_row(row);
    }

    fn on_done(&mut self, rows_affected: u64) {
        if self.state.is_terminal() {
            tracing::debug!(request = %self.label, "completion after terminal event ignored");
            return;
        }
        let payload = self.aggregator.finish(rows_affected);
        if self.guard.deliver(Ok(payload)) {
            self.state = RequestState::Completed;
            tracing::debug!(request = %self.label, rows_affected, "request completed");
        }
    }

    fn on_error(&mut self, error: CatalogDbError) {
        self.fail(error);
    }
}
