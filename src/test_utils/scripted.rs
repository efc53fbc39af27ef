use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::aggregate::ResultShape;
use crate::connection::{DatabaseDriver, EventSink};
use crate::error::CatalogDbError;
use crate::request::Request;
use crate::results::Row;

/// One event a [`ScriptedDriver`] plays back.
#[derive(Debug)]
pub enum ScriptStep {
    Row(Row),
    Done(u64),
    Error(CatalogDbError),
    /// Return this error from `run` itself; later steps are not played.
    Throw(CatalogDbError),
}

/// Requests a driver has seen, shared with the test after the driver has
/// been moved into a connection handle.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Request>>>);

impl RequestLog {
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.0.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, request: &Request) {
        if let Ok(mut log) = self.0.lock() {
            log.push(request.clone());
        }
    }
}

/// Driver that replays one queued script per request, in FIFO order. With
/// the queue empty it completes each request with zero rows affected.
///
/// Scripts may be out of order or contradictory on purpose: several
/// terminal events, rows after completion, an error event followed by a
/// synchronous failure.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    scripts: VecDeque<Vec<ScriptStep>>,
    log: RequestLog,
}

impl ScriptedDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next request.
    #[must_use]
    pub fn with_script(mut self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.scripts.push_back(steps.into_iter().collect());
        self
    }

    #[must_use]
    pub fn request_log(&self) -> RequestLog {
        self.log.clone()
    }
}

#[async_trait]
impl DatabaseDriver for ScriptedDriver {
    async fn run(
        &mut self,
        request: &Request,
        _shape: ResultShape,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        self.log.push(request);
        let Some(script) = self.scripts.pop_front() else {
            sink.on_done(0);
            return Ok(());
        };
        for step in script {
            // Let other tasks interleave between events.
            tokio::task::yield_now().await;
            match step {
                ScriptStep::Row(row) => sink.on_row(row),
                ScriptStep::Done(n) => sink.on_done(n),
                ScriptStep::Error(err) => sink.on_error(err),
                ScriptStep::Throw(err) => return Err(err),
            }
        }
        Ok(())
    }
}
