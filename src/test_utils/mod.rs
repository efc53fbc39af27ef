//! Test doubles for the driver seam: a scripted event player and an
//! in-memory stand-in for the catalog database.

mod fake_server;
mod scripted;

pub use fake_server::{FakeCatalogServer, FakeCatalogState, FakeUser};
pub use scripted::{RequestLog, ScriptStep, ScriptedDriver};
