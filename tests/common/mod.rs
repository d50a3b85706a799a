//! Common test infrastructure
//!
//! In-memory stand-ins for the wallet, chain reader and router, plus a
//! throwaway HTTP server for the REST clients. Tests should only import from
//! this module, not from internal submodules.

#![allow(dead_code)]

mod fakes;
mod fixtures;
mod server;

pub use fakes::{FakeChainReader, FakeRoutingClient, FakeWallet, RecordingProvider};
pub use fixtures::*;
pub use server::MockApiServer;
