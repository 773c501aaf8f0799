#![doc(test(attr(deny(warnings))))]

//! Nucleo Core keeps a personal-finance transaction ledger: a derived running
//! balance, read-only statistics over it, and JSON persistence on a background
//! writer.

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Nucleo Core tracing initialized.");
    });
}
