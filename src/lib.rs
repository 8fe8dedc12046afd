//! Payment settlement for the EventHub marketplace.
//!
//! Starts Paystack checkouts for orders, authenticates gateway webhooks, and
//! reconciles gateway outcomes into the order and the transaction ledger
//! exactly once in effect, however many times they are delivered.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod settlement;

pub use api::{router, AppState};
pub use error::{AppError, AppResult};
