//! Outbound payment gateway client: request/response types, the gateway
//! trait, the Paystack implementation and amount/signature helpers.

pub mod error;
pub mod provider;
pub mod providers;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use provider::PaymentGateway;
pub use providers::paystack::{PaystackConfig, PaystackGateway, PAYSTACK_SIGNATURE_HEADER};
