//! Term Deposit Prediction Service Library
//!
//! Predicts whether a bank customer will subscribe to a term deposit.
//! A validated customer record is encoded, laid out by the artifact's
//! column transformer and scored by a pre-trained classifier loaded once
//! at startup.

pub mod config;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use feature_encoder::{EncodedRow, FeatureEncoder};
pub use models::inference::{InferenceError, InferenceService};
pub use schema::ValidationErrors;
pub use types::{record::InputRecord, response::ClassProbabilities};
