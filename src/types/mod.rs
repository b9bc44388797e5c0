//! Type definitions for the prediction service

pub mod record;
pub mod response;

pub use record::{Contact, Education, InputRecord, Job, Marital, Month, Poutcome, YesNo};
pub use response::{ClassProbabilities, HealthResponse, PredictionResponse};
