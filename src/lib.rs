//! # Docsumma
//!
//! Extractive document summarisation backed by the Azure AI Language
//! analyze-text jobs API.
//!
//! ## Features
//!
//! - **Job client**: submits a summarisation job, polls the operation location
//!   with a fixed-interval policy and returns the extracted sentences
//! - **Local files**: PDF, DOCX, ODT and plain text are read before submission
//! - **Credentials**: endpoint and key persisted in sled, or taken from the environment

pub mod client;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod summary;
pub mod wire;

pub use client::{JobClient, PollPolicy};
pub use config::Config;
pub use controller::Controller;
pub use credentials::{CredentialStore, Credentials};
pub use error::{ApiError, ErrorClass, Phase, SummarizeError};
pub use summary::{SummaryLength, SummaryRequest, SummaryResult};
