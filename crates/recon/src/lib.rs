//! `prosopon-recon` — cross-catalog author identity reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded catalog records and a [`Gateway`]
//! handle, returns classified results. No CLI, file-path or network
//! dependencies.

pub mod alias;
pub mod combine;
pub mod config;
pub mod curation;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod report;

pub use config::PipelineConfig;
pub use curation::CurationOverride;
pub use engine::{load_catalog_rows, run};
pub use error::ReconError;
pub use gateway::{Gateway, GatewayError, MemoryGateway};
pub use model::{CanonicalAuthor, CatalogInput, CatalogRecord, IdScheme, Identifier, RunResult};
