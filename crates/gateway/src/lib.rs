//! Knowledge-graph gateway over SPARQL.
//!
//! Blocking reqwest client (no async runtime). Implements the engine's
//! [`prosopon_recon::gateway::Gateway`] trait: one query per batch,
//! retry with exponential backoff owned here, so the engine only ever
//! sees a final reply or an exhausted error.

mod client;
mod query;

pub use client::GraphClient;
