//! Territory Core - resolves a service address to the territory operator
//! (the regulated utility) that delivers power to it.
//!
//! ```text
//!  RawAddress
//!      │
//!      ▼
//!  validation ──► normalize ──► cache ──hit──► ResolutionResult
//!                                  │miss
//!                                  ▼
//!                          strategy chain
//!   external_registry (guarded) → extended_postal_code → street_level
//!        → multi_operator_config → postal_fallback
//!                                  │
//!                                  ▼
//!                      conflict resolution (consensus mode)
//!                                  │
//!                                  ▼
//!                     cache populate + audit sinks
//! ```
//!
//! Storage-backed cache tiers and audit sinks live in
//! `territory-storage-sqlite`; this crate is database-agnostic and defines
//! the [`cache::CacheTier`] and [`audit::ValidationLogSink`] traits they
//! implement.

pub mod audit;
pub mod cache;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod guard;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod strategy;
pub mod validation;

pub use models::*;
pub use resolver::{
    EngineHealth, ResolutionStage, ResolveOptions, TerritoryResolver, TerritoryResolverBuilder,
};

pub use errors::TerritoryError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TerritoryError>;
