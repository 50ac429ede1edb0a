//! Engine configuration.
//!
//! Two layers, both read once at startup:
//! - [`EngineConfig`]: timeouts, batching, resolution mode, external registry
//!   and cache settings
//! - [`BoundaryData`]: the static operator/postal-code/street-rule dataset

mod boundary_data;
mod engine;

pub use boundary_data::{
    BoundaryData, CompiledStreetRule, FallbackRange, PostalCodeConfig, PostalRange, RegionConfig,
    StreetRule,
};
pub use engine::{CacheConfig, EngineConfig, ExternalRegistryConfig, ResolutionMode};
