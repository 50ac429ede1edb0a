//! Territory resolution models
//!
//! This module contains the core data types:
//! - `address` - Caller input (`RawAddress`) and its canonical form (`NormalizedAddress`)
//! - `operator` - The territory operator reference entity
//! - `confidence` - Coarse confidence tiers and their weights
//! - `lookup` - Per-strategy output (`BoundaryLookupResult`) with typed metadata
//! - `resolution` - Externally visible answers (`ResolutionResult`, analysis, options)
//! - `validation_log` - Append-only audit record (`ValidationLog`)

mod address;
mod confidence;
mod lookup;
mod operator;
mod resolution;
mod validation_log;

pub use address::{NormalizedAddress, RawAddress, StreetType, UnitType};
pub use confidence::Confidence;
pub use lookup::{BoundaryLookupResult, ExtensionRule, HouseParity, StrategyId, StrategyMetadata};
pub use operator::{Granularity, OperatorId, TerritoryOperator};
pub use resolution::{
    AttemptOutcome, OperatorOption, OperatorOptions, PostalCodeAnalysis, ResolutionResult,
    StrategyAttempt,
};
pub use validation_log::ValidationLog;
