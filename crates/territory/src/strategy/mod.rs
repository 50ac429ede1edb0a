//! Territory boundary strategies.
//!
//! Five independent strategies, tried in priority order by [`StrategyChain`]:
//! 1. [`ExternalRegistryStrategy`] - authoritative registry over HTTP
//! 2. [`ExtendedPostalStrategy`] - `ZIP+4` digit rule
//! 3. [`StreetLevelStrategy`] - street pattern and house-number ranges
//! 4. [`MultiOperatorStrategy`] - configured primary operator
//! 5. [`PostalFallbackStrategy`] - postal-code range heuristic, never declines

mod chain;
mod extended_postal;
mod external_registry;
mod multi_operator;
mod postal_fallback;
mod street_level;
mod traits;

pub use chain::{ChainRun, CollectedRun, StrategyChain};
pub use extended_postal::ExtendedPostalStrategy;
pub use external_registry::ExternalRegistryStrategy;
pub use multi_operator::MultiOperatorStrategy;
pub use postal_fallback::PostalFallbackStrategy;
pub use street_level::StreetLevelStrategy;
pub use traits::{BoundaryStrategy, ResolveContext};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::NormalizedAddress;
    use crate::normalize::parse_street;

    pub fn address(postal_code: &str, street: &str) -> NormalizedAddress {
        let parsed = parse_street(street);
        NormalizedAddress {
            partial: parsed.house_number.is_none(),
            house_number: parsed.house_number,
            street_name: parsed.street_name,
            street_type: parsed.street_type,
            unit_type: parsed.unit_type,
            unit_number: parsed.unit_number,
            city: "Testville".to_string(),
            region: "TX".to_string(),
            postal_code: postal_code.to_string(),
            postal_extension: None,
            display: format!("{}, Testville, TX {}", street, postal_code),
        }
    }
}
