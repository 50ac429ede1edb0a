use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::NormalizedAddress;

/// Namespace for full-address resolutions.
pub const RESOLUTION_NAMESPACE: &str = "resolution";
/// Namespace for postal-code pre-checks.
pub const ANALYSIS_NAMESPACE: &str = "analysis";

/// Deterministic cache key, `"{namespace}:{sha256-hex}"`.
///
/// The digest covers sorted `field=value` pairs with values lowercased and
/// whitespace collapsed, so field order and casing never change the key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_fields<'a, I>(namespace: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pairs: Vec<String> = fields
            .into_iter()
            .map(|(field, value)| format!("{}={}", canonical(field), canonical(value)))
            .collect();
        pairs.sort_unstable();

        let mut hasher = Sha256::new();
        for pair in &pairs {
            hasher.update(pair.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{}:{}", namespace, hex::encode(hasher.finalize())))
    }

    /// Key for a full-address resolution.
    pub fn for_address(address: &NormalizedAddress) -> Self {
        let street_type = address.street_type.map(|t| t.as_str()).unwrap_or_default();
        let unit_type = address.unit_type.map(|t| t.as_str()).unwrap_or_default();
        Self::from_fields(
            RESOLUTION_NAMESPACE,
            [
                ("house_number", address.house_number.as_deref().unwrap_or_default()),
                ("street_name", address.street_name.as_str()),
                ("street_type", street_type),
                ("unit_type", unit_type),
                ("unit_number", address.unit_number.as_deref().unwrap_or_default()),
                ("city", address.city.as_str()),
                ("region", address.region.as_str()),
                ("postal_code", address.postal_code.as_str()),
                (
                    "postal_extension",
                    address.postal_extension.as_deref().unwrap_or_default(),
                ),
            ],
        )
    }

    /// Key for a postal-code-only lookup.
    pub fn for_postal_code(namespace: &str, postal_code: &str) -> Self {
        Self::from_fields(namespace, [("postal_code", postal_code)])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn digest(&self) -> &str {
        self.0.split_once(':').map(|(_, d)| d).unwrap_or(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_shape() {
        let key = CacheKey::for_postal_code(ANALYSIS_NAMESPACE, "75001");
        assert_eq!(key.namespace(), "analysis");
        assert_eq!(key.digest().len(), 64);
        assert!(key.digest().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_casing_and_spacing_collide() {
        let a = CacheKey::from_fields("resolution", [("street", "Belt  Line"), ("city", "ADDISON")]);
        let b = CacheKey::from_fields("resolution", [("city", "addison"), ("street", " belt line ")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_namespaces_and_values_separate_keys() {
        let a = CacheKey::for_postal_code(ANALYSIS_NAMESPACE, "75001");
        let b = CacheKey::for_postal_code(RESOLUTION_NAMESPACE, "75001");
        let c = CacheKey::for_postal_code(ANALYSIS_NAMESPACE, "75002");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    proptest! {
        #[test]
        fn prop_field_order_is_irrelevant(
            fields in proptest::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,20}", 1..8),
            seed in any::<u64>(),
        ) {
            let forward: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let mut shuffled = forward.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            prop_assert_eq!(
                CacheKey::from_fields("resolution", forward),
                CacheKey::from_fields("resolution", shuffled)
            );
        }
    }
}
