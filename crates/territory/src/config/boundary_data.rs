//! Static boundary dataset.
//!
//! The reference Texas dataset is compiled in via `include_str!`; the same
//! JSON files can be loaded from a directory at startup. Loading validates
//! that every referenced operator exists and that every street pattern
//! compiles, so the strategies can index the data without further checks.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::TerritoryError;
use crate::models::{ExtensionRule, Granularity, HouseParity, OperatorId, TerritoryOperator};

const OPERATORS_FILE: &str = "operators.json";
const POSTAL_CODES_FILE: &str = "postal_codes.json";
const STREET_RULES_FILE: &str = "street_rules.json";
const FALLBACK_RANGES_FILE: &str = "fallback_ranges.json";
const REGION_FILE: &str = "region.json";

// ── JSON schema ──────────────────────────────────────────────────────────────

/// Inclusive numeric postal-code range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PostalRange {
    pub start: u32,
    pub end: u32,
}

impl PostalRange {
    pub fn contains(&self, code: u32) -> bool {
        (self.start..=self.end).contains(&code)
    }
}

/// Supported region and the national envelope around it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub code: String,
    pub name: String,
    pub ranges: Vec<PostalRange>,
    pub national_range: PostalRange,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Date the static boundary files were last reconciled.
    #[serde(default)]
    pub data_as_of: Option<DateTime<Utc>>,
}

impl RegionConfig {
    pub fn contains(&self, code: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(code))
    }
}

/// Operators configured for one postal code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalCodeConfig {
    #[serde(default)]
    pub city: Option<String>,
    pub operators: Vec<OperatorId>,
    pub primary: OperatorId,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub requires_address_validation: bool,
    #[serde(default)]
    pub extension_rule: ExtensionRule,
}

impl PostalCodeConfig {
    pub fn is_multi_operator(&self) -> bool {
        self.operators.len() > 1
    }

    /// Every configured operator except the primary, in configured order.
    pub fn alternate_ids(&self) -> impl Iterator<Item = &OperatorId> {
        self.operators.iter().filter(move |id| **id != self.primary)
    }
}

/// One street-level boundary rule as written in the data files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetRule {
    pub pattern: String,
    pub operator: OperatorId,
    #[serde(default)]
    pub min_house: u32,
    #[serde(default = "default_max_house")]
    pub max_house: u32,
    #[serde(default)]
    pub parity: Option<HouseParity>,
}

fn default_max_house() -> u32 {
    u32::MAX
}

/// Postal-code range mapped to a city and its historical operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackRange {
    pub start: u32,
    pub end: u32,
    pub city: String,
    pub operator: OperatorId,
}

// ── Indexed dataset ──────────────────────────────────────────────────────────

/// Street rule with its pattern compiled.
#[derive(Clone, Debug)]
pub struct CompiledStreetRule {
    pub regex: Regex,
    pub rule: StreetRule,
}

impl CompiledStreetRule {
    /// True when the street matches and the house number satisfies the range
    /// and parity constraints. Rules without a numeric house number only
    /// match when they carry no constraints at all.
    pub fn matches(&self, street: &str, house_number: Option<u32>) -> bool {
        if !self.regex.is_match(street) {
            return false;
        }
        match house_number {
            Some(number) => {
                (self.rule.min_house..=self.rule.max_house).contains(&number)
                    && self.rule.parity.map_or(true, |parity| parity.matches(number))
            }
            None => {
                self.rule.min_house == 0
                    && self.rule.max_house == u32::MAX
                    && self.rule.parity.is_none()
            }
        }
    }
}

/// Read-only boundary dataset injected into the engine at construction.
#[derive(Clone, Debug)]
pub struct BoundaryData {
    operators: HashMap<OperatorId, TerritoryOperator>,
    postal_codes: HashMap<String, PostalCodeConfig>,
    street_rules: HashMap<String, Vec<CompiledStreetRule>>,
    fallback_ranges: Vec<FallbackRange>,
    region: RegionConfig,
}

impl BoundaryData {
    /// The reference dataset compiled into the crate.
    pub fn bundled() -> Result<Self, TerritoryError> {
        Self::from_parts(
            parse(OPERATORS_FILE, include_str!("../../data/operators.json"))?,
            parse(POSTAL_CODES_FILE, include_str!("../../data/postal_codes.json"))?,
            parse(STREET_RULES_FILE, include_str!("../../data/street_rules.json"))?,
            parse(
                FALLBACK_RANGES_FILE,
                include_str!("../../data/fallback_ranges.json"),
            )?,
            parse(REGION_FILE, include_str!("../../data/region.json"))?,
        )
    }

    /// Loads the dataset from a directory holding the five JSON files.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TerritoryError> {
        let dir = dir.as_ref();
        info!("Loading boundary data from {}", dir.display());
        Self::from_parts(
            read(dir, OPERATORS_FILE)?,
            read(dir, POSTAL_CODES_FILE)?,
            read(dir, STREET_RULES_FILE)?,
            read(dir, FALLBACK_RANGES_FILE)?,
            read(dir, REGION_FILE)?,
        )
    }

    /// Builds and validates a dataset from already-parsed parts.
    pub fn from_parts(
        operators: Vec<TerritoryOperator>,
        postal_codes: HashMap<String, PostalCodeConfig>,
        street_rules: HashMap<String, Vec<StreetRule>>,
        mut fallback_ranges: Vec<FallbackRange>,
        region: RegionConfig,
    ) -> Result<Self, TerritoryError> {
        let operators: HashMap<OperatorId, TerritoryOperator> = operators
            .into_iter()
            .map(|op| (op.id.clone(), op))
            .collect();

        let known = |id: &OperatorId, context: &str| -> Result<(), TerritoryError> {
            if operators.contains_key(id) {
                Ok(())
            } else {
                Err(TerritoryError::Configuration(format!(
                    "{} references unknown operator {}",
                    context, id
                )))
            }
        };

        if region.ranges.is_empty() {
            return Err(TerritoryError::Configuration(
                "region must declare at least one postal range".to_string(),
            ));
        }

        for (code, config) in &postal_codes {
            if config.operators.is_empty() {
                return Err(TerritoryError::Configuration(format!(
                    "postal code {} has no operators",
                    code
                )));
            }
            if !config.operators.contains(&config.primary) {
                return Err(TerritoryError::Configuration(format!(
                    "postal code {} primary {} is not among its operators",
                    code, config.primary
                )));
            }
            for id in &config.operators {
                known(id, &format!("postal code {}", code))?;
            }
        }

        let mut compiled = HashMap::with_capacity(street_rules.len());
        for (code, rules) in street_rules {
            let mut rules_for_code = Vec::with_capacity(rules.len());
            for rule in rules {
                known(&rule.operator, &format!("street rule for {}", code))?;
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        TerritoryError::Configuration(format!(
                            "street rule '{}' for {} does not compile: {}",
                            rule.pattern, code, e
                        ))
                    })?;
                rules_for_code.push(CompiledStreetRule { regex, rule });
            }
            compiled.insert(code, rules_for_code);
        }

        for range in &fallback_ranges {
            known(&range.operator, &format!("fallback range {}", range.city))?;
            if range.start > range.end {
                return Err(TerritoryError::Configuration(format!(
                    "fallback range {} starts after it ends",
                    range.city
                )));
            }
        }
        fallback_ranges.sort_by_key(|range| range.start);

        info!(
            "Boundary data loaded: {} operators, {} postal codes, {} street rule sets, {} fallback ranges",
            operators.len(),
            postal_codes.len(),
            compiled.len(),
            fallback_ranges.len()
        );

        Ok(Self {
            operators,
            postal_codes,
            street_rules: compiled,
            fallback_ranges,
            region,
        })
    }

    pub fn operator(&self, id: &str) -> Option<&TerritoryOperator> {
        self.operators.get(id)
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    pub fn postal_code(&self, code: &str) -> Option<&PostalCodeConfig> {
        self.postal_codes.get(code)
    }

    pub fn postal_code_count(&self) -> usize {
        self.postal_codes.len()
    }

    pub fn street_rules(&self, code: &str) -> &[CompiledStreetRule] {
        self.street_rules
            .get(code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fallback_for(&self, code: u32) -> Option<&FallbackRange> {
        self.fallback_ranges.iter().find(|range| {
            PostalRange {
                start: range.start,
                end: range.end,
            }
            .contains(code)
        })
    }

    pub fn region(&self) -> &RegionConfig {
        &self.region
    }

    /// As-of date of the static data. Undated data ranks as the oldest.
    pub fn data_as_of(&self) -> DateTime<Utc> {
        self.region.data_as_of.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Operators configured for a postal code, primary first. Postal codes
    /// without explicit configuration report their fallback operator.
    pub fn operators_for_postal_code(&self, code: &str) -> Vec<TerritoryOperator> {
        if let Some(config) = self.postal_code(code) {
            std::iter::once(&config.primary)
                .chain(config.alternate_ids())
                .filter_map(|id| self.operator(id).cloned())
                .collect()
        } else {
            code.parse::<u32>()
                .ok()
                .and_then(|numeric| self.fallback_for(numeric))
                .and_then(|range| self.operator(&range.operator).cloned())
                .into_iter()
                .collect()
        }
    }

    /// Resolves configured alternates to operators, skipping `exclude`.
    pub fn alternates_for(&self, code: &str, exclude: &str) -> Vec<TerritoryOperator> {
        self.postal_code(code)
            .map(|config| {
                config
                    .operators
                    .iter()
                    .filter(|id| id.as_str() != exclude)
                    .filter_map(|id| self.operator(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse<T: DeserializeOwned>(name: &str, json: &str) -> Result<T, TerritoryError> {
    serde_json::from_str(json)
        .map_err(|e| TerritoryError::Configuration(format!("{} is invalid: {}", name, e)))
}

fn read<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, TerritoryError> {
    let path = dir.join(name);
    let json = fs::read_to_string(&path).map_err(|e| {
        TerritoryError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(name, &json)
}
