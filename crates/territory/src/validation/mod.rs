//! Format and region validation.
//!
//! Checks are applied in a fixed order so each failure maps to exactly one
//! taxonomy code:
//!
//! 1. length (`INVALID_LENGTH`)
//! 2. character class (`INVALID_CHARACTERS`)
//! 3. national envelope (`NOT_NATIONAL_FORMAT`)
//! 4. supported region ranges (`NOT_SUPPORTED_REGION`)
//!
//! Validation is pure and has no side effects.

use log::debug;

use crate::config::RegionConfig;
use crate::errors::{TerritoryError, SUGGESTED_POSTAL_CODES};
use crate::models::RawAddress;

const POSTAL_CODE_LENGTH: usize = 5;
const EXTENSION_LENGTH: usize = 4;

/// A postal code that passed every format and region check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedPostalCode {
    pub code: String,
    pub numeric: u32,
    /// Extension carried inline as `75001-1234`, if any.
    pub extension: Option<String>,
}

/// Raw address passed through unchanged plus its validated postal code.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedAddress {
    pub raw: RawAddress,
    pub postal: ValidatedPostalCode,
    /// Explicit extension if valid, else the inline one.
    pub extension: Option<String>,
    pub warnings: Vec<String>,
}

/// Validates postal codes against the supported region.
#[derive(Clone, Debug)]
pub struct RegionValidator {
    region: RegionConfig,
}

impl RegionValidator {
    pub fn new(region: RegionConfig) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &RegionConfig {
        &self.region
    }

    /// Validates a postal code, optionally written as `ZIP+4`.
    pub fn validate_postal_code(&self, input: &str) -> Result<ValidatedPostalCode, TerritoryError> {
        let trimmed = input.trim();
        let (code, inline_extension) = match trimmed.split_once('-') {
            Some((code, ext)) => (code.trim(), Some(ext.trim())),
            None => (trimmed, None),
        };

        let length = code.chars().count();
        if length != POSTAL_CODE_LENGTH {
            return Err(TerritoryError::InvalidLength { length });
        }

        if !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(TerritoryError::InvalidCharacters {
                input: code.to_string(),
            });
        }

        let numeric: u32 = code
            .parse()
            .map_err(|_| TerritoryError::InvalidCharacters {
                input: code.to_string(),
            })?;

        if !self.region.national_range.contains(numeric) {
            return Err(TerritoryError::NotNationalFormat {
                postal_code: code.to_string(),
            });
        }

        if !self.region.contains(numeric) {
            debug!("Postal code {} outside {}", code, self.region.code);
            return Err(TerritoryError::NotSupportedRegion {
                postal_code: code.to_string(),
                suggestions: self.suggestions(),
            });
        }

        Ok(ValidatedPostalCode {
            code: code.to_string(),
            numeric,
            extension: inline_extension
                .filter(|ext| is_valid_extension(ext))
                .map(str::to_string),
        })
    }

    /// Validates a full address. Only the postal code can fail; other
    /// irregularities become warnings.
    pub fn validate(&self, raw: &RawAddress) -> Result<ValidatedAddress, TerritoryError> {
        let postal = self.validate_postal_code(&raw.postal_code)?;
        let mut warnings = Vec::new();

        let explicit = raw
            .postal_extension
            .as_deref()
            .map(str::trim)
            .filter(|ext| !ext.is_empty());
        let extension = match explicit {
            Some(ext) if is_valid_extension(ext) => Some(ext.to_string()),
            Some(ext) => {
                warnings.push(format!("Ignoring malformed ZIP+4 extension '{}'", ext));
                postal.extension.clone()
            }
            None => postal.extension.clone(),
        };

        let state = raw.state.trim();
        if !state.is_empty() && !state.eq_ignore_ascii_case(&self.region.code) {
            warnings.push(format!(
                "State '{}' does not match postal code region {}",
                state, self.region.code
            ));
        }

        Ok(ValidatedAddress {
            raw: raw.clone(),
            postal,
            extension,
            warnings,
        })
    }

    fn suggestions(&self) -> Vec<String> {
        if self.region.suggestions.is_empty() {
            SUGGESTED_POSTAL_CODES.iter().map(|s| s.to_string()).collect()
        } else {
            self.region.suggestions.clone()
        }
    }
}

fn is_valid_extension(ext: &str) -> bool {
    ext.len() == EXTENSION_LENGTH && ext.chars().all(|c| c.is_ascii_digit())
}
