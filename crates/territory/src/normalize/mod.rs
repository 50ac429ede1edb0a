//! Address normalization.
//!
//! Turns a validated [`RawAddress`](crate::models::RawAddress) into a
//! [`NormalizedAddress`]. Pure string processing: no I/O and no failure
//! path. Input that cannot be fully parsed still produces a best-effort
//! address flagged `partial`, so postal-code-level strategies can run.

mod vocabulary;

use crate::config::RegionConfig;
use crate::models::{NormalizedAddress, StreetType, UnitType};
use crate::validation::ValidatedAddress;

/// Structured pieces of a free-text street line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedStreet {
    pub house_number: Option<String>,
    pub street_name: String,
    pub street_type: Option<StreetType>,
    pub unit_type: Option<UnitType>,
    pub unit_number: Option<String>,
}

/// Normalizes a validated address.
pub fn normalize(validated: &ValidatedAddress, region: &RegionConfig) -> NormalizedAddress {
    let raw = &validated.raw;
    let mut parsed = parse_street(&raw.street);

    if let Some(unit) = raw.unit.as_deref().filter(|u| !u.trim().is_empty()) {
        let (unit_type, unit_number) = parse_unit(unit);
        parsed.unit_type = unit_type;
        parsed.unit_number = unit_number;
    }

    let city = title_case(&raw.city);
    let region_code = region_code(&raw.state, region);
    let postal_code = validated.postal.code.clone();
    let postal_extension = validated.extension.clone();
    let partial = parsed.house_number.is_none() || parsed.street_name.is_empty();

    let mut address = NormalizedAddress {
        house_number: parsed.house_number,
        street_name: parsed.street_name,
        street_type: parsed.street_type,
        unit_type: parsed.unit_type,
        unit_number: parsed.unit_number,
        city,
        region: region_code,
        postal_code,
        postal_extension,
        display: String::new(),
        partial,
    };
    address.display = render(&address);
    address
}

/// Splits a street line into house number, name, type and embedded unit.
pub fn parse_street(street: &str) -> ParsedStreet {
    let cleaned = street.replace(',', " ");
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let mut parsed = ParsedStreet::default();

    if tokens.first().is_some_and(|t| looks_like_house_number(t)) {
        let mut number = tokens.remove(0).to_string();
        // "12 1/2 Main St"
        if tokens.first().is_some_and(|t| is_fraction(t)) {
            number.push(' ');
            number.push_str(tokens.remove(0));
        }
        parsed.house_number = Some(number.to_uppercase());
    }

    if let Some(position) = tokens.iter().position(|t| is_unit_token(t)) {
        let unit_tokens = tokens.split_off(position);
        let (unit_type, unit_number) = parse_unit(&unit_tokens.join(" "));
        parsed.unit_type = unit_type;
        parsed.unit_number = unit_number;
    }

    if tokens.len() > 1 {
        if let Some(street_type) = tokens.last().and_then(|t| vocabulary::street_type(t)) {
            parsed.street_type = Some(street_type);
            tokens.pop();
        }
    }

    let words: Vec<String> = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| match vocabulary::directional(token) {
            Some(full) if index == 0 && tokens.len() > 1 => full.to_string(),
            _ => title_case(token.trim_end_matches('.')),
        })
        .filter(|word| !word.is_empty())
        .collect();
    parsed.street_name = words.join(" ");
    parsed
}

/// Splits an explicit unit string into designator and number.
pub fn parse_unit(unit: &str) -> (Option<UnitType>, Option<String>) {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    // "#12" has the designator glued on
    if let Some(rest) = trimmed.strip_prefix('#') {
        let number = rest.trim();
        return (
            Some(UnitType::Number),
            (!number.is_empty()).then(|| number.to_uppercase()),
        );
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    match vocabulary::unit_designator(head) {
        Some(unit_type) => {
            let number = parts
                .next()
                .map(|rest| rest.trim().trim_start_matches('#').trim())
                .filter(|rest| !rest.is_empty())
                .map(str::to_uppercase);
            (Some(unit_type), number)
        }
        None => (None, Some(trimmed.to_uppercase())),
    }
}

/// Capitalises the first letter of every word and lowercases the rest.
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn region_code(state: &str, region: &RegionConfig) -> String {
    let state = state.trim();
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        return state.to_ascii_uppercase();
    }
    // Full names ("Texas") and blanks fall back to the configured region.
    region.code.to_ascii_uppercase()
}

fn looks_like_house_number(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
}

fn is_fraction(token: &str) -> bool {
    match token.split_once('/') {
        Some((numerator, denominator)) => {
            !numerator.is_empty()
                && !denominator.is_empty()
                && numerator.chars().all(|c| c.is_ascii_digit())
                && denominator.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_unit_token(token: &str) -> bool {
    token.starts_with('#') || vocabulary::unit_designator(token).is_some()
}

fn render(address: &NormalizedAddress) -> String {
    let mut street = String::new();
    if let Some(number) = &address.house_number {
        street.push_str(number);
    }
    let full_street = address.full_street();
    if !full_street.is_empty() {
        if !street.is_empty() {
            street.push(' ');
        }
        street.push_str(&full_street);
    }

    let mut segments = Vec::with_capacity(4);
    if !street.is_empty() {
        segments.push(street);
    }
    match (&address.unit_type, &address.unit_number) {
        (Some(UnitType::Number), Some(number)) => segments.push(format!("#{}", number)),
        (Some(unit_type), Some(number)) => {
            segments.push(format!("{} {}", unit_type.as_str(), number))
        }
        (Some(unit_type), None) => segments.push(unit_type.as_str().to_string()),
        (None, Some(number)) => segments.push(number.clone()),
        (None, None) => {}
    }
    if !address.city.is_empty() {
        segments.push(address.city.clone());
    }
    segments.push(format!(
        "{} {}",
        address.region,
        address.full_postal_code()
    ));
    segments.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundaryData;
    use crate::models::RawAddress;
    use crate::validation::RegionValidator;
    use proptest::prelude::*;

    fn normalize_raw(raw: &RawAddress) -> NormalizedAddress {
        let data = BoundaryData::bundled().unwrap();
        let validator = RegionValidator::new(data.region().clone());
        let validated = validator.validate(raw).unwrap();
        normalize(&validated, data.region())
    }

    #[test]
    fn test_full_street_line() {
        let parsed = parse_street("1234 Belt Line Rd");
        assert_eq!(parsed.house_number.as_deref(), Some("1234"));
        assert_eq!(parsed.street_name, "Belt Line");
        assert_eq!(parsed.street_type, Some(StreetType::Road));
        assert_eq!(parsed.unit_type, None);
    }

    #[test]
    fn test_alphanumeric_and_fractional_house_numbers() {
        let parsed = parse_street("1234b Main St");
        assert_eq!(parsed.house_number.as_deref(), Some("1234B"));

        let parsed = parse_street("12 1/2 Elm Ave");
        assert_eq!(parsed.house_number.as_deref(), Some("12 1/2"));
        assert_eq!(parsed.street_name, "Elm");
        assert_eq!(parsed.street_type, Some(StreetType::Avenue));
    }

    #[test]
    fn test_embedded_unit() {
        let parsed = parse_street("500 main street apt 4b");
        assert_eq!(parsed.street_name, "Main");
        assert_eq!(parsed.street_type, Some(StreetType::Street));
        assert_eq!(parsed.unit_type, Some(UnitType::Apartment));
        assert_eq!(parsed.unit_number.as_deref(), Some("4B"));

        let parsed = parse_street("500 Main St #12");
        assert_eq!(parsed.unit_type, Some(UnitType::Number));
        assert_eq!(parsed.unit_number.as_deref(), Some("12"));
    }

    #[test]
    fn test_lone_type_word_is_kept_as_name() {
        let parsed = parse_street("100 Loop");
        assert_eq!(parsed.street_name, "Loop");
        assert_eq!(parsed.street_type, None);
    }

    #[test]
    fn test_directional_prefix_expands() {
        let parsed = parse_street("300 N Akard St");
        assert_eq!(parsed.street_name, "North Akard");
        assert_eq!(parsed.street_type, Some(StreetType::Street));
    }

    #[test]
    fn test_explicit_unit_string() {
        assert_eq!(
            parse_unit("Suite 200"),
            (Some(UnitType::Suite), Some("200".to_string()))
        );
        assert_eq!(
            parse_unit("#7"),
            (Some(UnitType::Number), Some("7".to_string()))
        );
        assert_eq!(parse_unit("Penthouse"), (None, Some("PENTHOUSE".to_string())));
        assert_eq!(parse_unit("   "), (None, None));
    }

    #[test]
    fn test_normalize_renders_display() {
        let raw = RawAddress::new("100 congress ave", "AUSTIN", "tx", "78701").with_unit("ste 5");
        let address = normalize_raw(&raw);
        assert_eq!(address.city, "Austin");
        assert_eq!(address.region, "TX");
        assert_eq!(address.street_type, Some(StreetType::Avenue));
        assert_eq!(address.display, "100 Congress Avenue, Suite 5, Austin, TX 78701");
        assert!(!address.partial);
    }

    #[test]
    fn test_unparseable_street_is_partial_not_error() {
        let raw = RawAddress::new("???", "dallas", "Texas", "75201");
        let address = normalize_raw(&raw);
        assert!(address.partial);
        assert_eq!(address.house_number, None);
        assert_eq!(address.region, "TX");
        assert_eq!(address.postal_code, "75201");
    }

    #[test]
    fn test_extension_is_rendered() {
        let raw = RawAddress::new("1 Main St", "Frisco", "TX", "75034").with_extension("1236");
        let address = normalize_raw(&raw);
        assert!(address.display.ends_with("TX 75034-1236"));
    }

    proptest! {
        #[test]
        fn prop_parse_street_never_panics(street in "\\PC{0,60}") {
            let parsed = parse_street(&street);
            if let Some(number) = parsed.house_number {
                prop_assert!(number.chars().next().is_some_and(|c| c.is_ascii_digit()));
            }
        }

        #[test]
        fn prop_normalize_always_returns(street in "\\PC{0,40}", city in "\\PC{0,20}", unit in proptest::option::of("\\PC{0,10}")) {
            let mut raw = RawAddress::new(street, city, "TX", "75001");
            raw.unit = unit;
            let address = normalize_raw(&raw);
            prop_assert_eq!(address.region.len(), 2);
            prop_assert_eq!(address.postal_code.as_str(), "75001");
            prop_assert!(!address.display.is_empty());
        }
    }
}
