use std::fmt;

use serde::{Deserialize, Serialize};

/// Address exactly as the caller supplied it. Never mutated.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub postal_extension: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl RawAddress {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            postal_extension: None,
            unit: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.postal_extension = Some(extension.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Parses a one-line address such as `"1234 Belt Line Road, Addison, TX 75001"`.
    ///
    /// Accepts `ZIP+4` (`75001-1234`) in the last segment. Returns `None` when
    /// the line does not have the street, city and state/postal segments.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }

        let street = parts[0];
        let city = parts[parts.len() - 2];
        let mut tail = parts[parts.len() - 1].split_whitespace();
        let state = tail.next()?;
        let postal = tail.next()?;

        let (postal_code, extension) = match postal.split_once('-') {
            Some((code, ext)) => (code, Some(ext)),
            None => (postal, None),
        };

        let mut raw = Self::new(street, city, state, postal_code);
        if parts.len() > 3 {
            // "street, unit, city, ST 75001"
            raw.unit = Some(parts[1..parts.len() - 2].join(" "));
        }
        raw.postal_extension = extension.map(str::to_string);
        Some(raw)
    }
}

/// Canonical street type vocabulary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum StreetType {
    Avenue,
    Boulevard,
    Circle,
    Court,
    Drive,
    Expressway,
    Freeway,
    Highway,
    Lane,
    Loop,
    Parkway,
    Place,
    Plaza,
    Road,
    Square,
    Street,
    Terrace,
    Trail,
    Way,
}

impl StreetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avenue => "Avenue",
            Self::Boulevard => "Boulevard",
            Self::Circle => "Circle",
            Self::Court => "Court",
            Self::Drive => "Drive",
            Self::Expressway => "Expressway",
            Self::Freeway => "Freeway",
            Self::Highway => "Highway",
            Self::Lane => "Lane",
            Self::Loop => "Loop",
            Self::Parkway => "Parkway",
            Self::Place => "Place",
            Self::Plaza => "Plaza",
            Self::Road => "Road",
            Self::Square => "Square",
            Self::Street => "Street",
            Self::Terrace => "Terrace",
            Self::Trail => "Trail",
            Self::Way => "Way",
        }
    }
}

impl fmt::Display for StreetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary unit designators.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Apartment,
    Building,
    Floor,
    Lot,
    Number,
    Room,
    Space,
    Suite,
    Unit,
}

impl UnitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apartment => "Apt",
            Self::Building => "Bldg",
            Self::Floor => "Fl",
            Self::Lot => "Lot",
            Self::Number => "#",
            Self::Room => "Rm",
            Self::Space => "Spc",
            Self::Suite => "Suite",
            Self::Unit => "Unit",
        }
    }
}

/// Canonical form of an address, consumed by every boundary strategy.
///
/// Created once by the normalizer; never mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAddress {
    /// May contain letters or fractions ("1234B", "12 1/2").
    pub house_number: Option<String>,
    pub street_name: String,
    pub street_type: Option<StreetType>,
    pub unit_type: Option<UnitType>,
    pub unit_number: Option<String>,
    pub city: String,
    /// Always two uppercase ASCII letters.
    pub region: String,
    pub postal_code: String,
    pub postal_extension: Option<String>,
    pub display: String,
    /// Set when the street could not be fully parsed.
    #[serde(default)]
    pub partial: bool,
}

impl NormalizedAddress {
    /// Street name followed by the canonical street type, if any.
    pub fn full_street(&self) -> String {
        match self.street_type {
            Some(street_type) if !self.street_name.is_empty() => {
                format!("{} {}", self.street_name, street_type)
            }
            Some(street_type) => street_type.to_string(),
            None => self.street_name.clone(),
        }
    }

    /// Numeric prefix of the house number (`1234` for `"1234B"`).
    pub fn house_number_value(&self) -> Option<u32> {
        let digits: String = self
            .house_number
            .as_deref()?
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Postal code with its extension, `75001-1234` style.
    pub fn full_postal_code(&self) -> String {
        match &self.postal_extension {
            Some(ext) => format!("{}-{}", self.postal_code, ext),
            None => self.postal_code.clone(),
        }
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let raw = RawAddress::parse_line("1234 Belt Line Road, Addison, TX 75001").unwrap();
        assert_eq!(raw.street, "1234 Belt Line Road");
        assert_eq!(raw.city, "Addison");
        assert_eq!(raw.state, "TX");
        assert_eq!(raw.postal_code, "75001");
        assert_eq!(raw.postal_extension, None);
        assert_eq!(raw.unit, None);
    }

    #[test]
    fn test_parse_line_with_zip4_and_unit() {
        let raw =
            RawAddress::parse_line("500 Main Street, Suite 200, Dallas, TX 75202-3401").unwrap();
        assert_eq!(raw.postal_code, "75202");
        assert_eq!(raw.postal_extension.as_deref(), Some("3401"));
        assert_eq!(raw.unit.as_deref(), Some("Suite 200"));
        assert_eq!(raw.city, "Dallas");
    }

    #[test]
    fn test_parse_line_rejects_short_input() {
        assert!(RawAddress::parse_line("75001").is_none());
        assert!(RawAddress::parse_line("Main St, Dallas").is_none());
        assert!(RawAddress::parse_line("Main St, Dallas, TX").is_none());
    }

    #[test]
    fn test_house_number_value() {
        let mut address = NormalizedAddress {
            house_number: Some("1234B".to_string()),
            street_name: "Belt Line".to_string(),
            street_type: Some(StreetType::Road),
            unit_type: None,
            unit_number: None,
            city: "Addison".to_string(),
            region: "TX".to_string(),
            postal_code: "75001".to_string(),
            postal_extension: None,
            display: String::new(),
            partial: false,
        };
        assert_eq!(address.house_number_value(), Some(1234));
        assert_eq!(address.full_street(), "Belt Line Road");

        address.house_number = Some("A12".to_string());
        assert_eq!(address.house_number_value(), None);
    }
}
