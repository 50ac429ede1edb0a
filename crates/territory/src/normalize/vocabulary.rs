//! Synonym tables for street types, unit designators and directionals.
//!
//! Built once via `lazy_static`; keys are lowercase with trailing periods
//! stripped by the caller.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::models::{StreetType, UnitType};

lazy_static! {
    static ref STREET_TYPES: HashMap<&'static str, StreetType> = {
        let table: &[(StreetType, &[&str])] = &[
            (StreetType::Avenue, &["avenue", "ave", "av", "avn", "aven"]),
            (StreetType::Boulevard, &["boulevard", "blvd", "boul", "blv"]),
            (StreetType::Circle, &["circle", "cir", "circ", "crcl"]),
            (StreetType::Court, &["court", "ct", "crt"]),
            (StreetType::Drive, &["drive", "dr", "drv"]),
            (StreetType::Expressway, &["expressway", "expy", "expwy", "exp"]),
            (StreetType::Freeway, &["freeway", "fwy", "frwy"]),
            (StreetType::Highway, &["highway", "hwy", "hiway", "hway"]),
            (StreetType::Lane, &["lane", "ln"]),
            (StreetType::Loop, &["loop", "lp"]),
            (StreetType::Parkway, &["parkway", "pkwy", "pky", "pkway"]),
            (StreetType::Place, &["place", "pl"]),
            (StreetType::Plaza, &["plaza", "plz", "plza"]),
            (StreetType::Road, &["road", "rd"]),
            (StreetType::Square, &["square", "sq", "sqr"]),
            (StreetType::Street, &["street", "st", "str", "strt"]),
            (StreetType::Terrace, &["terrace", "ter", "terr"]),
            (StreetType::Trail, &["trail", "trl", "tr"]),
            (StreetType::Way, &["way", "wy"]),
        ];
        table
            .iter()
            .flat_map(|(kind, synonyms)| synonyms.iter().map(move |s| (*s, *kind)))
            .collect()
    };

    static ref UNIT_DESIGNATORS: HashMap<&'static str, UnitType> = {
        let table: &[(UnitType, &[&str])] = &[
            (UnitType::Apartment, &["apt", "apartment"]),
            (UnitType::Building, &["bldg", "building"]),
            (UnitType::Floor, &["fl", "floor"]),
            (UnitType::Lot, &["lot"]),
            (UnitType::Number, &["#", "no", "num"]),
            (UnitType::Room, &["rm", "room"]),
            (UnitType::Space, &["spc", "space"]),
            (UnitType::Suite, &["ste", "suite"]),
            (UnitType::Unit, &["unit"]),
        ];
        table
            .iter()
            .flat_map(|(kind, synonyms)| synonyms.iter().map(move |s| (*s, *kind)))
            .collect()
    };

    static ref DIRECTIONALS: HashMap<&'static str, &'static str> = [
        ("n", "North"),
        ("s", "South"),
        ("e", "East"),
        ("w", "West"),
        ("ne", "Northeast"),
        ("nw", "Northwest"),
        ("se", "Southeast"),
        ("sw", "Southwest"),
    ]
    .into_iter()
    .collect();
}

fn key(token: &str) -> String {
    token.trim_end_matches(['.', ',']).to_lowercase()
}

pub(crate) fn street_type(token: &str) -> Option<StreetType> {
    STREET_TYPES.get(key(token).as_str()).copied()
}

pub(crate) fn unit_designator(token: &str) -> Option<UnitType> {
    UNIT_DESIGNATORS.get(key(token).as_str()).copied()
}

pub(crate) fn directional(token: &str) -> Option<&'static str> {
    DIRECTIONALS.get(key(token).as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_street_type_synonyms() {
        assert_eq!(street_type("Ave"), Some(StreetType::Avenue));
        assert_eq!(street_type("AVENUE"), Some(StreetType::Avenue));
        assert_eq!(street_type("St."), Some(StreetType::Street));
        assert_eq!(street_type("Rd"), Some(StreetType::Road));
        assert_eq!(street_type("Broadway"), None);
    }

    #[test]
    fn test_unit_designators() {
        assert_eq!(unit_designator("Apt"), Some(UnitType::Apartment));
        assert_eq!(unit_designator("STE."), Some(UnitType::Suite));
        assert_eq!(unit_designator("#"), Some(UnitType::Number));
        assert_eq!(unit_designator("Main"), None);
    }

    #[test]
    fn test_directionals() {
        assert_eq!(directional("N"), Some("North"));
        assert_eq!(directional("sw."), Some("Southwest"));
        assert_eq!(directional("Nor"), None);
    }
}
