use std::collections::HashMap;

use crate::error::ParseError;
use super::RegionReport;

/// One CSV record keyed by header name.
pub type RawRow = HashMap<String, String>;

const ADMIN2: &str = "Admin2";
const PROVINCE_STATE: &str = "Province_State";
const LAST_UPDATE: &str = "Last_Update";
const COUNTRY_REGION: &str = "Country_Region";
const COMBINED_KEY: &str = "Combined_Key";
const ACTIVE: &str = "Active";
const CONFIRMED: &str = "Confirmed";
const DEATHS: &str = "Deaths";
const RECOVERED: &str = "Recovered";

// the header spelling changed over the lifetime of the dataset
const LATITUDE: [&str; 2] = ["Lat", "Latitude"];
const LONGITUDE: [&str; 2] = ["Long_", "Longitude"];

fn required<'a>(row: &'a RawRow, field: &'static str) -> Result<&'a str, ParseError> {
    match row.get(field) {
        Some(value) => { Ok(value.as_str()) },
        None => { Err(ParseError::MissingField { field }) }
    }
}

fn optional(row: &RawRow, names: &[&str]) -> String {
    names.iter()
        .find_map(|name| row.get(*name))
        .cloned()
        .unwrap_or_default()
}

fn integer(row: &RawRow, field: &'static str) -> Result<i64, ParseError> {
    let value = required(row, field)?;

    value.trim().parse::<i64>().map_err(|source| ParseError::InvalidInteger {
        field,
        value: value.to_owned(),
        source
    })
}

pub fn parse_region_report(row: &RawRow) -> Result<RegionReport, ParseError> {
    let region = format!("{} {}", required(row, ADMIN2)?, required(row, PROVINCE_STATE)?);

    Ok(RegionReport {
        region,
        last_update: optional(row, &[LAST_UPDATE]),
        country_region: optional(row, &[COUNTRY_REGION]),
        combined_key: optional(row, &[COMBINED_KEY]),
        active: integer(row, ACTIVE)?,
        confirmed: integer(row, CONFIRMED)?,
        deaths: integer(row, DEATHS)?,
        recovered: integer(row, RECOVERED)?,
        latitude: optional(row, &LATITUDE),
        longitude: optional(row, &LONGITUDE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn autauga() -> RawRow {
        row(&[
            ("FIPS", "01001"),
            ("Admin2", "Autauga"),
            ("Province_State", "Alabama"),
            ("Country_Region", "US"),
            ("Last_Update", "2020-06-01 02:32:27"),
            ("Lat", "32.53952745"),
            ("Long_", "-86.64408227"),
            ("Confirmed", "233"),
            ("Deaths", "5"),
            ("Recovered", "0"),
            ("Active", "228"),
            ("Combined_Key", "Autauga, Alabama, US"),
        ])
    }

    #[test]
    fn test_parse_full_row() {
        let report = parse_region_report(&autauga()).unwrap();

        assert_eq!(report, RegionReport {
            region: "Autauga Alabama".to_owned(),
            last_update: "2020-06-01 02:32:27".to_owned(),
            country_region: "US".to_owned(),
            combined_key: "Autauga, Alabama, US".to_owned(),
            active: 228,
            confirmed: 233,
            deaths: 5,
            recovered: 0,
            latitude: "32.53952745".to_owned(),
            longitude: "-86.64408227".to_owned()
        });
    }

    #[test]
    fn test_empty_region_parts_are_kept() {
        let mut input = autauga();
        input.insert("Admin2".to_owned(), String::new());
        input.insert("Province_State".to_owned(), String::new());

        assert_eq!(parse_region_report(&input).unwrap().region, " ");
    }

    #[test]
    fn test_longitude_alternate_spelling() {
        let mut input = autauga();
        input.remove("Long_");
        input.remove("Lat");
        input.insert("Longitude".to_owned(), "12.5".to_owned());
        input.insert("Latitude".to_owned(), "41.9".to_owned());

        let report = parse_region_report(&input).unwrap();
        assert_eq!(report.longitude, "12.5");
        assert_eq!(report.latitude, "41.9");
    }

    #[test]
    fn test_coordinates_are_not_validated() {
        let mut input = autauga();
        input.insert("Lat".to_owned(), "".to_owned());
        input.insert("Long_".to_owned(), "n/a".to_owned());

        let report = parse_region_report(&input).unwrap();
        assert_eq!(report.latitude, "");
        assert_eq!(report.longitude, "n/a");
    }

    #[test]
    fn test_negative_corrections_parse() {
        let mut input = autauga();
        input.insert("Active".to_owned(), "-12".to_owned());

        assert_eq!(parse_region_report(&input).unwrap().active, -12);
    }

    #[test]
    fn test_missing_numeric_field_is_named() {
        for field in &["Active", "Confirmed", "Deaths", "Recovered"] {
            let mut input = autauga();
            input.remove(*field);

            let error = parse_region_report(&input).unwrap_err();
            assert!(matches!(error, ParseError::MissingField { .. }));
            assert_eq!(error.field(), *field);
        }
    }

    #[test]
    fn test_non_numeric_field_is_named() {
        for (field, bad) in &[("Active", ""), ("Confirmed", "many"), ("Deaths", "1.5"), ("Recovered", "12a")] {
            let mut input = autauga();
            input.insert(field.to_string(), bad.to_string());

            match parse_region_report(&input) {
                Err(ParseError::InvalidInteger { field: f, value, .. }) => {
                    assert_eq!(f, *field);
                    assert_eq!(value, *bad);
                },
                other => { panic!("expected InvalidInteger for {}, got {:?}", field, other) }
            }
        }
    }

    #[test]
    fn test_missing_region_column() {
        let mut input = autauga();
        input.remove("Admin2");

        assert_eq!(parse_region_report(&input).unwrap_err().field(), "Admin2");
    }

    #[test]
    fn test_input_row_is_untouched() {
        let input = autauga();
        let before = input.clone();
        parse_region_report(&input).unwrap();

        assert_eq!(input, before);
    }
}
