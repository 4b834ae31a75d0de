// https://github.com/CSSEGISandData/COVID-19/tree/master/csse_covid_19_data/csse_covid_19_daily_reports

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::ConfigError;

pub mod daily;
pub mod record;

pub const USER_AGENT: &str = "covid-reporting-bot/0.1";

pub const DAILY_REPORTS_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports/";
pub const SOURCE_CATEGORY: &str = "covid";
pub const SOURCE_PROVENANCE: &str = "https://github.com/CSSEGISandData/COVID-19";

/// One region's row of a daily report, normalized.
///
/// Serialized field names follow the ones already published to the archive,
/// so `region` goes out as `province_state` and `combined_key` as `combined`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    #[serde(rename = "province_state")]
    pub region: String,          // "<Admin2> <Province_State>"
    pub last_update: String,     // as published, not validated
    pub country_region: String,
    #[serde(rename = "combined")]
    pub combined_key: String,
    pub active: i64,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub latitude: String,        // opaque
    pub longitude: String        // opaque
}

/// `MM-DD-YYYY.csv`, the naming used by the daily reports folder.
///
/// Both month and day are two digits. Days 1 through 9 get a leading zero and
/// day 10 onwards is used as is; the older announcer padded day 10 to `010`
/// and left January as `1`, neither of which exists upstream.
pub fn daily_file_name(date: NaiveDate) -> String {
    format!("{:02}-{:02}-{}.csv", date.month(), date.day(), date.year())
}

pub fn daily_report_url(base_url: &str, date: NaiveDate) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, daily_file_name(date))
    } else {
        format!("{}/{}", base_url, daily_file_name(date))
    }
}

/// Reverse of `daily_file_name`, for picking a day on the command line.
pub fn parse_report_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s.trim(), "%m-%d-%Y").map_err(|_| ConfigError::Date(s.to_owned()))
}
