use serde::Serialize;
use tracing::debug;

use crate::integration::ledger::AccountAddress;
use crate::jhu::{RegionReport, SOURCE_CATEGORY, SOURCE_PROVENANCE};

pub const TOTAL_GLOBAL_INFECTED: &str = "totalGlobalInfected";
pub const TOTAL_GLOBAL_DEATH_COUNT: &str = "totalGlobalDeathCount";
pub const TOTAL_GLOBAL_RECOVERED: &str = "totalGlobalRecovered";
pub const TOTAL_GLOBAL_ACTIVE: &str = "totalGlobalActive";
pub const COUNTRY_REPORTS: &str = "covidCountryReport";

/// Global totals for one daily report.
///
/// `total_active` is always `total_infected - total_recovered`. The per-region
/// `active` column is not summed, archived reports have been computed this way
/// from the start.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DailyAggregate {
    pub total_infected: i64,
    pub total_deaths: i64,
    pub total_recovered: i64,
    pub total_active: i64
}

impl DailyAggregate {
    pub fn from_reports(reports: &[RegionReport]) -> DailyAggregate {
        let mut result = DailyAggregate::default();

        for report in reports {
            // "infected" is the confirmed column
            result.total_infected += report.confirmed;
            result.total_deaths += report.deaths;
            result.total_recovered += report.recovered;
        }
        result.total_active = result.total_infected - result.total_recovered;

        result
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DataValue {
    Scalar(i64),
    Collection(Vec<RegionReport>)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub name: String,
    pub value: DataValue
}

impl DataPoint {
    fn scalar(name: &str, value: i64) -> DataPoint {
        DataPoint { name: name.to_owned(), value: DataValue::Scalar(value) }
    }

    pub fn as_scalar(&self) -> Option<i64> {
        match self.value {
            DataValue::Scalar(v) => { Some(v) },
            DataValue::Collection(_) => { None }
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundReport {
    pub category: String,
    pub source_url: String,
    pub data_points: Vec<DataPoint>,
    pub account: AccountAddress
}

/// Assembles outbound reports for one reporting account.
pub struct ReportBuilder {
    account: AccountAddress
}

impl ReportBuilder {
    pub fn new(account: AccountAddress) -> ReportBuilder {
        ReportBuilder { account }
    }

    pub fn build(&self, aggregate: &DailyAggregate, reports: &[RegionReport]) -> OutboundReport {
        let data_points = vec![
            DataPoint::scalar(TOTAL_GLOBAL_INFECTED, aggregate.total_infected),
            DataPoint::scalar(TOTAL_GLOBAL_DEATH_COUNT, aggregate.total_deaths),
            DataPoint::scalar(TOTAL_GLOBAL_RECOVERED, aggregate.total_recovered),
            DataPoint::scalar(TOTAL_GLOBAL_ACTIVE, aggregate.total_active),
            DataPoint { name: COUNTRY_REPORTS.to_owned(), value: DataValue::Collection(reports.to_vec()) },
        ];

        for point in &data_points {
            if let Some(value) = point.as_scalar() {
                debug!("{} = {}", point.name, value);
            }
        }

        OutboundReport {
            category: SOURCE_CATEGORY.to_owned(),
            source_url: SOURCE_PROVENANCE.to_owned(),
            data_points,
            account: self.account.clone()
        }
    }
}
