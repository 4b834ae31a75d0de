use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{FetchError, PipelineError};
use super::record::{parse_region_report, RawRow};
use super::{daily_report_url, RegionReport, USER_AGENT};

/// Body of an HTTP response together with whether the server considered it a success.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedText {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub body: String
}

pub trait Fetch {
    /// Only transport failures are errors here; a non-2xx status still comes back as `Ok`.
    fn fetch(&self, url: &str) -> Result<FetchedText, FetchError>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self, url: &str) -> Result<FetchedText, FetchError> {
        (**self).fetch(url)
    }
}

pub struct HttpFetch {
    pub connect_timeout: u64,   // milliseconds
    pub receive_timeout: u64
}

impl Fetch for HttpFetch {
    fn fetch(&self, url: &str) -> Result<FetchedText, FetchError> {
        let response = ureq::get(url)
            .set("User-Agent", USER_AGENT)
            .timeout_connect(self.connect_timeout)
            .timeout_read(self.receive_timeout)
            .call();

        if let Some(error) = response.synthetic_error() {
            return Err(FetchError::Transport { url: url.to_owned(), message: error.to_string() });
        }

        let ok = response.ok();
        let status = response.status();
        let status_text = response.status_text().to_owned();
        let body = response.into_string().map_err(|source| FetchError::Body { url: url.to_owned(), source })?;

        Ok(FetchedText { ok, status, status_text, body })
    }
}

/// Parses the whole text of a daily report. The first bad row aborts the lot.
pub fn parse_daily_report(text: &str) -> Result<Vec<RegionReport>, PipelineError> {
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut reports = Vec::new();
    for (index, result) in reader.deserialize::<RawRow>().enumerate() {
        let row = result?;
        let report = parse_region_report(&row).map_err(|source| {
            warn!("Row {} rejected at column `{}`, dropping the whole report", index + 1, source.field());
            PipelineError::Parse { row: index + 1, source }
        })?;
        reports.push(report);
    }

    Ok(reports)
}

/// Retrieves and parses the report published for `date`.
///
/// When `abort_on_failure` is false a non-success response is only logged and
/// its body goes through the parser regardless.
pub fn fetch_daily_report(fetcher: &dyn Fetch, base_url: &str, date: NaiveDate, abort_on_failure: bool) -> Result<Vec<RegionReport>, PipelineError> {
    let url = daily_report_url(base_url, date);
    info!("Fetching daily report {}", url);

    let fetched = fetcher.fetch(&url)?;

    if !fetched.ok {
        if abort_on_failure {
            return Err(FetchError::Status {
                url,
                status: fetched.status,
                status_text: fetched.status_text
            }.into());
        }
        warn!("{} answered {} {}, parsing the body anyway", url, fetched.status, fetched.status_text);
    }

    debug!("Received {} bytes from {}", fetched.body.len(), url);
    let reports = parse_daily_report(&fetched.body)?;
    info!("Parsed {} region reports for {}", reports.len(), date);

    Ok(reports)
}
