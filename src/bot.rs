use chrono::NaiveDate;
use tracing::info;

use crate::config::BotConfig;
use crate::error::RunError;
use crate::integration::ledger::{Account, Acknowledgement, Announce};
use crate::jhu::daily::{fetch_daily_report, Fetch};
use crate::jhu::daily_report_url;
use crate::report::{DailyAggregate, ReportBuilder};

#[derive(Debug)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub url: String,
    pub records: usize,
    pub aggregate: DailyAggregate,
    pub acknowledgement: Acknowledgement
}

/// One fetch, aggregate, announce cycle against fixed configuration.
pub struct Bot<'a> {
    config: &'a BotConfig,
    account: Account,
    builder: ReportBuilder,
    fetcher: Box<dyn Fetch + 'a>,
    ledger: Box<dyn Announce + 'a>
}

impl<'a> Bot<'a> {
    pub fn new(config: &'a BotConfig, account: Account, fetcher: Box<dyn Fetch + 'a>, ledger: Box<dyn Announce + 'a>) -> Bot<'a> {
        let builder = ReportBuilder::new(account.address.clone());
        Bot { config, account, builder, fetcher, ledger }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn run(&self, date: NaiveDate) -> Result<RunSummary, RunError> {
        let url = daily_report_url(&self.config.base_url, date);
        let reports = fetch_daily_report(self.fetcher.as_ref(), &self.config.base_url, date, self.config.abort_on_fetch_failure)?;

        let aggregate = DailyAggregate::from_reports(&reports);
        info!(
            "Totals for {}: infected={} deaths={} recovered={} active={}",
            date, aggregate.total_infected, aggregate.total_deaths, aggregate.total_recovered, aggregate.total_active
        );

        let report = self.builder.build(&aggregate, &reports);
        let acknowledgement = self.ledger.announce(&self.account, &report, &self.config.channel, &self.config.tag)?;
        info!("Report for {} announced as {}: {}", date, self.account.address, acknowledgement);

        Ok(RunSummary {
            date,
            url,
            records: reports.len(),
            aggregate,
            acknowledgement
        })
    }
}
