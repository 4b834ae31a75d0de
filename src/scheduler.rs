use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tracing::{debug, error, info, warn};

use crate::bot::{Bot, RunSummary};
use crate::error::{ConfigError, RunError};

/// Wall-clock time of day at which the daily run fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time: NaiveTime
}

impl DailyTrigger {
    /// `HH:MM`, 24-hour clock.
    pub fn parse(s: &str) -> Result<DailyTrigger, ConfigError> {
        match NaiveTime::parse_from_str(s.trim(), "%H:%M") {
            Ok(time) => { Ok(DailyTrigger { time }) },
            Err(_) => { Err(ConfigError::Trigger(s.to_owned())) }
        }
    }

    /// First trigger strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Like `next_fire_after`, but never returns a trigger on `last_fired`.
    pub fn next_unfired_after(&self, now: NaiveDateTime, last_fired: Option<NaiveDate>) -> NaiveDateTime {
        let next = self.next_fire_after(now);
        if Some(next.date()) == last_fired {
            next + Duration::days(1)
        } else {
            next
        }
    }
}

/// Real time left until the local wall-clock `next`. A trigger inside a DST gap
/// falls back to the naive difference.
fn wait_until(next: NaiveDateTime) -> StdDuration {
    let now = Local::now();
    let remaining = match Local.from_local_datetime(&next).earliest() {
        Some(target) => { target.signed_duration_since(now) },
        None => { next - now.naive_local() }
    };

    remaining.to_std().unwrap_or_else(|_| StdDuration::from_secs(0))
}

#[derive(Debug)]
pub enum FireOutcome {
    Completed(RunSummary),
    Failed(RunError),
    Skipped
}

struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Scheduler<'a> {
    bot: &'a Bot<'a>,
    trigger: DailyTrigger,
    busy: AtomicBool
}

impl<'a> Scheduler<'a> {
    pub fn new(bot: &'a Bot<'a>, trigger: DailyTrigger) -> Scheduler<'a> {
        Scheduler { bot, trigger, busy: AtomicBool::new(false) }
    }

    fn try_claim(&self) -> Option<Busy<'_>> {
        match self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => { Some(Busy(&self.busy)) },
            Err(_) => { None }
        }
    }

    /// Runs the pipeline for `date` unless a previous run is still in flight.
    pub fn fire(&self, date: NaiveDate) -> FireOutcome {
        let _busy = match self.try_claim() {
            Some(b) => { b },
            None => {
                warn!("Run for {} skipped, previous run still in flight", date);
                return FireOutcome::Skipped;
            }
        };

        match self.bot.run(date) {
            Ok(summary) => {
                info!(
                    "Run for {} completed: {} regions from {}, active={}, acknowledgement {}",
                    summary.date, summary.records, summary.url, summary.aggregate.total_active, summary.acknowledgement
                );
                FireOutcome::Completed(summary)
            },
            Err(e) => {
                error!("Run for {} failed: {}", date, e);
                FireOutcome::Failed(e)
            }
        }
    }

    /// Sleeps until each trigger and fires. The next trigger is computed from the
    /// clock after a run settles and skips any date already fired, so neither an
    /// overrunning run nor a DST shift fires a date twice.
    pub fn run_forever(&self) -> ! {
        let mut last_fired: Option<NaiveDate> = None;

        loop {
            let next = self.trigger.next_unfired_after(Local::now().naive_local(), last_fired);
            info!("Next daily report run at {}", next);

            thread::sleep(wait_until(next));

            match self.fire(next.date()) {
                FireOutcome::Completed(summary) => { last_fired = Some(summary.date) },
                FireOutcome::Failed(e) => {
                    // no retry, the next trigger is the recovery
                    debug!("Not retrying {}: {:?}", next.date(), e);
                    last_fired = Some(next.date());
                },
                FireOutcome::Skipped => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::tests::{account, test_config};
    use crate::integration::ledger::tests::RecordingLedger;
    use crate::jhu::daily::tests::{CannedFetch, SAMPLE};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn test_parse_trigger() {
        assert_eq!(DailyTrigger::parse("23:59").unwrap(), DailyTrigger::parse("23:59").unwrap());
        assert_eq!(DailyTrigger::parse(" 06:05 ").unwrap(), DailyTrigger::parse("6:05").unwrap());

        for bad in &["", "24:00", "23:60", "noon", "23"] {
            assert!(matches!(DailyTrigger::parse(bad), Err(ConfigError::Trigger(_))), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_next_fire_later_today() {
        let trigger = DailyTrigger::parse("23:59").unwrap();
        assert_eq!(trigger.next_fire_after(at(2020, 5, 31, 12, 0, 0)), at(2020, 5, 31, 23, 59, 0));
    }

    #[test]
    fn test_next_fire_rolls_to_tomorrow() {
        let trigger = DailyTrigger::parse("23:59").unwrap();

        assert_eq!(trigger.next_fire_after(at(2020, 5, 31, 23, 59, 0)), at(2020, 6, 1, 23, 59, 0));
        assert_eq!(trigger.next_fire_after(at(2020, 5, 31, 23, 59, 30)), at(2020, 6, 1, 23, 59, 0));
        assert_eq!(trigger.next_fire_after(at(2020, 12, 31, 23, 59, 59)), at(2021, 1, 1, 23, 59, 0));
    }

    #[test]
    fn test_early_wake_does_not_refire_same_date() {
        // DST end: a 24h naive sleep lands at 22:59 local on the date just fired
        let trigger = DailyTrigger::parse("23:59").unwrap();
        let fired = NaiveDate::from_ymd_opt(2020, 11, 1).unwrap();

        assert_eq!(trigger.next_fire_after(at(2020, 11, 1, 22, 59, 0)), at(2020, 11, 1, 23, 59, 0));
        assert_eq!(trigger.next_unfired_after(at(2020, 11, 1, 22, 59, 0), Some(fired)), at(2020, 11, 2, 23, 59, 0));
        assert_eq!(trigger.next_unfired_after(at(2020, 11, 1, 23, 59, 5), Some(fired)), at(2020, 11, 2, 23, 59, 0));
    }

    #[test]
    fn test_unfired_keeps_pending_date() {
        let trigger = DailyTrigger::parse("23:59").unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2020, 10, 31).unwrap();

        assert_eq!(trigger.next_unfired_after(at(2020, 11, 1, 22, 59, 0), Some(yesterday)), at(2020, 11, 1, 23, 59, 0));
        assert_eq!(trigger.next_unfired_after(at(2020, 11, 1, 22, 59, 0), None), at(2020, 11, 1, 23, 59, 0));
    }

    #[test]
    fn test_wait_until_past_is_zero() {
        assert_eq!(wait_until(at(2000, 1, 1, 0, 0, 0)), StdDuration::from_secs(0));
    }

    #[test]
    fn test_fire_runs_pipeline() {
        let config = test_config();
        let fetcher = CannedFetch::ok(SAMPLE);
        let ledger = RecordingLedger::default();
        let bot = Bot::new(&config, account(), Box::new(&fetcher), Box::new(&ledger));
        let scheduler = Scheduler::new(&bot, config.trigger);

        match scheduler.fire(NaiveDate::from_ymd_opt(2020, 5, 31).unwrap()) {
            FireOutcome::Completed(summary) => {
                assert_eq!(summary.records, 2);
                assert_eq!(summary.date, NaiveDate::from_ymd_opt(2020, 5, 31).unwrap());
            },
            other => { panic!("expected a completed run, got {:?}", other) }
        }
        assert!(!scheduler.busy.load(Ordering::SeqCst));
    }

    #[test]
    fn test_fire_while_busy_is_skipped() {
        let config = test_config();
        let fetcher = CannedFetch::ok(SAMPLE);
        let ledger = RecordingLedger::default();
        let bot = Bot::new(&config, account(), Box::new(&fetcher), Box::new(&ledger));
        let scheduler = Scheduler::new(&bot, config.trigger);

        let held = scheduler.try_claim();
        assert!(held.is_some());
        assert!(matches!(scheduler.fire(NaiveDate::from_ymd_opt(2020, 5, 31).unwrap()), FireOutcome::Skipped));
        assert!(fetcher.requested.borrow().is_empty());

        drop(held);
        assert!(matches!(scheduler.fire(NaiveDate::from_ymd_opt(2020, 5, 31).unwrap()), FireOutcome::Completed(_)));
    }

    #[test]
    fn test_failed_run_releases_guard() {
        let config = test_config();
        let fetcher = CannedFetch::unreachable();
        let ledger = RecordingLedger::default();
        let bot = Bot::new(&config, account(), Box::new(&fetcher), Box::new(&ledger));
        let scheduler = Scheduler::new(&bot, config.trigger);

        assert!(matches!(scheduler.fire(NaiveDate::from_ymd_opt(2020, 5, 31).unwrap()), FireOutcome::Failed(_)));
        assert!(!scheduler.busy.load(Ordering::SeqCst));
    }
}
