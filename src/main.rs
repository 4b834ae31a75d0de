#[macro_use]
extern crate lazy_static;
extern crate toml;
extern crate serde;
extern crate ureq;

use std::process;

use chrono::Local;
use clap::{Arg, App, ArgMatches};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bot;
use bot::Bot;

mod config;
use config::{load_config, load_private_key};

mod error;
use error::ConfigError;

mod integration;
use integration::ledger::{Account, Announce, DryRunLedger, HttpLedger};

mod jhu;
use jhu::daily::HttpFetch;
use jhu::parse_report_date;

mod report;

mod scheduler;
use scheduler::Scheduler;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    const DEFAULT_CONFIG: &str = "config/bot.toml";
    const DEFAULT_SECRET_CONFIG: &str = "config/secret.toml";

    App::new("covid-reporting-bot")
    .about("Announces the daily JHU CSSE COVID-19 totals to a report archive")
    .arg(
        Arg::with_name("config")
            .long("config")
            .takes_value(true)
            .default_value(DEFAULT_CONFIG)
            .help("Location of bot configuration (ledger node, schedule, http timeouts)")
    )
    .arg(
        Arg::with_name("secret-config")
            .long("secret-config")
            .takes_value(true)
            .default_value(DEFAULT_SECRET_CONFIG)
            .help("Location of private configuration holding the account private key. Prompted for when absent.")
    )
    .arg(
        Arg::with_name("node-url")
            .short("n")
            .long("node-url")
            .takes_value(true)
            .help("Ledger node to announce to, overriding the configured one")
    )
    .arg(
        Arg::with_name("once")
            .long("once")
            .takes_value(false)
            .help("Run a single cycle for today immediately, then exit")
    )
    .arg(
        Arg::with_name("date")
            .short("d")
            .long("date")
            .takes_value(true)
            .help("Run a single cycle for the given day (MM-DD-YYYY), then exit")
    )
    .arg(
        Arg::with_name("dry-run")
            .long("dry-run")
            .takes_value(false)
            .help("Print the report that would be announced instead of sending it")
    )
}

fn start(matches: &ArgMatches) -> Result<(), ConfigError> {
    let mut config = load_config(matches.value_of("config").unwrap_or_default())?;
    if let Some(node_url) = matches.value_of("node-url") {
        config.node_url = node_url.to_owned();
    }

    let single_date = match matches.value_of("date") {
        Some(d) => { Some(parse_report_date(d)?) },
        None => { None }
    };

    let private_key = load_private_key(matches.value_of("secret-config").unwrap_or_default())?;
    let account = Account::from_private_key(&private_key, config.network)?;

    let fetcher = HttpFetch {
        connect_timeout: config.connect_timeout,
        receive_timeout: config.receive_timeout
    };
    let ledger: Box<dyn Announce> = if matches.is_present("dry-run") {
        Box::new(DryRunLedger)
    } else {
        Box::new(HttpLedger {
            node_url: config.node_url.clone(),
            connect_timeout: config.connect_timeout,
            receive_timeout: config.receive_timeout
        })
    };

    let bot = Bot::new(&config, account, Box::new(fetcher), ledger);
    info!("Reporting as {} to {}", bot.account().address, config.node_url);

    if single_date.is_some() || matches.is_present("once") {
        let date = single_date.unwrap_or_else(|| Local::now().naive_local().date());

        if let Err(e) = bot.run(date) {
            error!("Run for {} failed: {}", date, e);
            process::exit(1);
        }
        return Ok(());
    }

    Scheduler::new(&bot, config.trigger).run_forever()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = command_usage().get_matches();

    if let Err(e) = start(&matches) {
        error!("{}", e);
        process::exit(2);
    }
}
