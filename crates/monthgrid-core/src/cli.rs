use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::{parse_date_input, parse_month_input};
use crate::state::Action;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "monthgrid",
    version,
    about = "Month calendar grid with per-day events",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Events file (JSON array or one object per line).
    #[arg(long = "events")]
    pub events: Option<PathBuf>,

    /// Day to select: today, tomorrow, yesterday or YYYY-MM-DD.
    #[arg(long = "date")]
    pub date: Option<String>,

    /// Month to show: YYYY-MM, a date, or a month name.
    #[arg(long = "month")]
    pub month: Option<String>,

    /// Months to move the view by.
    #[arg(long = "shift", allow_hyphen_values = true)]
    pub shift: Option<i32>,

    #[arg(long = "next", action = ArgAction::Count)]
    pub next: u8,

    #[arg(long = "prev", action = ArgAction::Count)]
    pub prev: u8,

    #[arg(long = "week-start")]
    pub week_start: Option<String>,

    #[arg(long = "json")]
    pub json: bool,
}

impl GlobalCli {
    /// Navigation requested on the command line, in application order.
    ///
    /// Selecting a date also moves the view, so `--month` and the shifts are
    /// applied after it.
    #[tracing::instrument(skip(self, today))]
    pub fn actions(&self, today: NaiveDate) -> anyhow::Result<Vec<Action>> {
        let mut actions = Vec::new();

        if let Some(raw) = &self.date {
            actions.push(Action::SelectDate(parse_date_input(raw, today)?));
        }

        if let Some(raw) = &self.month {
            let target = parse_month_input(raw, today)?;
            let current = match actions.last() {
                Some(Action::SelectDate(date)) => *date,
                _ => today,
            };
            actions.push(Action::ShiftMonth(months_between(current, target)));
        }

        let step = self
            .shift
            .unwrap_or(0)
            .checked_add(i32::from(self.next))
            .and_then(|step| step.checked_sub(i32::from(self.prev)))
            .ok_or_else(|| anyhow!("month shift out of range"))?;
        if step != 0 {
            actions.push(Action::ShiftMonth(step));
        }

        debug!(?actions, "resolved navigation actions");
        Ok(actions)
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
