use std::fs;
use std::path::PathBuf;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "monthgrid-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "MONTHGRID_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "MONTHGRID_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Resolves the timezone used to decide
/// which day is "today".
///
/// Lookup order: `MONTHGRID_TIMEZONE`,
/// the `timezone` config key, then the
/// `monthgrid-time.toml` file. `None`
/// means the system local time is used.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return Some(tz);
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return Some(tz);
  }

  timezone_config_path().and_then(
    |path| load_timezone_from_file(&path)
  )
}

#[must_use]
pub fn today_in(
  timezone: Option<Tz>
) -> NaiveDate {
  match timezone {
    | Some(tz) => {
      Utc::now()
        .with_timezone(&tz)
        .date_naive()
    }
    | None => Local::now().date_naive()
  }
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn first_day_of_month(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

#[must_use]
pub fn last_day_of_month(
  date: NaiveDate
) -> NaiveDate {
  let (next_year, next_month) =
    if date.month() >= 12 {
      (date.year().saturating_add(1), 1_u32)
    } else {
      (date.year(), date.month() + 1)
    };
  match NaiveDate::from_ymd_opt(
    next_year, next_month, 1
  ) {
    | Some(next_first) => {
      add_days(next_first, -1)
    }
    // December of the last representable year.
    | None => {
      NaiveDate::from_ymd_opt(
        date.year(),
        12,
        31
      )
      .unwrap_or(date)
    }
  }
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .map(|first| {
    last_day_of_month(first).day()
  })
  .unwrap_or(30)
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[must_use]
pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = date.year() as i64 * 12
    + date.month0() as i64
    + months as i64;
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;

  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

#[must_use]
pub fn same_month(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a.year() == b.year()
    && a.month() == b.month()
}

pub fn parse_week_start(
  raw: &str
) -> anyhow::Result<Weekday> {
  let lower =
    raw.trim().to_ascii_lowercase();
  parse_weekday_name(&lower)
    .ok_or_else(|| {
      anyhow!(
        "invalid week start '{}'; \
         expected a weekday name such \
         as sunday or monday",
        raw.trim()
      )
    })
}

/// Parses a date typed by the user into
/// a calendar day.
///
/// Accepts `today`, `tomorrow`,
/// `yesterday` and `YYYY-MM-DD`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_input(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "unrecognized date '{token}'; \
       supported: today, tomorrow, \
       yesterday, YYYY-MM-DD"
    )
  })
}

/// Parses a month reference into the
/// first day of that month.
///
/// Accepts `YYYY-MM`, any full date,
/// and month names (resolved in the
/// current year).
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_month_input(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  if let Some(month) =
    parse_month_name(&lower)
  {
    return NaiveDate::from_ymd_opt(
      today.year(),
      month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: {month}"
      )
    });
  }

  let year_month_re = Regex::new(
    r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
  )
  .context(
    "failed to compile month pattern"
  )?;
  if let Some(captures) =
    year_month_re.captures(token)
  {
    let year: i32 = captures["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = captures["month"]
      .parse()
      .context("invalid month")?;
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month '{token}'; \
         month must be 1-12"
      )
    });
  }

  parse_date_input(token, today)
    .map(first_day_of_month)
    .map_err(|_| {
      anyhow!(
        "unrecognized month \
         '{token}'; supported: \
         YYYY-MM, YYYY-MM-DD, month \
         names (e.g. march), today"
      )
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}


pub mod clock_time_serde {
  use chrono::NaiveTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S>(
    time: &NaiveTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &time.format(FORMAT).to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    NaiveTime::parse_from_str(
      raw.trim(),
      FORMAT
    )
    .map_err(serde::de::Error::custom)
  }
}
