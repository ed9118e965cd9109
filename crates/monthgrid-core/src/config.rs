use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::binder::{
  DEFAULT_VISIBLE_LIMIT,
  MAX_VISIBLE_LIMIT
};
use crate::color::DEFAULT_OUTSIDE_ALPHA;
use crate::datetime::parse_week_start;
use crate::grid::{
  GridLayout,
  GridOptions
};

const RC_ENV_VAR: &str = "MONTHGRIDRC";
const RC_FILE_NAME: &str =
  ".monthgridrc";

const DEFAULT_WEEK_START: &str =
  "sunday";
const DEFAULT_EVENTS_FILE: &str =
  "events.json";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "week.start".to_string(),
      DEFAULT_WEEK_START.to_string()
    );
    map.insert(
      "events.visible_limit"
        .to_string(),
      DEFAULT_VISIBLE_LIMIT.to_string()
    );
    map.insert(
      "events.outside_alpha"
        .to_string(),
      DEFAULT_OUTSIDE_ALPHA.to_string()
    );
    map.insert(
      "grid.layout".to_string(),
      GridLayout::Fit
        .as_key()
        .to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading monthgridrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no monthgridrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Typed view of the keys the calendar
/// reads.
#[derive(Debug, Clone)]
pub struct CalendarSettings {
  pub grid:          GridOptions,
  pub outside_alpha: f64,
  pub color:         bool,
  pub timezone:      Option<String>,
  pub events_file:   PathBuf,
  /// Whether `events_file` came from
  /// configuration rather than the
  /// built-in default.
  pub events_file_explicit: bool
}

impl CalendarSettings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let week_start = match cfg
      .get("week.start")
      .filter(|raw| !raw.trim().is_empty())
    {
      | Some(raw) => {
        parse_week_start(&raw)
          .context("invalid week.start")?
      }
      | None => Weekday::Sun
    };

    let visible_limit = match cfg
      .get("events.visible_limit")
    {
      | Some(raw) => {
        let parsed = raw
          .trim()
          .parse::<usize>()
          .with_context(|| {
            format!(
              "invalid \
               events.visible_limit: \
               {raw}"
            )
          })?;
        if parsed == 0 {
          warn!(
            "events.visible_limit of 0 \
             ignored; using default"
          );
          DEFAULT_VISIBLE_LIMIT
        } else if parsed > MAX_VISIBLE_LIMIT
        {
          warn!(
            requested = parsed,
            max = MAX_VISIBLE_LIMIT,
            "events.visible_limit capped"
          );
          MAX_VISIBLE_LIMIT
        } else {
          parsed
        }
      }
      | None => DEFAULT_VISIBLE_LIMIT
    };

    let outside_alpha = match cfg
      .get("events.outside_alpha")
    {
      | Some(raw) => {
        let parsed = raw
          .trim()
          .parse::<f64>()
          .with_context(|| {
            format!(
              "invalid \
               events.outside_alpha: \
               {raw}"
            )
          })?;
        if parsed.is_nan() {
          return Err(anyhow!(
            "events.outside_alpha must \
             be a number"
          ));
        }
        parsed.clamp(0.0, 1.0)
      }
      | None => DEFAULT_OUTSIDE_ALPHA
    };

    let layout = match cfg
      .get("grid.layout")
    {
      | Some(raw) => {
        GridLayout::from_key(&raw)
          .ok_or_else(|| {
            anyhow!(
              "invalid grid.layout: \
               {raw} (expected fit or \
               fixed)"
            )
          })?
      }
      | None => GridLayout::Fit
    };

    let color = match cfg.get("color")
    {
      | Some(raw) => {
        parse_bool(&raw).ok_or_else(
          || {
            anyhow!(
              "invalid color setting: \
               {}",
              raw.trim()
            )
          }
        )?
      }
      | None => true
    };

    let timezone = cfg
      .get("timezone")
      .map(|raw| raw.trim().to_string())
      .filter(|raw| !raw.is_empty());

    let (events_file, events_file_explicit) =
      match cfg
        .get("events.file")
        .filter(|raw| {
          !raw.trim().is_empty()
        }) {
        | Some(raw) => {
          (
            expand_tilde(Path::new(
              raw.trim()
            )),
            true
          )
        }
        | None => {
          (
            PathBuf::from(
              DEFAULT_EVENTS_FILE
            ),
            false
          )
        }
      };

    let settings = Self {
      grid: GridOptions {
        week_start,
        visible_limit,
        layout
      },
      outside_alpha,
      color,
      timezone,
      events_file,
      events_file_explicit
    };
    info!(
      week_start = %settings.grid.week_start,
      visible_limit = settings.grid.visible_limit,
      layout = settings.grid.layout.as_key(),
      outside_alpha = settings.outside_alpha,
      "resolved calendar settings"
    );
    Ok(settings)
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping default rc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
