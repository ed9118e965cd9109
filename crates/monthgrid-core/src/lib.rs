pub mod binder;
pub mod cli;
pub mod color;
pub mod config;
pub mod datetime;
pub mod event;
pub mod format;
pub mod grid;
pub mod render;
pub mod source;
pub mod state;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use binder::{
  DayEvents,
  EventIndex,
  events_for
};
pub use color::attenuate;
pub use event::Event;
pub use grid::{
  CalendarGrid,
  DayCategory,
  GridCell,
  GridRange,
  build_grid,
  classify,
  compute_grid_range
};
pub use state::{
  Action,
  CalendarState
};

pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  run_with_writer(
    raw_args,
    io::stdout().lock()
  )
}

/// Same as [`run`], with the rendered
/// month or JSON sent to `writer`.
#[tracing::instrument(skip_all)]
pub fn run_with_writer<W: Write>(
  raw_args: Vec<OsString>,
  mut writer: W
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting monthgrid"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );
  if let Some(week_start) =
    cli.week_start.as_deref()
  {
    cfg.apply_overrides([(
      "week.start".to_string(),
      week_start.to_string()
    )]);
  }
  for (key, value) in cfg.iter() {
    debug!(key = %key, value = %value, "effective config");
  }

  let settings =
    config::CalendarSettings::from_config(
      &cfg
    )?;

  let timezone =
    datetime::resolve_timezone(
      settings.timezone.as_deref()
    );
  let today = datetime::today_in(timezone);

  let state = cli
    .actions(today)?
    .into_iter()
    .fold(
      CalendarState::new(today),
      CalendarState::apply
    );

  let events = match cli.events.as_deref()
  {
    | Some(path) => {
      source::load_events(path)
    }
    | None if settings
      .events_file_explicit =>
    {
      source::load_events(
        &settings.events_file
      )
    }
    | None => {
      source::load_events_if_present(
        &settings.events_file
      )
    }
  }
  .context("failed to load events")?;

  let grid = build_grid(
    &state,
    today,
    &events,
    &settings.grid
  );
  let view =
    render::CalendarView::from_grid(
      &grid, &settings
    );

  let renderer =
    render::Renderer::new(&settings);
  if cli.json {
    renderer
      .write_json(&mut writer, &view)?;
  } else {
    renderer
      .write_month(&mut writer, &view)?;
  }

  info!(
    month = %view.title,
    selected = %state.selected_date,
    selection_visible =
      state.selection_visible(),
    "done"
  );
  Ok(())
}
