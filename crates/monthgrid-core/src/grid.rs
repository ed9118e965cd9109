//! Month grid construction.
//!
//! A grid is a run of whole weeks covering the reference month. Each cell
//! carries its display category and the events bound to its date.

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;
use tracing::debug;

use crate::binder::{
  DEFAULT_VISIBLE_LIMIT,
  EventIndex
};
use crate::datetime::{
  add_days,
  end_of_week,
  first_day_of_month,
  last_day_of_month,
  same_month,
  start_of_week
};
use crate::event::Event;
use crate::state::CalendarState;

pub const DAYS_PER_WEEK: usize = 7;
pub const FIXED_GRID_WEEKS: usize = 6;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DayCategory {
  Selected,
  Today,
  InMonth,
  OutOfMonth
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum GridLayout {
  /// Only the weeks the month touches
  /// (four to six).
  #[default]
  Fit,
  /// Always six weeks.
  Fixed
}

impl GridLayout {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "fit" => Some(Self::Fit),
      | "fixed" | "six" => {
        Some(Self::Fixed)
      }
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Fit => "fit",
      | Self::Fixed => "fixed"
    }
  }
}

/// Inclusive span of days rendered by
/// the grid.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct GridRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl GridRange {
  pub fn len_days(&self) -> usize {
    let span = (self.end - self.start)
      .num_days()
      + 1;
    usize::try_from(span).unwrap_or(0)
  }

  pub fn weeks(&self) -> usize {
    self.len_days() / DAYS_PER_WEEK
  }

  pub fn contains(
    &self,
    day: NaiveDate
  ) -> bool {
    self.start <= day && day <= self.end
  }

  pub fn days(
    &self
  ) -> impl Iterator<Item = NaiveDate>
  {
    let start = self.start;
    (0..self.len_days()).map(
      move |offset| {
        add_days(start, offset as i64)
      }
    )
  }
}

#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
  pub week_start:    Weekday,
  pub visible_limit: usize,
  pub layout:        GridLayout
}

impl Default for GridOptions {
  fn default() -> Self {
    Self {
      week_start:    Weekday::Sun,
      visible_limit:
        DEFAULT_VISIBLE_LIMIT,
      layout:        GridLayout::Fit
    }
  }
}

/// Whole weeks covering the month that
/// contains `reference_month`.
#[must_use]
pub fn compute_grid_range(
  reference_month: NaiveDate,
  week_start: Weekday
) -> GridRange {
  let month_start =
    first_day_of_month(reference_month);
  let month_end =
    last_day_of_month(reference_month);
  GridRange {
    start: start_of_week(
      month_start,
      week_start
    ),
    end:   end_of_week(
      month_end, week_start
    )
  }
}

#[must_use]
pub fn compute_grid_range_with_layout(
  reference_month: NaiveDate,
  week_start: Weekday,
  layout: GridLayout
) -> GridRange {
  let range = compute_grid_range(
    reference_month,
    week_start
  );
  match layout {
    | GridLayout::Fit => range,
    | GridLayout::Fixed => {
      let missing = FIXED_GRID_WEEKS
        .saturating_sub(range.weeks());
      GridRange {
        start: range.start,
        end:   add_days(
          range.end,
          (missing * DAYS_PER_WEEK)
            as i64
        )
      }
    }
  }
}

/// Display category of `day`; the first
/// matching rule wins.
#[must_use]
pub fn classify(
  day: NaiveDate,
  selected_date: NaiveDate,
  reference_month: NaiveDate,
  today: NaiveDate
) -> DayCategory {
  if day == selected_date {
    DayCategory::Selected
  } else if day == today {
    DayCategory::Today
  } else if same_month(
    day,
    reference_month
  ) {
    DayCategory::InMonth
  } else {
    DayCategory::OutOfMonth
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell<'a> {
  pub date:           NaiveDate,
  pub category:       DayCategory,
  pub in_month:       bool,
  pub visible_events: Vec<&'a Event>,
  pub overflow_count: usize
}

#[derive(Debug, Clone)]
pub struct CalendarGrid<'a> {
  pub reference_month: NaiveDate,
  pub selected_date:   NaiveDate,
  pub today:           NaiveDate,
  pub week_start:      Weekday,
  pub range:           GridRange,
  pub cells:           Vec<GridCell<'a>>,
  pub selected_events: Vec<&'a Event>
}

impl<'a> CalendarGrid<'a> {
  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[GridCell<'a>]>
  {
    self.cells.chunks(DAYS_PER_WEEK)
  }

  pub fn cell(
    &self,
    day: NaiveDate
  ) -> Option<&GridCell<'a>> {
    if !self.range.contains(day) {
      return None;
    }
    let offset =
      (day - self.range.start).num_days();
    usize::try_from(offset)
      .ok()
      .and_then(|idx| self.cells.get(idx))
  }
}

/// Builds every cell of the month grid
/// for `state`.
///
/// Events are grouped by date once; the
/// selected day's list is taken from the
/// full collection since it may fall
/// outside the rendered range.
#[tracing::instrument(
  skip(state, events, options),
  fields(
    reference_month = %state.reference_month,
    selected = %state.selected_date,
    events = events.len()
  )
)]
pub fn build_grid<'a>(
  state: &CalendarState,
  today: NaiveDate,
  events: &'a [Event],
  options: &GridOptions
) -> CalendarGrid<'a> {
  let range =
    compute_grid_range_with_layout(
      state.reference_month,
      options.week_start,
      options.layout
    );
  let index =
    EventIndex::for_range(events, range);

  let cells: Vec<GridCell<'a>> = range
    .days()
    .map(|day| {
      let bound = index.events_for(
        day,
        options.visible_limit
      );
      GridCell {
        date:           day,
        category:       classify(
          day,
          state.selected_date,
          state.reference_month,
          today
        ),
        in_month:       same_month(
          day,
          state.reference_month
        ),
        visible_events: bound.visible,
        overflow_count: bound.overflow
      }
    })
    .collect();

  let selected_events = if range
    .contains(state.selected_date)
  {
    index
      .on(state.selected_date)
      .to_vec()
  } else {
    events
      .iter()
      .filter(|event| {
        event
          .occurs_on(state.selected_date)
      })
      .collect()
  };

  debug!(
    start = %range.start,
    end = %range.end,
    weeks = range.weeks(),
    cells = cells.len(),
    indexed_days = index.days(),
    selected_events = selected_events.len(),
    month = state.reference_month.month(),
    "built calendar grid"
  );

  CalendarGrid {
    reference_month: state
      .reference_month,
    selected_date: state.selected_date,
    today,
    week_start: options.week_start,
    range,
    cells,
    selected_events
  }
}
