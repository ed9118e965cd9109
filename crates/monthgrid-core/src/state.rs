use chrono::NaiveDate;
use tracing::debug;

use crate::datetime::{first_day_of_month, same_month, shift_months};

/// Which day is selected and which month is on screen.
///
/// Transitions consume the state and return the next one; whoever renders the
/// calendar owns the single live value and rebuilds the grid after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarState {
    pub selected_date: NaiveDate,
    pub reference_month: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A day cell was clicked; the visible month does not move.
    ClickDay(NaiveDate),
    SelectDate(NaiveDate),
    ShiftMonth(i32),
    /// Jump back to the current day, selecting it.
    Today(NaiveDate),
}

impl CalendarState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            selected_date: today,
            reference_month: today,
        }
    }

    /// Selects `date` without moving the visible month, so a click on a
    /// neighbouring month's fill cell keeps the current view.
    #[must_use]
    pub fn click_day(self, date: NaiveDate) -> Self {
        Self {
            selected_date: date,
            reference_month: self.reference_month,
        }
    }

    /// Selects `date` and moves the visible month to contain it.
    #[must_use]
    pub fn select_date(self, date: NaiveDate) -> Self {
        Self {
            selected_date: date,
            reference_month: date,
        }
    }

    /// Moves the visible month by `step`; the selection stays put.
    #[must_use]
    pub fn shift_month(self, step: i32) -> Self {
        Self {
            selected_date: self.selected_date,
            reference_month: shift_months(self.reference_month, step),
        }
    }

    #[must_use]
    pub fn apply(self, action: Action) -> Self {
        let next = match action {
            Action::ClickDay(date) => self.click_day(date),
            Action::SelectDate(date) | Action::Today(date) => self.select_date(date),
            Action::ShiftMonth(step) => self.shift_month(step),
        };
        debug!(
            ?action,
            selected = %next.selected_date,
            month = %first_day_of_month(next.reference_month),
            "calendar state transition"
        );
        next
    }

    pub fn month_start(&self) -> NaiveDate {
        first_day_of_month(self.reference_month)
    }

    pub fn selection_visible(&self) -> bool {
        same_month(self.selected_date, self.reference_month)
    }
}
