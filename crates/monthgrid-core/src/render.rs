use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::color::{Rgb, Rgba, attenuate};
use crate::config::CalendarSettings;
use crate::event::Event;
use crate::format::{
    WeekdayLabel, clock_12h, day_label, month_title, overflow_label, time_range, truncate,
    weekday_labels,
};
use crate::grid::{CalendarGrid, DayCategory, GridCell, GridRange};

const CELL_WIDTH: usize = 16;

// Faded events are composited over a dark terminal background.
const TERMINAL_BACKGROUND: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Render-ready snapshot of a grid: every string a renderer needs, already
/// formatted.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub title: String,
    pub reference_month: NaiveDate,
    pub selected_date: NaiveDate,
    pub today: NaiveDate,
    pub range: GridRange,
    pub weekdays: Vec<WeekdayLabel>,
    pub weeks: Vec<Vec<CellView>>,
    pub selected_events: Vec<EventView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub date: NaiveDate,
    pub label: String,
    pub category: DayCategory,
    pub in_month: bool,
    pub events: Vec<EventView>,
    pub overflow: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub title: String,
    pub starts_at: String,
    pub time_range: String,
    /// CSS color: the source hex, or `rgba(..)` when faded.
    pub color: String,
    #[serde(skip)]
    pub fill: Option<Rgba>,
}

impl CalendarView {
    #[tracing::instrument(skip_all, fields(month = %grid.reference_month))]
    pub fn from_grid(grid: &CalendarGrid<'_>, settings: &CalendarSettings) -> Self {
        let weeks = grid
            .weeks()
            .map(|week| {
                week.iter()
                    .map(|cell| cell_view(cell, settings.outside_alpha))
                    .collect()
            })
            .collect();

        let selected_events = grid
            .selected_events
            .iter()
            .map(|event| event_view(event, None))
            .collect();

        Self {
            title: month_title(grid.reference_month),
            reference_month: grid.reference_month,
            selected_date: grid.selected_date,
            today: grid.today,
            range: grid.range,
            weekdays: weekday_labels(grid.week_start, grid.today, grid.reference_month),
            weeks,
            selected_events,
        }
    }
}

fn cell_view(cell: &GridCell<'_>, outside_alpha: f64) -> CellView {
    let fade = (!cell.in_month).then_some(outside_alpha);
    CellView {
        date: cell.date,
        label: day_label(cell.date),
        category: cell.category,
        in_month: cell.in_month,
        events: cell
            .visible_events
            .iter()
            .map(|event| event_view(event, fade))
            .collect(),
        overflow: cell.overflow_count,
        overflow_label: overflow_label(cell.overflow_count),
    }
}

fn event_view(event: &Event, fade: Option<f64>) -> EventView {
    let alpha = fade.unwrap_or(1.0);
    let (color, fill) = match attenuate(&event.color, alpha) {
        Ok(rgba) if fade.is_some() => (rgba.to_string(), Some(rgba)),
        Ok(rgba) => (event.color.clone(), Some(rgba)),
        Err(err) => {
            warn!(
                title = %event.title,
                color = %event.color,
                error = %err,
                "unusable event color; passing it through"
            );
            (event.color.clone(), None)
        }
    };

    EventView {
        title: event.title.clone(),
        starts_at: clock_12h(event.start_time),
        time_range: time_range(event),
        color,
        fill,
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    visible_limit: usize,
}

impl Renderer {
    pub fn new(settings: &CalendarSettings) -> Self {
        Self {
            color: settings.color && io::stdout().is_terminal(),
            visible_limit: settings.grid.visible_limit,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[tracing::instrument(skip_all)]
    pub fn write_json<W: Write>(&self, mut writer: W, view: &CalendarView) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut writer, view)?;
        writeln!(writer)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_month<W: Write>(&self, mut writer: W, view: &CalendarView) -> anyhow::Result<()> {
        writeln!(writer, "{}", self.paint(&view.title, "1"))?;
        writeln!(writer)?;

        let header: Vec<String> = view
            .weekdays
            .iter()
            .map(|label| {
                if label.highlighted {
                    self.paint(label.label, "1;33")
                } else {
                    label.label.to_string()
                }
            })
            .collect();
        write_row(&mut writer, &header)?;
        let rule: Vec<String> = view.weekdays.iter().map(|_| "-".repeat(CELL_WIDTH)).collect();
        write_row(&mut writer, &rule)?;

        for week in &view.weeks {
            for line in 0..self.lines_per_cell() {
                let row: Vec<String> = week.iter().map(|cell| self.cell_line(cell, line)).collect();
                write_row(&mut writer, &row)?;
            }
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "{}",
            self.paint(&view.selected_date.format("%a %b %d %Y").to_string(), "1")
        )?;
        if view.selected_events.is_empty() {
            writeln!(writer, "  no events")?;
        }
        for event in &view.selected_events {
            let swatch = self.swatch(event, "  ");
            writeln!(writer, "{swatch} {}  {}", event.time_range, event.title)?;
        }

        Ok(())
    }

    // Day number, one line per visible event slot, then the overflow note.
    fn lines_per_cell(&self) -> usize {
        self.visible_limit.saturating_add(2)
    }

    fn cell_line(&self, cell: &CellView, line: usize) -> String {
        if line == 0 {
            return self.paint_day(cell);
        }

        let slot = line - 1;
        if let Some(event) = cell.events.get(slot) {
            let text = truncate(&format!("{} {}", event.starts_at, event.title), CELL_WIDTH);
            return self.swatch(event, &text);
        }

        if slot == cell.events.len()
            && let Some(label) = &cell.overflow_label
        {
            return self.paint(label, "2;4");
        }

        String::new()
    }

    fn paint_day(&self, cell: &CellView) -> String {
        match cell.category {
            DayCategory::Selected => self.paint(&format!("[{}]", cell.label), "1;4;33"),
            DayCategory::Today => self.paint(&cell.label, "1;30;43"),
            DayCategory::InMonth => cell.label.clone(),
            DayCategory::OutOfMonth => self.paint(&cell.label, "2"),
        }
    }

    fn swatch(&self, event: &EventView, text: &str) -> String {
        match event.fill {
            Some(fill) => {
                let rgb = fill.blend_over(TERMINAL_BACKGROUND);
                self.paint(text, &format!("97;48;2;{};{};{}", rgb.r, rgb.g, rgb.b))
            }
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_row<W: Write>(writer: &mut W, cells: &[String]) -> anyhow::Result<()> {
    let mut line = String::new();
    for cell in cells {
        let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        let padding = CELL_WIDTH.saturating_sub(visible_width);
        line.push_str(cell);
        line.push_str(&" ".repeat(padding));
        line.push(' ');
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::config::{CalendarSettings, Config};
    use crate::grid::build_grid;
    use crate::state::CalendarState;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn event(date: NaiveDate, title: &str, color: &str) -> Event {
        Event::new(
            date,
            NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
            title,
            color,
        )
    }

    fn march_view(events: &[Event]) -> CalendarView {
        let settings = CalendarSettings::from_config(&Config::default()).expect("settings");
        let state = CalendarState::new(ymd(2024, 3, 10));
        let grid = build_grid(&state, ymd(2024, 3, 12), events, &settings.grid);
        CalendarView::from_grid(&grid, &settings)
    }

    #[test]
    fn view_fades_only_week_fill_events() {
        let events = vec![
            event(ymd(2024, 2, 25), "fill", "#3b82f6"),
            event(ymd(2024, 3, 10), "inside", "#3b82f6"),
            event(ymd(2024, 3, 11), "odd", "blue"),
        ];
        let view = march_view(&events);

        let first = &view.weeks[0][0];
        assert_eq!(first.date, ymd(2024, 2, 25));
        assert_eq!(first.events[0].color, "rgba(59, 130, 246, 0.4)");

        let tenth = &view.weeks[2][0];
        assert_eq!(tenth.category, DayCategory::Selected);
        assert_eq!(tenth.events[0].color, "#3b82f6");

        let eleventh = &view.weeks[2][1];
        assert_eq!(eleventh.events[0].color, "blue");
        assert!(eleventh.events[0].fill.is_none());

        assert_eq!(view.title, "Mar 2024");
        assert_eq!(view.selected_events.len(), 1);
        assert!(view.weekdays.iter().any(|label| label.highlighted));
    }

    #[test]
    fn plain_month_lists_overflow_and_selection() {
        let events = vec![
            event(ymd(2024, 3, 10), "Alpha", "#3b82f6"),
            event(ymd(2024, 3, 10), "Beta", "#10b981"),
            event(ymd(2024, 3, 10), "Gamma", "#f59e0b"),
        ];
        let view = march_view(&events);
        let settings = CalendarSettings::from_config(&Config::default()).expect("settings");
        let renderer = Renderer::new(&settings).with_color(false);

        let mut out = Vec::new();
        renderer.write_month(&mut out, &view).expect("write month");
        let text = String::from_utf8(out).expect("utf8 output");

        assert!(text.starts_with("Mar 2024\n"));
        assert!(text.contains("Sun"));
        assert!(text.contains("[10]"));
        assert!(text.contains("09:00 AM Alpha"));
        assert!(text.contains("09:00 AM Beta"));
        assert!(!text.contains("09:00 AM Gamma"));
        assert!(text.contains("and 1 more"));
        assert!(text.contains("Sun Mar 10 2024"));
        assert!(text.contains("09:00 AM - 10:00 AM  Gamma"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn json_carries_categories_and_skips_fill() {
        let events = vec![event(ymd(2024, 3, 10), "Alpha", "#3b82f6")];
        let view = march_view(&events);
        let settings = CalendarSettings::from_config(&Config::default()).expect("settings");
        let renderer = Renderer::new(&settings);

        let mut out = Vec::new();
        renderer.write_json(&mut out, &view).expect("write json");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");

        assert_eq!(value["title"], "Mar 2024");
        assert_eq!(value["range"]["start"], "2024-02-25");
        assert_eq!(value["weeks"][2][0]["category"], "selected");
        assert_eq!(value["weeks"][0][0]["category"], "out_of_month");
        assert_eq!(value["weeks"][2][0]["events"][0]["time_range"], "09:00 AM - 10:00 AM");
        assert!(value["weeks"][2][0]["events"][0].get("fill").is_none());
    }

    #[test]
    fn wide_titles_keep_columns_aligned() {
        let events = vec![
            event(ymd(2024, 3, 12), "四半期の計画会議について", "#3b82f6"),
            event(ymd(2024, 3, 13), "Retro", "#10b981"),
        ];
        let view = march_view(&events);
        let settings = CalendarSettings::from_config(&Config::default()).expect("settings");
        let renderer = Renderer::new(&settings).with_color(false);

        let mut out = Vec::new();
        renderer.write_month(&mut out, &view).expect("write month");
        let text = String::from_utf8(out).expect("utf8 output");

        let row = text
            .lines()
            .find(|line| line.contains("四半期"))
            .expect("event line");
        let wide_at = row.find("09:00").expect("wide event");
        let next_at = row.rfind("09:00 AM Retro").expect("next event");
        assert_eq!(row[..wide_at].width(), 2 * (CELL_WIDTH + 1));
        assert_eq!(row[..next_at].width(), 3 * (CELL_WIDTH + 1));
        assert!(!row.contains("について"));
    }

    #[test]
    fn huge_limit_does_not_overflow_line_count() {
        let renderer = Renderer {
            color: false,
            visible_limit: usize::MAX,
        };
        assert_eq!(renderer.lines_per_cell(), usize::MAX);
    }

    #[test]
    fn strip_ansi_keeps_visible_text() {
        let renderer = Renderer {
            color: true,
            visible_limit: 2,
        };
        let painted = renderer.paint("10", "1;30;43");
        assert_ne!(painted, "10");
        assert_eq!(strip_ansi(&painted), "10");
    }
}
