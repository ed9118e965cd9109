//! Display strings for the renderers. Nothing here decides what is shown.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::datetime::{add_days, same_month, start_of_week};
use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayLabel {
    pub label: &'static str,
    pub highlighted: bool,
}

pub fn clock_12h(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

pub fn time_range(event: &Event) -> String {
    format!("{} - {}", clock_12h(event.start_time), clock_12h(event.end_time))
}

pub fn month_title(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

pub fn day_label(date: NaiveDate) -> String {
    date.day().to_string()
}

pub fn overflow_label(overflow: usize) -> Option<String> {
    (overflow > 0).then(|| format!("and {overflow} more"))
}

pub fn weekday_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Header labels starting at `week_start`.
///
/// Today's weekday is highlighted only while today falls in the displayed
/// month.
pub fn weekday_labels(
    week_start: Weekday,
    today: NaiveDate,
    reference_month: NaiveDate,
) -> Vec<WeekdayLabel> {
    let today_visible = same_month(today, reference_month);
    let first = start_of_week(today, week_start);
    (0..7)
        .map(|offset| {
            let day = add_days(first, offset);
            WeekdayLabel {
                label: weekday_abbrev(day.weekday()),
                highlighted: today_visible && day == today,
            }
        })
        .collect()
}

/// Cuts `text` to at most `max` terminal columns, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let budget = max - 1;
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn formats_times_in_twelve_hour_clock() {
        let event = Event::new(
            ymd(2024, 3, 10),
            NaiveTime::from_hms_opt(9, 5, 0).expect("valid time"),
            NaiveTime::from_hms_opt(13, 30, 0).expect("valid time"),
            "Lunch",
            "#ffffff",
        );
        assert_eq!(time_range(&event), "09:05 AM - 01:30 PM");
        assert_eq!(
            clock_12h(NaiveTime::from_hms_opt(0, 0, 0).expect("valid time")),
            "12:00 AM"
        );
    }

    #[test]
    fn formats_titles_and_labels() {
        assert_eq!(month_title(ymd(2024, 3, 17)), "Mar 2024");
        assert_eq!(day_label(ymd(2024, 3, 7)), "7");
        assert_eq!(overflow_label(0), None);
        assert_eq!(overflow_label(3).as_deref(), Some("and 3 more"));
    }

    #[test]
    fn highlights_today_only_in_its_month() {
        // 2024-03-13 is a Wednesday.
        let today = ymd(2024, 3, 13);
        let labels = weekday_labels(Weekday::Sun, today, ymd(2024, 3, 1));
        let names: Vec<&str> = labels.iter().map(|l| l.label).collect();
        assert_eq!(names, vec!["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]);
        assert_eq!(
            labels.iter().filter(|l| l.highlighted).map(|l| l.label).collect::<Vec<_>>(),
            vec!["Wed"]
        );

        let other_month = weekday_labels(Weekday::Mon, today, ymd(2024, 4, 1));
        assert_eq!(other_month[0].label, "Mon");
        assert!(other_month.iter().all(|l| !l.highlighted));
    }

    #[test]
    fn truncates_by_display_width() {
        assert_eq!(truncate("Standup", 10), "Standup");
        assert_eq!(truncate("Quarterly planning", 8), "Quarter…");
        assert_eq!(truncate("Café au lait", 5), "Café…");
        assert_eq!(truncate("abc", 0), "");

        let wide = truncate("09:00 AM 四半期の計画会議について", 16);
        assert_eq!(wide, "09:00 AM 四半期…");
        assert!(wide.width() <= 16);
        assert_eq!(truncate("会議会議", 8), "会議会議");
        assert_eq!(truncate("会議会議", 6), "会議…");
    }
}
