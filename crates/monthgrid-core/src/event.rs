use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::datetime::clock_time_serde;

/// A single-day event as supplied by the event source.
///
/// Events are read-only input: the grid borrows them and never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub date: NaiveDate,

    #[serde(with = "clock_time_serde")]
    pub start_time: NaiveTime,

    #[serde(with = "clock_time_serde")]
    pub end_time: NaiveTime,

    pub title: String,

    pub color: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        title: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            date,
            start_time,
            end_time,
            title: title.into(),
            color: color.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        self.date == day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_source_record() {
        let json = r##"{
            "date": "2024-03-10",
            "startTime": "09:00",
            "endTime": "10:30",
            "title": "Standup",
            "color": "#3b82f6",
            "location": "Room 4"
        }"##;

        let event: Event = serde_json::from_str(json).expect("parse event");

        assert_eq!(
            event.date,
            NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date")
        );
        assert_eq!(
            event.start_time,
            NaiveTime::from_hms_opt(9, 0, 0).expect("valid time")
        );
        assert_eq!(
            event.end_time,
            NaiveTime::from_hms_opt(10, 30, 0).expect("valid time")
        );
        assert_eq!(event.title, "Standup");
        assert_eq!(
            event.extra.get("location"),
            Some(&serde_json::Value::String("Room 4".to_string()))
        );
    }

    #[test]
    fn serializes_times_in_source_format() {
        let event = Event::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date"),
            NaiveTime::from_hms_opt(14, 5, 0).expect("valid time"),
            NaiveTime::from_hms_opt(15, 0, 0).expect("valid time"),
            "Review",
            "#10b981",
        );

        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["startTime"], "14:05");
        assert_eq!(value["endTime"], "15:00");
        assert_eq!(value["date"], "2024-03-10");
    }

    #[test]
    fn rejects_malformed_time() {
        let json = r##"{
            "date": "2024-03-10",
            "startTime": "9am",
            "endTime": "10:30",
            "title": "Broken",
            "color": "#000000"
        }"##;

        assert!(serde_json::from_str::<Event>(json).is_err());
    }

    #[test]
    fn occurs_on_matches_exact_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date");
        let event = Event::new(
            day,
            NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            NaiveTime::from_hms_opt(9, 30, 0).expect("valid time"),
            "A",
            "#000000",
        );

        assert!(event.occurs_on(day));
        assert!(!event.occurs_on(day.succ_opt().expect("next day")));
    }
}
