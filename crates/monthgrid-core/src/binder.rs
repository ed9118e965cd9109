use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::event::Event;
use crate::grid::GridRange;

pub const DEFAULT_VISIBLE_LIMIT: usize = 2;
/// Upper bound for a configured cap; a cell never grows past this many lines.
pub const MAX_VISIBLE_LIMIT: usize = 12;

/// Events bound to one day: the ones shown directly and how many were cut.
#[derive(Debug, Clone, PartialEq)]
pub struct DayEvents<'a> {
    pub visible: Vec<&'a Event>,
    pub overflow: usize,
}

impl<'a> DayEvents<'a> {
    pub fn empty() -> Self {
        Self {
            visible: Vec::new(),
            overflow: 0,
        }
    }

    fn capped(matches: &[&'a Event], limit: usize) -> Self {
        let shown = matches.len().min(limit);
        Self {
            visible: matches[..shown].to_vec(),
            overflow: matches.len().saturating_sub(limit),
        }
    }

    pub fn total(&self) -> usize {
        self.visible.len() + self.overflow
    }
}

/// Stable filter of `all_events` down to `day`, capped at `limit`.
///
/// Walks the whole collection on every call; `EventIndex` gives the same
/// answer after a single pass and is what the grid builder uses.
pub fn events_for<'a>(day: NaiveDate, all_events: &'a [Event], limit: usize) -> DayEvents<'a> {
    let matches: Vec<&Event> = all_events
        .iter()
        .filter(|event| event.occurs_on(day))
        .collect();
    DayEvents::capped(&matches, limit)
}

/// Events grouped by calendar date, preserving source order within a day.
#[derive(Debug, Clone, Default)]
pub struct EventIndex<'a> {
    by_date: BTreeMap<NaiveDate, Vec<&'a Event>>,
}

impl<'a> EventIndex<'a> {
    #[tracing::instrument(skip(events), fields(events = events.len()))]
    pub fn build(events: &'a [Event]) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<&'a Event>> = BTreeMap::new();
        for event in events {
            by_date.entry(event.date).or_default().push(event);
        }
        debug!(days = by_date.len(), "indexed events by date");
        Self { by_date }
    }

    /// Like `build`, but skips events outside the rendered range.
    #[tracing::instrument(skip(events, range), fields(events = events.len()))]
    pub fn for_range(events: &'a [Event], range: GridRange) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<&'a Event>> = BTreeMap::new();
        for event in events.iter().filter(|event| range.contains(event.date)) {
            by_date.entry(event.date).or_default().push(event);
        }
        debug!(
            days = by_date.len(),
            start = %range.start,
            end = %range.end,
            "indexed events in grid range"
        );
        Self { by_date }
    }

    pub fn on(&self, day: NaiveDate) -> &[&'a Event] {
        self.by_date.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn events_for(&self, day: NaiveDate, limit: usize) -> DayEvents<'a> {
        match self.by_date.get(&day) {
            Some(matches) => DayEvents::capped(matches, limit),
            None => DayEvents::empty(),
        }
    }

    pub fn days(&self) -> usize {
        self.by_date.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
    }

    fn event(date: NaiveDate, title: &str) -> Event {
        Event::new(
            date,
            NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
            title,
            "#3b82f6",
        )
    }

    fn titles(events: &DayEvents<'_>) -> Vec<String> {
        events.visible.iter().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn caps_visible_and_counts_overflow() {
        let events = vec![
            event(day(10), "A"),
            event(day(10), "B"),
            event(day(10), "C"),
        ];

        let bound = events_for(day(10), &events, DEFAULT_VISIBLE_LIMIT);
        assert_eq!(titles(&bound), vec!["A", "B"]);
        assert_eq!(bound.overflow, 1);
        assert_eq!(bound.total(), 3);
    }

    #[test]
    fn keeps_source_order_not_time_order() {
        let mut late = event(day(5), "late");
        late.start_time = NaiveTime::from_hms_opt(18, 0, 0).expect("valid time");
        let early = event(day(5), "early");
        let events = vec![late, event(day(6), "other"), early];

        let bound = events_for(day(5), &events, 5);
        assert_eq!(titles(&bound), vec!["late", "early"]);
        assert_eq!(bound.overflow, 0);
    }

    #[test]
    fn no_match_is_empty() {
        let events = vec![event(day(1), "A")];
        assert_eq!(events_for(day(2), &events, 2), DayEvents::empty());
        assert_eq!(events_for(day(2), &[], 2), DayEvents::empty());
    }

    #[test]
    fn visible_and_overflow_follow_totals() {
        for total in 0..6_usize {
            let events: Vec<Event> = (0..total)
                .map(|i| event(day(7), &format!("e{i}")))
                .collect();
            for limit in 0..4_usize {
                let bound = events_for(day(7), &events, limit);
                assert_eq!(bound.visible.len(), total.min(limit));
                assert_eq!(bound.overflow, total.saturating_sub(limit));
            }
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let events = vec![event(day(3), "A"), event(day(3), "B"), event(day(3), "C")];
        let first = events_for(day(3), &events, 2);
        let second = events_for(day(3), &events, 2);
        assert_eq!(first, second);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn index_agrees_with_naive_filter() {
        let events = vec![
            event(day(1), "a"),
            event(day(2), "b"),
            event(day(1), "c"),
            event(day(1), "d"),
            event(day(4), "e"),
        ];
        let index = EventIndex::build(&events);

        for d in 1..=5 {
            assert_eq!(index.events_for(day(d), 2), events_for(day(d), &events, 2));
        }
        assert_eq!(index.on(day(1)).len(), 3);
        assert!(index.on(day(3)).is_empty());
        assert_eq!(index.days(), 3);
    }

    #[test]
    fn range_index_drops_events_outside_grid() {
        let range = GridRange {
            start: day(3),
            end: day(9),
        };
        let events = vec![event(day(2), "before"), event(day(5), "inside"), event(day(10), "after")];
        let index = EventIndex::for_range(&events, range);

        assert_eq!(index.days(), 1);
        assert_eq!(index.on(day(5))[0].title, "inside");
        assert!(index.on(day(2)).is_empty());
    }
}
