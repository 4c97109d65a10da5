//! Week-sized query windows (ISO weeks, Monday first).
//!
//! Browsing tools page through the log one week at a time; these helpers
//! compute the windows and the list of weeks worth offering.

use crate::LogStore;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use egress_core::{EgressResult, StoredEntry};

/// One selectable week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekLookup {
    pub start: NaiveDate,
    /// `dd.mm.yyyy – dd.mm.yyyy` (Monday to Sunday).
    pub label: String,
}

/// Monday of the week containing `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date - Days::new(offset)
}

/// Half-open UTC range `[start 00:00, start + 7 days 00:00)`.
pub fn week_window(start: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = start + Days::new(7);
    (
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        end.and_time(chrono::NaiveTime::MIN).and_utc(),
    )
}

/// Continuous weeks from the week of `today` back to the week of
/// `earliest`, newest first. Empty when there is no data.
pub fn week_lookups(today: NaiveDate, earliest: Option<NaiveDate>) -> Vec<WeekLookup> {
    let Some(earliest) = earliest else {
        return Vec::new();
    };
    let last = week_start_for(earliest);
    let mut week = week_start_for(today);
    let mut items = Vec::new();
    while week >= last {
        let sunday = week + Days::new(6);
        items.push(WeekLookup {
            start: week,
            label: format!("{} – {}", week.format("%d.%m.%Y"), sunday.format("%d.%m.%Y")),
        });
        week = week - Days::new(7);
    }
    items
}

/// Entries whose `request_time` falls in the week starting on `start`.
pub fn entries_for_week<S: LogStore + ?Sized>(
    store: &S,
    start: NaiveDate,
) -> EgressResult<Vec<StoredEntry>> {
    let (from, to) = week_window(week_start_for(start));
    store.range(from, to)
}

/// Week lookups for everything currently in `store`.
pub fn store_week_lookups<S: LogStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> EgressResult<Vec<WeekLookup>> {
    let earliest = store.earliest_request_time()?.map(|t| t.date_naive());
    Ok(week_lookups(today, earliest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLogStore;
    use chrono::{TimeZone, Weekday};
    use egress_core::LogEntry;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        // 2025-01-15 is a Wednesday
        assert_eq!(week_start_for(date(2025, 1, 15)), date(2025, 1, 13));
        assert_eq!(week_start_for(date(2025, 1, 13)), date(2025, 1, 13));
        assert_eq!(week_start_for(date(2025, 1, 19)), date(2025, 1, 13));
        assert_eq!(week_start_for(date(2025, 1, 15)).weekday(), Weekday::Mon);
    }

    #[test]
    fn week_start_crosses_year_boundary() {
        // 2025-01-01 is a Wednesday; its week starts in 2024
        assert_eq!(week_start_for(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[test]
    fn week_window_spans_seven_days() {
        let (from, to) = week_window(date(2025, 1, 13));
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap());
    }

    #[test]
    fn lookups_are_continuous_and_newest_first() {
        let items = week_lookups(date(2025, 1, 29), Some(date(2025, 1, 8)));
        let starts: Vec<NaiveDate> = items.iter().map(|w| w.start).collect();
        assert_eq!(
            starts,
            vec![date(2025, 1, 27), date(2025, 1, 20), date(2025, 1, 13), date(2025, 1, 6)]
        );
        assert_eq!(items[0].label, "27.01.2025 – 02.02.2025");
    }

    #[test]
    fn lookups_empty_without_data() {
        assert!(week_lookups(date(2025, 1, 29), None).is_empty());
    }

    #[test]
    fn lookups_single_week_when_data_is_current() {
        let items = week_lookups(date(2025, 1, 15), Some(date(2025, 1, 14)));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, date(2025, 1, 13));
    }

    fn entry_on(d: NaiveDate, hour: u32) -> LogEntry {
        let t = d.and_hms_opt(hour, 0, 0).unwrap().and_utc();
        LogEntry {
            request_url: format!("http://example.com/{d}"),
            request_method: "GET".into(),
            request_headers: "{}".into(),
            request_payload: "{}".into(),
            request_query_params: "{}".into(),
            response: None,
            request_time: t,
            response_time: t,
            message: "refused".into(),
        }
    }

    #[test]
    fn entries_for_week_filters_by_window() {
        let store = MemoryLogStore::new();
        store.append(&entry_on(date(2025, 1, 12), 23)).unwrap(); // Sunday before
        store.append(&entry_on(date(2025, 1, 13), 0)).unwrap(); // Monday 00:00
        store.append(&entry_on(date(2025, 1, 19), 23)).unwrap(); // Sunday
        store.append(&entry_on(date(2025, 1, 20), 0)).unwrap(); // next Monday

        let hits = entries_for_week(&store, date(2025, 1, 16)).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.request_time.date_naive(), date(2025, 1, 13));
        assert_eq!(hits[1].entry.request_time.date_naive(), date(2025, 1, 19));
    }

    #[test]
    fn store_week_lookups_reach_back_to_earliest_entry() {
        let store = MemoryLogStore::new();
        store.append(&entry_on(date(2025, 1, 2), 12)).unwrap();
        let items = store_week_lookups(&store, date(2025, 1, 15)).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.last().unwrap().start, date(2024, 12, 30));
    }
}
