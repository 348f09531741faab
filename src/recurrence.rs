//! Expands a recurring entry into dated occurrences over a window.
//!
//! Every function here is pure: the same entry, start date and horizon always
//! give the same ordered list. Malformed anchors never fail; they either fall
//! back to a start-derived default or yield nothing, depending on frequency.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};

use crate::domain::{EntryRole, Frequency, Occurrence, RecurringEntry};

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Last day of the inclusive window `[start, start + horizon_days]`.
pub fn window_end(start: NaiveDate, horizon_days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Every occurrence of `entry` inside `[start, start + horizon_days]`, in
/// ascending date order, signed for `role`.
pub fn expand(
    entry: &RecurringEntry,
    role: EntryRole,
    start: NaiveDate,
    horizon_days: u32,
) -> Vec<Occurrence> {
    let end = window_end(start, horizon_days);
    let dates = occurrence_dates(entry.frequency, &entry.anchor, start, end);
    let signed_amount = entry.amount.abs() * entry.sign(role);

    dates
        .into_iter()
        .map(|date| Occurrence {
            date,
            signed_amount,
            source_name: entry.name.clone(),
        })
        .collect()
}

/// Dates only, for callers that do not care about amounts.
pub fn occurrence_dates(
    frequency: Frequency,
    anchor: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }
    match frequency {
        Frequency::Weekly => weekly(anchor, start, end),
        Frequency::Biweekly => biweekly(anchor, start, end),
        Frequency::Monthly => monthly(anchor, start, end),
        Frequency::Annually => annually(anchor, start, end),
        Frequency::OneTime => one_time(anchor, start, end),
    }
}

fn weekly(anchor: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let target = parse_weekday(anchor)
        .or_else(|| parse_anchor_date(anchor).map(|d| d.weekday()))
        .unwrap_or_else(|| start.weekday());

    let offset = (7 + target.num_days_from_monday() - start.weekday().num_days_from_monday()) % 7;
    match start.checked_add_days(Days::new(u64::from(offset))) {
        Some(first) => step_from(first, 7, end),
        None => Vec::new(),
    }
}

fn biweekly(anchor: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let Some(anchor) = parse_anchor_date(anchor) else {
        return Vec::new();
    };

    let first = if anchor < start {
        // Round the elapsed days up to the next whole cycle so we stay on-cycle.
        let elapsed = (start - anchor).num_days();
        let cycles = (elapsed + 13) / 14;
        anchor.checked_add_days(Days::new((cycles * 14) as u64))
    } else {
        Some(anchor)
    };
    match first {
        Some(first) => step_from(first, 14, end),
        None => Vec::new(),
    }
}

fn monthly(anchor: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let day_of_month = anchor
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|d| *d > 0)
        .map(|d| d.min(28) as u32)
        .unwrap_or_else(|| start.day().min(28));

    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day_of_month) {
            if candidate >= start && candidate <= end {
                out.push(candidate);
            }
        }
        if year > end.year() || (year == end.year() && month >= end.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

fn annually(anchor: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let Some(anchor) = parse_anchor_date(anchor) else {
        return Vec::new();
    };

    // Feb 29 anchors simply have no date in non-leap years.
    (start.year()..=end.year())
        .filter_map(|year| NaiveDate::from_ymd_opt(year, anchor.month(), anchor.day()))
        .filter(|d| *d >= start && *d <= end)
        .collect()
}

fn one_time(anchor: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    parse_anchor_date(anchor)
        .filter(|d| *d >= start && *d <= end)
        .into_iter()
        .collect()
}

fn step_from(first: NaiveDate, step_days: u64, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut current = Some(first);
    while let Some(date) = current {
        if date > end {
            break;
        }
        out.push(date);
        current = date.checked_add_days(Days::new(step_days));
    }
    out
}

/// Weekday from a name like "Friday" (case-insensitive).
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let lowered = raw.trim().to_ascii_lowercase();
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, wd)| *wd)
}

/// Accepts `YYYY-MM-DD` and ISO date-times; the time part is dropped.
pub fn parse_anchor_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bill(freq: Frequency, anchor: &str) -> RecurringEntry {
        RecurringEntry::new("Rent", 100, freq, anchor, EntryKind::Debit)
    }

    #[test]
    fn weekly_hits_target_weekday_every_seven_days() {
        let entry = bill(Frequency::Weekly, "FRIDAY");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 1), 60);

        assert_eq!(occ[0].date, d(2024, 1, 5));
        assert!(occ.iter().all(|o| o.date.weekday() == Weekday::Fri));
        for pair in occ.windows(2) {
            assert_eq!((pair[1].date - pair[0].date).num_days(), 7);
        }
        assert!(occ.iter().all(|o| o.signed_amount == -100));
    }

    #[test]
    fn weekly_starts_on_start_date_when_weekday_matches() {
        let entry = bill(Frequency::Weekly, "monday");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 1), 7);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 8)]);
    }

    #[test]
    fn weekly_unparseable_anchor_uses_start_weekday() {
        let entry = bill(Frequency::Weekly, "someday");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 3), 14);
        assert_eq!(occ.len(), 3);
        assert!(occ.iter().all(|o| o.date.weekday() == Weekday::Wed));
    }

    #[test]
    fn biweekly_rounds_up_to_next_cycle() {
        let entry = bill(Frequency::Biweekly, "2023-12-01");
        let start = d(2024, 1, 1);
        let occ = expand(&entry, EntryRole::Bill, start, 40);

        // 2023-12-01 + 14 * 3 = 2024-01-12, first cycle date on/after start.
        assert_eq!(occ[0].date, d(2024, 1, 12));
        assert_eq!(occ[1].date, d(2024, 1, 26));
        for o in &occ {
            assert_eq!((o.date - d(2023, 12, 1)).num_days() % 14, 0);
        }
    }

    #[test]
    fn biweekly_anchor_on_cycle_boundary_includes_start() {
        let entry = bill(Frequency::Biweekly, "2023-12-18");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 1), 10);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].date, d(2024, 1, 1));
    }

    #[test]
    fn biweekly_without_date_anchor_is_silent() {
        let entry = bill(Frequency::Biweekly, "friday");
        assert!(expand(&entry, EntryRole::Bill, d(2024, 1, 1), 90).is_empty());
    }

    #[test]
    fn monthly_clamps_day_to_28() {
        let entry = bill(Frequency::Monthly, "31");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 1), 120);
        assert_eq!(occ.len(), 4);
        assert!(occ.iter().all(|o| o.date.day() == 28));
    }

    #[test]
    fn monthly_skips_days_before_start() {
        let entry = bill(Frequency::Monthly, "5");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 10), 30);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 2, 5)]);
    }

    #[test]
    fn monthly_bad_day_defaults_to_start_day() {
        let entry = bill(Frequency::Monthly, "first");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 3, 9), 40);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 3, 9), d(2024, 4, 9)]);
    }

    #[test]
    fn annually_rolls_to_next_year_and_covers_long_windows() {
        let entry = bill(Frequency::Annually, "2020-03-15");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 6, 1), 800);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2025, 3, 15), d(2026, 3, 15)]);
    }

    #[test]
    fn annually_leap_day_only_in_leap_years() {
        let entry = bill(Frequency::Annually, "2020-02-29");
        let occ = expand(&entry, EntryRole::Bill, d(2025, 1, 1), 1825);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2028, 2, 29)]);
    }

    #[test]
    fn one_time_inside_and_outside_window() {
        let inside = bill(Frequency::OneTime, "2024-01-20");
        let outside = bill(Frequency::OneTime, "2024-03-20");
        let garbage = bill(Frequency::OneTime, "soon");
        assert_eq!(expand(&inside, EntryRole::Bill, d(2024, 1, 1), 30).len(), 1);
        assert!(expand(&outside, EntryRole::Bill, d(2024, 1, 1), 30).is_empty());
        assert!(expand(&garbage, EntryRole::Bill, d(2024, 1, 1), 30).is_empty());
    }

    #[test]
    fn credit_bills_and_income_are_positive() {
        let mut card = bill(Frequency::OneTime, "2024-01-02");
        card.kind = EntryKind::Credit;
        let occ = expand(&card, EntryRole::Bill, d(2024, 1, 1), 5);
        assert_eq!(occ[0].signed_amount, 100);

        let pay = RecurringEntry::new("Pay", 50, Frequency::OneTime, "2024-01-02", EntryKind::Debit);
        let occ = expand(&pay, EntryRole::Income, d(2024, 1, 1), 5);
        assert_eq!(occ[0].signed_amount, 50);
    }

    #[test]
    fn anchor_date_accepts_datetimes() {
        assert_eq!(parse_anchor_date("2024-02-03T10:30:00"), Some(d(2024, 2, 3)));
        assert_eq!(parse_anchor_date(" 2024-02-03 "), Some(d(2024, 2, 3)));
        assert_eq!(parse_anchor_date("02/03/2024"), None);
    }

    #[test]
    fn weekly_date_anchor_uses_its_weekday() {
        // 2024-01-05 is a Friday.
        let entry = bill(Frequency::Weekly, "2024-01-05");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 2, 1), 15);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 2, 2), d(2024, 2, 9), d(2024, 2, 16)]);
    }

    #[test]
    fn monthly_non_positive_day_defaults_to_start_day() {
        for anchor in ["0", "-3"] {
            let entry = bill(Frequency::Monthly, anchor);
            let occ = expand(&entry, EntryRole::Bill, d(2024, 5, 12), 45);
            let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
            assert_eq!(dates, vec![d(2024, 5, 12), d(2024, 6, 12)], "anchor {anchor}");
        }
    }

    #[test]
    fn biweekly_future_anchor_starts_on_anchor() {
        let entry = bill(Frequency::Biweekly, "2024-01-10");
        let occ = expand(&entry, EntryRole::Bill, d(2024, 1, 1), 30);
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 10), d(2024, 1, 24)]);
    }

    #[test]
    fn dates_near_calendar_end_do_not_overflow() {
        let start = NaiveDate::MAX - Days::new(1);
        let weekly = bill(Frequency::Weekly, "2024-01-05");
        let biweekly = bill(Frequency::Biweekly, "2024-01-05");
        let occ = expand(&weekly, EntryRole::Bill, start, 1);
        assert!(occ.len() <= 1);
        assert!(expand(&biweekly, EntryRole::Bill, start, 1).len() <= 1);
    }
}
