use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Instant for a stay date at a configured hour (e.g. the 14:00 check-in
/// hour). Hours outside 0..=23 clamp to 23.
pub fn date_at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    date.and_time(time).and_utc()
}

/// Half-open range overlap: `[a_start, a_end)` meets `[b_start, b_end)`
/// iff `a_start < b_end && b_start < a_end`. Back-to-back stays sharing a
/// boundary date do not overlap.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}
