//! Candidate-slot computation for natively scheduled mentors.
//!
//! The engine is a pure function of stored state: weekly availability rules,
//! unavailability blocks, and sessions already on the calendar. Candidate
//! instants are anchored to free-interval starts, so the grid never depends
//! on the query time; `now` only filters. A slot offered at read time is
//! therefore the same instant the booking coordinator re-derives at write
//! time.

use std::cmp::{max, min};
use std::collections::BTreeSet;

use chrono::{Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use super::{RecurringPattern, SchedulingError, SchedulingResult};

/// Mentor-level knobs, a projection of the `human_mentors` row.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingPolicy {
    pub buffer_minutes: i64,
    pub advance_booking_days: i64,
}

/// One recurring weekly availability rule. `day_of_week` uses 0 = Sunday,
/// matching the stored encoding.
#[derive(Debug, Clone)]
pub struct WeeklyRule {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: Tz,
    pub is_active: bool,
}

/// An explicit unavailability block in UTC, optionally recurring.
#[derive(Debug, Clone)]
pub struct BlockedPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub recurrence: Option<RecurringPattern>,
}

/// An already-scheduled session occupying the mentor's calendar.
#[derive(Debug, Clone, Copy)]
pub struct BusySession {
    pub start: NaiveDateTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Default)]
pub struct AvailabilityInputs {
    pub rules: Vec<WeeklyRule>,
    pub blocked: Vec<BlockedPeriod>,
    pub busy: Vec<BusySession>,
}

/// Enumerates bookable start instants (UTC) for `duration_minutes`-long
/// sessions within `[range_start, range_end]`, ascending and deduplicated.
///
/// A candidate must leave room for `duration + buffer` before its rule window
/// ends, must not touch any busy interval (each extended by the buffer at its
/// end), and must lie in `[now, now + advance_booking_days]`.
pub fn candidate_slots(
    policy: &SchedulingPolicy,
    inputs: &AvailabilityInputs,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> SchedulingResult<Vec<NaiveDateTime>> {
    if duration_minutes <= 0 {
        return Err(SchedulingError::Validation(
            "duration must be a positive number of minutes".into(),
        ));
    }
    if range_end < range_start {
        return Err(SchedulingError::Validation(
            "range end must not precede range start".into(),
        ));
    }

    let buffer = Duration::minutes(policy.buffer_minutes.max(0));
    let need = Duration::minutes(duration_minutes) + buffer;
    let lower = max(range_start, now);
    let upper = min(range_end, now + Duration::days(policy.advance_booking_days));
    if upper < lower {
        return Ok(Vec::new());
    }

    // Busy intervals, each extended by the trailing buffer, merged.
    let expand_from = lower - Duration::days(2);
    let expand_to = upper + Duration::days(2);
    let mut busy: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    for block in &inputs.blocked {
        for (start, end) in block_occurrences(block, expand_from, expand_to) {
            busy.push((start, end + buffer));
        }
    }
    for session in &inputs.busy {
        let end = session.start + Duration::minutes(session.duration_minutes);
        busy.push((session.start, end + buffer));
    }
    let busy = merge_intervals(busy);

    let mut candidates = BTreeSet::new();
    for rule in &inputs.rules {
        if !rule.is_active || rule.start_time >= rule.end_time {
            continue;
        }

        // Walk one day past the window on both sides so zone offsets cannot
        // drop a rule occurrence.
        let first_day = rule
            .timezone
            .from_utc_datetime(&(lower - Duration::days(1)))
            .date_naive();
        let last_day = rule
            .timezone
            .from_utc_datetime(&(upper + Duration::days(1)))
            .date_naive();

        let mut day = first_day;
        while day <= last_day {
            if day.weekday().num_days_from_sunday() as i32 == rule.day_of_week {
                if let Some(window) = rule_window_utc(rule, day) {
                    for (free_start, free_end) in subtract_busy(window, &busy) {
                        let mut cursor = free_start;
                        while cursor + need <= free_end {
                            if cursor >= lower && cursor <= upper {
                                candidates.insert(cursor);
                            }
                            cursor += need;
                        }
                    }
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
    }

    Ok(candidates.into_iter().collect())
}

/// Converts a rule's local window on `day` to a UTC interval. Days the local
/// start does not exist on (DST spring-forward) yield no window.
fn rule_window_utc(rule: &WeeklyRule, day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = local_to_utc(rule.timezone, day, rule.start_time)?;
    let end = local_to_utc(rule.timezone, day, rule.end_time)?;
    (start < end).then_some((start, end))
}

fn local_to_utc(tz: Tz, day: NaiveDate, time: NaiveTime) -> Option<NaiveDateTime> {
    match tz.from_local_datetime(&day.and_time(time)) {
        LocalResult::Single(dt) => Some(dt.naive_utc()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.naive_utc()),
        LocalResult::None => None,
    }
}

/// Expands a block into the occurrences intersecting `[from, to]`.
fn block_occurrences(
    block: &BlockedPeriod,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    if block.end <= block.start {
        return Vec::new();
    }
    let length = block.end - block.start;

    let step = match block.recurrence {
        None => {
            if block.end > from && block.start <= to {
                return vec![(block.start, block.end)];
            }
            return Vec::new();
        }
        Some(RecurringPattern::Daily) => Some(Duration::days(1)),
        Some(RecurringPattern::Weekly) => Some(Duration::weeks(1)),
        Some(RecurringPattern::Monthly) => None,
    };

    let mut occurrences = Vec::new();
    match step {
        Some(step) => {
            let mut occ = block.start;
            let step_secs = step.num_seconds();
            let gap = (from - block.start).num_seconds();
            if gap > step_secs {
                let skip = (gap / step_secs - 1).max(0);
                occ += Duration::seconds(skip * step_secs);
            }
            while occ <= to {
                let occ_end = occ + length;
                if occ_end > from {
                    occurrences.push((occ, occ_end));
                }
                occ += step;
            }
        }
        None => {
            let mut months = 0u32;
            while let Some(occ) = block.start.checked_add_months(Months::new(months)) {
                if occ > to {
                    break;
                }
                let occ_end = occ + length;
                if occ_end > from {
                    occurrences.push((occ, occ_end));
                }
                months += 1;
            }
        }
    }
    occurrences
}

fn merge_intervals(
    mut intervals: Vec<(NaiveDateTime, NaiveDateTime)>,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    intervals.sort();
    let mut merged: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = max(last.1, end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn subtract_busy(
    window: (NaiveDateTime, NaiveDateTime),
    busy: &[(NaiveDateTime, NaiveDateTime)],
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut free = Vec::new();
    let mut cursor = window.0;
    for &(busy_start, busy_end) in busy {
        if busy_end <= cursor {
            continue;
        }
        if busy_start >= window.1 {
            break;
        }
        if busy_start > cursor {
            free.push((cursor, min(busy_start, window.1)));
        }
        cursor = max(cursor, busy_end);
        if cursor >= window.1 {
            break;
        }
    }
    if cursor < window.1 {
        free.push((cursor, window.1));
    }
    free
}
