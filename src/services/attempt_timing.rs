use time::{Duration, PrimitiveDateTime};

/// Base duration of an attempt: the exam's own duration, or the rounded mean over
/// all exams of a subject-wide attempt. `None` when there are no exams.
pub(crate) fn base_duration_minutes(durations: &[i32]) -> Option<i32> {
    if durations.is_empty() {
        return None;
    }

    let total = durations.iter().map(|value| i64::from(*value)).sum::<i64>();
    let mean = total as f64 / durations.len() as f64;
    Some(mean.round() as i32)
}

pub(crate) fn effective_duration_minutes(base_minutes: i32, extra_time_minutes: i32) -> i32 {
    base_minutes.saturating_add(extra_time_minutes.max(0))
}

pub(crate) fn deadline(created_at: PrimitiveDateTime, duration_minutes: i32) -> PrimitiveDateTime {
    created_at + Duration::minutes(i64::from(duration_minutes))
}

/// Seconds until the deadline, never negative. Computed from `now` on every call.
pub(crate) fn time_left_seconds(
    created_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> i64 {
    (deadline(created_at, duration_minutes) - now).whole_seconds().max(0)
}

pub(crate) fn is_expired(
    created_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> bool {
    time_left_seconds(created_at, duration_minutes, now) <= 0
}
