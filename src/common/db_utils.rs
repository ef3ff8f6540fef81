// src/common/db_utils.rs

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

// ---
// Soft delete
// ---
/// Tombstone predicate for the table aliased `alias`. Every read of a
/// soft-deletable table builds its WHERE clause through this helper.
pub fn live(alias: &str) -> String {
    format!("{alias}.deleted_at IS NULL")
}

// ---
// Clock
// ---
/// Wall-clock instant used for `created_at`/`updated_at` and movement times.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Splits an instant into the separate date and second-precision time
/// columns of `inventory_movement_times`.
pub fn clock_parts(at: NaiveDateTime) -> (NaiveDate, NaiveTime) {
    let time = at.time().with_nanosecond(0).unwrap_or_else(|| at.time());
    (at.date(), time)
}
