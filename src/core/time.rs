use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_optional(value: Option<PrimitiveDateTime>) -> Option<String> {
    value.map(format_primitive)
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Long form used on printed documents, e.g. `02 January 2025`.
pub(crate) fn format_long_date(value: Date) -> String {
    value
        .format(format_description!("[day] [month repr:long] [year]"))
        .unwrap_or_else(|_| value.to_string())
}

/// `at + value` minutes, clamped to the largest representable instant.
pub(crate) fn add_minutes(at: PrimitiveDateTime, value: i32) -> PrimitiveDateTime {
    at.checked_add(Duration::minutes(i64::from(value))).unwrap_or(PrimitiveDateTime::MAX)
}
