//! Request handlers, one module per route group.

pub mod admin;
pub mod auth;
pub mod enfermera_jefe;
pub mod instrumentador;
pub mod suministros;
pub mod surgery_flow;

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use quirofano_http::{HttpError, HttpResult};
use quirofano_orm::ModelError;

pub const CIRUGIA_NO_ENCONTRADA: &str = "Cirugía no encontrada";

/// `Some(row)` or a 404 with `message`
pub fn found<T>(row: Option<T>, message: &str) -> HttpResult<T> {
    row.ok_or_else(|| HttpError::not_found(message))
}

/// `Some(row)` or a 400 with `message`; for references inside a body
pub fn referenced<T>(row: Option<T>, message: &str) -> HttpResult<T> {
    row.ok_or_else(|| HttpError::bad_request(message))
}

/// Replace the generic room-conflict message with an endpoint-specific one
pub fn room_conflict(message: &'static str) -> impl Fn(ModelError) -> HttpError {
    move |error| match error {
        ModelError::RoomUnavailable => HttpError::conflict(message),
        other => other.into(),
    }
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC, or a bare date at midnight
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(raw).map(start_of_day)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `[00:00, next 00:00]` of `date` in UTC
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(date);
    (start, start + Duration::days(1))
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn invalid_param(field: &str) -> HttpError {
    HttpError::bad_request_with("Parámetros inválidos", vec![format!("{} inválido", field)])
}

/// Optional query value parsed as `T`; blank counts as absent
pub fn query_value<T: FromStr>(raw: &Option<String>, field: &str) -> HttpResult<Option<T>> {
    present(raw)
        .map(|value| value.parse::<T>().map_err(|_| invalid_param(field)))
        .transpose()
}

pub fn query_time(raw: &Option<String>, field: &str) -> HttpResult<Option<DateTime<Utc>>> {
    present(raw)
        .map(|value| parse_timestamp(value).ok_or_else(|| invalid_param(field)))
        .transpose()
}

/// `true` / `false`; anything else is ignored
pub fn query_flag(raw: &Option<String>) -> Option<bool> {
    match present(raw)? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn query_text(raw: &Option<String>) -> Option<&str> {
    present(raw)
}

/// Trimmed, non-empty text
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 10, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2026-03-10T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10T06:30:00-04:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10T10:30"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-10").map(|t| t.hour()), Some(0));
        assert_eq!(parse_timestamp("mañana"), None);
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_query_helpers() {
        assert_eq!(query_value::<i32>(&Some("7".into()), "id").unwrap(), Some(7));
        assert_eq!(query_value::<i32>(&Some("  ".into()), "id").unwrap(), None);
        assert!(query_value::<i32>(&Some("x".into()), "id").is_err());
        assert_eq!(query_flag(&Some("true".into())), Some(true));
        assert_eq!(query_flag(&Some("si".into())), None);
        assert!(query_time(&Some("ayer".into()), "fecha_inicio").is_err());
    }

    #[test]
    fn test_room_conflict_message() {
        let map = room_conflict("El quirófano no está disponible en la nueva fecha");
        assert_eq!(
            map(ModelError::RoomUnavailable),
            HttpError::conflict("El quirófano no está disponible en la nueva fecha")
        );
        assert_eq!(
            map(ModelError::NotFound("cirugias".into())).status_code().as_u16(),
            404
        );
    }
}
