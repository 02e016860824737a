//! Operating-room booking window.
//!
//! A surgery at time `T` holds its room over the closed interval
//! `[T - 2h, T + 2h]`. Any other surgery in the same room whose scheduled time
//! falls inside that interval, and which still blocks the room, is a conflict.

use chrono::{DateTime, Duration, Utc};

use crate::models::Cirugia;

/// Half-width of the booking window
pub const CONFLICT_WINDOW_HOURS: i64 = 2;

pub fn conflict_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let half = Duration::hours(CONFLICT_WINDOW_HOURS);
    (at - half, at + half)
}

/// Whether `existing` prevents booking `quirofano_id` at `at`.
///
/// `exclude` skips the surgery being edited.
pub fn blocks_booking(
    existing: &Cirugia,
    quirofano_id: i32,
    at: DateTime<Utc>,
    exclude: Option<i32>,
) -> bool {
    let (start, end) = conflict_window(at);
    existing.deleted_at.is_none()
        && existing.quirofano_id == quirofano_id
        && exclude != Some(existing.id)
        && existing.estado.blocks_room()
        && existing.fecha_programada >= start
        && existing.fecha_programada <= end
}

/// First surgery among `existing` that blocks the booking
pub fn find_conflict<'a, I>(
    existing: I,
    quirofano_id: i32,
    at: DateTime<Utc>,
    exclude: Option<i32>,
) -> Option<&'a Cirugia>
where
    I: IntoIterator<Item = &'a Cirugia>,
{
    existing
        .into_iter()
        .find(|c| blocks_booking(c, quirofano_id, at, exclude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EstadoCirugia, Prioridad};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
    }

    fn booked(id: i32, quirofano_id: i32, fecha: DateTime<Utc>, estado: EstadoCirugia) -> Cirugia {
        Cirugia {
            id,
            paciente_id: 1,
            tipo_cirugia_id: 1,
            quirofano_id,
            cirujano_principal_id: 1,
            instrumentador_id: None,
            fecha_programada: fecha,
            fecha_inicio: None,
            fecha_fin: None,
            estado,
            prioridad: Prioridad::Media,
            observaciones_previas: None,
            observaciones_finales: None,
            diagnostico_preoperatorio: None,
            diagnostico_postoperatorio: None,
            duracion_real_minutos: None,
            created_at: fecha,
            updated_at: fecha,
            deleted_at: None,
        }
    }

    #[test]
    fn test_window_is_closed_on_both_ends() {
        let existing = booked(1, 1, at(10, 0), EstadoCirugia::Programada);

        assert!(blocks_booking(&existing, 1, at(12, 0), None));
        assert!(blocks_booking(&existing, 1, at(8, 0), None));
        assert!(blocks_booking(&existing, 1, at(11, 30), None));
    }

    #[test]
    fn test_outside_window_is_accepted() {
        let existing = booked(1, 1, at(10, 0), EstadoCirugia::Programada);

        assert!(!blocks_booking(&existing, 1, at(12, 1), None));
        assert!(!blocks_booking(&existing, 1, at(7, 59), None));
    }

    #[test]
    fn test_other_rooms_never_conflict() {
        let existing = booked(1, 1, at(10, 0), EstadoCirugia::Programada);
        assert!(!blocks_booking(&existing, 2, at(10, 0), None));
    }

    #[test]
    fn test_released_states_do_not_block() {
        let cancelled = booked(1, 1, at(10, 0), EstadoCirugia::Cancelada);
        let finished = booked(2, 1, at(10, 0), EstadoCirugia::Finalizada);
        let postponed = booked(3, 1, at(10, 0), EstadoCirugia::Pospuesta);

        assert!(!blocks_booking(&cancelled, 1, at(10, 0), None));
        assert!(!blocks_booking(&finished, 1, at(10, 0), None));
        assert!(blocks_booking(&postponed, 1, at(10, 0), None));
    }

    #[test]
    fn test_edit_excludes_itself() {
        let existing = booked(5, 1, at(10, 0), EstadoCirugia::Programada);
        assert!(!blocks_booking(&existing, 1, at(10, 30), Some(5)));
        assert!(blocks_booking(&existing, 1, at(10, 30), Some(6)));
    }

    #[test]
    fn test_find_conflict_returns_first_blocker() {
        let rows = vec![
            booked(1, 1, at(6, 0), EstadoCirugia::Programada),
            booked(2, 1, at(9, 0), EstadoCirugia::Cancelada),
            booked(3, 1, at(9, 30), EstadoCirugia::EnPreparacion),
        ];

        let conflict = find_conflict(&rows, 1, at(10, 0), None).map(|c| c.id);
        assert_eq!(conflict, Some(3));
        assert!(find_conflict(&rows, 1, at(16, 0), None).is_none());
    }
}
