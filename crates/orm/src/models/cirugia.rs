use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::{EstadoCirugia, Prioridad, RolCirugia};

/// A scheduled operating-room procedure
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Cirugia {
    pub id: i32,
    pub paciente_id: i32,
    pub tipo_cirugia_id: i32,
    pub quirofano_id: i32,
    pub cirujano_principal_id: i32,
    pub instrumentador_id: Option<i32>,
    pub fecha_programada: DateTime<Utc>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub estado: EstadoCirugia,
    pub prioridad: Prioridad,
    pub observaciones_previas: Option<String>,
    pub observaciones_finales: Option<String>,
    pub diagnostico_preoperatorio: Option<String>,
    pub diagnostico_postoperatorio: Option<String>,
    pub duracion_real_minutos: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaCirugia {
    pub paciente_id: i32,
    pub tipo_cirugia_id: i32,
    pub quirofano_id: i32,
    pub cirujano_principal_id: i32,
    pub instrumentador_id: Option<i32>,
    pub fecha_programada: DateTime<Utc>,
    pub prioridad: Prioridad,
    pub observaciones_previas: Option<String>,
    pub diagnostico_preoperatorio: Option<String>,
}

/// Auxiliary doctor assigned to a surgery
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CirugiaPersonal {
    pub id: i32,
    pub cirugia_id: i32,
    pub medico_id: i32,
    pub rol_en_cirugia: RolCirugia,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevoPersonal {
    pub medico_id: i32,
    pub rol_en_cirugia: RolCirugia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Listing filter over surgeries; every bound is inclusive
#[derive(Debug, Clone, Default)]
pub struct FiltroCirugias {
    pub desde: Option<DateTime<Utc>>,
    pub hasta: Option<DateTime<Utc>>,
    pub estados: Vec<EstadoCirugia>,
    pub quirofano_id: Option<i32>,
    pub cirujano_id: Option<i32>,
    pub instrumentador_id: Option<i32>,
    pub tipo_cirugia_id: Option<i32>,
    pub prioridad: Option<Prioridad>,
    pub orden: SortOrder,
}

impl FiltroCirugias {
    pub fn matches(&self, cirugia: &Cirugia) -> bool {
        cirugia.deleted_at.is_none()
            && self.desde.map_or(true, |d| cirugia.fecha_programada >= d)
            && self.hasta.map_or(true, |h| cirugia.fecha_programada <= h)
            && (self.estados.is_empty() || self.estados.contains(&cirugia.estado))
            && self.quirofano_id.map_or(true, |q| cirugia.quirofano_id == q)
            && self.cirujano_id.map_or(true, |c| cirugia.cirujano_principal_id == c)
            && self
                .instrumentador_id
                .map_or(true, |i| cirugia.instrumentador_id == Some(i))
            && self.tipo_cirugia_id.map_or(true, |t| cirugia.tipo_cirugia_id == t)
            && self.prioridad.map_or(true, |p| cirugia.prioridad == p)
    }
}

/// How a surgery write is guarded
#[derive(Debug, Clone)]
pub struct SurgerySave {
    /// State the caller read; the write fails with `StaleState` if it moved
    pub expected_estado: EstadoCirugia,
    /// Re-run the room conflict check, excluding the surgery itself
    pub check_room: bool,
    /// Replace the auxiliary staff when present
    pub staff: Option<Vec<NuevoPersonal>>,
}

impl SurgerySave {
    pub fn transition(expected_estado: EstadoCirugia) -> Self {
        Self {
            expected_estado,
            check_room: false,
            staff: None,
        }
    }
}
