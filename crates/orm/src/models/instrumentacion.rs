use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::{EstadoConteo, Severidad, TipoConteo, TipoIncidente};

/// Initial or final instrument count of a surgery
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ConteoInstrumentacion {
    pub id: i32,
    pub cirugia_id: i32,
    pub tipo_conteo: TipoConteo,
    pub fecha_conteo: DateTime<Utc>,
    pub realizado_por_id: i32,
    pub confirmado: bool,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoConteo {
    pub cirugia_id: i32,
    pub tipo_conteo: TipoConteo,
    pub realizado_por_id: i32,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DetalleConteo {
    pub id: i32,
    pub conteo_id: i32,
    pub item_id: i32,
    pub cantidad_esperada: i32,
    pub cantidad_contada: i32,
    pub estado: EstadoConteo,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevoDetalle {
    pub item_id: i32,
    pub cantidad_esperada: i32,
    pub cantidad_contada: i32,
    pub estado: EstadoConteo,
    pub observaciones: Option<String>,
}

impl EstadoConteo {
    /// Compare counted against expected units
    pub fn from_quantities(esperada: i32, contada: i32) -> Self {
        match contada.cmp(&esperada) {
            std::cmp::Ordering::Equal => EstadoConteo::Correcto,
            std::cmp::Ordering::Less => EstadoConteo::Faltante,
            std::cmp::Ordering::Greater => EstadoConteo::Sobrante,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Incidente {
    pub id: i32,
    pub cirugia_id: Option<i32>,
    pub tipo_incidente: TipoIncidente,
    pub severidad: Severidad,
    pub descripcion: String,
    pub reportado_por_id: i32,
    pub fecha_incidente: DateTime<Utc>,
    pub resuelto: bool,
    pub fecha_resolucion: Option<DateTime<Utc>>,
    pub acciones_tomadas: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevoIncidente {
    pub cirugia_id: Option<i32>,
    pub tipo_incidente: TipoIncidente,
    pub severidad: Severidad,
    pub descripcion: String,
    pub reportado_por_id: i32,
    pub acciones_tomadas: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_state_from_quantities() {
        assert_eq!(EstadoConteo::from_quantities(5, 5), EstadoConteo::Correcto);
        assert_eq!(EstadoConteo::from_quantities(5, 3), EstadoConteo::Faltante);
        assert_eq!(EstadoConteo::from_quantities(5, 6), EstadoConteo::Sobrante);
    }
}
