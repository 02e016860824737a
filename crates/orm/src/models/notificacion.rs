use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::{Prioridad, TipoEntidad, TipoNotificacion};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Notificacion {
    pub id: i32,
    pub usuario_id: Option<i32>,
    pub entidad_suministradora_id: Option<i32>,
    pub tipo: TipoNotificacion,
    pub titulo: String,
    pub mensaje: String,
    pub prioridad: Prioridad,
    pub leida: bool,
    pub url_accion: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_lectura: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuevaNotificacion {
    pub usuario_id: Option<i32>,
    pub entidad_suministradora_id: Option<i32>,
    pub tipo: TipoNotificacion,
    pub titulo: String,
    pub mensaje: String,
    pub prioridad: Prioridad,
    pub url_accion: Option<String>,
}

/// Listing filter over notifications, newest first
#[derive(Debug, Clone, Default)]
pub struct FiltroNotificaciones {
    pub tipo: Option<TipoNotificacion>,
    /// Only notifications addressed to an entity of this kind
    pub tipo_entidad: Option<TipoEntidad>,
    /// `Some(true)` keeps urgent ones, `Some(false)` drops them
    pub urgente: Option<bool>,
    pub leida: Option<bool>,
    pub desde: Option<DateTime<Utc>>,
    pub hasta: Option<DateTime<Utc>>,
}

impl FiltroNotificaciones {
    /// Everything except the entity-kind join, which needs the entity row
    pub fn matches(&self, notificacion: &Notificacion) -> bool {
        notificacion.deleted_at.is_none()
            && self.tipo.map_or(true, |t| notificacion.tipo == t)
            && self
                .urgente
                .map_or(true, |u| (notificacion.prioridad == Prioridad::Urgente) == u)
            && self.leida.map_or(true, |l| notificacion.leida == l)
            && self.desde.map_or(true, |d| notificacion.fecha_creacion >= d)
            && self.hasta.map_or(true, |h| notificacion.fecha_creacion <= h)
    }
}
