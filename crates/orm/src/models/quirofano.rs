use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::{EstadoQuirofano, NivelComplejidad};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategoriaQuirofano {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaCategoriaQuirofano {
    pub nombre: String,
    pub descripcion: Option<String>,
}

/// Operating room
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Quirofano {
    pub id: i32,
    pub nombre: String,
    pub numero: i32,
    pub categoria_id: Option<i32>,
    pub estado: EstadoQuirofano,
    pub capacidad_personas: i32,
    pub equipamiento_especial: Option<String>,
    pub ubicacion: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoQuirofano {
    pub nombre: String,
    pub numero: i32,
    pub categoria_id: Option<i32>,
    pub estado: EstadoQuirofano,
    pub capacidad_personas: i32,
    pub equipamiento_especial: Option<String>,
    pub ubicacion: Option<String>,
    pub activo: bool,
}

/// Surgery standard: expected duration and complexity
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TipoCirugia {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub duracion_estimada_minutos: Option<i32>,
    pub nivel_complejidad: NivelComplejidad,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoTipoCirugia {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub duracion_estimada_minutos: Option<i32>,
    pub nivel_complejidad: NivelComplejidad,
}
