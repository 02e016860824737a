use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::TipoSangre;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Especialidad {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaEspecialidad {
    pub nombre: String,
    pub descripcion: Option<String>,
}

/// Doctor profile attached to a user account
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Medico {
    pub id: i32,
    pub usuario_id: i32,
    pub numero_licencia: String,
    pub especialidad_id: Option<i32>,
    pub anos_experiencia: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoMedico {
    pub usuario_id: i32,
    pub numero_licencia: String,
    pub especialidad_id: Option<i32>,
    pub anos_experiencia: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Paciente {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub fecha_nacimiento: NaiveDate,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub tipo_sangre: Option<TipoSangre>,
    pub alergias: Option<String>,
    pub condiciones_medicas: Option<String>,
    pub contacto_emergencia_nombre: Option<String>,
    pub contacto_emergencia_telefono: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoPaciente {
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub fecha_nacimiento: NaiveDate,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub tipo_sangre: Option<TipoSangre>,
    pub alergias: Option<String>,
    pub condiciones_medicas: Option<String>,
    pub contacto_emergencia_nombre: Option<String>,
    pub contacto_emergencia_telefono: Option<String>,
}
