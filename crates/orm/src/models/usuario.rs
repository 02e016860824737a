use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// System role; the seeded names gate the route groups
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    pub const ADMINISTRADOR: &'static str = "administrador";
    pub const ENFERMERA_JEFE: &'static str = "enfermera_jefe";
    pub const CENTRAL: &'static str = "central";
    pub const FARMACIA: &'static str = "farmacia";
    pub const INSTRUMENTADOR: &'static str = "instrumentador";
}

#[derive(Debug, Clone)]
pub struct NuevoRol {
    pub nombre: String,
    pub descripcion: Option<String>,
}

/// Staff account. The password hash never leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Usuario {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub rol_id: i32,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Usuario {
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

#[derive(Debug, Clone)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub password_hash: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub rol_id: i32,
    pub activo: bool,
}

/// Login session keyed by the token id (`jti`)
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Sesion {
    pub id: i32,
    pub usuario_id: i32,
    pub token_sesion: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_expiracion: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub activa: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Sesion {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.activa && self.deleted_at.is_none() && self.fecha_expiracion > now
    }
}

#[derive(Debug, Clone)]
pub struct NuevaSesion {
    pub usuario_id: i32,
    pub token_sesion: String,
    pub fecha_expiracion: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usuario() -> Usuario {
        let now = Utc::now();
        Usuario {
            id: 1,
            nombre: "Ana".to_string(),
            apellido: "Pérez".to_string(),
            email: "ana@hospital.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            cedula: "V123".to_string(),
            telefono: None,
            rol_id: 2,
            activo: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(usuario()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["email"], "ana@hospital.com");
    }

    #[test]
    fn test_session_validity() {
        let now = Utc::now();
        let mut sesion = Sesion {
            id: 1,
            usuario_id: 1,
            token_sesion: "jti".to_string(),
            fecha_inicio: now,
            fecha_expiracion: now + Duration::hours(1),
            ip_address: None,
            user_agent: None,
            activa: true,
            deleted_at: None,
        };
        assert!(sesion.is_valid_at(now));
        assert!(!sesion.is_valid_at(now + Duration::hours(2)));

        sesion.activa = false;
        assert!(!sesion.is_valid_at(now));
    }
}
