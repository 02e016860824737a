//! Database Seeding
//!
//! Seeders run against any [`Store`] and are idempotent: rows that already
//! exist are left untouched.

use async_trait::async_trait;

use crate::backends::Store;
use crate::error::OrmResult;
use crate::models::{NuevoRol, NuevoUsuario, Role};

pub const ADMIN_EMAIL: &str = "admin@hospital.com";
pub const ADMIN_PASSWORD: &str = "1234";

const ROLES: [(&str, &str); 5] = [
    (
        Role::ADMINISTRADOR,
        "Administrador del sistema con acceso completo",
    ),
    (
        Role::ENFERMERA_JEFE,
        "Enfermera jefe con permisos de supervisión",
    ),
    (Role::CENTRAL, "Personal de central de esterilización"),
    (Role::FARMACIA, "Personal de farmacia"),
    (Role::INSTRUMENTADOR, "Instrumentador quirúrgico"),
];

/// Seeder trait for implementing database seeders
#[async_trait]
pub trait Seeder: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn run(&self, store: &dyn Store) -> OrmResult<()>;
}

/// Creates the fixed set of roles
pub struct RoleSeeder;

#[async_trait]
impl Seeder for RoleSeeder {
    fn name(&self) -> &str {
        "roles"
    }

    async fn run(&self, store: &dyn Store) -> OrmResult<()> {
        for (nombre, descripcion) in ROLES {
            if store.find_role_by_name(nombre).await?.is_some() {
                tracing::debug!(rol = nombre, "Role already exists");
                continue;
            }
            store
                .create_role(NuevoRol {
                    nombre: nombre.to_string(),
                    descripcion: Some(descripcion.to_string()),
                })
                .await?;
            tracing::info!(rol = nombre, "Role created");
        }
        Ok(())
    }
}

/// Creates the initial administrator account
pub struct AdminSeeder {
    password_hash: String,
}

impl AdminSeeder {
    /// `password_hash` is the bcrypt hash of [`ADMIN_PASSWORD`]
    pub fn new(password_hash: impl Into<String>) -> Self {
        Self {
            password_hash: password_hash.into(),
        }
    }
}

#[async_trait]
impl Seeder for AdminSeeder {
    fn name(&self) -> &str {
        "admin"
    }

    async fn run(&self, store: &dyn Store) -> OrmResult<()> {
        if store.email_taken(ADMIN_EMAIL, None).await? {
            tracing::debug!("Administrator already exists");
            return Ok(());
        }

        let rol = store
            .find_role_by_name(Role::ADMINISTRADOR)
            .await?
            .ok_or_else(|| crate::error::ModelError::NotFound("roles".to_string()))?;

        store
            .create_user(NuevoUsuario {
                nombre: "Admin".to_string(),
                apellido: "Sistema".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password_hash: self.password_hash.clone(),
                cedula: "ADMIN001".to_string(),
                telefono: Some("1234567890".to_string()),
                rol_id: rol.id,
                activo: true,
            })
            .await?;
        tracing::info!(email = ADMIN_EMAIL, "Administrator created");
        Ok(())
    }
}

/// Seeder manager for running multiple seeders in order
#[derive(Default)]
pub struct SeederManager {
    seeders: Vec<Box<dyn Seeder>>,
}

impl SeederManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles first, then the administrator
    pub fn initial_data(admin_password_hash: impl Into<String>) -> Self {
        Self::new()
            .add(RoleSeeder)
            .add(AdminSeeder::new(admin_password_hash))
    }

    pub fn add<S: Seeder + 'static>(mut self, seeder: S) -> Self {
        self.seeders.push(Box::new(seeder));
        self
    }

    pub async fn run(&self, store: &dyn Store) -> OrmResult<()> {
        for seeder in &self.seeders {
            tracing::info!("Running seeder: {}", seeder.name());
            seeder.run(store).await?;
        }
        tracing::info!("All seeders completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryStore, UserStore};

    #[tokio::test]
    async fn test_initial_data_is_idempotent() {
        let store = MemoryStore::new();
        let manager = SeederManager::initial_data("$2b$04$hash");

        manager.run(&store).await.unwrap();
        manager.run(&store).await.unwrap();

        let roles = store.list_roles().await.unwrap();
        assert_eq!(roles.len(), 5);
        assert!(roles.iter().all(|r| r.descripcion.is_some()));

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        let admin = &users[0];
        assert_eq!(admin.email, ADMIN_EMAIL);
        assert_eq!(admin.cedula, "ADMIN001");
        assert_eq!(admin.telefono.as_deref(), Some("1234567890"));

        let rol = store.find_role(admin.rol_id).await.unwrap().unwrap();
        assert_eq!(rol.nombre, Role::ADMINISTRADOR);
    }
}
