//! Shared fixtures: the real router over a seeded in-memory store.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use quirofano_api::{build_router, AppState};
use quirofano_auth::{BcryptHasher, JwtConfig, JwtProvider, PasswordHasher};
use quirofano_orm::seeding::{ADMIN_EMAIL, ADMIN_PASSWORD};
use quirofano_orm::{MemoryStore, SeederManager};
use quirofano_testing::prelude::*;

pub const FECHA_CIRUGIA: &str = "2030-05-10T09:00:00Z";

pub struct Harness {
    router: Router,
    pub admin: TestClient,
    pub admin_id: i64,
}

/// Ids of the rows a surgery needs
pub struct Fixture {
    pub paciente_id: i64,
    pub quirofano_id: i64,
    pub tipo_cirugia_id: i64,
    pub medico_id: i64,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = BcryptHasher::development();
        let hash = hasher.hash_password(ADMIN_PASSWORD).unwrap();
        SeederManager::initial_data(hash)
            .run(store.as_ref())
            .await
            .unwrap();

        let jwt = JwtProvider::new(&JwtConfig::new("integration-test-secret", 24)).unwrap();
        let state = AppState::new(store, jwt, Arc::new(hasher));
        let router = build_router(state, Duration::from_secs(30));

        let anonymous = TestClient::new(router.clone());
        let response = login(&anonymous, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let token = response.data()["token"].as_str().unwrap().to_string();
        let admin_id = response.data()["user"]["id"].as_i64().unwrap();

        Self {
            admin: TestClient::new(router.clone()).authenticated_with_token(token),
            router,
            admin_id,
        }
    }

    pub fn anonymous(&self) -> TestClient {
        TestClient::new(self.router.clone())
    }

    pub fn client(&self, token: &str) -> TestClient {
        TestClient::new(self.router.clone()).authenticated_with_token(token)
    }

    pub async fn role_id(&self, nombre: &str) -> i64 {
        let roles = self.admin.get("/api/v1/admin/roles").send().await.unwrap().data();
        roles
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["nombre"] == nombre)
            .and_then(|r| r["id"].as_i64())
            .unwrap()
    }

    /// Create a user with `rol` and return its id and a logged-in client
    pub async fn user_with_role(&self, rol: &str) -> (i64, TestClient) {
        let email = utils::random_email();
        let password = "secreto123";
        let created = self
            .admin
            .post("/api/v1/admin/users")
            .json(&json!({
                "nombre": "Ana",
                "apellido": "Pérez",
                "email": email,
                "password": password,
                "cedula": utils::random_cedula(),
                "rol_id": self.role_id(rol).await,
            }))
            .send()
            .await
            .unwrap()
            .assert_status(201);
        let id = created.data()["id"].as_i64().unwrap();

        let token = login(&self.anonymous(), &email, password).await.data()["token"]
            .as_str()
            .unwrap()
            .to_string();
        (id, self.client(&token))
    }

    /// Patient, room, surgery type and a doctor backed by the admin account
    pub async fn fixture(&self) -> Fixture {
        let paciente = self
            .admin
            .post("/api/v1/admin/patients")
            .json(&json!({
                "nombre": "Luis",
                "apellido": "Gómez",
                "cedula": utils::random_cedula(),
                "fecha_nacimiento": "1980-02-14",
                "tipo_sangre": "O+",
            }))
            .send()
            .await
            .unwrap()
            .assert_status(201);
        let quirofano = self
            .admin
            .post("/api/v1/admin/quirofanos")
            .json(&json!({ "nombre": "Quirófano 1", "numero": 1 }))
            .send()
            .await
            .unwrap()
            .assert_status(201);
        let tipo = self
            .admin
            .post("/api/v1/admin/tipos-cirugia")
            .json(&json!({
                "nombre": "Apendicectomía",
                "duracion_estimada_minutos": 90,
                "nivel_complejidad": "media",
            }))
            .send()
            .await
            .unwrap()
            .assert_status(201);
        let medico = self
            .admin
            .post("/api/v1/admin/medicos")
            .json(&json!({ "usuario_id": self.admin_id, "numero_licencia": "LIC-0001" }))
            .send()
            .await
            .unwrap()
            .assert_status(201);

        Fixture {
            paciente_id: paciente.data()["id"].as_i64().unwrap(),
            quirofano_id: quirofano.data()["id"].as_i64().unwrap(),
            tipo_cirugia_id: tipo.data()["id"].as_i64().unwrap(),
            medico_id: medico.data()["id"].as_i64().unwrap(),
        }
    }

    /// Schedule a surgery as the admin and return its id
    pub async fn schedule(&self, fixture: &Fixture, fecha: &str, instrumentador_id: Option<i64>) -> i64 {
        self.admin
            .post("/api/v1/enfermera_jefe/cirugias")
            .json(&json!({
                "paciente_id": fixture.paciente_id,
                "tipo_cirugia_id": fixture.tipo_cirugia_id,
                "quirofano_id": fixture.quirofano_id,
                "cirujano_principal_id": fixture.medico_id,
                "instrumentador_id": instrumentador_id,
                "fecha_programada": fecha,
                "prioridad": "alta",
            }))
            .send()
            .await
            .unwrap()
            .assert_status(201)
            .data()["id"]
            .as_i64()
            .unwrap()
    }
}

pub async fn login(client: &TestClient, email: &str, password: &str) -> TestResponse {
    client
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
}
