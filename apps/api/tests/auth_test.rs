mod common;

use common::{login, Harness};
use quirofano_orm::seeding::{ADMIN_EMAIL, ADMIN_PASSWORD};
use quirofano_testing::prelude::*;

#[tokio::test]
async fn test_root_and_health() {
    let harness = Harness::new().await;
    let client = harness.anonymous();

    client
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("¡API del Sistema de Gestión Hospitalaria funcionando correctamente!");
    client
        .get("/health")
        .send()
        .await
        .unwrap()
        .assert_success()
        .assert_message("ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let harness = Harness::new().await;
    harness
        .anonymous()
        .get("/api/v1/nada")
        .send()
        .await
        .unwrap()
        .assert_status(404)
        .assert_json_contains(json!({ "success": false }))
        .unwrap();
}

#[tokio::test]
async fn test_register_login_profile_logout() {
    let harness = Harness::new().await;
    let client = harness.anonymous();
    let email = utils::random_email();

    let registered = client
        .post("/api/v1/auth/register")
        .json(&json!({
            "nombre": "Marta",
            "apellido": "Ruiz",
            "email": email,
            "password": "clave-segura",
            "cedula": utils::random_cedula(),
            "rol_id": harness.role_id("instrumentador").await,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .assert_message("Usuario registrado exitosamente");
    assert!(registered.data()["token"].is_string());
    assert_eq!(registered.data()["user"]["rol"]["nombre"], "instrumentador");
    assert!(registered.data()["user"].get("password_hash").is_none());

    let token = login(&client, &email, "clave-segura").await.data()["token"]
        .as_str()
        .unwrap()
        .to_string();
    let session = harness.client(&token);

    let profile = session
        .get("/api/v1/auth/profile")
        .send()
        .await
        .unwrap()
        .assert_status(200);
    assert_eq!(profile.data()["user"]["email"], email.as_str());

    session
        .post("/api/v1/auth/logout")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Sesión cerrada exitosamente");

    session
        .get("/api/v1/auth/profile")
        .send()
        .await
        .unwrap()
        .assert_status(403)
        .assert_message("Token inválido");
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let harness = Harness::new().await;
    harness
        .anonymous()
        .post("/api/v1/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": "incorrecta" }))
        .send()
        .await
        .unwrap()
        .assert_status(401)
        .assert_message("Credenciales inválidas");
}

#[tokio::test]
async fn test_register_validation_lists_every_error() {
    let harness = Harness::new().await;
    let response = harness
        .anonymous()
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "no-es-email", "password": "123" }))
        .send()
        .await
        .unwrap()
        .assert_status(400);

    let errors = response.errors();
    assert!(errors.contains(&"El nombre es requerido".to_string()));
    assert!(errors.contains(&"Email válido es requerido".to_string()));
    assert!(errors.contains(&"La contraseña debe tener al menos 6 caracteres".to_string()));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let harness = Harness::new().await;
    harness
        .anonymous()
        .post("/api/v1/auth/register")
        .json(&json!({
            "nombre": "Otro",
            "apellido": "Admin",
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD.repeat(2),
            "cedula": utils::random_cedula(),
            "rol_id": 1,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("El email ya está registrado");
}

#[tokio::test]
async fn test_missing_and_malformed_tokens() {
    let harness = Harness::new().await;
    harness
        .anonymous()
        .get("/api/v1/admin/users")
        .send()
        .await
        .unwrap()
        .assert_status(401)
        .assert_message("Token de acceso requerido");
    harness
        .client("no-es-un-jwt")
        .get("/api/v1/admin/users")
        .send()
        .await
        .unwrap()
        .assert_status(403);
}

#[tokio::test]
async fn test_role_groups_are_enforced() {
    let harness = Harness::new().await;
    let (_, farmacia) = harness.user_with_role("farmacia").await;

    farmacia
        .get("/api/v1/admin/users")
        .send()
        .await
        .unwrap()
        .assert_status(403);
    farmacia
        .get("/api/v1/suministros/stock")
        .send()
        .await
        .unwrap()
        .assert_status(200);
    farmacia
        .get("/api/v1/suministros/central/esterilizacion")
        .send()
        .await
        .unwrap()
        .assert_status(403);
}
