mod common;

use common::{login, Harness};
use quirofano_testing::prelude::*;

async fn create_patient(harness: &Harness, cedula: &str) -> JsonValue {
    harness
        .admin
        .post("/api/v1/admin/patients")
        .json(&json!({
            "nombre": "Carmen",
            "apellido": "Díaz",
            "cedula": cedula,
            "fecha_nacimiento": "1975-07-01",
            "telefono": "04121234567",
            "tipo_sangre": "A-",
            "alergias": "Penicilina",
        }))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .data()
}

fn find_by_id(rows: &JsonValue, id: &JsonValue) -> Option<JsonValue> {
    rows.as_array()
        .unwrap()
        .iter()
        .find(|row| &row["id"] == id)
        .cloned()
}

#[tokio::test]
async fn test_deleted_user_cannot_log_in_and_is_not_listed() {
    let harness = Harness::new().await;
    let email = utils::random_email();
    let created = harness
        .admin
        .post("/api/v1/admin/users")
        .json(&json!({
            "nombre": "Pedro",
            "apellido": "Mora",
            "email": email,
            "password": "clave-segura",
            "cedula": utils::random_cedula(),
            "rol_id": harness.role_id("farmacia").await,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .data();
    let id = &created["id"];
    login(&harness.anonymous(), &email, "clave-segura").await;

    harness
        .admin
        .delete(format!("/api/v1/admin/users/{}", id))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Usuario eliminado exitosamente");

    harness
        .anonymous()
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": "clave-segura" }))
        .send()
        .await
        .unwrap()
        .assert_status(401)
        .assert_message("Credenciales inválidas");

    let usuarios = harness
        .admin
        .get("/api/v1/admin/users")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert!(find_by_id(&usuarios, id).is_none());

    harness
        .admin
        .delete(format!("/api/v1/admin/users/{}", id))
        .send()
        .await
        .unwrap()
        .assert_status(404)
        .assert_message("Usuario no encontrado");
}

#[tokio::test]
async fn test_update_user_rejects_taken_email_and_cedula() {
    let harness = Harness::new().await;
    let (id, _) = harness.user_with_role("central").await;
    harness.user_with_role("central").await;
    let usuarios = harness.admin.get("/api/v1/admin/users").send().await.unwrap().data();
    let otro = usuarios
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["id"] != id && u["id"] != harness.admin_id)
        .cloned()
        .unwrap();
    let path = format!("/api/v1/admin/users/{}", id);

    harness
        .admin
        .put(&path)
        .json(&json!({ "email": otro["email"] }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("El email ya está registrado");
    harness
        .admin
        .put(&path)
        .json(&json!({ "cedula": otro["cedula"] }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("La cédula ya está registrada");

    let actualizado = harness
        .admin
        .put(&path)
        .json(&json!({ "nombre": "Ana María", "telefono": "04140000000" }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Usuario actualizado exitosamente")
        .data();
    assert_eq!(actualizado["nombre"], "Ana María");
    assert_eq!(actualizado["telefono"], "04140000000");
    assert_eq!(actualizado["rol"]["nombre"], "central");
    assert!(actualizado.get("password_hash").is_none());
}

#[tokio::test]
async fn test_patient_reads_back_and_identical_update_is_stable() {
    let harness = Harness::new().await;
    let cedula = utils::random_cedula();
    let creado = create_patient(&harness, &cedula).await;
    let id = &creado["id"];

    let pacientes = harness
        .admin
        .get("/api/v1/admin/patients")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    let leido = find_by_id(&pacientes, id).unwrap();
    for campo in ["nombre", "apellido", "cedula", "fecha_nacimiento", "telefono", "tipo_sangre", "alergias"] {
        assert_eq!(leido[campo], creado[campo], "campo {}", campo);
    }

    let cambios = json!({ "telefono": "04160000000", "direccion": "Av. Bolívar" });
    let primero = harness
        .admin
        .put(format!("/api/v1/admin/patients/{}", id))
        .json(&cambios)
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    let segundo = harness
        .admin
        .put(format!("/api/v1/admin/patients/{}", id))
        .json(&cambios)
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    for campo in ["nombre", "cedula", "telefono", "direccion", "alergias"] {
        assert_eq!(primero[campo], segundo[campo], "campo {}", campo);
    }
    assert_eq!(segundo["direccion"], "Av. Bolívar");
}

#[tokio::test]
async fn test_update_patient_rejects_cedula_of_another_patient() {
    let harness = Harness::new().await;
    let primero = create_patient(&harness, &utils::random_cedula()).await;
    let segundo = create_patient(&harness, &utils::random_cedula()).await;

    harness
        .admin
        .put(format!("/api/v1/admin/patients/{}", segundo["id"]))
        .json(&json!({ "cedula": primero["cedula"] }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("Ya existe otro paciente con esta cédula");

    // Keeping its own cedula is not a collision
    harness
        .admin
        .put(format!("/api/v1/admin/patients/{}", segundo["id"]))
        .json(&json!({ "cedula": segundo["cedula"] }))
        .send()
        .await
        .unwrap()
        .assert_status(200);

    harness
        .admin
        .put("/api/v1/admin/patients/9999")
        .json(&json!({ "nombre": "Nadie" }))
        .send()
        .await
        .unwrap()
        .assert_status(404)
        .assert_message("Paciente no encontrado");
}

#[tokio::test]
async fn test_update_room_rejects_duplicate_number() {
    let harness = Harness::new().await;
    let mut ids = Vec::new();
    for numero in [1, 2] {
        let sala = harness
            .admin
            .post("/api/v1/admin/quirofanos")
            .json(&json!({ "nombre": format!("Quirófano {}", numero), "numero": numero }))
            .send()
            .await
            .unwrap()
            .assert_status(201)
            .data();
        ids.push(sala["id"].clone());
    }

    harness
        .admin
        .post("/api/v1/admin/quirofanos")
        .json(&json!({ "nombre": "Repetido", "numero": 2 }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("Ya existe un quirófano con este número");
    harness
        .admin
        .put(format!("/api/v1/admin/quirofanos/{}", ids[1]))
        .json(&json!({ "numero": 1 }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("Ya existe un quirófano con este número");

    let actualizado = harness
        .admin
        .put(format!("/api/v1/admin/quirofanos/{}", ids[1]))
        .json(&json!({ "numero": 2, "nombre": "Quirófano Cardiovascular", "ubicacion": "Piso 3" }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Quirófano actualizado exitosamente")
        .data();
    assert_eq!(actualizado["numero"], 2);
    assert_eq!(actualizado["nombre"], "Quirófano Cardiovascular");

    let salas = harness
        .admin
        .get("/api/v1/admin/quirofanos")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    let leida = find_by_id(&salas, &ids[1]).unwrap();
    assert_eq!(leida["nombre"], "Quirófano Cardiovascular");
    assert_eq!(leida["ubicacion"], "Piso 3");
}
