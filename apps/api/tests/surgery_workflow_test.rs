mod common;

use common::{Harness, FECHA_CIRUGIA};
use quirofano_testing::prelude::*;

#[tokio::test]
async fn test_room_cannot_be_double_booked_within_two_hours() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    harness.schedule(&fixture, FECHA_CIRUGIA, None).await;

    harness
        .admin
        .post("/api/v1/enfermera_jefe/cirugias")
        .json(&json!({
            "paciente_id": fixture.paciente_id,
            "tipo_cirugia_id": fixture.tipo_cirugia_id,
            "quirofano_id": fixture.quirofano_id,
            "cirujano_principal_id": fixture.medico_id,
            "fecha_programada": "2030-05-10T10:30:00Z",
        }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("El quirófano no está disponible en el horario solicitado");

    harness
        .admin
        .post("/api/v1/enfermera_jefe/cirugias")
        .json(&json!({
            "paciente_id": fixture.paciente_id,
            "tipo_cirugia_id": fixture.tipo_cirugia_id,
            "quirofano_id": fixture.quirofano_id,
            "cirujano_principal_id": fixture.medico_id,
            "fecha_programada": "2030-05-10T11:00:00Z",
        }))
        .send()
        .await
        .unwrap()
        .assert_status(409);

    harness.schedule(&fixture, "2030-05-10T11:01:00Z", None).await;
}

#[tokio::test]
async fn test_create_surgery_rejects_unknown_references() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;

    harness
        .admin
        .post("/api/v1/enfermera_jefe/cirugias")
        .json(&json!({
            "paciente_id": 999,
            "tipo_cirugia_id": fixture.tipo_cirugia_id,
            "quirofano_id": fixture.quirofano_id,
            "cirujano_principal_id": fixture.medico_id,
            "fecha_programada": FECHA_CIRUGIA,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("El paciente especificado no existe");
}

#[tokio::test]
async fn test_available_rooms_exclude_booked_room() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    harness.schedule(&fixture, FECHA_CIRUGIA, None).await;

    let libres = harness
        .admin
        .get("/api/v1/enfermera_jefe/quirofanos-disponibles")
        .query("fecha", "2030-05-10")
        .query("hora", "10:00")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert!(libres.as_array().unwrap().is_empty());

    let libres = harness
        .admin
        .get("/api/v1/enfermera_jefe/quirofanos-disponibles")
        .query("fecha", "2030-05-10")
        .query("hora", "15:00")
        .send()
        .await
        .unwrap()
        .data();
    assert_eq!(libres.as_array().unwrap().len(), 1);

    harness
        .admin
        .get("/api/v1/enfermera_jefe/quirofanos-disponibles")
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("Fecha y hora son requeridas");
}

#[tokio::test]
async fn test_postpone_and_cancel_append_notes() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, None).await;

    let pospuesta = harness
        .admin
        .put(format!("/api/v1/enfermera_jefe/cirugias/{}/posponer", id))
        .json(&json!({ "nueva_fecha": "2030-05-12T09:00:00Z", "motivo": "Paciente con fiebre" }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(pospuesta["estado"], "pospuesta");
    assert!(pospuesta["observaciones_previas"]
        .as_str()
        .unwrap()
        .contains("CIRUGÍA POSPUESTA: Paciente con fiebre"));

    let cancelada = harness
        .admin
        .delete(format!("/api/v1/enfermera_jefe/cirugias/{}", id))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(cancelada["estado"], "cancelada");
    assert!(cancelada["observaciones_previas"]
        .as_str()
        .unwrap()
        .contains("CIRUGÍA CANCELADA: Sin motivo especificado"));
}

#[tokio::test]
async fn test_cancelled_surgery_cannot_be_revived() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let cancelada = harness.schedule(&fixture, FECHA_CIRUGIA, None).await;
    let path = format!("/api/v1/enfermera_jefe/cirugias/{}", cancelada);

    harness
        .admin
        .delete(&path)
        .send()
        .await
        .unwrap()
        .assert_status(200);

    // The cancelled booking released the slot
    let vigente = harness.schedule(&fixture, FECHA_CIRUGIA, None).await;

    harness
        .admin
        .put(format!("{}/posponer", path))
        .json(&json!({ "motivo": "Reprogramar" }))
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("No se puede posponer una cirugía cancelada");
    harness
        .admin
        .delete(&path)
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("La cirugía ya fue cancelada");

    let cirugias = harness
        .admin
        .get("/api/v1/enfermera_jefe/cirugias")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    let estado = |id: i64| {
        cirugias
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == id)
            .map(|c| c["estado"].clone())
            .unwrap()
    };
    assert_eq!(estado(cancelada), "cancelada");
    assert_eq!(estado(vigente), "programada");
}

#[tokio::test]
async fn test_update_surgery_moves_booking_and_checks_other_surgeries() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, None).await;
    harness.schedule(&fixture, "2030-05-10T16:00:00Z", None).await;
    let path = format!("/api/v1/enfermera_jefe/cirugias/{}", id);

    // Its own booking does not count as a conflict
    let movida = harness
        .admin
        .put(&path)
        .json(&json!({
            "fecha_programada": "2030-05-10T10:00:00Z",
            "prioridad": "urgente",
            "diagnostico_preoperatorio": "Apendicitis aguda",
        }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Cirugía actualizada exitosamente")
        .data();
    assert_eq!(movida["fecha_programada"], "2030-05-10T10:00:00Z");
    assert_eq!(movida["prioridad"], "urgente");
    assert_eq!(movida["estado"], "programada");

    harness
        .admin
        .put(&path)
        .json(&json!({ "fecha_programada": "2030-05-10T15:00:00Z" }))
        .send()
        .await
        .unwrap()
        .assert_status(409)
        .assert_message("El quirófano no está disponible en el nuevo horario");

    let leida = harness
        .admin
        .get(&path)
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(leida["fecha_programada"], "2030-05-10T10:00:00Z");
    assert_eq!(leida["diagnostico_preoperatorio"], "Apendicitis aguda");
    assert_eq!(leida["quirofano"]["id"], fixture.quirofano_id);
}

#[tokio::test]
async fn test_start_and_finish_from_head_nurse_group() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, None).await;

    harness
        .admin
        .put(format!("/api/v1/enfermera_jefe/cirugias/{}/finalizar", id))
        .send()
        .await
        .unwrap()
        .assert_status(400);

    let iniciada = harness
        .admin
        .put(format!("/api/v1/enfermera_jefe/cirugias/{}/iniciar", id))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(iniciada["estado"], "en_curso");
    assert!(iniciada["fecha_inicio"].is_string());

    harness
        .admin
        .put(format!("/api/v1/enfermera_jefe/cirugias/{}", id))
        .json(&json!({ "prioridad": "baja" }))
        .send()
        .await
        .unwrap()
        .assert_status(400);

    let finalizada = harness
        .admin
        .put(format!("/api/v1/enfermera_jefe/cirugias/{}/finalizar", id))
        .json(&json!({
            "observaciones_finales": "Sin complicaciones",
            "diagnostico_postoperatorio": "Apendicitis aguda resuelta",
        }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(finalizada["estado"], "finalizada");
    assert_eq!(finalizada["duracion_real_minutos"], 0);
    assert!(finalizada["observaciones_finales"]
        .as_str()
        .unwrap()
        .starts_with("OBSERVACIONES GENERALES:"));
}

#[tokio::test]
async fn test_instrument_tech_sees_only_assigned_surgeries() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let (tech_id, tech) = harness.user_with_role("instrumentador").await;
    let (_, otro) = harness.user_with_role("instrumentador").await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, Some(tech_id)).await;

    let propias = tech
        .get("/api/v1/instrumentador/cirugias")
        .query("estado", "pendiente")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(propias.as_array().unwrap().len(), 1);
    assert_eq!(propias[0]["id"], id);

    let ajenas = otro
        .get("/api/v1/instrumentador/cirugias")
        .send()
        .await
        .unwrap()
        .data();
    assert!(ajenas.as_array().unwrap().is_empty());

    otro.get(format!("/api/v1/instrumentador/cirugias/{}/tiempo", id))
        .send()
        .await
        .unwrap()
        .assert_status(403)
        .assert_message("No estás asignado a esta cirugía");
    tech.get("/api/v1/instrumentador/cirugias/9999/tiempo")
        .send()
        .await
        .unwrap()
        .assert_status(404)
        .assert_message("Cirugía no encontrada");
}

#[tokio::test]
async fn test_full_instrumentation_workflow() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let (tech_id, tech) = harness.user_with_role("instrumentador").await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, Some(tech_id)).await;
    let base = format!("/api/v1/instrumentador/cirugias/{}", id);
    let item_id = harness
        .admin
        .post("/api/v1/suministros/items")
        .json(&json!({ "nombre": "Separador Farabeuf", "codigo": utils::random_string(Some("INS")) }))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .data()["id"]
        .as_i64()
        .unwrap();

    let conteo = tech
        .post(format!("{}/conteo-inicial", base))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .assert_message("Conteo inicial iniciado")
        .data();
    assert_eq!(conteo["conteo"]["tipo_conteo"], "inicial");

    tech.post(format!("{}/conteo-inicial/finalizar", base))
        .json(&json!({
            "instrumentos": [{ "instrumento_id": item_id, "cantidad_actual": 3, "cantidad_requerida": 4 }],
            "confirmacion": false,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("Debe confirmar el conteo");

    let cerrado = tech
        .post(format!("{}/conteo-inicial/finalizar", base))
        .json(&json!({
            "instrumentos": [{ "instrumento_id": item_id, "cantidad_actual": 3, "cantidad_requerida": 4 }],
            "confirmacion": true,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(cerrado["conteo"]["confirmado"], true);
    assert_eq!(cerrado["faltantes"].as_array().unwrap().len(), 1);

    tech.post(format!("{}/iniciar", base))
        .send()
        .await
        .unwrap()
        .assert_status(200);

    let tiempo = tech
        .get(format!("{}/tiempo", base))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(tiempo["duracion_estimada_minutos"], 90);
    assert_eq!(tiempo["minutos_transcurridos"], 0);
    assert_eq!(tiempo["minutos_restantes_estimados"], 90);

    let esperados = tech
        .post(format!("{}/conteo-final", base))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .data();
    assert_eq!(esperados["instrumentos_esperados"][0]["item_id"], item_id);
    assert_eq!(esperados["instrumentos_esperados"][0]["cantidad_esperada"], 3);

    let final_ = tech
        .post(format!("{}/conteo-final/finalizar", base))
        .json(&json!({
            "instrumentos": [{ "instrumento_id": item_id, "estado_final": "perdido", "cantidad_final": 2 }],
            "confirmacion": true,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_message("Conteo final finalizado")
        .data();
    assert_eq!(final_["detalles"][0]["estado"], "faltante");
    assert_eq!(final_["incidentes"][0]["tipo_incidente"], "instrumento_perdido");
    assert_eq!(final_["incidentes"][0]["severidad"], "critica");

    tech.post(format!("{}/finalizar", base))
        .send()
        .await
        .unwrap()
        .assert_status(200);

    let reporte = harness
        .admin
        .get(format!("/api/v1/admin/reports/cirugia/{}", id))
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    assert_eq!(reporte["estado"], "finalizada");
    assert_eq!(reporte["conteos"].as_array().unwrap().len(), 2);
    assert_eq!(reporte["incidentes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_urgent_incident_notifies_head_nurses() {
    let harness = Harness::new().await;
    let fixture = harness.fixture().await;
    let (tech_id, tech) = harness.user_with_role("instrumentador").await;
    let (nurse_id, _) = harness.user_with_role("enfermera_jefe").await;
    let id = harness.schedule(&fixture, FECHA_CIRUGIA, Some(tech_id)).await;

    tech.post(format!("/api/v1/instrumentador/cirugias/{}/reportar-incidente", id))
        .json(&json!({ "tipo_incidente": "volcan", "descripcion": "x" }))
        .send()
        .await
        .unwrap()
        .assert_status(400)
        .assert_message("Tipo de incidente inválido");

    let incidente = tech
        .post(format!("/api/v1/instrumentador/cirugias/{}/reportar-incidente", id))
        .json(&json!({
            "tipo_incidente": "complicacion_medica",
            "descripcion": "Sangrado inesperado",
            "requiere_accion_inmediata": true,
        }))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .assert_message("Incidente reportado correctamente")
        .data();
    assert_eq!(incidente["severidad"], "critica");

    let notificaciones = harness
        .admin
        .get("/api/v1/suministros/notificaciones")
        .query("tipo", "incidente")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .data();
    let destinatarios: Vec<i64> = notificaciones
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["usuario_id"].as_i64())
        .collect();
    assert_eq!(destinatarios, vec![nurse_id]);
}
