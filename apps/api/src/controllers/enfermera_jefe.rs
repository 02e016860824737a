//! Head-nurse scheduling: booking, editing, postponing and cancelling
//! surgeries, plus staff and room availability lookups.

use std::collections::HashSet;

use axum::extract::{Path, State};
use chrono::{DateTime, NaiveTime, Utc};
use quirofano_http::{
    parse_body, validate_body, ApiResponse, HttpError, HttpResult, JsonBody, OptionalJsonBody,
    QueryParams,
};
use quirofano_orm::models::*;
use quirofano_orm::scheduling::{conflict_window, find_conflict};
use quirofano_orm::Store;
use quirofano_validation::{NumericValidator, RequiredValidator, Rules};
use serde::Deserialize;
use serde_json::Value;

use super::surgery_flow::{self, load_surgery, FinishRequest};
use super::{
    parse_date, parse_timestamp, query_text, query_time, query_value, referenced, room_conflict,
};
use crate::state::AppState;
use crate::views;

const DATOS_INVALIDOS: &str = "Datos de cirugía inválidos";

#[derive(Debug, Deserialize)]
struct StaffEntry {
    medico_id: Option<i32>,
    usuario_id: Option<i32>,
    #[serde(alias = "rol_cirugia")]
    rol_en_cirugia: Option<RolCirugia>,
}

#[derive(Debug, Deserialize)]
struct NewSurgeryRequest {
    paciente_id: i32,
    tipo_cirugia_id: i32,
    quirofano_id: i32,
    cirujano_principal_id: i32,
    instrumentador_id: Option<i32>,
    fecha_programada: String,
    prioridad: Option<Prioridad>,
    observaciones_previas: Option<String>,
    diagnostico_preoperatorio: Option<String>,
    personal_auxiliar: Option<Vec<StaffEntry>>,
}

#[derive(Debug, Deserialize)]
struct UpdateSurgeryRequest {
    paciente_id: Option<i32>,
    tipo_cirugia_id: Option<i32>,
    quirofano_id: Option<i32>,
    cirujano_principal_id: Option<i32>,
    instrumentador_id: Option<i32>,
    fecha_programada: Option<String>,
    prioridad: Option<Prioridad>,
    observaciones_previas: Option<String>,
    diagnostico_preoperatorio: Option<String>,
    personal_auxiliar: Option<Vec<StaffEntry>>,
}

#[derive(Debug, Deserialize)]
struct PostponeRequest {
    nueva_fecha: Option<String>,
    motivo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    motivo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SurgeryListQuery {
    fecha_inicio: Option<String>,
    fecha_fin: Option<String>,
    estado: Option<String>,
    quirofano_id: Option<String>,
    cirujano_id: Option<String>,
    prioridad: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    tipo_personal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoomAvailabilityQuery {
    fecha: Option<String>,
    hora: Option<String>,
}

fn surgery_rules() -> Rules {
    Rules::new()
        .field(
            "paciente_id",
            NumericValidator::positive_id().message("El paciente es requerido"),
        )
        .field(
            "tipo_cirugia_id",
            NumericValidator::positive_id().message("El tipo de cirugía es requerido"),
        )
        .field(
            "quirofano_id",
            NumericValidator::positive_id().message("El quirófano es requerido"),
        )
        .field(
            "cirujano_principal_id",
            NumericValidator::positive_id().message("El cirujano principal es requerido"),
        )
        .field(
            "fecha_programada",
            RequiredValidator::with_message("La fecha programada es requerida"),
        )
}

fn scheduled_at(raw: &str) -> HttpResult<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| {
        HttpError::bad_request_with(
            DATOS_INVALIDOS,
            vec!["La fecha programada no es válida".to_string()],
        )
    })
}

/// Resolve each entry to a doctor; repeated (doctor, role) pairs collapse
async fn resolve_staff(
    store: &dyn Store,
    entries: Vec<StaffEntry>,
) -> HttpResult<Vec<NuevoPersonal>> {
    let mut staff: Vec<NuevoPersonal> = Vec::with_capacity(entries.len());
    for entry in entries {
        let (requested, medico) = match (entry.medico_id, entry.usuario_id) {
            (Some(id), _) => (id, store.find_doctor(id).await?),
            (None, Some(usuario_id)) => {
                (usuario_id, store.find_doctor_by_user(usuario_id).await?)
            }
            (None, None) => {
                return Err(HttpError::bad_request_with(
                    DATOS_INVALIDOS,
                    vec!["Cada miembro del personal requiere medico_id".to_string()],
                ))
            }
        };
        let medico = referenced(medico, &format!("El médico {} no existe", requested))?;

        let fila = NuevoPersonal {
            medico_id: medico.id,
            rol_en_cirugia: entry.rol_en_cirugia.unwrap_or(RolCirugia::Otro),
        };
        if !staff.contains(&fila) {
            staff.push(fila);
        }
    }
    Ok(staff)
}

/// The rows a surgery points to must exist
async fn check_references(
    store: &dyn Store,
    paciente_id: Option<i32>,
    tipo_cirugia_id: Option<i32>,
    quirofano_id: Option<i32>,
    cirujano_id: Option<i32>,
    instrumentador_id: Option<i32>,
) -> HttpResult<()> {
    if let Some(id) = paciente_id {
        referenced(store.find_patient(id).await?, "El paciente especificado no existe")?;
    }
    if let Some(id) = tipo_cirugia_id {
        referenced(
            store.find_surgery_type(id).await?,
            "El tipo de cirugía especificado no existe",
        )?;
    }
    if let Some(id) = quirofano_id {
        referenced(store.find_room(id).await?, "El quirófano especificado no existe")?;
    }
    if let Some(id) = cirujano_id {
        referenced(store.find_doctor(id).await?, "El cirujano especificado no existe")?;
    }
    if let Some(id) = instrumentador_id {
        referenced(
            store.find_user(id).await?,
            "El instrumentador especificado no existe",
        )?;
    }
    Ok(())
}

pub async fn create_surgery(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: NewSurgeryRequest = validate_body(body, &surgery_rules(), DATOS_INVALIDOS).await?;
    let fecha_programada = scheduled_at(&req.fecha_programada)?;
    let store = state.store();

    check_references(
        store,
        Some(req.paciente_id),
        Some(req.tipo_cirugia_id),
        Some(req.quirofano_id),
        Some(req.cirujano_principal_id),
        req.instrumentador_id,
    )
    .await?;
    let staff = resolve_staff(store, req.personal_auxiliar.unwrap_or_default()).await?;

    let cirugia = store
        .schedule_surgery(
            NuevaCirugia {
                paciente_id: req.paciente_id,
                tipo_cirugia_id: req.tipo_cirugia_id,
                quirofano_id: req.quirofano_id,
                cirujano_principal_id: req.cirujano_principal_id,
                instrumentador_id: req.instrumentador_id,
                fecha_programada,
                prioridad: req.prioridad.unwrap_or(Prioridad::Media),
                observaciones_previas: req.observaciones_previas,
                diagnostico_preoperatorio: req.diagnostico_preoperatorio,
            },
            staff,
        )
        .await
        .map_err(room_conflict(
            "El quirófano no está disponible en el horario solicitado",
        ))?;

    tracing::info!(
        cirugia_id = cirugia.id,
        quirofano_id = cirugia.quirofano_id,
        fecha = %cirugia.fecha_programada,
        "Surgery scheduled"
    );
    Ok(ApiResponse::created(
        "Cirugía creada y asignada exitosamente",
        views::surgery(store, &cirugia).await?,
    ))
}

pub async fn list_surgeries(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SurgeryListQuery>,
) -> HttpResult<ApiResponse> {
    let filtro = FiltroCirugias {
        desde: query_time(&query.fecha_inicio, "fecha_inicio")?,
        hasta: query_time(&query.fecha_fin, "fecha_fin")?,
        estados: query_value::<EstadoCirugia>(&query.estado, "estado")?
            .into_iter()
            .collect(),
        quirofano_id: query_value(&query.quirofano_id, "quirofano_id")?,
        cirujano_id: query_value(&query.cirujano_id, "cirujano_id")?,
        prioridad: query_value(&query.prioridad, "prioridad")?,
        orden: SortOrder::Asc,
        ..Default::default()
    };
    let store = state.store();
    let cirugias = store.list_surgeries(&filtro).await?;
    Ok(ApiResponse::ok(
        "Cirugías obtenidas exitosamente",
        Value::Array(views::surgeries(store, &cirugias).await?),
    ))
}

pub async fn get_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    Ok(ApiResponse::ok(
        "Cirugía obtenida exitosamente",
        views::surgery(store, &cirugia).await?,
    ))
}

pub async fn update_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: UpdateSurgeryRequest = parse_body(body)?;
    let store = state.store();
    let mut cirugia = load_surgery(store, id).await?;
    if cirugia.estado.is_locked() {
        return Err(HttpError::bad_request(
            "No se puede editar una cirugía en curso o finalizada",
        ));
    }

    check_references(
        store,
        req.paciente_id,
        req.tipo_cirugia_id,
        req.quirofano_id,
        req.cirujano_principal_id,
        req.instrumentador_id,
    )
    .await?;
    let fecha_programada = req.fecha_programada.as_deref().map(scheduled_at).transpose()?;
    let staff = match req.personal_auxiliar {
        Some(entries) => Some(resolve_staff(store, entries).await?),
        None => None,
    };

    let check_room = req.quirofano_id.map_or(false, |q| q != cirugia.quirofano_id)
        || fecha_programada.map_or(false, |f| f != cirugia.fecha_programada);

    if let Some(id) = req.paciente_id {
        cirugia.paciente_id = id;
    }
    if let Some(id) = req.tipo_cirugia_id {
        cirugia.tipo_cirugia_id = id;
    }
    if let Some(id) = req.quirofano_id {
        cirugia.quirofano_id = id;
    }
    if let Some(id) = req.cirujano_principal_id {
        cirugia.cirujano_principal_id = id;
    }
    if req.instrumentador_id.is_some() {
        cirugia.instrumentador_id = req.instrumentador_id;
    }
    if let Some(fecha) = fecha_programada {
        cirugia.fecha_programada = fecha;
    }
    if let Some(prioridad) = req.prioridad {
        cirugia.prioridad = prioridad;
    }
    if req.observaciones_previas.is_some() {
        cirugia.observaciones_previas = req.observaciones_previas;
    }
    if req.diagnostico_preoperatorio.is_some() {
        cirugia.diagnostico_preoperatorio = req.diagnostico_preoperatorio;
    }

    let save = SurgerySave {
        expected_estado: cirugia.estado,
        check_room,
        staff,
    };
    let cirugia = store
        .save_surgery(&cirugia, save)
        .await
        .map_err(room_conflict("El quirófano no está disponible en el nuevo horario"))?;

    tracing::info!(cirugia_id = cirugia.id, "Surgery updated");
    Ok(ApiResponse::ok(
        "Cirugía actualizada exitosamente",
        views::surgery(store, &cirugia).await?,
    ))
}

pub async fn postpone_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: PostponeRequest = parse_body(body)?;
    let store = state.store();
    let mut cirugia = load_surgery(store, id).await?;
    if cirugia.estado == EstadoCirugia::Cancelada {
        return Err(HttpError::bad_request("No se puede posponer una cirugía cancelada"));
    }
    if cirugia.estado.is_closed() {
        return Err(HttpError::bad_request(
            "No se puede posponer una cirugía en curso o finalizada",
        ));
    }

    let previous = cirugia.estado;
    let nueva_fecha = match req.nueva_fecha.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
            HttpError::bad_request_with(
                "Datos inválidos",
                vec!["La nueva fecha no es válida".to_string()],
            )
        })?),
        None => None,
    };
    if let Some(fecha) = nueva_fecha {
        cirugia.fecha_programada = fecha;
    }
    cirugia.estado = EstadoCirugia::Pospuesta;
    cirugia.append_nota("CIRUGÍA POSPUESTA", req.motivo.as_deref());

    let save = SurgerySave {
        expected_estado: previous,
        check_room: nueva_fecha.is_some(),
        staff: None,
    };
    let cirugia = store
        .save_surgery(&cirugia, save)
        .await
        .map_err(room_conflict("El quirófano no está disponible en la nueva fecha"))?;

    tracing::info!(cirugia_id = cirugia.id, "Surgery postponed");
    Ok(ApiResponse::ok(
        "Cirugía pospuesta exitosamente",
        views::to_json(&cirugia)?,
    ))
}

pub async fn cancel_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: CancelRequest = parse_body(body)?;
    let store = state.store();
    let mut cirugia = load_surgery(store, id).await?;
    if cirugia.estado == EstadoCirugia::Cancelada {
        return Err(HttpError::bad_request("La cirugía ya fue cancelada"));
    }
    if cirugia.estado.is_closed() {
        return Err(HttpError::bad_request(
            "No se puede eliminar una cirugía en curso o finalizada",
        ));
    }

    let previous = cirugia.estado;
    cirugia.estado = EstadoCirugia::Cancelada;
    cirugia.append_nota("CIRUGÍA CANCELADA", req.motivo.as_deref());
    let cirugia = store
        .save_surgery(&cirugia, SurgerySave::transition(previous))
        .await?;

    tracing::info!(cirugia_id = cirugia.id, "Surgery cancelled");
    Ok(ApiResponse::ok(
        "Cirugía cancelada exitosamente",
        views::to_json(&cirugia)?,
    ))
}

pub async fn start_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    let data = surgery_flow::start(store, cirugia).await?;
    Ok(ApiResponse::ok("Cirugía iniciada exitosamente", data))
}

pub async fn finish_surgery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: FinishRequest = parse_body(body)?;
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    let data = surgery_flow::finish(store, cirugia, req).await?;
    Ok(ApiResponse::ok("Cirugía finalizada exitosamente", data))
}

/// Role names behind each `tipo_personal`
fn staff_roles(tipo_personal: &str) -> Option<&'static [&'static str]> {
    match tipo_personal {
        "instrumentadores" => Some(&[Role::INSTRUMENTADOR]),
        "anestesiologos" => Some(&["anestesiologo", "medico"]),
        "auxiliares" => Some(&["auxiliar_enfermeria", "residente"]),
        _ => None,
    }
}

pub async fn available_staff(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<StaffQuery>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let tipo = query_text(&query.tipo_personal).unwrap_or_default();

    if tipo == "cirujanos" {
        let mut data = Vec::new();
        for medico in store.list_doctors().await? {
            let activo = store
                .find_user(medico.usuario_id)
                .await?
                .map_or(false, |usuario| usuario.activo);
            if activo {
                data.push(views::doctor(store, &medico).await?);
            }
        }
        return Ok(ApiResponse::ok(
            "Cirujanos disponibles obtenidos exitosamente",
            Value::Array(data),
        ));
    }

    let rol_ids: Option<HashSet<i32>> = match staff_roles(tipo) {
        Some(nombres) => Some(
            store
                .list_roles()
                .await?
                .into_iter()
                .filter(|rol| nombres.contains(&rol.nombre.as_str()))
                .map(|rol| rol.id)
                .collect(),
        ),
        None => None,
    };
    let usuarios: Vec<Usuario> = store
        .list_users()
        .await?
        .into_iter()
        .filter(|usuario| usuario.activo)
        .filter(|usuario| rol_ids.as_ref().map_or(true, |ids| ids.contains(&usuario.rol_id)))
        .collect();

    Ok(ApiResponse::ok(
        "Personal disponible obtenido exitosamente",
        Value::Array(views::users_with_roles(store, &usuarios).await?),
    ))
}

pub async fn available_rooms(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<RoomAvailabilityQuery>,
) -> HttpResult<ApiResponse> {
    let (Some(fecha), Some(hora)) = (query_text(&query.fecha), query_text(&query.hora)) else {
        return Err(HttpError::bad_request("Fecha y hora son requeridas"));
    };
    let fecha = parse_date(fecha);
    let hora = NaiveTime::parse_from_str(hora, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(hora, "%H:%M:%S"))
        .ok();
    let (Some(fecha), Some(hora)) = (fecha, hora) else {
        return Err(HttpError::bad_request("Fecha u hora inválidas"));
    };
    let instante = fecha.and_time(hora).and_utc();

    let store = state.store();
    let (desde, hasta) = conflict_window(instante);
    let cercanas = store
        .list_surgeries(&FiltroCirugias {
            desde: Some(desde),
            hasta: Some(hasta),
            ..Default::default()
        })
        .await?;

    let mut data = Vec::new();
    for quirofano in store.list_rooms().await? {
        if quirofano.activo && find_conflict(&cercanas, quirofano.id, instante, None).is_none() {
            data.push(views::room(store, &quirofano).await?);
        }
    }
    Ok(ApiResponse::ok(
        "Quirófanos disponibles obtenidos exitosamente",
        Value::Array(data),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles() {
        assert_eq!(staff_roles("instrumentadores"), Some(&["instrumentador"][..]));
        assert!(staff_roles("anestesiologos").unwrap().contains(&"medico"));
        assert!(staff_roles("auxiliares").unwrap().contains(&"residente"));
        assert_eq!(staff_roles("todos"), None);
    }

    #[test]
    fn test_scheduled_at_rejects_garbage() {
        assert!(scheduled_at("2026-03-10T10:00:00Z").is_ok());
        let err = scheduled_at("pronto").unwrap_err();
        assert_eq!(err.public_message(), DATOS_INVALIDOS);
    }
}
