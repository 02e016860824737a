//! Instrument-tech workflow: instrument requests, the initial and final
//! counts, damage and incident reports.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, State};
use chrono::{Duration, NaiveDate, Utc};
use quirofano_auth::UserContext;
use quirofano_http::{
    parse_body, validate_body, ApiResponse, HttpError, HttpResult, JsonBody, OptionalJsonBody,
    QueryParams,
};
use quirofano_orm::models::*;
use quirofano_orm::Store;
use quirofano_validation::{NumericValidator, RequiredValidator, Rules};
use serde::Deserialize;
use serde_json::{json, Value};

use super::surgery_flow::{self, ensure_assigned, load_surgery, FinishRequest};
use super::{day_bounds, found, non_blank, query_text, query_value};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::views;

/// Load a surgery the current user may work on
async fn assigned_surgery(store: &dyn Store, user: &UserContext, id: i32) -> HttpResult<Cirugia> {
    let cirugia = load_surgery(store, id).await?;
    ensure_assigned(user, &cirugia)?;
    Ok(cirugia)
}

async fn load_item(store: &dyn Store, id: i32) -> HttpResult<Item> {
    found(store.find_item(id).await?, &format!("Item {} no encontrado", id))
}

/// The given entity, or the first active one of `tipo`
async fn supplying_entity(
    store: &dyn Store,
    entidad_id: Option<i32>,
    tipo: TipoEntidad,
) -> HttpResult<EntidadSuministradora> {
    if let Some(id) = entidad_id {
        return found(
            store.find_entity(id).await?,
            "Entidad suministradora no encontrada",
        );
    }
    store
        .list_entities()
        .await?
        .into_iter()
        .find(|e| e.activo && e.tipo == tipo)
        .ok_or_else(|| {
            HttpError::bad_request(format!("No hay entidad suministradora de tipo {}", tipo))
        })
}

/// Units per item, ordered by item id
fn aggregate<I>(lines: I) -> BTreeMap<i32, i32>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let mut totals = BTreeMap::new();
    for (item_id, cantidad) in lines {
        *totals.entry(item_id).or_insert(0) += cantidad;
    }
    totals
}

/// Everything allocated to the surgery
async fn expected_initial(store: &dyn Store, cirugia_id: i32) -> HttpResult<BTreeMap<i32, i32>> {
    let asignaciones = store.list_allocations(cirugia_id).await?;
    Ok(aggregate(
        asignaciones
            .iter()
            .map(|a| (a.item_id, a.cantidad_asignada)),
    ))
}

/// What the confirmed initial count found plus additional allocations
async fn expected_final(store: &dyn Store, cirugia_id: i32) -> HttpResult<BTreeMap<i32, i32>> {
    let inicial = store
        .list_counts(cirugia_id)
        .await?
        .into_iter()
        .filter(|c| c.tipo_conteo == TipoConteo::Inicial && c.confirmado)
        .last();
    let mut lines = Vec::new();
    if let Some(conteo) = inicial {
        for detalle in store.list_count_details(conteo.id).await? {
            lines.push((detalle.item_id, detalle.cantidad_contada));
        }
    }
    for asignacion in store.list_allocations(cirugia_id).await? {
        if asignacion.es_adicional {
            lines.push((asignacion.item_id, asignacion.cantidad_asignada));
        }
    }
    Ok(aggregate(lines))
}

async fn expected_view(store: &dyn Store, esperados: &BTreeMap<i32, i32>) -> HttpResult<Value> {
    let mut out = Vec::with_capacity(esperados.len());
    for (&item_id, &cantidad) in esperados {
        let nombre = store.find_item(item_id).await?.map(|i| i.nombre);
        out.push(json!({
            "item_id": item_id,
            "nombre": nombre,
            "cantidad_esperada": cantidad,
        }));
    }
    Ok(Value::Array(out))
}

/// The count of `tipo` still waiting for confirmation
async fn open_count_of(
    store: &dyn Store,
    cirugia_id: i32,
    tipo: TipoConteo,
) -> HttpResult<Option<ConteoInstrumentacion>> {
    Ok(store
        .list_counts(cirugia_id)
        .await?
        .into_iter()
        .filter(|c| c.tipo_conteo == tipo && !c.confirmado)
        .last())
}

/// Detail state for the initial count; an explicit `faltante` wins
fn initial_detail_state(explicit: Option<&str>, esperada: i32, contada: i32) -> EstadoConteo {
    match explicit {
        Some("faltante") => EstadoConteo::Faltante,
        _ => EstadoConteo::from_quantities(esperada, contada),
    }
}

/// Detail state for the final count and the incident it raises, if any
fn final_detail_state(
    estado_final: &str,
    esperada: i32,
    contada: i32,
) -> HttpResult<(EstadoConteo, Option<(TipoIncidente, Severidad)>)> {
    match estado_final {
        "correcto" => Ok((EstadoConteo::from_quantities(esperada, contada), None)),
        "perdido" => Ok((
            EstadoConteo::Faltante,
            Some((TipoIncidente::InstrumentoPerdido, Severidad::Critica)),
        )),
        "danado" | "dañado" => Ok((
            EstadoConteo::Danado,
            Some((TipoIncidente::InstrumentoDanado, Severidad::Media)),
        )),
        "contaminado" => Ok((
            EstadoConteo::Otro,
            Some((TipoIncidente::InstrumentoContaminado, Severidad::Alta)),
        )),
        other => Err(HttpError::bad_request(format!("Estado final inválido: {}", other))),
    }
}

fn count_rules() -> Rules {
    Rules::new().field(
        "instrumentos",
        RequiredValidator::with_message("Debe especificar los instrumentos contados"),
    )
}

fn ensure_confirmed(confirmacion: bool) -> HttpResult<()> {
    if confirmacion {
        Ok(())
    } else {
        Err(HttpError::bad_request("Debe confirmar el conteo"))
    }
}

// ---------------------------------------------------------------------------
// Assigned surgeries
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AssignedQuery {
    fecha: Option<String>,
    estado: Option<String>,
}

pub async fn list_assigned(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<AssignedQuery>,
) -> HttpResult<ApiResponse> {
    let mut filtro = FiltroCirugias {
        instrumentador_id: Some(user.user_id),
        estados: match query_text(&query.estado) {
            Some("pendiente") => EstadoCirugia::pending(),
            _ => query_value::<EstadoCirugia>(&query.estado, "estado")?
                .into_iter()
                .collect(),
        },
        orden: SortOrder::Asc,
        ..Default::default()
    };
    if let Some(fecha) = query_value::<NaiveDate>(&query.fecha, "fecha")? {
        let (inicio, fin) = day_bounds(fecha);
        filtro.desde = Some(inicio);
        filtro.hasta = Some(fin - Duration::seconds(1));
    }

    let store = state.store();
    let cirugias = store.list_surgeries(&filtro).await?;
    Ok(ApiResponse::ok(
        "Cirugías asignadas obtenidas exitosamente",
        Value::Array(views::surgeries(store, &cirugias).await?),
    ))
}

// ---------------------------------------------------------------------------
// Instrument requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InstrumentLine {
    instrumento_id: i32,
    cantidad: i32,
    tipo: Option<TipoEntidad>,
    entidad_suministradora_id: Option<i32>,
    observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstrumentRequest {
    #[serde(default)]
    instrumentos: Vec<InstrumentLine>,
}

#[derive(Debug, Deserialize)]
struct AdditionalRequest {
    tipo: Option<TipoEntidad>,
    instrumento_id: i32,
    cantidad: i32,
    urgencia: Option<bool>,
    motivo: Option<String>,
}

fn positive_quantity(item_id: i32, cantidad: i32) -> HttpResult<()> {
    if cantidad <= 0 {
        return Err(HttpError::bad_request(format!(
            "La cantidad del item {} debe ser mayor a cero",
            item_id
        )));
    }
    Ok(())
}

/// Record a material request and tell the supplying desk about it
async fn file_request(
    store: &dyn Store,
    item: &Item,
    entidad: &EntidadSuministradora,
    nueva: NuevaSolicitud,
) -> HttpResult<SolicitudCirugia> {
    let solicitud = store.create_request(nueva).await?;
    let cirugia_id = solicitud.cirugia_id;

    store
        .create_notification(NuevaNotificacion {
            usuario_id: entidad.responsable_id,
            entidad_suministradora_id: Some(entidad.id),
            tipo: TipoNotificacion::SolicitudMaterial,
            titulo: format!("Solicitud de {} para cirugía #{}", item.nombre, cirugia_id),
            mensaje: format!(
                "Se solicitan {} {} de {} para la cirugía #{}",
                solicitud.cantidad_solicitada, item.unidad_medida, item.nombre, cirugia_id
            ),
            prioridad: solicitud.prioridad,
            url_accion: Some(format!("/api/v1/suministros/cirugias/{}/stock", cirugia_id)),
        })
        .await?;
    Ok(solicitud)
}

pub async fn request_instruments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: InstrumentRequest = parse_body(body)?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    if !cirugia.estado.accepts_instrument_request() {
        return Err(HttpError::bad_request(
            "Solo se pueden solicitar instrumentos antes de iniciar la cirugía",
        ));
    }
    if req.instrumentos.is_empty() {
        return Err(HttpError::bad_request("Debe especificar al menos un instrumento"));
    }

    let mut resueltas = Vec::with_capacity(req.instrumentos.len());
    for line in req.instrumentos {
        positive_quantity(line.instrumento_id, line.cantidad)?;
        let item = load_item(store, line.instrumento_id).await?;
        let entidad = supplying_entity(
            store,
            line.entidad_suministradora_id,
            line.tipo.unwrap_or(TipoEntidad::Central),
        )
        .await?;
        resueltas.push((item, entidad, line.cantidad, line.observaciones));
    }

    let mut solicitudes = Vec::with_capacity(resueltas.len());
    for (item, entidad, cantidad, observaciones) in resueltas {
        let nueva = NuevaSolicitud {
            cirugia_id: cirugia.id,
            item_id: item.id,
            entidad_suministradora_id: entidad.id,
            cantidad_solicitada: cantidad,
            prioridad: cirugia.prioridad,
            solicitado_por_id: user.user_id,
            observaciones: non_blank(observaciones),
        };
        let solicitud = file_request(store, &item, &entidad, nueva).await?;
        solicitudes.push(solicitud);
    }

    tracing::info!(
        cirugia_id = cirugia.id,
        solicitudes = solicitudes.len(),
        "Instruments requested"
    );
    Ok(ApiResponse::created(
        "Solicitud de instrumentos registrada correctamente",
        views::to_json(&solicitudes)?,
    ))
}

pub async fn request_additional(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "instrumento_id",
            NumericValidator::positive_id().message("El instrumento es requerido"),
        )
        .field(
            "cantidad",
            NumericValidator::new()
                .integer_only()
                .min(1.0)
                .message("La cantidad debe ser mayor a cero"),
        );
    let req: AdditionalRequest = validate_body(body, &rules, "Datos de solicitud inválidos").await?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    if !cirugia.estado.accepts_additional_stock() {
        return Err(HttpError::bad_request(
            "Solo se pueden solicitar instrumentos adicionales durante la cirugía",
        ));
    }
    let item = load_item(store, req.instrumento_id).await?;
    let entidad = supplying_entity(store, None, req.tipo.unwrap_or(TipoEntidad::Central)).await?;
    let prioridad = if req.urgencia.unwrap_or(false) {
        Prioridad::Urgente
    } else {
        Prioridad::Alta
    };

    let nueva = NuevaSolicitud {
        cirugia_id: cirugia.id,
        item_id: item.id,
        entidad_suministradora_id: entidad.id,
        cantidad_solicitada: req.cantidad,
        prioridad,
        solicitado_por_id: user.user_id,
        observaciones: non_blank(req.motivo),
    };
    let solicitud = file_request(store, &item, &entidad, nueva).await?;

    tracing::info!(cirugia_id = cirugia.id, %prioridad, "Additional instrument requested");
    Ok(ApiResponse::created(
        "Solicitud de instrumento adicional registrada",
        views::to_json(&solicitud)?,
    ))
}

// ---------------------------------------------------------------------------
// Start and finish
// ---------------------------------------------------------------------------

pub async fn start_surgery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;
    let data = surgery_flow::start(store, cirugia).await?;
    Ok(ApiResponse::ok("Cirugía iniciada exitosamente", data))
}

pub async fn finish_surgery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: FinishRequest = parse_body(body)?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;
    let data = surgery_flow::finish(store, cirugia, req).await?;
    Ok(ApiResponse::ok("Cirugía finalizada exitosamente", data))
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InitialCountLine {
    instrumento_id: i32,
    estado: Option<String>,
    cantidad_actual: i32,
    cantidad_requerida: Option<i32>,
    observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitialCountRequest {
    instrumentos: Vec<InitialCountLine>,
    #[serde(default)]
    confirmacion: bool,
}

#[derive(Debug, Deserialize)]
struct FinalCountLine {
    instrumento_id: i32,
    estado_final: String,
    cantidad_final: i32,
    observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinalCountRequest {
    instrumentos: Vec<FinalCountLine>,
    #[serde(default)]
    confirmacion: bool,
}

#[derive(Debug, Default, Deserialize)]
struct OpenCountRequest {
    observaciones: Option<String>,
}

pub async fn open_initial_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: OpenCountRequest = parse_body(body)?;
    let store = state.store();
    let mut cirugia = assigned_surgery(store, &user, id).await?;

    if !cirugia.estado.can_open_initial_count() {
        return Err(HttpError::bad_request(
            "No se puede iniciar el conteo inicial desde el estado actual",
        ));
    }
    let esperados = expected_initial(store, cirugia.id).await?;
    let previous = cirugia.estado;
    cirugia.estado = EstadoCirugia::ConteoInicial;

    let conteo = store
        .open_count(
            NuevoConteo {
                cirugia_id: cirugia.id,
                tipo_conteo: TipoConteo::Inicial,
                realizado_por_id: user.user_id,
                observaciones: non_blank(req.observaciones),
            },
            &cirugia,
            previous,
        )
        .await?;

    tracing::info!(cirugia_id = cirugia.id, conteo_id = conteo.id, "Initial count opened");
    Ok(ApiResponse::created(
        "Conteo inicial iniciado",
        json!({
            "conteo": conteo,
            "instrumentos_esperados": expected_view(store, &esperados).await?,
        }),
    ))
}

pub async fn close_initial_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: InitialCountRequest =
        validate_body(body, &count_rules(), "Datos de conteo inválidos").await?;
    let store = state.store();
    let mut cirugia = assigned_surgery(store, &user, id).await?;

    let sin_conteo = || HttpError::bad_request("No hay un conteo inicial en curso");
    if cirugia.estado != EstadoCirugia::ConteoInicial {
        return Err(sin_conteo());
    }
    ensure_confirmed(req.confirmacion)?;
    let mut conteo = open_count_of(store, cirugia.id, TipoConteo::Inicial)
        .await?
        .ok_or_else(sin_conteo)?;

    let esperados = expected_initial(store, cirugia.id).await?;
    let detalles: Vec<NuevoDetalle> = req
        .instrumentos
        .into_iter()
        .map(|line| {
            let esperada = line
                .cantidad_requerida
                .or_else(|| esperados.get(&line.instrumento_id).copied())
                .unwrap_or(line.cantidad_actual);
            NuevoDetalle {
                item_id: line.instrumento_id,
                cantidad_esperada: esperada,
                cantidad_contada: line.cantidad_actual,
                estado: initial_detail_state(line.estado.as_deref(), esperada, line.cantidad_actual),
                observaciones: non_blank(line.observaciones),
            }
        })
        .collect();

    conteo.confirmado = true;
    cirugia.estado = EstadoCirugia::EnPreparacion;
    let (detalles, _) = store
        .close_count(&conteo, detalles, Vec::new(), &cirugia, EstadoCirugia::ConteoInicial)
        .await?;
    let faltantes: Vec<&DetalleConteo> = detalles
        .iter()
        .filter(|d| d.estado == EstadoConteo::Faltante)
        .collect();

    if !faltantes.is_empty() {
        tracing::warn!(
            cirugia_id = cirugia.id,
            faltantes = faltantes.len(),
            "Initial count closed with missing instruments"
        );
    }
    Ok(ApiResponse::ok(
        "Conteo inicial finalizado",
        json!({ "conteo": conteo, "detalles": detalles, "faltantes": faltantes }),
    ))
}

pub async fn open_final_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    OptionalJsonBody(body): OptionalJsonBody,
) -> HttpResult<ApiResponse> {
    let req: OpenCountRequest = parse_body(body)?;
    let store = state.store();
    let mut cirugia = assigned_surgery(store, &user, id).await?;

    if !cirugia.estado.can_open_final_count() {
        return Err(HttpError::bad_request(
            "Solo se puede iniciar el conteo final durante la cirugía",
        ));
    }
    let esperados = expected_final(store, cirugia.id).await?;
    let previous = cirugia.estado;
    cirugia.estado = EstadoCirugia::ConteoFinal;

    let conteo = store
        .open_count(
            NuevoConteo {
                cirugia_id: cirugia.id,
                tipo_conteo: TipoConteo::Final,
                realizado_por_id: user.user_id,
                observaciones: non_blank(req.observaciones),
            },
            &cirugia,
            previous,
        )
        .await?;

    tracing::info!(cirugia_id = cirugia.id, conteo_id = conteo.id, "Final count opened");
    Ok(ApiResponse::created(
        "Conteo final iniciado",
        json!({
            "conteo": conteo,
            "instrumentos_esperados": expected_view(store, &esperados).await?,
        }),
    ))
}

pub async fn close_final_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: FinalCountRequest =
        validate_body(body, &count_rules(), "Datos de conteo inválidos").await?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    let sin_conteo = || HttpError::bad_request("No hay un conteo final en curso");
    if cirugia.estado != EstadoCirugia::ConteoFinal {
        return Err(sin_conteo());
    }
    ensure_confirmed(req.confirmacion)?;
    let mut conteo = open_count_of(store, cirugia.id, TipoConteo::Final)
        .await?
        .ok_or_else(sin_conteo)?;

    let esperados = expected_final(store, cirugia.id).await?;
    let nombres: HashMap<i32, String> = store
        .list_items()
        .await?
        .into_iter()
        .map(|i| (i.id, i.nombre))
        .collect();

    let mut detalles = Vec::with_capacity(req.instrumentos.len());
    let mut incidentes = Vec::new();
    for line in req.instrumentos {
        let esperada = esperados
            .get(&line.instrumento_id)
            .copied()
            .unwrap_or(line.cantidad_final);
        let (estado, incidente) =
            final_detail_state(line.estado_final.trim(), esperada, line.cantidad_final)?;

        if let Some((tipo_incidente, severidad)) = incidente {
            let nombre = nombres
                .get(&line.instrumento_id)
                .cloned()
                .unwrap_or_else(|| format!("item {}", line.instrumento_id));
            incidentes.push(NuevoIncidente {
                cirugia_id: Some(cirugia.id),
                tipo_incidente,
                severidad,
                descripcion: format!(
                    "Conteo final: {} reportado como {}",
                    nombre,
                    line.estado_final.trim()
                ),
                reportado_por_id: user.user_id,
                acciones_tomadas: None,
            });
        }
        detalles.push(NuevoDetalle {
            item_id: line.instrumento_id,
            cantidad_esperada: esperada,
            cantidad_contada: line.cantidad_final,
            estado,
            observaciones: non_blank(line.observaciones),
        });
    }

    conteo.confirmado = true;
    let (detalles, incidentes) = store
        .close_count(&conteo, detalles, incidentes, &cirugia, EstadoCirugia::ConteoFinal)
        .await?;

    if !incidentes.is_empty() {
        tracing::warn!(
            cirugia_id = cirugia.id,
            incidentes = incidentes.len(),
            "Final count raised incidents"
        );
    }
    Ok(ApiResponse::ok(
        "Conteo final finalizado",
        json!({ "conteo": conteo, "detalles": detalles, "incidentes": incidentes }),
    ))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DamageReport {
    instrumento_id: i32,
    tipo_dano: String,
    descripcion: String,
    impacto_cirugia: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncidentReport {
    tipo_incidente: String,
    descripcion: String,
    impacto: Option<String>,
    acciones_tomadas: Option<String>,
    #[serde(default)]
    requiere_accion_inmediata: bool,
}

pub async fn report_damaged(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "instrumento_id",
            NumericValidator::positive_id().message("El instrumento es requerido"),
        )
        .field("tipo_dano", RequiredValidator::with_message("El tipo de daño es requerido"))
        .field("descripcion", RequiredValidator::with_message("La descripción es requerida"));
    let req: DamageReport = validate_body(body, &rules, "Datos de reporte inválidos").await?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    if !cirugia.estado.accepts_damage_report() {
        return Err(HttpError::bad_request(
            "No se pueden reportar instrumentos dañados en el estado actual de la cirugía",
        ));
    }
    let item = load_item(store, req.instrumento_id).await?;
    let impacto = non_blank(req.impacto_cirugia);

    let incidente = store
        .create_incident(NuevoIncidente {
            cirugia_id: Some(cirugia.id),
            tipo_incidente: TipoIncidente::InstrumentoDanado,
            severidad: if impacto.is_some() {
                Severidad::Alta
            } else {
                Severidad::Media
            },
            descripcion: format!("{}: {}", req.tipo_dano.trim(), req.descripcion.trim()),
            reportado_por_id: user.user_id,
            acciones_tomadas: impacto,
        })
        .await?;

    tracing::warn!(cirugia_id = cirugia.id, item_id = item.id, "Damaged instrument reported");
    Ok(ApiResponse::created(
        "Instrumento dañado reportado",
        views::to_json(&incidente)?,
    ))
}

/// Explicit urgency wins, then the reported impact, then `media`
fn incident_severity(requiere_accion_inmediata: bool, impacto: Option<&str>) -> Severidad {
    if requiere_accion_inmediata {
        return Severidad::Critica;
    }
    impacto
        .and_then(|i| i.trim().parse().ok())
        .unwrap_or(Severidad::Media)
}

/// Urgent notification for every active head nurse
async fn alert_head_nurses(store: &dyn Store, cirugia: &Cirugia, incidente: &Incidente) -> HttpResult<()> {
    let Some(rol) = store.find_role_by_name(Role::ENFERMERA_JEFE).await? else {
        return Ok(());
    };
    let enfermeras = store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.rol_id == rol.id && u.activo);

    for enfermera in enfermeras {
        store
            .create_notification(NuevaNotificacion {
                usuario_id: Some(enfermera.id),
                entidad_suministradora_id: None,
                tipo: TipoNotificacion::Incidente,
                titulo: format!("Incidente en cirugía #{}", cirugia.id),
                mensaje: incidente.descripcion.clone(),
                prioridad: Prioridad::Urgente,
                url_accion: Some(format!("/api/v1/enfermera_jefe/cirugias/{}", cirugia.id)),
            })
            .await?;
    }
    Ok(())
}

pub async fn report_incident(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "tipo_incidente",
            RequiredValidator::with_message("El tipo de incidente es requerido"),
        )
        .field("descripcion", RequiredValidator::with_message("La descripción es requerida"));
    let req: IncidentReport = validate_body(body, &rules, "Datos de incidente inválidos").await?;
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    let tipo_incidente: TipoIncidente = req
        .tipo_incidente
        .trim()
        .parse()
        .map_err(|_| HttpError::bad_request("Tipo de incidente inválido"))?;
    let incidente = store
        .create_incident(NuevoIncidente {
            cirugia_id: Some(cirugia.id),
            tipo_incidente,
            severidad: incident_severity(req.requiere_accion_inmediata, req.impacto.as_deref()),
            descripcion: req.descripcion,
            reportado_por_id: user.user_id,
            acciones_tomadas: non_blank(req.acciones_tomadas),
        })
        .await?;

    if req.requiere_accion_inmediata {
        alert_head_nurses(store, &cirugia, &incidente).await?;
    }
    tracing::warn!(
        cirugia_id = cirugia.id,
        incidente_id = incidente.id,
        severidad = %incidente.severidad,
        "Incident reported"
    );
    Ok(ApiResponse::created(
        "Incidente reportado correctamente",
        views::to_json(&incidente)?,
    ))
}

// ---------------------------------------------------------------------------
// Live views
// ---------------------------------------------------------------------------

/// Estimated minutes left, only while the surgery runs
fn remaining_minutes(
    estado: EstadoCirugia,
    estimada: Option<i32>,
    transcurridos: Option<i64>,
) -> Option<i64> {
    if estado != EstadoCirugia::EnCurso {
        return None;
    }
    let estimada = i64::from(estimada?);
    Some((estimada - transcurridos?).max(0))
}

pub async fn surgery_time(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;
    let estimada = store
        .find_surgery_type(cirugia.tipo_cirugia_id)
        .await?
        .and_then(|t| t.duracion_estimada_minutos);
    let transcurridos = cirugia.elapsed_minutes(Utc::now());

    Ok(ApiResponse::ok(
        "Tiempo de cirugía obtenido exitosamente",
        json!({
            "id": cirugia.id,
            "estado": cirugia.estado,
            "fecha_programada": cirugia.fecha_programada,
            "fecha_inicio": cirugia.fecha_inicio,
            "fecha_fin": cirugia.fecha_fin,
            "minutos_transcurridos": transcurridos,
            "duracion_estimada_minutos": estimada,
            "minutos_restantes_estimados": remaining_minutes(cirugia.estado, estimada, transcurridos),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CurrentInstrumentsQuery {
    tipo: Option<String>,
    estado: Option<String>,
}

pub async fn current_instruments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    QueryParams(query): QueryParams<CurrentInstrumentsQuery>,
) -> HttpResult<ApiResponse> {
    let tipo = query_value::<TipoEntidad>(&query.tipo, "tipo")?;
    let adicional = match query_text(&query.estado) {
        Some("adicional") => Some(true),
        Some("asignado") => Some(false),
        _ => None,
    };
    let store = state.store();
    let cirugia = assigned_surgery(store, &user, id).await?;

    let tipos: HashMap<i32, TipoEntidad> = store
        .list_entities()
        .await?
        .into_iter()
        .map(|e| (e.id, e.tipo))
        .collect();
    let asignaciones: Vec<CirugiaStockAsignado> = store
        .list_allocations(cirugia.id)
        .await?
        .into_iter()
        .filter(|a| {
            tipo.map_or(true, |t| tipos.get(&a.entidad_suministradora_id) == Some(&t))
        })
        .filter(|a| adicional.map_or(true, |flag| a.es_adicional == flag))
        .collect();

    Ok(ApiResponse::ok(
        "Instrumentos actuales obtenidos exitosamente",
        Value::Array(views::allocations(store, &asignaciones).await?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_sums_per_item() {
        let totals = aggregate([(3, 2), (1, 5), (3, 4)]);
        assert_eq!(totals.into_iter().collect::<Vec<_>>(), vec![(1, 5), (3, 6)]);
    }

    #[test]
    fn test_initial_detail_state() {
        assert_eq!(initial_detail_state(None, 4, 4), EstadoConteo::Correcto);
        assert_eq!(initial_detail_state(None, 4, 3), EstadoConteo::Faltante);
        assert_eq!(initial_detail_state(Some("correcto"), 4, 6), EstadoConteo::Sobrante);
        assert_eq!(initial_detail_state(Some("faltante"), 4, 4), EstadoConteo::Faltante);
    }

    #[test]
    fn test_final_detail_state_raises_incidents() {
        assert_eq!(
            final_detail_state("correcto", 2, 2).unwrap(),
            (EstadoConteo::Correcto, None)
        );
        assert_eq!(
            final_detail_state("perdido", 2, 1).unwrap(),
            (
                EstadoConteo::Faltante,
                Some((TipoIncidente::InstrumentoPerdido, Severidad::Critica))
            )
        );
        assert_eq!(
            final_detail_state("dañado", 1, 1).unwrap().1,
            Some((TipoIncidente::InstrumentoDanado, Severidad::Media))
        );
        assert_eq!(
            final_detail_state("contaminado", 1, 1).unwrap(),
            (
                EstadoConteo::Otro,
                Some((TipoIncidente::InstrumentoContaminado, Severidad::Alta))
            )
        );
        assert!(final_detail_state("roto", 1, 1).is_err());
    }

    #[test]
    fn test_incident_severity() {
        assert_eq!(incident_severity(true, Some("baja")), Severidad::Critica);
        assert_eq!(incident_severity(false, Some("alta")), Severidad::Alta);
        assert_eq!(incident_severity(false, Some("enorme")), Severidad::Media);
        assert_eq!(incident_severity(false, None), Severidad::Media);
    }

    #[test]
    fn test_remaining_minutes_only_while_running() {
        assert_eq!(remaining_minutes(EstadoCirugia::EnCurso, Some(90), Some(30)), Some(60));
        assert_eq!(remaining_minutes(EstadoCirugia::EnCurso, Some(90), Some(120)), Some(0));
        assert_eq!(remaining_minutes(EstadoCirugia::Finalizada, Some(90), Some(30)), None);
        assert_eq!(remaining_minutes(EstadoCirugia::EnCurso, None, Some(30)), None);
    }
}
