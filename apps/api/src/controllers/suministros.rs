//! Supply desks (central sterile and pharmacy): stock, deliveries,
//! allocations to surgeries, notifications and sterilization.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, State};
use chrono::{Duration, Utc};
use quirofano_http::{
    parse_body, validate_body, ApiResponse, HttpError, HttpResult, JsonBody, QueryParams,
};
use quirofano_orm::models::*;
use quirofano_orm::{ModelError, Store};
use quirofano_validation::{NumericValidator, RequiredValidator, Rules};
use serde::Deserialize;
use serde_json::Value;

use super::surgery_flow::load_surgery;
use super::{found, non_blank, query_flag, query_text, query_time, query_value, referenced};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::views;

const ITEMS_REQUERIDOS: &str = "Debe especificar al menos un item";

/// One requested (item, entity, quantity) line
#[derive(Debug, Deserialize)]
struct LineRequest {
    item_id: i32,
    cantidad: i32,
    entidad_suministradora_id: i32,
    urgencia: Option<bool>,
    motivo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinesRequest {
    items: Vec<LineRequest>,
}

fn lines_rules() -> Rules {
    Rules::new().field("items", RequiredValidator::with_message(ITEMS_REQUERIDOS))
}

/// Quantities must be positive so a reservation can never add stock back
fn stock_lines(items: &[LineRequest]) -> HttpResult<Vec<LineaStock>> {
    items
        .iter()
        .map(|line| {
            if line.cantidad <= 0 {
                return Err(HttpError::bad_request(format!(
                    "La cantidad del item {} debe ser mayor a cero",
                    line.item_id
                )));
            }
            Ok(LineaStock {
                item_id: line.item_id,
                entidad_suministradora_id: line.entidad_suministradora_id,
                cantidad: line.cantidad,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    tipo: Option<String>,
    categoria: Option<String>,
    disponible: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InUseQuery {
    tipo: Option<String>,
    cirugia_id: Option<String>,
}

/// Items and entities by id, for filtering stock rows
struct StockContext {
    items: HashMap<i32, Item>,
    entidades: HashMap<i32, EntidadSuministradora>,
}

impl StockContext {
    async fn load(store: &dyn Store) -> HttpResult<Self> {
        Ok(Self {
            items: store.list_items().await?.into_iter().map(|i| (i.id, i)).collect(),
            entidades: store
                .list_entities()
                .await?
                .into_iter()
                .map(|e| (e.id, e))
                .collect(),
        })
    }

    /// `reutilizable` / `no_reutilizable` test the item; `central` / `farmacia` the entity
    fn matches_tipo(&self, stock: &Stock, tipo: Option<&str>) -> bool {
        let item = self.items.get(&stock.item_id);
        let entidad = self.entidades.get(&stock.entidad_suministradora_id);
        match tipo {
            None => true,
            Some("reutilizable") => item.map_or(false, |i| i.es_reutilizable),
            Some("no_reutilizable") => item.map_or(false, |i| !i.es_reutilizable),
            Some(other) => match other.parse::<TipoEntidad>() {
                Ok(tipo) => entidad.map_or(false, |e| e.tipo == tipo),
                Err(_) => true,
            },
        }
    }

    fn matches_categoria(&self, stock: &Stock, categoria: Option<i32>) -> bool {
        categoria.map_or(true, |c| {
            self.items
                .get(&stock.item_id)
                .map_or(false, |i| i.categoria_id == Some(c))
        })
    }
}

async fn stock_views(store: &dyn Store, rows: &[Stock]) -> HttpResult<Value> {
    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        data.push(views::stock(store, row).await?);
    }
    Ok(Value::Array(data))
}

pub async fn list_stock(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<StockQuery>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let context = StockContext::load(store).await?;
    let tipo = query_text(&query.tipo);
    let categoria = query_value::<i32>(&query.categoria, "categoria")?;
    let disponible = query_flag(&query.disponible);

    let rows: Vec<Stock> = store
        .list_stock()
        .await?
        .into_iter()
        .filter(|s| context.matches_tipo(s, tipo))
        .filter(|s| context.matches_categoria(s, categoria))
        .filter(|s| match disponible {
            Some(true) => s.cantidad_disponible > 0,
            Some(false) => s.cantidad_disponible == 0,
            None => true,
        })
        .collect();

    Ok(ApiResponse::ok(
        "Stock obtenido exitosamente",
        stock_views(store, &rows).await?,
    ))
}

pub async fn list_stock_in_use(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<InUseQuery>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let context = StockContext::load(store).await?;
    let tipo = query_text(&query.tipo);
    let asignados: Option<HashSet<i32>> = match query_value::<i32>(&query.cirugia_id, "cirugia_id")? {
        Some(cirugia_id) => Some(
            store
                .list_allocations(cirugia_id)
                .await?
                .into_iter()
                .map(|a| a.stock_id)
                .collect(),
        ),
        None => None,
    };

    let rows: Vec<Stock> = store
        .list_stock()
        .await?
        .into_iter()
        .filter(|s| s.cantidad_en_uso > 0)
        .filter(|s| context.matches_tipo(s, tipo))
        .filter(|s| asignados.as_ref().map_or(true, |ids| ids.contains(&s.id)))
        .collect();

    Ok(ApiResponse::ok(
        "Stock en uso obtenido exitosamente",
        stock_views(store, &rows).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct NewStockRequest {
    item_id: i32,
    entidad_suministradora_id: i32,
    cantidad_disponible: i32,
    cantidad_minima: Option<i32>,
    lote: Option<String>,
    fecha_vencimiento: Option<chrono::NaiveDate>,
    ubicacion_almacen: Option<String>,
}

pub async fn create_stock(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field("item_id", NumericValidator::positive_id().message("El item es requerido"))
        .field(
            "entidad_suministradora_id",
            NumericValidator::positive_id().message("La entidad suministradora es requerida"),
        )
        .field(
            "cantidad_disponible",
            NumericValidator::new()
                .integer_only()
                .min(0.0)
                .message("La cantidad disponible debe ser un número no negativo"),
        );
    let req: NewStockRequest = validate_body(body, &rules, "Datos de stock inválidos").await?;
    let store = state.store();

    found(store.find_item(req.item_id).await?, "Item no encontrado")?;
    found(
        store.find_entity(req.entidad_suministradora_id).await?,
        "Entidad suministradora no encontrada",
    )?;

    let stock = store
        .create_stock(NuevoStock {
            item_id: req.item_id,
            entidad_suministradora_id: req.entidad_suministradora_id,
            cantidad_disponible: req.cantidad_disponible,
            cantidad_minima: req.cantidad_minima.unwrap_or(0),
            lote: non_blank(req.lote),
            fecha_vencimiento: req.fecha_vencimiento,
            ubicacion_almacen: req.ubicacion_almacen,
        })
        .await
        .map_err(|error| match error {
            ModelError::Conflict(_) => {
                HttpError::conflict("Ya existe stock para este item, entidad y lote")
            }
            other => other.into(),
        })?;

    tracing::info!(stock_id = stock.id, item_id = stock.item_id, "Stock registered");
    Ok(ApiResponse::created(
        "Stock registrado exitosamente",
        views::stock(store, &stock).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateStockRequest {
    cantidad: Option<i32>,
    estado: Option<String>,
    ubicacion: Option<String>,
    observaciones: Option<String>,
}

/// Tell the entity's responsable that a row fell to its minimum
async fn notify_low_stock(store: &dyn Store, stock: &Stock) -> HttpResult<()> {
    let entidad = store.find_entity(stock.entidad_suministradora_id).await?;
    let item = store.find_item(stock.item_id).await?;
    let nombre = item.map_or_else(|| format!("item {}", stock.item_id), |i| i.nombre);

    store
        .create_notification(NuevaNotificacion {
            usuario_id: entidad.as_ref().and_then(|e| e.responsable_id),
            entidad_suministradora_id: Some(stock.entidad_suministradora_id),
            tipo: TipoNotificacion::StockBajo,
            titulo: "Stock bajo".to_string(),
            mensaje: format!(
                "El stock de {} está en {} unidades (mínimo {})",
                nombre, stock.cantidad_disponible, stock.cantidad_minima
            ),
            prioridad: Prioridad::Alta,
            url_accion: Some(format!("/api/v1/suministros/stock/{}", stock.id)),
        })
        .await?;
    tracing::warn!(stock_id = stock.id, disponible = stock.cantidad_disponible, "Low stock");
    Ok(())
}

pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: UpdateStockRequest = parse_body(body)?;
    let store = state.store();
    let mut stock = found(store.find_stock(id).await?, "Stock no encontrado")?;

    if let Some(cantidad) = req.cantidad {
        if cantidad < 0 {
            return Err(HttpError::bad_request("La cantidad no puede ser negativa"));
        }
        stock.cantidad_disponible = cantidad;
    }
    if req.ubicacion.is_some() {
        stock.ubicacion_almacen = req.ubicacion;
    }
    if req.estado.is_some() || req.observaciones.is_some() {
        tracing::debug!(
            stock_id = id,
            estado = ?req.estado,
            observaciones = ?req.observaciones,
            "Stock update notes"
        );
    }

    let stock = store.update_stock(&stock).await?;
    if stock.is_low() {
        notify_low_stock(store, &stock).await?;
    }
    Ok(ApiResponse::ok(
        "Stock actualizado correctamente",
        views::stock(store, &stock).await?,
    ))
}

// ---------------------------------------------------------------------------
// Deliveries
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DeliveryRequest {
    cirugia_id: i32,
    items: Vec<LineRequest>,
    receptor_id: i32,
    observaciones: Option<String>,
    es_urgente: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReceiptLine {
    item_id: i32,
    cantidad_recibida: i32,
    observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptRequest {
    entrega_id: i32,
    receptor_id: i32,
    cirugia_id: i32,
    #[serde(default)]
    confirmacion_items: Vec<ReceiptLine>,
}

const RECEPTOR_NO_ENCONTRADO: &str = "Receptor no encontrado";

pub async fn create_delivery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "cirugia_id",
            NumericValidator::positive_id().message("La cirugía es requerida"),
        )
        .field("items", RequiredValidator::with_message(ITEMS_REQUERIDOS))
        .field(
            "receptor_id",
            NumericValidator::positive_id().message("El receptor es requerido"),
        );
    let req: DeliveryRequest = validate_body(body, &rules, "Datos de entrega inválidos").await?;
    let store = state.store();

    load_surgery(store, req.cirugia_id).await?;
    found(store.find_user(req.receptor_id).await?, RECEPTOR_NO_ENCONTRADO)?;
    let lineas = stock_lines(&req.items)?;

    let entregas = store
        .deliver_stock(
            req.cirugia_id,
            &lineas,
            DatosEntrega {
                entregado_por_id: user.user_id,
                recibido_por_id: req.receptor_id,
                es_urgente: req.es_urgente.unwrap_or(false),
                observaciones: req.observaciones,
            },
        )
        .await?;

    tracing::info!(
        cirugia_id = req.cirugia_id,
        lineas = entregas.len(),
        "Stock delivered"
    );
    Ok(ApiResponse::ok(
        "Entrega registrada correctamente",
        views::to_json(&entregas)?,
    ))
}

pub async fn register_receipt(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "entrega_id",
            NumericValidator::positive_id().message("La entrega es requerida"),
        )
        .field(
            "receptor_id",
            NumericValidator::positive_id().message("El receptor es requerido"),
        )
        .field(
            "cirugia_id",
            NumericValidator::positive_id().message("La cirugía es requerida"),
        );
    let req: ReceiptRequest = validate_body(body, &rules, "Datos de recepción inválidos").await?;
    let store = state.store();

    let mut entrega = found(store.find_delivery(req.entrega_id).await?, "Entrega no encontrada")?;
    found(store.find_user(req.receptor_id).await?, RECEPTOR_NO_ENCONTRADO)?;
    if entrega.cirugia_id != req.cirugia_id {
        return Err(HttpError::bad_request("La cirugía no coincide con la entrega"));
    }
    if let Some(ajena) = req
        .confirmacion_items
        .iter()
        .find(|line| line.item_id != entrega.item_id)
    {
        return Err(HttpError::bad_request(format!(
            "El item {} no corresponde a esta entrega",
            ajena.item_id
        )));
    }

    entrega.recibido_por_id = Some(req.receptor_id);
    for line in &req.confirmacion_items {
        if line.cantidad_recibida != entrega.cantidad_entregada {
            tracing::warn!(
                entrega_id = entrega.id,
                entregado = entrega.cantidad_entregada,
                recibido = line.cantidad_recibida,
                "Delivery quantity mismatch"
            );
            entrega.append_observacion(&format!(
                "DISCREPANCIA: entregado {}, recibido {}",
                entrega.cantidad_entregada, line.cantidad_recibida
            ));
        }
        if let Some(nota) = line.observaciones.as_deref().filter(|n| !n.trim().is_empty()) {
            entrega.append_observacion(nota);
        }
    }

    let entrega = store.update_delivery(&entrega).await?;
    Ok(ApiResponse::ok(
        "Recepción registrada correctamente",
        views::to_json(&entrega)?,
    ))
}

// ---------------------------------------------------------------------------
// Allocation to surgeries
// ---------------------------------------------------------------------------

pub async fn allocate_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: LinesRequest = validate_body(body, &lines_rules(), "Datos de asignación inválidos").await?;
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    let lineas = stock_lines(&req.items)?;

    let asignaciones = store
        .allocate_stock(
            cirugia.id,
            &lineas,
            DatosAsignacion {
                asignado_por_id: user.user_id,
                es_adicional: false,
                motivo_adicional: None,
            },
        )
        .await?;

    tracing::info!(cirugia_id = cirugia.id, lineas = asignaciones.len(), "Stock allocated");
    Ok(ApiResponse::ok(
        "Stock asignado correctamente",
        views::to_json(&asignaciones)?,
    ))
}

pub async fn list_allocated_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    let asignaciones = store.list_allocations(cirugia.id).await?;
    Ok(ApiResponse::ok(
        "Stock asignado obtenido exitosamente",
        Value::Array(views::allocations(store, &asignaciones).await?),
    ))
}

/// Distinct reasons given across the lines
fn additional_reason(items: &[LineRequest]) -> Option<String> {
    let mut motivos: Vec<&str> = Vec::new();
    for motivo in items.iter().filter_map(|line| line.motivo.as_deref()) {
        let motivo = motivo.trim();
        if !motivo.is_empty() && !motivos.contains(&motivo) {
            motivos.push(motivo);
        }
    }
    (!motivos.is_empty()).then(|| motivos.join("; "))
}

pub async fn allocate_additional_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: LinesRequest = validate_body(body, &lines_rules(), "Datos de asignación inválidos").await?;
    let store = state.store();
    let cirugia = load_surgery(store, id).await?;
    if !cirugia.estado.accepts_additional_stock() {
        return Err(HttpError::bad_request(
            "Solo se puede agregar stock adicional a cirugías en curso",
        ));
    }
    let lineas = stock_lines(&req.items)?;

    let asignaciones = store
        .allocate_stock(
            cirugia.id,
            &lineas,
            DatosAsignacion {
                asignado_por_id: user.user_id,
                es_adicional: true,
                motivo_adicional: additional_reason(&req.items),
            },
        )
        .await?;

    tracing::info!(
        cirugia_id = cirugia.id,
        lineas = asignaciones.len(),
        urgente = req.items.iter().any(|l| l.urgencia == Some(true)),
        "Additional stock allocated"
    );
    Ok(ApiResponse::ok(
        "Stock adicional agregado correctamente",
        views::to_json(&asignaciones)?,
    ))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    tipo: Option<String>,
    urgencia: Option<String>,
    estado: Option<String>,
    fecha_inicio: Option<String>,
    fecha_fin: Option<String>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<NotificationQuery>,
) -> HttpResult<ApiResponse> {
    let mut filtro = FiltroNotificaciones {
        urgente: query_flag(&query.urgencia),
        leida: match query_text(&query.estado) {
            Some("leida") => Some(true),
            Some("no_leida") => Some(false),
            _ => None,
        },
        desde: query_time(&query.fecha_inicio, "fecha_inicio")?,
        hasta: query_time(&query.fecha_fin, "fecha_fin")?,
        ..Default::default()
    };
    match query_text(&query.tipo) {
        Some(tipo @ ("central" | "farmacia")) => filtro.tipo_entidad = tipo.parse().ok(),
        Some(_) => filtro.tipo = query_value(&query.tipo, "tipo")?,
        None => {}
    }

    let notificaciones = state.store().list_notifications(&filtro).await?;
    Ok(ApiResponse::ok(
        "Notificaciones obtenidas exitosamente",
        views::to_json(&notificaciones)?,
    ))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut notificacion = found(
        store.find_notification(id).await?,
        "Notificación no encontrada",
    )?;
    if notificacion.usuario_id != Some(user.user_id) {
        return Err(HttpError::forbidden(
            "No tienes permiso para marcar esta notificación como leída",
        ));
    }

    notificacion.leida = true;
    notificacion.fecha_lectura = Some(Utc::now());
    let notificacion = store.update_notification(&notificacion).await?;
    Ok(ApiResponse::ok(
        "Notificación marcada como leída",
        views::to_json(&notificacion)?,
    ))
}

// ---------------------------------------------------------------------------
// Sterilization (central only)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SterilizationLine {
    #[serde(alias = "instrumento_id")]
    item_id: i32,
    #[serde(alias = "cirugia_origen_id")]
    cirugia_id: Option<i32>,
    metodo_esterilizacion: Option<MetodoEsterilizacion>,
    tiempo_esterilizacion: Option<i32>,
    temperatura: Option<f64>,
    lote_esterilizacion: Option<String>,
    responsable_id: Option<i32>,
    entidad_suministradora_id: Option<i32>,
    observaciones: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SterilizationRequest {
    items: Vec<SterilizationLine>,
}

#[derive(Debug, Deserialize)]
pub struct SterilizationQuery {
    instrumento_id: Option<String>,
    cirugia_id: Option<String>,
    fecha_inicio: Option<String>,
    fecha_fin: Option<String>,
}

pub async fn register_sterilization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: SterilizationRequest =
        validate_body(body, &lines_rules(), "Datos de esterilización inválidos").await?;
    let store = state.store();

    for line in &req.items {
        let item = found(
            store.find_item(line.item_id).await?,
            &format!("Item {} no encontrado", line.item_id),
        )?;
        if !item.requiere_esterilizacion {
            return Err(HttpError::bad_request(format!(
                "El item {} no requiere esterilización",
                item.id
            )));
        }
    }

    let inicio = Utc::now();
    let nuevas = req
        .items
        .into_iter()
        .map(|line| NuevaEsterilizacion {
            item_id: line.item_id,
            cirugia_origen_id: line.cirugia_id,
            entidad_suministradora_id: line.entidad_suministradora_id,
            metodo: line
                .metodo_esterilizacion
                .unwrap_or(MetodoEsterilizacion::Autoclave),
            fecha_inicio: inicio,
            fecha_fin_estimada: line
                .tiempo_esterilizacion
                .map(|minutos| inicio + Duration::minutes(i64::from(minutos))),
            responsable_id: line.responsable_id.unwrap_or(user.user_id),
            lote_esterilizacion: line.lote_esterilizacion,
            temperatura: line.temperatura,
            tiempo_minutos: line.tiempo_esterilizacion,
            observaciones: line.observaciones,
        })
        .collect();
    let registros = store.create_sterilizations(nuevas).await?;

    tracing::info!(registros = registros.len(), "Sterilization cycle registered");
    Ok(ApiResponse::ok(
        "Esterilización registrada correctamente",
        views::to_json(&registros)?,
    ))
}

pub async fn sterilization_history(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SterilizationQuery>,
) -> HttpResult<ApiResponse> {
    let filtro = FiltroEsterilizaciones {
        item_id: query_value(&query.instrumento_id, "instrumento_id")?,
        cirugia_id: query_value(&query.cirugia_id, "cirugia_id")?,
        desde: query_time(&query.fecha_inicio, "fecha_inicio")?,
        hasta: query_time(&query.fecha_fin, "fecha_fin")?,
    };
    let store = state.store();

    let mut data = Vec::new();
    for registro in store.list_sterilizations(&filtro).await? {
        let mut entry = views::to_json(&registro)?;
        entry["item"] = views::to_json(&store.find_item(registro.item_id).await?)?;
        data.push(entry);
    }
    Ok(ApiResponse::ok(
        "Historial de esterilización obtenido exitosamente",
        Value::Array(data),
    ))
}

pub async fn complete_sterilization(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut registro = found(
        store.find_sterilization(id).await?,
        "Esterilización no encontrada",
    )?;
    if registro.estado == EstadoEsterilizacion::Completada {
        return Err(HttpError::bad_request("La esterilización ya fue completada"));
    }

    registro.estado = EstadoEsterilizacion::Completada;
    registro.fecha_fin = Some(Utc::now());
    let registro = store.update_sterilization(&registro).await?;
    tracing::info!(esterilizacion_id = registro.id, "Sterilization completed");
    Ok(ApiResponse::ok(
        "Esterilización completada exitosamente",
        views::to_json(&registro)?,
    ))
}

// ---------------------------------------------------------------------------
// Running procedures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProceduresQuery {
    tipo: Option<String>,
}

pub async fn concurrent_procedures(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProceduresQuery>,
) -> HttpResult<ApiResponse> {
    let filtro = FiltroCirugias {
        estados: vec![EstadoCirugia::EnCurso],
        tipo_cirugia_id: query_text(&query.tipo).and_then(|t| t.parse().ok()),
        ..Default::default()
    };
    let store = state.store();

    let mut data = Vec::new();
    for cirugia in store.list_surgeries(&filtro).await? {
        data.push(views::running_procedure(store, &cirugia).await?);
    }
    Ok(ApiResponse::ok(
        "Procedimientos en curso obtenidos exitosamente",
        Value::Array(data),
    ))
}

// ---------------------------------------------------------------------------
// Items and item categories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewItemRequest {
    nombre: String,
    codigo: String,
    categoria_id: Option<i32>,
    descripcion: Option<String>,
    es_reutilizable: Option<bool>,
    requiere_esterilizacion: Option<bool>,
    precio_unitario: Option<f64>,
    unidad_medida: Option<String>,
    proveedor: Option<String>,
    fecha_vencimiento: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct NewItemCategoryRequest {
    nombre: String,
    tipo: TipoItem,
    descripcion: Option<String>,
}

pub async fn create_item(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field("nombre", RequiredValidator::with_message("El nombre es requerido"))
        .field("codigo", RequiredValidator::with_message("El código es requerido"));
    let req: NewItemRequest = validate_body(body, &rules, "Datos de item inválidos").await?;
    let store = state.store();

    if store.find_item_by_code(&req.codigo).await?.is_some() {
        return Err(HttpError::conflict("Ya existe un item con este código"));
    }
    if let Some(categoria_id) = req.categoria_id {
        referenced(
            store.find_item_category(categoria_id).await?,
            "La categoría especificada no existe",
        )?;
    }

    let item = store
        .create_item(NuevoItem {
            nombre: req.nombre,
            codigo: req.codigo,
            categoria_id: req.categoria_id,
            descripcion: req.descripcion,
            es_reutilizable: req.es_reutilizable.unwrap_or(false),
            requiere_esterilizacion: req.requiere_esterilizacion.unwrap_or(false),
            precio_unitario: req.precio_unitario,
            unidad_medida: non_blank(req.unidad_medida).unwrap_or_else(|| "unidad".to_string()),
            proveedor: req.proveedor,
            fecha_vencimiento: req.fecha_vencimiento,
        })
        .await?;
    Ok(ApiResponse::created(
        "Item creado exitosamente",
        views::item(store, &item).await?,
    ))
}

pub async fn list_items(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut data = Vec::new();
    for item in store.list_items().await? {
        data.push(views::item(store, &item).await?);
    }
    Ok(ApiResponse::ok("Items obtenidos exitosamente", Value::Array(data)))
}

pub async fn create_item_category(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field("nombre", RequiredValidator::with_message("El nombre es requerido"))
        .field("tipo", RequiredValidator::with_message("El tipo es requerido"));
    let req: NewItemCategoryRequest =
        validate_body(body, &rules, "Datos de categoría inválidos").await?;
    let store = state.store();

    if store.find_item_category_by_name(&req.nombre).await?.is_some() {
        return Err(HttpError::conflict("Ya existe una categoría con este nombre"));
    }
    let categoria = store
        .create_item_category(NuevaCategoriaItem {
            nombre: req.nombre,
            tipo: req.tipo,
            descripcion: req.descripcion,
        })
        .await?;
    Ok(ApiResponse::created(
        "Categoría de item creada exitosamente",
        views::to_json(&categoria)?,
    ))
}

pub async fn list_item_categories(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let categorias = state.store().list_item_categories().await?;
    Ok(ApiResponse::ok(
        "Categorías de items obtenidas exitosamente",
        views::to_json(&categorias)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: i32, cantidad: i32, motivo: Option<&str>) -> LineRequest {
        LineRequest {
            item_id,
            cantidad,
            entidad_suministradora_id: 1,
            urgencia: None,
            motivo: motivo.map(String::from),
        }
    }

    #[test]
    fn test_stock_lines_reject_non_positive_quantities() {
        assert_eq!(stock_lines(&[line(1, 2, None)]).unwrap().len(), 1);
        let err = stock_lines(&[line(1, 2, None), line(7, 0, None)]).unwrap_err();
        assert_eq!(
            err.public_message(),
            "La cantidad del item 7 debe ser mayor a cero"
        );
    }

    #[test]
    fn test_additional_reason_joins_distinct_motives() {
        let items = [
            line(1, 1, Some("sangrado")),
            line(2, 1, Some(" sangrado ")),
            line(3, 1, Some("contaminación")),
            line(4, 1, None),
        ];
        assert_eq!(
            additional_reason(&items).as_deref(),
            Some("sangrado; contaminación")
        );
        assert_eq!(additional_reason(&[line(1, 1, Some("  "))]), None);
    }
}
