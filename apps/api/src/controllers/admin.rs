//! Administration: accounts, patients, rooms, catalogs, reports.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use quirofano_http::{
    parse_body, validate_body, ApiResponse, HttpError, HttpResult, JsonBody, QueryParams,
};
use quirofano_orm::models::*;
use quirofano_validation::{NumericValidator, RequiredValidator, Rules};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::{create_account, registration_rules, RegisterRequest};
use super::{day_bounds, found, query_time, query_value, referenced, start_of_day};
use crate::state::AppState;
use crate::views;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    nombre: Option<String>,
    apellido: Option<String>,
    email: Option<String>,
    cedula: Option<String>,
    telefono: Option<String>,
    rol_id: Option<i32>,
    activo: Option<bool>,
}

pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: RegisterRequest =
        validate_body(body, &registration_rules(), "Datos de registro inválidos").await?;
    let (usuario, rol) = create_account(&state, req).await?;

    let mut user = views::to_json(&usuario)?;
    user["rol"] = views::to_json(&rol)?;
    Ok(ApiResponse::created("Usuario registrado exitosamente", user))
}

pub async fn list_users(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let usuarios = store.list_users().await?;
    let data = views::users_with_roles(store, &usuarios).await?;
    Ok(ApiResponse::ok("Usuarios obtenidos exitosamente", Value::Array(data)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: UpdateUserRequest = parse_body(body)?;
    let store = state.store();
    let mut usuario = found(store.find_user(id).await?, "Usuario no encontrado")?;

    if let Some(rol_id) = req.rol_id {
        referenced(store.find_role(rol_id).await?, "El rol especificado no existe")?;
        usuario.rol_id = rol_id;
    }
    if let Some(email) = req.email {
        if email != usuario.email && store.email_taken(&email, Some(id)).await? {
            return Err(HttpError::conflict("El email ya está registrado"));
        }
        usuario.email = email;
    }
    if let Some(cedula) = req.cedula {
        if cedula != usuario.cedula && store.cedula_taken(&cedula, Some(id)).await? {
            return Err(HttpError::conflict("La cédula ya está registrada"));
        }
        usuario.cedula = cedula;
    }
    if let Some(nombre) = req.nombre {
        usuario.nombre = nombre;
    }
    if let Some(apellido) = req.apellido {
        usuario.apellido = apellido;
    }
    if req.telefono.is_some() {
        usuario.telefono = req.telefono;
    }
    if let Some(activo) = req.activo {
        usuario.activo = activo;
    }

    let usuario = store.update_user(&usuario).await?;
    tracing::info!(user_id = usuario.id, "User updated");
    Ok(ApiResponse::ok(
        "Usuario actualizado exitosamente",
        views::user_with_role(store, &usuario).await?,
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    found(store.find_user(id).await?, "Usuario no encontrado")?;
    store.soft_delete_user(id).await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(ApiResponse::message("Usuario eliminado exitosamente"))
}

pub async fn list_roles(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let roles = state.store().list_roles().await?;
    Ok(ApiResponse::ok("Roles obtenidos exitosamente", views::to_json(&roles)?))
}

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewPatientRequest {
    nombre: String,
    apellido: String,
    cedula: String,
    fecha_nacimiento: NaiveDate,
    telefono: Option<String>,
    direccion: Option<String>,
    tipo_sangre: Option<TipoSangre>,
    alergias: Option<String>,
    condiciones_medicas: Option<String>,
    contacto_emergencia_nombre: Option<String>,
    contacto_emergencia_telefono: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatePatientRequest {
    nombre: Option<String>,
    apellido: Option<String>,
    cedula: Option<String>,
    fecha_nacimiento: Option<NaiveDate>,
    telefono: Option<String>,
    direccion: Option<String>,
    tipo_sangre: Option<TipoSangre>,
    alergias: Option<String>,
    condiciones_medicas: Option<String>,
    contacto_emergencia_nombre: Option<String>,
    contacto_emergencia_telefono: Option<String>,
}

fn patient_rules() -> Rules {
    Rules::new()
        .field("nombre", RequiredValidator::with_message("El nombre es requerido"))
        .field("apellido", RequiredValidator::with_message("El apellido es requerido"))
        .field("cedula", RequiredValidator::with_message("La cédula es requerida"))
        .field(
            "fecha_nacimiento",
            RequiredValidator::with_message("La fecha de nacimiento es requerida"),
        )
}

pub async fn create_patient(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: NewPatientRequest =
        validate_body(body, &patient_rules(), "Datos de paciente inválidos").await?;
    let store = state.store();
    if store.patient_cedula_taken(&req.cedula, None).await? {
        return Err(HttpError::conflict("Ya existe un paciente con esta cédula"));
    }

    let paciente = store
        .create_patient(NuevoPaciente {
            nombre: req.nombre,
            apellido: req.apellido,
            cedula: req.cedula,
            fecha_nacimiento: req.fecha_nacimiento,
            telefono: req.telefono,
            direccion: req.direccion,
            tipo_sangre: req.tipo_sangre,
            alergias: req.alergias,
            condiciones_medicas: req.condiciones_medicas,
            contacto_emergencia_nombre: req.contacto_emergencia_nombre,
            contacto_emergencia_telefono: req.contacto_emergencia_telefono,
        })
        .await?;
    tracing::info!(paciente_id = paciente.id, "Patient registered");
    Ok(ApiResponse::created(
        "Paciente registrado exitosamente",
        views::to_json(&paciente)?,
    ))
}

pub async fn list_patients(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let pacientes = state.store().list_patients().await?;
    Ok(ApiResponse::ok(
        "Pacientes obtenidos exitosamente",
        views::to_json(&pacientes)?,
    ))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: UpdatePatientRequest = parse_body(body)?;
    let store = state.store();
    let mut paciente = found(store.find_patient(id).await?, "Paciente no encontrado")?;

    if let Some(cedula) = req.cedula {
        if cedula != paciente.cedula && store.patient_cedula_taken(&cedula, Some(id)).await? {
            return Err(HttpError::conflict("Ya existe otro paciente con esta cédula"));
        }
        paciente.cedula = cedula;
    }
    if let Some(nombre) = req.nombre {
        paciente.nombre = nombre;
    }
    if let Some(apellido) = req.apellido {
        paciente.apellido = apellido;
    }
    if let Some(fecha) = req.fecha_nacimiento {
        paciente.fecha_nacimiento = fecha;
    }
    if req.telefono.is_some() {
        paciente.telefono = req.telefono;
    }
    if req.direccion.is_some() {
        paciente.direccion = req.direccion;
    }
    if req.tipo_sangre.is_some() {
        paciente.tipo_sangre = req.tipo_sangre;
    }
    if req.alergias.is_some() {
        paciente.alergias = req.alergias;
    }
    if req.condiciones_medicas.is_some() {
        paciente.condiciones_medicas = req.condiciones_medicas;
    }
    if req.contacto_emergencia_nombre.is_some() {
        paciente.contacto_emergencia_nombre = req.contacto_emergencia_nombre;
    }
    if req.contacto_emergencia_telefono.is_some() {
        paciente.contacto_emergencia_telefono = req.contacto_emergencia_telefono;
    }

    let paciente = store.update_patient(&paciente).await?;
    Ok(ApiResponse::ok(
        "Paciente actualizado exitosamente",
        views::to_json(&paciente)?,
    ))
}

// ---------------------------------------------------------------------------
// Operating rooms
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewRoomRequest {
    nombre: String,
    numero: i32,
    categoria_id: Option<i32>,
    estado: Option<EstadoQuirofano>,
    capacidad_personas: Option<i32>,
    equipamiento_especial: Option<String>,
    ubicacion: Option<String>,
    activo: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct UpdateRoomRequest {
    nombre: Option<String>,
    numero: Option<i32>,
    categoria_id: Option<i32>,
    estado: Option<EstadoQuirofano>,
    capacidad_personas: Option<i32>,
    equipamiento_especial: Option<String>,
    ubicacion: Option<String>,
    activo: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CatalogRequest {
    nombre: String,
    descripcion: Option<String>,
}

fn name_rules() -> Rules {
    Rules::new().field("nombre", RequiredValidator::with_message("El nombre es requerido"))
}

const CATEGORIA_NO_EXISTE: &str = "La categoría especificada no existe";

pub async fn create_room(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = name_rules().field(
        "numero",
        NumericValidator::new()
            .integer_only()
            .message("El número del quirófano es requerido"),
    );
    let req: NewRoomRequest = validate_body(body, &rules, "Datos de quirófano inválidos").await?;
    let store = state.store();

    if store.find_room_by_number(req.numero).await?.is_some() {
        return Err(HttpError::conflict("Ya existe un quirófano con este número"));
    }
    if let Some(categoria_id) = req.categoria_id {
        referenced(store.find_room_category(categoria_id).await?, CATEGORIA_NO_EXISTE)?;
    }

    let quirofano = store
        .create_room(NuevoQuirofano {
            nombre: req.nombre,
            numero: req.numero,
            categoria_id: req.categoria_id,
            estado: req.estado.unwrap_or(EstadoQuirofano::Libre),
            capacidad_personas: req.capacidad_personas.unwrap_or(10),
            equipamiento_especial: req.equipamiento_especial,
            ubicacion: req.ubicacion,
            activo: req.activo.unwrap_or(true),
        })
        .await?;
    tracing::info!(quirofano_id = quirofano.id, numero = quirofano.numero, "Room created");
    Ok(ApiResponse::created(
        "Quirófano creado exitosamente",
        views::room(store, &quirofano).await?,
    ))
}

pub async fn list_rooms(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut data = Vec::new();
    for quirofano in store.list_rooms().await? {
        data.push(views::room(store, &quirofano).await?);
    }
    Ok(ApiResponse::ok("Quirófanos obtenidos exitosamente", Value::Array(data)))
}

pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: UpdateRoomRequest = parse_body(body)?;
    let store = state.store();
    let mut quirofano = found(store.find_room(id).await?, "Quirófano no encontrado")?;

    if let Some(categoria_id) = req.categoria_id {
        referenced(store.find_room_category(categoria_id).await?, CATEGORIA_NO_EXISTE)?;
        quirofano.categoria_id = Some(categoria_id);
    }
    if let Some(numero) = req.numero {
        if let Some(other) = store.find_room_by_number(numero).await? {
            if other.id != id {
                return Err(HttpError::conflict("Ya existe un quirófano con este número"));
            }
        }
        quirofano.numero = numero;
    }
    if let Some(nombre) = req.nombre {
        quirofano.nombre = nombre;
    }
    if let Some(estado) = req.estado {
        quirofano.estado = estado;
    }
    if let Some(capacidad) = req.capacidad_personas {
        quirofano.capacidad_personas = capacidad;
    }
    if req.equipamiento_especial.is_some() {
        quirofano.equipamiento_especial = req.equipamiento_especial;
    }
    if req.ubicacion.is_some() {
        quirofano.ubicacion = req.ubicacion;
    }
    if let Some(activo) = req.activo {
        quirofano.activo = activo;
    }

    let quirofano = store.update_room(&quirofano).await?;
    Ok(ApiResponse::ok(
        "Quirófano actualizado exitosamente",
        views::room(store, &quirofano).await?,
    ))
}

pub async fn list_room_categories(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let categorias = state.store().list_room_categories().await?;
    Ok(ApiResponse::ok(
        "Categorías de quirófanos obtenidas exitosamente",
        views::to_json(&categorias)?,
    ))
}

pub async fn create_room_category(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: CatalogRequest = validate_body(body, &name_rules(), "Datos de categoría inválidos").await?;
    let store = state.store();
    if store.find_room_category_by_name(&req.nombre).await?.is_some() {
        return Err(HttpError::conflict("Ya existe una categoría con este nombre"));
    }
    let categoria = store
        .create_room_category(NuevaCategoriaQuirofano {
            nombre: req.nombre,
            descripcion: req.descripcion,
        })
        .await?;
    Ok(ApiResponse::created(
        "Categoría de quirófano creada exitosamente",
        views::to_json(&categoria)?,
    ))
}

// ---------------------------------------------------------------------------
// Supply entities and surgery types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewEntityRequest {
    nombre: String,
    tipo: TipoEntidad,
    ubicacion: Option<String>,
    telefono: Option<String>,
    responsable_id: Option<i32>,
}

pub async fn create_entity(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = name_rules().field("tipo", RequiredValidator::with_message("El tipo es requerido"));
    let req: NewEntityRequest =
        validate_body(body, &rules, "Datos de entidad suministradora inválidos").await?;
    let store = state.store();
    if let Some(responsable_id) = req.responsable_id {
        referenced(
            store.find_user(responsable_id).await?,
            "El responsable especificado no existe",
        )?;
    }

    let entidad = store
        .create_entity(NuevaEntidad {
            nombre: req.nombre,
            tipo: req.tipo,
            ubicacion: req.ubicacion,
            telefono: req.telefono,
            responsable_id: req.responsable_id,
        })
        .await?;
    tracing::info!(entidad_id = entidad.id, tipo = %entidad.tipo, "Supply entity created");
    Ok(ApiResponse::created(
        "Entidad suministradora creada exitosamente",
        views::entity(store, &entidad).await?,
    ))
}

pub async fn list_entities(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut data = Vec::new();
    for entidad in store.list_entities().await? {
        data.push(views::entity(store, &entidad).await?);
    }
    Ok(ApiResponse::ok(
        "Entidades suministradoras obtenidas exitosamente",
        Value::Array(data),
    ))
}

#[derive(Debug, Deserialize)]
struct NewSurgeryTypeRequest {
    nombre: String,
    descripcion: Option<String>,
    duracion_estimada_minutos: Option<i32>,
    nivel_complejidad: Option<NivelComplejidad>,
}

pub async fn create_surgery_type(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: NewSurgeryTypeRequest =
        validate_body(body, &name_rules(), "Datos de tipo de cirugía inválidos").await?;
    let store = state.store();
    if store.find_surgery_type_by_name(&req.nombre).await?.is_some() {
        return Err(HttpError::conflict("Ya existe un tipo de cirugía con este nombre"));
    }
    let tipo = store
        .create_surgery_type(NuevoTipoCirugia {
            nombre: req.nombre,
            descripcion: req.descripcion,
            duracion_estimada_minutos: req.duracion_estimada_minutos,
            nivel_complejidad: req.nivel_complejidad.unwrap_or(NivelComplejidad::Media),
        })
        .await?;
    Ok(ApiResponse::created(
        "Estándar de cirugía creado exitosamente",
        views::to_json(&tipo)?,
    ))
}

pub async fn list_surgery_types(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let tipos = state.store().list_surgery_types().await?;
    Ok(ApiResponse::ok(
        "Tipos de cirugía obtenidos exitosamente",
        views::to_json(&tipos)?,
    ))
}

// ---------------------------------------------------------------------------
// Specialties and doctors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewDoctorRequest {
    usuario_id: i32,
    numero_licencia: String,
    especialidad_id: Option<i32>,
    anos_experiencia: Option<i32>,
}

pub async fn create_specialty(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: CatalogRequest =
        validate_body(body, &name_rules(), "Datos de especialidad inválidos").await?;
    let store = state.store();
    if store.find_specialty_by_name(&req.nombre).await?.is_some() {
        return Err(HttpError::conflict("Ya existe una especialidad con este nombre"));
    }
    let especialidad = store
        .create_specialty(NuevaEspecialidad {
            nombre: req.nombre,
            descripcion: req.descripcion,
        })
        .await?;
    Ok(ApiResponse::created(
        "Especialidad creada exitosamente",
        views::to_json(&especialidad)?,
    ))
}

pub async fn list_specialties(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let especialidades = state.store().list_specialties().await?;
    Ok(ApiResponse::ok(
        "Especialidades obtenidas exitosamente",
        views::to_json(&especialidades)?,
    ))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let rules = Rules::new()
        .field(
            "usuario_id",
            NumericValidator::positive_id().message("El ID del usuario es requerido"),
        )
        .field(
            "numero_licencia",
            RequiredValidator::with_message("El número de licencia es requerido"),
        );
    let req: NewDoctorRequest = validate_body(body, &rules, "Datos de médico inválidos").await?;
    let store = state.store();

    referenced(
        store.find_user(req.usuario_id).await?,
        "El usuario especificado no existe",
    )?;
    if store.find_doctor_by_user(req.usuario_id).await?.is_some() {
        return Err(HttpError::conflict("El usuario ya está registrado como médico"));
    }
    if store
        .find_doctor_by_license(&req.numero_licencia)
        .await?
        .is_some()
    {
        return Err(HttpError::conflict("El número de licencia ya está registrado"));
    }
    if let Some(especialidad_id) = req.especialidad_id {
        referenced(
            store.find_specialty(especialidad_id).await?,
            "La especialidad especificada no existe",
        )?;
    }

    let medico = store
        .create_doctor(NuevoMedico {
            usuario_id: req.usuario_id,
            numero_licencia: req.numero_licencia,
            especialidad_id: req.especialidad_id,
            anos_experiencia: req.anos_experiencia,
        })
        .await?;
    tracing::info!(medico_id = medico.id, usuario_id = medico.usuario_id, "Doctor registered");
    Ok(ApiResponse::created(
        "Médico registrado exitosamente",
        views::doctor(store, &medico).await?,
    ))
}

pub async fn list_doctors(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let mut data = Vec::new();
    for medico in store.list_doctors().await? {
        data.push(views::doctor(store, &medico).await?);
    }
    Ok(ApiResponse::ok("Médicos obtenidos exitosamente", Value::Array(data)))
}

// ---------------------------------------------------------------------------
// Reports and statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    fecha_inicio: Option<String>,
    fecha_fin: Option<String>,
    estado: Option<String>,
    cirujano_id: Option<String>,
}

pub async fn surgery_report(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let cirugia = found(store.find_surgery(id).await?, super::CIRUGIA_NO_ENCONTRADA)?;
    Ok(ApiResponse::ok(
        "Informe de cirugía obtenido exitosamente",
        views::surgery_report(store, &cirugia).await?,
    ))
}

pub async fn surgeries_report(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ReportQuery>,
) -> HttpResult<ApiResponse> {
    let desde = query_time(&query.fecha_inicio, "fecha_inicio")?;
    let hasta = query_time(&query.fecha_fin, "fecha_fin")?;
    let (desde, hasta) = match (desde, hasta) {
        (Some(desde), Some(hasta)) => (Some(desde), Some(hasta)),
        _ => (None, None),
    };
    let filtro = FiltroCirugias {
        desde,
        hasta,
        estados: query_value::<EstadoCirugia>(&query.estado, "estado")?
            .into_iter()
            .collect(),
        cirujano_id: query_value(&query.cirujano_id, "cirujano_id")?,
        orden: SortOrder::Desc,
        ..Default::default()
    };

    let store = state.store();
    let cirugias = store.list_surgeries(&filtro).await?;
    Ok(ApiResponse::ok(
        "Cirugías obtenidas exitosamente",
        Value::Array(views::surgeries(store, &cirugias).await?),
    ))
}

/// Mean per day over `days`, to two decimals
fn daily_average(count: usize, days: i64) -> f64 {
    (count as f64 / days as f64 * 100.0).round() / 100.0
}

pub async fn statistics(State(state): State<AppState>) -> HttpResult<ApiResponse> {
    let store = state.store();
    let now = Utc::now();
    let today = now.date_naive();

    let (inicio_dia, fin_dia) = day_bounds(today);
    let cirugias_dia = store
        .list_surgeries(&FiltroCirugias {
            desde: Some(inicio_dia),
            hasta: Some(fin_dia),
            ..Default::default()
        })
        .await?
        .len();

    let cirugias_en_curso = store
        .list_surgeries(&FiltroCirugias {
            estados: vec![EstadoCirugia::EnCurso],
            ..Default::default()
        })
        .await?
        .len();

    let inicio_mes = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    let incidentes_mes = store.count_incidents_since(start_of_day(inicio_mes)).await?;

    let ultimos_30 = store
        .list_surgeries(&FiltroCirugias {
            desde: Some(now - Duration::days(30)),
            hasta: Some(now),
            ..Default::default()
        })
        .await?
        .len();

    let quirofanos_activos = store
        .list_rooms()
        .await?
        .iter()
        .filter(|quirofano| quirofano.activo)
        .count();

    let roles: BTreeMap<i32, String> = store
        .list_roles()
        .await?
        .into_iter()
        .map(|rol| (rol.id, rol.nombre))
        .collect();
    let mut por_rol: BTreeMap<i32, usize> = BTreeMap::new();
    for usuario in store.list_users().await?.iter().filter(|u| u.activo) {
        *por_rol.entry(usuario.rol_id).or_default() += 1;
    }
    let usuarios_por_rol: Vec<Value> = por_rol
        .into_iter()
        .map(|(rol_id, count)| {
            json!({
                "rol_id": rol_id,
                "rol": roles.get(&rol_id),
                "count": count,
            })
        })
        .collect();

    Ok(ApiResponse::ok(
        "Estadísticas obtenidas exitosamente",
        json!({
            "cirugias_dia": cirugias_dia,
            "cirugias_en_curso": cirugias_en_curso,
            "incidentes_mes": incidentes_mes,
            "promedio_cirugias_dia": daily_average(ultimos_30, 30),
            "quirofanos_activos": quirofanos_activos,
            "usuarios_por_rol": usuarios_por_rol,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_average_rounds_to_two_decimals() {
        assert_eq!(daily_average(0, 30), 0.0);
        assert_eq!(daily_average(10, 30), 0.33);
        assert_eq!(daily_average(20, 30), 0.67);
        assert_eq!(daily_average(45, 30), 1.5);
    }
}
