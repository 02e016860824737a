//! JSON shapes returned by the handlers.
//!
//! Rows serialize on their own; these functions attach the related rows the
//! clients expect (a user's role, a surgery's patient and staff, and so on).

use std::collections::HashMap;

use quirofano_http::HttpResult;
use quirofano_orm::models::*;
use quirofano_orm::Store;
use serde::Serialize;
use serde_json::{json, Value};

pub fn to_json<T: Serialize>(row: &T) -> HttpResult<Value> {
    Ok(serde_json::to_value(row)?)
}

/// `{id, nombre, apellido}` of a user
pub fn user_summary(usuario: &Usuario) -> Value {
    json!({
        "id": usuario.id,
        "nombre": usuario.nombre,
        "apellido": usuario.apellido,
    })
}

pub async fn user_with_role(store: &dyn Store, usuario: &Usuario) -> HttpResult<Value> {
    let mut value = to_json(usuario)?;
    value["rol"] = to_json(&store.find_role(usuario.rol_id).await?)?;
    Ok(value)
}

pub async fn users_with_roles(store: &dyn Store, usuarios: &[Usuario]) -> HttpResult<Vec<Value>> {
    let roles: HashMap<i32, Role> = store
        .list_roles()
        .await?
        .into_iter()
        .map(|rol| (rol.id, rol))
        .collect();
    usuarios
        .iter()
        .map(|usuario| -> HttpResult<Value> {
            let mut value = to_json(usuario)?;
            value["rol"] = to_json(&roles.get(&usuario.rol_id))?;
            Ok(value)
        })
        .collect()
}

async fn user_by_id(store: &dyn Store, id: Option<i32>) -> HttpResult<Value> {
    match id {
        Some(id) => to_json(&store.find_user(id).await?),
        None => Ok(Value::Null),
    }
}

pub async fn doctor(store: &dyn Store, medico: &Medico) -> HttpResult<Value> {
    let mut value = to_json(medico)?;
    value["usuario"] = match store.find_user(medico.usuario_id).await? {
        Some(usuario) => user_with_role(store, &usuario).await?,
        None => Value::Null,
    };
    value["especialidad"] = match medico.especialidad_id {
        Some(id) => to_json(&store.find_specialty(id).await?)?,
        None => Value::Null,
    };
    Ok(value)
}

async fn doctor_by_id(store: &dyn Store, id: i32) -> HttpResult<Value> {
    match store.find_doctor(id).await? {
        Some(medico) => doctor(store, &medico).await,
        None => Ok(Value::Null),
    }
}

pub async fn room(store: &dyn Store, quirofano: &Quirofano) -> HttpResult<Value> {
    let mut value = to_json(quirofano)?;
    value["categoria"] = match quirofano.categoria_id {
        Some(id) => to_json(&store.find_room_category(id).await?)?,
        None => Value::Null,
    };
    Ok(value)
}

/// A surgery with its patient, type, room, surgeon, instrument tech and staff
pub async fn surgery(store: &dyn Store, cirugia: &Cirugia) -> HttpResult<Value> {
    let mut value = to_json(cirugia)?;
    value["paciente"] = to_json(&store.find_patient(cirugia.paciente_id).await?)?;
    value["tipo_cirugia"] = to_json(&store.find_surgery_type(cirugia.tipo_cirugia_id).await?)?;
    value["quirofano"] = to_json(&store.find_room(cirugia.quirofano_id).await?)?;
    value["cirujano_principal"] = doctor_by_id(store, cirugia.cirujano_principal_id).await?;
    value["instrumentador"] = user_by_id(store, cirugia.instrumentador_id).await?;

    let mut personal = Vec::new();
    for fila in store.list_staff(cirugia.id).await? {
        let mut entry = to_json(&fila)?;
        entry["medico"] = doctor_by_id(store, fila.medico_id).await?;
        personal.push(entry);
    }
    value["personal"] = Value::Array(personal);
    Ok(value)
}

pub async fn surgeries(store: &dyn Store, cirugias: &[Cirugia]) -> HttpResult<Vec<Value>> {
    let mut out = Vec::with_capacity(cirugias.len());
    for cirugia in cirugias {
        out.push(surgery(store, cirugia).await?);
    }
    Ok(out)
}

pub async fn item(store: &dyn Store, item: &Item) -> HttpResult<Value> {
    let mut value = to_json(item)?;
    value["categoria"] = match item.categoria_id {
        Some(id) => to_json(&store.find_item_category(id).await?)?,
        None => Value::Null,
    };
    Ok(value)
}

async fn item_by_id(store: &dyn Store, id: i32) -> HttpResult<Value> {
    match store.find_item(id).await? {
        Some(row) => item(store, &row).await,
        None => Ok(Value::Null),
    }
}

/// A stock row with its item (and category) and entity
pub async fn stock(store: &dyn Store, stock: &Stock) -> HttpResult<Value> {
    let mut value = to_json(stock)?;
    value["item"] = item_by_id(store, stock.item_id).await?;
    value["entidad"] = to_json(&store.find_entity(stock.entidad_suministradora_id).await?)?;
    Ok(value)
}

pub async fn allocation(store: &dyn Store, asignacion: &CirugiaStockAsignado) -> HttpResult<Value> {
    let mut value = to_json(asignacion)?;
    value["stock"] = to_json(&store.find_stock(asignacion.stock_id).await?)?;
    value["item"] = item_by_id(store, asignacion.item_id).await?;
    value["entidad"] = to_json(&store.find_entity(asignacion.entidad_suministradora_id).await?)?;
    value["asignado_por"] = store
        .find_user(asignacion.asignado_por_id)
        .await?
        .as_ref()
        .map_or(Value::Null, user_summary);
    Ok(value)
}

pub async fn allocations(
    store: &dyn Store,
    asignaciones: &[CirugiaStockAsignado],
) -> HttpResult<Vec<Value>> {
    let mut out = Vec::with_capacity(asignaciones.len());
    for asignacion in asignaciones {
        out.push(allocation(store, asignacion).await?);
    }
    Ok(out)
}

pub async fn entity(store: &dyn Store, entidad: &EntidadSuministradora) -> HttpResult<Value> {
    let mut value = to_json(entidad)?;
    value["responsable"] = user_by_id(store, entidad.responsable_id).await?;
    Ok(value)
}

/// Everything recorded about one surgery
pub async fn surgery_report(store: &dyn Store, cirugia: &Cirugia) -> HttpResult<Value> {
    let mut value = surgery(store, cirugia).await?;
    value["quirofano"] = match store.find_room(cirugia.quirofano_id).await? {
        Some(quirofano) => room(store, &quirofano).await?,
        None => Value::Null,
    };
    value["stock_asignado"] =
        Value::Array(allocations(store, &store.list_allocations(cirugia.id).await?).await?);

    let mut conteos = Vec::new();
    for conteo in store.list_counts(cirugia.id).await? {
        let mut entry = to_json(&conteo)?;
        entry["detalles"] = to_json(&store.list_count_details(conteo.id).await?)?;
        conteos.push(entry);
    }
    value["conteos"] = Value::Array(conteos);
    value["incidentes"] = to_json(&store.list_incidents(cirugia.id).await?)?;
    Ok(value)
}

/// A running surgery as the supply desks see it
pub async fn running_procedure(store: &dyn Store, cirugia: &Cirugia) -> HttpResult<Value> {
    let mut value = to_json(cirugia)?;
    value["tipo_cirugia"] = to_json(&store.find_surgery_type(cirugia.tipo_cirugia_id).await?)?;
    value["quirofano"] = to_json(&store.find_room(cirugia.quirofano_id).await?)?;
    value["cirujano_principal"] = doctor_by_id(store, cirugia.cirujano_principal_id).await?;
    value["instrumentador"] = user_by_id(store, cirugia.instrumentador_id).await?;
    value["stock_asignado"] =
        Value::Array(allocations(store, &store.list_allocations(cirugia.id).await?).await?);
    Ok(value)
}
