use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::enums::{
    EstadoEsterilizacion, EstadoSolicitud, MetodoEsterilizacion, Prioridad, TipoEntidad,
    TipoItem,
};

/// Sterile central or pharmacy that owns stock
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EntidadSuministradora {
    pub id: i32,
    pub nombre: String,
    pub tipo: TipoEntidad,
    pub ubicacion: Option<String>,
    pub telefono: Option<String>,
    pub responsable_id: Option<i32>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaEntidad {
    pub nombre: String,
    pub tipo: TipoEntidad,
    pub ubicacion: Option<String>,
    pub telefono: Option<String>,
    pub responsable_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategoriaItem {
    pub id: i32,
    pub nombre: String,
    pub tipo: TipoItem,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaCategoriaItem {
    pub nombre: String,
    pub tipo: TipoItem,
    pub descripcion: Option<String>,
}

/// Catalogue entry for an instrument, drug, material or device
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Item {
    pub id: i32,
    pub nombre: String,
    pub codigo: String,
    pub categoria_id: Option<i32>,
    pub descripcion: Option<String>,
    pub es_reutilizable: bool,
    pub requiere_esterilizacion: bool,
    pub precio_unitario: Option<f64>,
    pub unidad_medida: String,
    pub proveedor: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevoItem {
    pub nombre: String,
    pub codigo: String,
    pub categoria_id: Option<i32>,
    pub descripcion: Option<String>,
    pub es_reutilizable: bool,
    pub requiere_esterilizacion: bool,
    pub precio_unitario: Option<f64>,
    pub unidad_medida: String,
    pub proveedor: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
}

/// Quantity of one item held by one entity, per lot
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Stock {
    pub id: i32,
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_disponible: i32,
    pub cantidad_en_uso: i32,
    pub cantidad_minima: i32,
    pub lote: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub ubicacion_almacen: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Stock {
    pub fn is_low(&self) -> bool {
        self.cantidad_disponible <= self.cantidad_minima
    }

    pub fn can_cover(&self, cantidad: i32) -> bool {
        self.deleted_at.is_none() && self.cantidad_disponible >= cantidad
    }

    /// Move `cantidad` units from available to in-use
    pub fn reserve(&mut self, cantidad: i32) {
        self.cantidad_disponible -= cantidad;
        self.cantidad_en_uso += cantidad;
    }
}

#[derive(Debug, Clone)]
pub struct NuevoStock {
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_disponible: i32,
    pub cantidad_minima: i32,
    pub lote: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub ubicacion_almacen: Option<String>,
}

/// One requested line of an allocation or delivery
#[derive(Debug, Clone, PartialEq)]
pub struct LineaStock {
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad: i32,
}

/// Stock allocated to a surgery
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CirugiaStockAsignado {
    pub id: i32,
    pub cirugia_id: i32,
    pub stock_id: i32,
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_asignada: i32,
    pub es_adicional: bool,
    pub motivo_adicional: Option<String>,
    pub fecha_asignacion: DateTime<Utc>,
    pub asignado_por_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Who allocates and whether it is an in-surgery extra
#[derive(Debug, Clone)]
pub struct DatosAsignacion {
    pub asignado_por_id: i32,
    pub es_adicional: bool,
    pub motivo_adicional: Option<String>,
}

/// Physical hand-over of stock to the surgical team
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EntregaStock {
    pub id: i32,
    pub cirugia_id: i32,
    pub stock_id: i32,
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_entregada: i32,
    pub fecha_entrega: DateTime<Utc>,
    pub entregado_por_id: i32,
    pub recibido_por_id: Option<i32>,
    pub es_urgente: bool,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EntregaStock {
    pub fn append_observacion(&mut self, nota: &str) {
        self.observaciones = Some(match self.observaciones.take() {
            Some(previas) if !previas.trim().is_empty() => format!("{}\n{}", previas, nota),
            _ => nota.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct DatosEntrega {
    pub entregado_por_id: i32,
    pub recibido_por_id: i32,
    pub es_urgente: bool,
    pub observaciones: Option<String>,
}

/// Material request raised for a surgery
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SolicitudCirugia {
    pub id: i32,
    pub cirugia_id: i32,
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_solicitada: i32,
    pub prioridad: Prioridad,
    pub estado: EstadoSolicitud,
    pub fecha_solicitud: DateTime<Utc>,
    pub solicitado_por_id: i32,
    pub observaciones: Option<String>,
    pub fecha_entrega: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaSolicitud {
    pub cirugia_id: i32,
    pub item_id: i32,
    pub entidad_suministradora_id: i32,
    pub cantidad_solicitada: i32,
    pub prioridad: Prioridad,
    pub solicitado_por_id: i32,
    pub observaciones: Option<String>,
}

/// Sterilization cycle of a reusable item
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Esterilizacion {
    pub id: i32,
    pub item_id: i32,
    pub cirugia_origen_id: Option<i32>,
    pub entidad_suministradora_id: Option<i32>,
    pub estado: EstadoEsterilizacion,
    pub metodo: MetodoEsterilizacion,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin_estimada: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub responsable_id: i32,
    pub lote_esterilizacion: Option<String>,
    pub temperatura: Option<f64>,
    pub tiempo_minutos: Option<i32>,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NuevaEsterilizacion {
    pub item_id: i32,
    pub cirugia_origen_id: Option<i32>,
    pub entidad_suministradora_id: Option<i32>,
    pub metodo: MetodoEsterilizacion,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin_estimada: Option<DateTime<Utc>>,
    pub responsable_id: i32,
    pub lote_esterilizacion: Option<String>,
    pub temperatura: Option<f64>,
    pub tiempo_minutos: Option<i32>,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FiltroEsterilizaciones {
    pub item_id: Option<i32>,
    pub cirugia_id: Option<i32>,
    pub desde: Option<DateTime<Utc>>,
    pub hasta: Option<DateTime<Utc>>,
}

impl FiltroEsterilizaciones {
    pub fn matches(&self, esterilizacion: &Esterilizacion) -> bool {
        esterilizacion.deleted_at.is_none()
            && self.item_id.map_or(true, |i| esterilizacion.item_id == i)
            && self
                .cirugia_id
                .map_or(true, |c| esterilizacion.cirugia_origen_id == Some(c))
            && self.desde.map_or(true, |d| esterilizacion.fecha_inicio >= d)
            && self.hasta.map_or(true, |h| esterilizacion.fecha_inicio <= h)
    }
}
