//! Storage backends.
//!
//! Handlers talk to an `Arc<dyn Store>`. The trait is split by domain so
//! each backend file reads in sections; [`Store`] is the union. Operations
//! that must not interleave with other requests (room booking, stock
//! allocation, count closing) are single trait methods so each backend can
//! make them atomic.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OrmResult;
use crate::models::*;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_roles(&self) -> OrmResult<Vec<Role>>;
    async fn find_role(&self, id: i32) -> OrmResult<Option<Role>>;
    async fn find_role_by_name(&self, nombre: &str) -> OrmResult<Option<Role>>;
    async fn create_role(&self, nuevo: NuevoRol) -> OrmResult<Role>;

    /// Non-deleted users, by id
    async fn list_users(&self) -> OrmResult<Vec<Usuario>>;
    async fn find_user(&self, id: i32) -> OrmResult<Option<Usuario>>;
    async fn find_user_by_email(&self, email: &str) -> OrmResult<Option<Usuario>>;
    /// Includes soft-deleted rows, matching the unique index
    async fn email_taken(&self, email: &str, except: Option<i32>) -> OrmResult<bool>;
    /// Includes soft-deleted rows, matching the unique index
    async fn cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool>;
    async fn create_user(&self, nuevo: NuevoUsuario) -> OrmResult<Usuario>;
    async fn update_user(&self, usuario: &Usuario) -> OrmResult<Usuario>;
    async fn soft_delete_user(&self, id: i32) -> OrmResult<()>;

    async fn create_session(&self, nueva: NuevaSesion) -> OrmResult<Sesion>;
    async fn find_session(&self, token_sesion: &str) -> OrmResult<Option<Sesion>>;
    async fn deactivate_session(&self, token_sesion: &str) -> OrmResult<()>;
}

#[async_trait]
pub trait ClinicalStore: Send + Sync {
    async fn create_patient(&self, nuevo: NuevoPaciente) -> OrmResult<Paciente>;
    async fn list_patients(&self) -> OrmResult<Vec<Paciente>>;
    async fn find_patient(&self, id: i32) -> OrmResult<Option<Paciente>>;
    async fn patient_cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool>;
    async fn update_patient(&self, paciente: &Paciente) -> OrmResult<Paciente>;

    async fn create_specialty(&self, nueva: NuevaEspecialidad) -> OrmResult<Especialidad>;
    async fn list_specialties(&self) -> OrmResult<Vec<Especialidad>>;
    async fn find_specialty(&self, id: i32) -> OrmResult<Option<Especialidad>>;
    async fn find_specialty_by_name(&self, nombre: &str) -> OrmResult<Option<Especialidad>>;

    async fn create_doctor(&self, nuevo: NuevoMedico) -> OrmResult<Medico>;
    async fn list_doctors(&self) -> OrmResult<Vec<Medico>>;
    async fn find_doctor(&self, id: i32) -> OrmResult<Option<Medico>>;
    async fn find_doctor_by_user(&self, usuario_id: i32) -> OrmResult<Option<Medico>>;
    async fn find_doctor_by_license(&self, numero_licencia: &str) -> OrmResult<Option<Medico>>;
}

#[async_trait]
pub trait FacilityStore: Send + Sync {
    async fn create_room_category(
        &self,
        nueva: NuevaCategoriaQuirofano,
    ) -> OrmResult<CategoriaQuirofano>;
    async fn list_room_categories(&self) -> OrmResult<Vec<CategoriaQuirofano>>;
    async fn find_room_category(&self, id: i32) -> OrmResult<Option<CategoriaQuirofano>>;
    async fn find_room_category_by_name(
        &self,
        nombre: &str,
    ) -> OrmResult<Option<CategoriaQuirofano>>;

    async fn create_room(&self, nuevo: NuevoQuirofano) -> OrmResult<Quirofano>;
    async fn list_rooms(&self) -> OrmResult<Vec<Quirofano>>;
    async fn find_room(&self, id: i32) -> OrmResult<Option<Quirofano>>;
    async fn find_room_by_number(&self, numero: i32) -> OrmResult<Option<Quirofano>>;
    async fn update_room(&self, quirofano: &Quirofano) -> OrmResult<Quirofano>;

    async fn create_surgery_type(&self, nuevo: NuevoTipoCirugia) -> OrmResult<TipoCirugia>;
    async fn list_surgery_types(&self) -> OrmResult<Vec<TipoCirugia>>;
    async fn find_surgery_type(&self, id: i32) -> OrmResult<Option<TipoCirugia>>;
    async fn find_surgery_type_by_name(&self, nombre: &str) -> OrmResult<Option<TipoCirugia>>;
}

#[async_trait]
pub trait SurgeryStore: Send + Sync {
    /// Insert a surgery and its staff unless the room is taken inside the
    /// conflict window; fails with `ModelError::RoomUnavailable`
    async fn schedule_surgery(
        &self,
        nueva: NuevaCirugia,
        staff: Vec<NuevoPersonal>,
    ) -> OrmResult<Cirugia>;

    /// Persist every mutable column of `cirugia` under the guards in `save`
    async fn save_surgery(&self, cirugia: &Cirugia, save: SurgerySave) -> OrmResult<Cirugia>;

    async fn find_surgery(&self, id: i32) -> OrmResult<Option<Cirugia>>;
    async fn list_surgeries(&self, filtro: &FiltroCirugias) -> OrmResult<Vec<Cirugia>>;
    async fn list_staff(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaPersonal>>;
}

#[async_trait]
pub trait SupplyStore: Send + Sync {
    async fn create_entity(&self, nueva: NuevaEntidad) -> OrmResult<EntidadSuministradora>;
    async fn list_entities(&self) -> OrmResult<Vec<EntidadSuministradora>>;
    async fn find_entity(&self, id: i32) -> OrmResult<Option<EntidadSuministradora>>;

    async fn create_item_category(&self, nueva: NuevaCategoriaItem) -> OrmResult<CategoriaItem>;
    async fn list_item_categories(&self) -> OrmResult<Vec<CategoriaItem>>;
    async fn find_item_category(&self, id: i32) -> OrmResult<Option<CategoriaItem>>;
    async fn find_item_category_by_name(&self, nombre: &str) -> OrmResult<Option<CategoriaItem>>;

    async fn create_item(&self, nuevo: NuevoItem) -> OrmResult<Item>;
    async fn list_items(&self) -> OrmResult<Vec<Item>>;
    async fn find_item(&self, id: i32) -> OrmResult<Option<Item>>;
    async fn find_item_by_code(&self, codigo: &str) -> OrmResult<Option<Item>>;

    /// Fails with `ModelError::Conflict` on a duplicate (item, entity, lot)
    async fn create_stock(&self, nuevo: NuevoStock) -> OrmResult<Stock>;
    async fn list_stock(&self) -> OrmResult<Vec<Stock>>;
    async fn find_stock(&self, id: i32) -> OrmResult<Option<Stock>>;
    async fn update_stock(&self, stock: &Stock) -> OrmResult<Stock>;

    /// Reserve every line and record the allocation, all or nothing;
    /// fails with `ModelError::InsufficientStock`
    async fn allocate_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosAsignacion,
    ) -> OrmResult<Vec<CirugiaStockAsignado>>;
    async fn list_allocations(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaStockAsignado>>;

    /// Reserve every line and record the hand-over, all or nothing
    async fn deliver_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosEntrega,
    ) -> OrmResult<Vec<EntregaStock>>;
    async fn find_delivery(&self, id: i32) -> OrmResult<Option<EntregaStock>>;
    async fn update_delivery(&self, entrega: &EntregaStock) -> OrmResult<EntregaStock>;

    async fn create_request(&self, nueva: NuevaSolicitud) -> OrmResult<SolicitudCirugia>;
    async fn list_requests(&self, cirugia_id: i32) -> OrmResult<Vec<SolicitudCirugia>>;

    async fn create_sterilizations(
        &self,
        nuevas: Vec<NuevaEsterilizacion>,
    ) -> OrmResult<Vec<Esterilizacion>>;
    async fn find_sterilization(&self, id: i32) -> OrmResult<Option<Esterilizacion>>;
    async fn update_sterilization(&self, esterilizacion: &Esterilizacion)
        -> OrmResult<Esterilizacion>;
    /// Newest first
    async fn list_sterilizations(
        &self,
        filtro: &FiltroEsterilizaciones,
    ) -> OrmResult<Vec<Esterilizacion>>;
}

#[async_trait]
pub trait InstrumentationStore: Send + Sync {
    /// Create a count and move the surgery to its counting state together
    async fn open_count(
        &self,
        nuevo: NuevoConteo,
        cirugia: &Cirugia,
        expected_estado: EstadoCirugia,
    ) -> OrmResult<ConteoInstrumentacion>;

    /// Store details and incidents, confirm the count and save the surgery
    async fn close_count(
        &self,
        conteo: &ConteoInstrumentacion,
        detalles: Vec<NuevoDetalle>,
        incidentes: Vec<NuevoIncidente>,
        cirugia: &Cirugia,
        expected_estado: EstadoCirugia,
    ) -> OrmResult<(Vec<DetalleConteo>, Vec<Incidente>)>;

    async fn list_counts(&self, cirugia_id: i32) -> OrmResult<Vec<ConteoInstrumentacion>>;
    async fn list_count_details(&self, conteo_id: i32) -> OrmResult<Vec<DetalleConteo>>;

    async fn create_incident(&self, nuevo: NuevoIncidente) -> OrmResult<Incidente>;
    async fn list_incidents(&self, cirugia_id: i32) -> OrmResult<Vec<Incidente>>;
    async fn count_incidents_since(&self, desde: DateTime<Utc>) -> OrmResult<i64>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, nueva: NuevaNotificacion) -> OrmResult<Notificacion>;
    async fn find_notification(&self, id: i32) -> OrmResult<Option<Notificacion>>;
    async fn update_notification(&self, notificacion: &Notificacion) -> OrmResult<Notificacion>;
    /// Newest first
    async fn list_notifications(
        &self,
        filtro: &FiltroNotificaciones,
    ) -> OrmResult<Vec<Notificacion>>;
}

/// Everything the API needs from persistence
pub trait Store:
    UserStore
    + ClinicalStore
    + FacilityStore
    + SurgeryStore
    + SupplyStore
    + InstrumentationStore
    + NotificationStore
{
}

impl<T> Store for T where
    T: UserStore
        + ClinicalStore
        + FacilityStore
        + SurgeryStore
        + SupplyStore
        + InstrumentationStore
        + NotificationStore
{
}
