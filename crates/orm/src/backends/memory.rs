//! In-memory storage backend.
//!
//! All tables sit behind one `parking_lot::Mutex`, so every trait method is
//! atomic with respect to every other. Used by the HTTP tests and by
//! `serve --memory` for demos without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{
    ClinicalStore, FacilityStore, InstrumentationStore, NotificationStore, SupplyStore,
    SurgeryStore, UserStore,
};
use crate::error::{ModelError, OrmResult};
use crate::models::*;
use crate::scheduling;

trait Record: Clone {
    fn id(&self) -> i32;
    fn is_deleted(&self) -> bool;
}

macro_rules! record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Record for $ty {
                fn id(&self) -> i32 {
                    self.id
                }

                fn is_deleted(&self) -> bool {
                    self.deleted_at.is_some()
                }
            }
        )+
    };
}

record!(
    Role,
    Usuario,
    Sesion,
    Especialidad,
    Medico,
    Paciente,
    CategoriaQuirofano,
    Quirofano,
    TipoCirugia,
    Cirugia,
    CirugiaPersonal,
    EntidadSuministradora,
    CategoriaItem,
    Item,
    Stock,
    CirugiaStockAsignado,
    EntregaStock,
    SolicitudCirugia,
    Esterilizacion,
    ConteoInstrumentacion,
    DetalleConteo,
    Incidente,
    Notificacion,
);

/// Rows plus the next serial value
struct Table<T> {
    name: &'static str,
    rows: Vec<T>,
    next_id: i32,
}

impl<T: Record> Table<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, build: impl FnOnce(i32) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.push(row.clone());
        row
    }

    fn live(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.iter().filter(|row| !row.is_deleted())
    }

    fn all(&self) -> Vec<T> {
        self.live().cloned().collect()
    }

    fn get(&self, id: i32) -> Option<T> {
        self.live().find(|row| row.id() == id).cloned()
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.live().find(|row| predicate(row)).cloned()
    }

    fn get_mut(&mut self, id: i32) -> OrmResult<&mut T> {
        let name = self.name;
        self.rows
            .iter_mut()
            .find(|row| row.id() == id && !row.is_deleted())
            .ok_or_else(|| ModelError::NotFound(name.to_string()))
    }

    fn replace(&mut self, row: T) -> OrmResult<T> {
        let slot = self.get_mut(row.id())?;
        *slot = row.clone();
        Ok(row)
    }
}

struct Tables {
    roles: Table<Role>,
    usuarios: Table<Usuario>,
    sesiones: Table<Sesion>,
    especialidades: Table<Especialidad>,
    medicos: Table<Medico>,
    pacientes: Table<Paciente>,
    categorias_quirofano: Table<CategoriaQuirofano>,
    quirofanos: Table<Quirofano>,
    tipos_cirugia: Table<TipoCirugia>,
    cirugias: Table<Cirugia>,
    personal: Table<CirugiaPersonal>,
    entidades: Table<EntidadSuministradora>,
    categorias_items: Table<CategoriaItem>,
    items: Table<Item>,
    stock: Table<Stock>,
    asignaciones: Table<CirugiaStockAsignado>,
    entregas: Table<EntregaStock>,
    solicitudes: Table<SolicitudCirugia>,
    esterilizaciones: Table<Esterilizacion>,
    conteos: Table<ConteoInstrumentacion>,
    detalles: Table<DetalleConteo>,
    incidentes: Table<Incidente>,
    notificaciones: Table<Notificacion>,
}

impl Tables {
    fn new() -> Self {
        Self {
            roles: Table::new("roles"),
            usuarios: Table::new("usuarios"),
            sesiones: Table::new("sesiones_usuario"),
            especialidades: Table::new("especialidades"),
            medicos: Table::new("medicos"),
            pacientes: Table::new("pacientes"),
            categorias_quirofano: Table::new("categorias_quirofanos"),
            quirofanos: Table::new("quirofanos"),
            tipos_cirugia: Table::new("tipos_cirugia"),
            cirugias: Table::new("cirugias"),
            personal: Table::new("cirugia_personal"),
            entidades: Table::new("entidades_suministradoras"),
            categorias_items: Table::new("categorias_items"),
            items: Table::new("items"),
            stock: Table::new("stock"),
            asignaciones: Table::new("cirugia_stock_asignado"),
            entregas: Table::new("entregas_stock"),
            solicitudes: Table::new("solicitudes_cirugia"),
            esterilizaciones: Table::new("esterilizaciones"),
            conteos: Table::new("conteos_instrumentacion"),
            detalles: Table::new("detalle_conteos"),
            incidentes: Table::new("incidentes"),
            notificaciones: Table::new("notificaciones"),
        }
    }

    /// Reserve each line against the first stock row that covers it.
    ///
    /// Works on a copy so a short line leaves every row untouched.
    fn reserve_lines(&mut self, lineas: &[LineaStock], now: DateTime<Utc>) -> OrmResult<Vec<i32>> {
        let mut scratch = self.stock.rows.clone();
        let mut picked = Vec::with_capacity(lineas.len());

        for linea in lineas {
            let row = scratch
                .iter_mut()
                .find(|s| {
                    s.item_id == linea.item_id
                        && s.entidad_suministradora_id == linea.entidad_suministradora_id
                        && s.can_cover(linea.cantidad)
                })
                .ok_or(ModelError::InsufficientStock {
                    item_id: linea.item_id,
                })?;
            row.reserve(linea.cantidad);
            row.updated_at = now;
            picked.push(row.id);
        }

        self.stock.rows = scratch;
        Ok(picked)
    }

    fn check_surgery_state(&self, id: i32, expected: EstadoCirugia) -> OrmResult<Cirugia> {
        let current = self
            .cirugias
            .get(id)
            .ok_or_else(|| ModelError::NotFound("cirugias".to_string()))?;
        if current.estado != expected {
            return Err(ModelError::StaleState { cirugia_id: id });
        }
        Ok(current)
    }

    fn write_surgery(&mut self, cirugia: &Cirugia, current: &Cirugia, now: DateTime<Utc>) -> OrmResult<Cirugia> {
        let mut row = cirugia.clone();
        row.created_at = current.created_at;
        row.updated_at = now;
        self.cirugias.replace(row)
    }

    fn insert_staff(&mut self, cirugia_id: i32, staff: Vec<NuevoPersonal>, now: DateTime<Utc>) {
        for miembro in staff {
            let duplicate = self.personal.live().any(|p| {
                p.cirugia_id == cirugia_id
                    && p.medico_id == miembro.medico_id
                    && p.rol_en_cirugia == miembro.rol_en_cirugia
            });
            if duplicate {
                continue;
            }
            self.personal.insert(|id| CirugiaPersonal {
                id,
                cirugia_id,
                medico_id: miembro.medico_id,
                rol_en_cirugia: miembro.rol_en_cirugia,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        }
    }

    fn insert_incident(&mut self, nuevo: NuevoIncidente, now: DateTime<Utc>) -> Incidente {
        self.incidentes.insert(|id| Incidente {
            id,
            cirugia_id: nuevo.cirugia_id,
            tipo_incidente: nuevo.tipo_incidente,
            severidad: nuevo.severidad,
            descripcion: nuevo.descripcion,
            reportado_por_id: nuevo.reportado_por_id,
            fecha_incidente: now,
            resuelto: false,
            fecha_resolucion: None,
            acciones_tomadas: nuevo.acciones_tomadas,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }
}

/// Process-local store
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn conflict(constraint: &str) -> ModelError {
    ModelError::Conflict(constraint.to_string())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_roles(&self) -> OrmResult<Vec<Role>> {
        Ok(self.tables.lock().roles.all())
    }

    async fn find_role(&self, id: i32) -> OrmResult<Option<Role>> {
        Ok(self.tables.lock().roles.get(id))
    }

    async fn find_role_by_name(&self, nombre: &str) -> OrmResult<Option<Role>> {
        Ok(self.tables.lock().roles.find(|r| r.nombre == nombre))
    }

    async fn create_role(&self, nuevo: NuevoRol) -> OrmResult<Role> {
        let mut t = self.tables.lock();
        if t.roles.rows.iter().any(|r| r.nombre == nuevo.nombre) {
            return Err(conflict("roles_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.roles.insert(|id| Role {
            id,
            nombre: nuevo.nombre,
            descripcion: nuevo.descripcion,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_users(&self) -> OrmResult<Vec<Usuario>> {
        Ok(self.tables.lock().usuarios.all())
    }

    async fn find_user(&self, id: i32) -> OrmResult<Option<Usuario>> {
        Ok(self.tables.lock().usuarios.get(id))
    }

    async fn find_user_by_email(&self, email: &str) -> OrmResult<Option<Usuario>> {
        Ok(self.tables.lock().usuarios.find(|u| u.email == email))
    }

    async fn email_taken(&self, email: &str, except: Option<i32>) -> OrmResult<bool> {
        let t = self.tables.lock();
        Ok(t.usuarios
            .rows
            .iter()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool> {
        let t = self.tables.lock();
        Ok(t.usuarios
            .rows
            .iter()
            .any(|u| u.cedula == cedula && Some(u.id) != except))
    }

    async fn create_user(&self, nuevo: NuevoUsuario) -> OrmResult<Usuario> {
        let mut t = self.tables.lock();
        if t.usuarios.rows.iter().any(|u| u.email == nuevo.email) {
            return Err(conflict("usuarios_email_key"));
        }
        if t.usuarios.rows.iter().any(|u| u.cedula == nuevo.cedula) {
            return Err(conflict("usuarios_cedula_key"));
        }
        let now = Utc::now();
        Ok(t.usuarios.insert(|id| Usuario {
            id,
            nombre: nuevo.nombre,
            apellido: nuevo.apellido,
            email: nuevo.email,
            password_hash: nuevo.password_hash,
            cedula: nuevo.cedula,
            telefono: nuevo.telefono,
            rol_id: nuevo.rol_id,
            activo: nuevo.activo,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn update_user(&self, usuario: &Usuario) -> OrmResult<Usuario> {
        let mut t = self.tables.lock();
        let clash = t.usuarios.rows.iter().any(|u| {
            u.id != usuario.id && (u.email == usuario.email || u.cedula == usuario.cedula)
        });
        if clash {
            return Err(conflict("usuarios_email_cedula"));
        }
        let mut row = usuario.clone();
        row.updated_at = Utc::now();
        t.usuarios.replace(row)
    }

    async fn soft_delete_user(&self, id: i32) -> OrmResult<()> {
        let mut t = self.tables.lock();
        let row = t.usuarios.get_mut(id)?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn create_session(&self, nueva: NuevaSesion) -> OrmResult<Sesion> {
        let mut t = self.tables.lock();
        if t.sesiones.rows.iter().any(|s| s.token_sesion == nueva.token_sesion) {
            return Err(conflict("sesiones_usuario_token_sesion_key"));
        }
        let now = Utc::now();
        Ok(t.sesiones.insert(|id| Sesion {
            id,
            usuario_id: nueva.usuario_id,
            token_sesion: nueva.token_sesion,
            fecha_inicio: now,
            fecha_expiracion: nueva.fecha_expiracion,
            ip_address: nueva.ip_address,
            user_agent: nueva.user_agent,
            activa: true,
            deleted_at: None,
        }))
    }

    async fn find_session(&self, token_sesion: &str) -> OrmResult<Option<Sesion>> {
        Ok(self
            .tables
            .lock()
            .sesiones
            .find(|s| s.token_sesion == token_sesion))
    }

    async fn deactivate_session(&self, token_sesion: &str) -> OrmResult<()> {
        let mut t = self.tables.lock();
        for sesion in t
            .sesiones
            .rows
            .iter_mut()
            .filter(|s| s.token_sesion == token_sesion)
        {
            sesion.activa = false;
        }
        Ok(())
    }
}

#[async_trait]
impl ClinicalStore for MemoryStore {
    async fn create_patient(&self, nuevo: NuevoPaciente) -> OrmResult<Paciente> {
        let mut t = self.tables.lock();
        if t.pacientes.rows.iter().any(|p| p.cedula == nuevo.cedula) {
            return Err(conflict("pacientes_cedula_key"));
        }
        let now = Utc::now();
        Ok(t.pacientes.insert(|id| Paciente {
            id,
            nombre: nuevo.nombre,
            apellido: nuevo.apellido,
            cedula: nuevo.cedula,
            fecha_nacimiento: nuevo.fecha_nacimiento,
            telefono: nuevo.telefono,
            direccion: nuevo.direccion,
            tipo_sangre: nuevo.tipo_sangre,
            alergias: nuevo.alergias,
            condiciones_medicas: nuevo.condiciones_medicas,
            contacto_emergencia_nombre: nuevo.contacto_emergencia_nombre,
            contacto_emergencia_telefono: nuevo.contacto_emergencia_telefono,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_patients(&self) -> OrmResult<Vec<Paciente>> {
        Ok(self.tables.lock().pacientes.all())
    }

    async fn find_patient(&self, id: i32) -> OrmResult<Option<Paciente>> {
        Ok(self.tables.lock().pacientes.get(id))
    }

    async fn patient_cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool> {
        let t = self.tables.lock();
        Ok(t.pacientes
            .rows
            .iter()
            .any(|p| p.cedula == cedula && Some(p.id) != except))
    }

    async fn update_patient(&self, paciente: &Paciente) -> OrmResult<Paciente> {
        let mut t = self.tables.lock();
        if t.pacientes
            .rows
            .iter()
            .any(|p| p.id != paciente.id && p.cedula == paciente.cedula)
        {
            return Err(conflict("pacientes_cedula_key"));
        }
        let mut row = paciente.clone();
        row.updated_at = Utc::now();
        t.pacientes.replace(row)
    }

    async fn create_specialty(&self, nueva: NuevaEspecialidad) -> OrmResult<Especialidad> {
        let mut t = self.tables.lock();
        if t.especialidades.rows.iter().any(|e| e.nombre == nueva.nombre) {
            return Err(conflict("especialidades_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.especialidades.insert(|id| Especialidad {
            id,
            nombre: nueva.nombre,
            descripcion: nueva.descripcion,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_specialties(&self) -> OrmResult<Vec<Especialidad>> {
        Ok(self.tables.lock().especialidades.all())
    }

    async fn find_specialty(&self, id: i32) -> OrmResult<Option<Especialidad>> {
        Ok(self.tables.lock().especialidades.get(id))
    }

    async fn find_specialty_by_name(&self, nombre: &str) -> OrmResult<Option<Especialidad>> {
        Ok(self.tables.lock().especialidades.find(|e| e.nombre == nombre))
    }

    async fn create_doctor(&self, nuevo: NuevoMedico) -> OrmResult<Medico> {
        let mut t = self.tables.lock();
        if t.medicos.rows.iter().any(|m| m.usuario_id == nuevo.usuario_id) {
            return Err(conflict("medicos_usuario_id_key"));
        }
        if t.medicos
            .rows
            .iter()
            .any(|m| m.numero_licencia == nuevo.numero_licencia)
        {
            return Err(conflict("medicos_numero_licencia_key"));
        }
        let now = Utc::now();
        Ok(t.medicos.insert(|id| Medico {
            id,
            usuario_id: nuevo.usuario_id,
            numero_licencia: nuevo.numero_licencia,
            especialidad_id: nuevo.especialidad_id,
            anos_experiencia: nuevo.anos_experiencia,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_doctors(&self) -> OrmResult<Vec<Medico>> {
        Ok(self.tables.lock().medicos.all())
    }

    async fn find_doctor(&self, id: i32) -> OrmResult<Option<Medico>> {
        Ok(self.tables.lock().medicos.get(id))
    }

    async fn find_doctor_by_user(&self, usuario_id: i32) -> OrmResult<Option<Medico>> {
        Ok(self.tables.lock().medicos.find(|m| m.usuario_id == usuario_id))
    }

    async fn find_doctor_by_license(&self, numero_licencia: &str) -> OrmResult<Option<Medico>> {
        Ok(self
            .tables
            .lock()
            .medicos
            .find(|m| m.numero_licencia == numero_licencia))
    }
}

#[async_trait]
impl FacilityStore for MemoryStore {
    async fn create_room_category(
        &self,
        nueva: NuevaCategoriaQuirofano,
    ) -> OrmResult<CategoriaQuirofano> {
        let mut t = self.tables.lock();
        if t.categorias_quirofano
            .rows
            .iter()
            .any(|c| c.nombre == nueva.nombre)
        {
            return Err(conflict("categorias_quirofanos_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.categorias_quirofano.insert(|id| CategoriaQuirofano {
            id,
            nombre: nueva.nombre,
            descripcion: nueva.descripcion,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_room_categories(&self) -> OrmResult<Vec<CategoriaQuirofano>> {
        Ok(self.tables.lock().categorias_quirofano.all())
    }

    async fn find_room_category(&self, id: i32) -> OrmResult<Option<CategoriaQuirofano>> {
        Ok(self.tables.lock().categorias_quirofano.get(id))
    }

    async fn find_room_category_by_name(
        &self,
        nombre: &str,
    ) -> OrmResult<Option<CategoriaQuirofano>> {
        Ok(self
            .tables
            .lock()
            .categorias_quirofano
            .find(|c| c.nombre == nombre))
    }

    async fn create_room(&self, nuevo: NuevoQuirofano) -> OrmResult<Quirofano> {
        let mut t = self.tables.lock();
        if t.quirofanos.rows.iter().any(|q| q.numero == nuevo.numero) {
            return Err(conflict("quirofanos_numero_key"));
        }
        if t.quirofanos.rows.iter().any(|q| q.nombre == nuevo.nombre) {
            return Err(conflict("quirofanos_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.quirofanos.insert(|id| Quirofano {
            id,
            nombre: nuevo.nombre,
            numero: nuevo.numero,
            categoria_id: nuevo.categoria_id,
            estado: nuevo.estado,
            capacidad_personas: nuevo.capacidad_personas,
            equipamiento_especial: nuevo.equipamiento_especial,
            ubicacion: nuevo.ubicacion,
            activo: nuevo.activo,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_rooms(&self) -> OrmResult<Vec<Quirofano>> {
        Ok(self.tables.lock().quirofanos.all())
    }

    async fn find_room(&self, id: i32) -> OrmResult<Option<Quirofano>> {
        Ok(self.tables.lock().quirofanos.get(id))
    }

    async fn find_room_by_number(&self, numero: i32) -> OrmResult<Option<Quirofano>> {
        Ok(self.tables.lock().quirofanos.find(|q| q.numero == numero))
    }

    async fn update_room(&self, quirofano: &Quirofano) -> OrmResult<Quirofano> {
        let mut t = self.tables.lock();
        if t.quirofanos.rows.iter().any(|q| {
            q.id != quirofano.id && (q.numero == quirofano.numero || q.nombre == quirofano.nombre)
        }) {
            return Err(conflict("quirofanos_numero_key"));
        }
        let mut row = quirofano.clone();
        row.updated_at = Utc::now();
        t.quirofanos.replace(row)
    }

    async fn create_surgery_type(&self, nuevo: NuevoTipoCirugia) -> OrmResult<TipoCirugia> {
        let mut t = self.tables.lock();
        if t.tipos_cirugia.rows.iter().any(|c| c.nombre == nuevo.nombre) {
            return Err(conflict("tipos_cirugia_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.tipos_cirugia.insert(|id| TipoCirugia {
            id,
            nombre: nuevo.nombre,
            descripcion: nuevo.descripcion,
            duracion_estimada_minutos: nuevo.duracion_estimada_minutos,
            nivel_complejidad: nuevo.nivel_complejidad,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_surgery_types(&self) -> OrmResult<Vec<TipoCirugia>> {
        Ok(self.tables.lock().tipos_cirugia.all())
    }

    async fn find_surgery_type(&self, id: i32) -> OrmResult<Option<TipoCirugia>> {
        Ok(self.tables.lock().tipos_cirugia.get(id))
    }

    async fn find_surgery_type_by_name(&self, nombre: &str) -> OrmResult<Option<TipoCirugia>> {
        Ok(self.tables.lock().tipos_cirugia.find(|c| c.nombre == nombre))
    }
}

#[async_trait]
impl SurgeryStore for MemoryStore {
    async fn schedule_surgery(
        &self,
        nueva: NuevaCirugia,
        staff: Vec<NuevoPersonal>,
    ) -> OrmResult<Cirugia> {
        let mut t = self.tables.lock();
        if scheduling::find_conflict(
            t.cirugias.live(),
            nueva.quirofano_id,
            nueva.fecha_programada,
            None,
        )
        .is_some()
        {
            return Err(ModelError::RoomUnavailable);
        }

        let now = Utc::now();
        let cirugia = t.cirugias.insert(|id| Cirugia {
            id,
            paciente_id: nueva.paciente_id,
            tipo_cirugia_id: nueva.tipo_cirugia_id,
            quirofano_id: nueva.quirofano_id,
            cirujano_principal_id: nueva.cirujano_principal_id,
            instrumentador_id: nueva.instrumentador_id,
            fecha_programada: nueva.fecha_programada,
            fecha_inicio: None,
            fecha_fin: None,
            estado: EstadoCirugia::Programada,
            prioridad: nueva.prioridad,
            observaciones_previas: nueva.observaciones_previas,
            observaciones_finales: None,
            diagnostico_preoperatorio: nueva.diagnostico_preoperatorio,
            diagnostico_postoperatorio: None,
            duracion_real_minutos: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        t.insert_staff(cirugia.id, staff, now);
        Ok(cirugia)
    }

    async fn save_surgery(&self, cirugia: &Cirugia, save: SurgerySave) -> OrmResult<Cirugia> {
        let mut t = self.tables.lock();
        let current = t.check_surgery_state(cirugia.id, save.expected_estado)?;

        if save.check_room
            && scheduling::find_conflict(
                t.cirugias.live(),
                cirugia.quirofano_id,
                cirugia.fecha_programada,
                Some(cirugia.id),
            )
            .is_some()
        {
            return Err(ModelError::RoomUnavailable);
        }

        let now = Utc::now();
        let saved = t.write_surgery(cirugia, &current, now)?;
        if let Some(staff) = save.staff {
            t.personal.rows.retain(|p| p.cirugia_id != cirugia.id);
            t.insert_staff(cirugia.id, staff, now);
        }
        Ok(saved)
    }

    async fn find_surgery(&self, id: i32) -> OrmResult<Option<Cirugia>> {
        Ok(self.tables.lock().cirugias.get(id))
    }

    async fn list_surgeries(&self, filtro: &FiltroCirugias) -> OrmResult<Vec<Cirugia>> {
        let t = self.tables.lock();
        let mut rows: Vec<Cirugia> = t
            .cirugias
            .live()
            .filter(|c| filtro.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.fecha_programada, a.id).cmp(&(b.fecha_programada, b.id))
        });
        if filtro.orden == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn list_staff(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaPersonal>> {
        let t = self.tables.lock();
        Ok(t.personal
            .live()
            .filter(|p| p.cirugia_id == cirugia_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SupplyStore for MemoryStore {
    async fn create_entity(&self, nueva: NuevaEntidad) -> OrmResult<EntidadSuministradora> {
        let mut t = self.tables.lock();
        let now = Utc::now();
        Ok(t.entidades.insert(|id| EntidadSuministradora {
            id,
            nombre: nueva.nombre,
            tipo: nueva.tipo,
            ubicacion: nueva.ubicacion,
            telefono: nueva.telefono,
            responsable_id: nueva.responsable_id,
            activo: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_entities(&self) -> OrmResult<Vec<EntidadSuministradora>> {
        Ok(self.tables.lock().entidades.all())
    }

    async fn find_entity(&self, id: i32) -> OrmResult<Option<EntidadSuministradora>> {
        Ok(self.tables.lock().entidades.get(id))
    }

    async fn create_item_category(&self, nueva: NuevaCategoriaItem) -> OrmResult<CategoriaItem> {
        let mut t = self.tables.lock();
        if t.categorias_items.rows.iter().any(|c| c.nombre == nueva.nombre) {
            return Err(conflict("categorias_items_nombre_key"));
        }
        let now = Utc::now();
        Ok(t.categorias_items.insert(|id| CategoriaItem {
            id,
            nombre: nueva.nombre,
            tipo: nueva.tipo,
            descripcion: nueva.descripcion,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_item_categories(&self) -> OrmResult<Vec<CategoriaItem>> {
        Ok(self.tables.lock().categorias_items.all())
    }

    async fn find_item_category(&self, id: i32) -> OrmResult<Option<CategoriaItem>> {
        Ok(self.tables.lock().categorias_items.get(id))
    }

    async fn find_item_category_by_name(&self, nombre: &str) -> OrmResult<Option<CategoriaItem>> {
        Ok(self.tables.lock().categorias_items.find(|c| c.nombre == nombre))
    }

    async fn create_item(&self, nuevo: NuevoItem) -> OrmResult<Item> {
        let mut t = self.tables.lock();
        if t.items.rows.iter().any(|i| i.codigo == nuevo.codigo) {
            return Err(conflict("items_codigo_key"));
        }
        let now = Utc::now();
        Ok(t.items.insert(|id| Item {
            id,
            nombre: nuevo.nombre,
            codigo: nuevo.codigo,
            categoria_id: nuevo.categoria_id,
            descripcion: nuevo.descripcion,
            es_reutilizable: nuevo.es_reutilizable,
            requiere_esterilizacion: nuevo.requiere_esterilizacion,
            precio_unitario: nuevo.precio_unitario,
            unidad_medida: nuevo.unidad_medida,
            proveedor: nuevo.proveedor,
            fecha_vencimiento: nuevo.fecha_vencimiento,
            activo: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_items(&self) -> OrmResult<Vec<Item>> {
        Ok(self.tables.lock().items.all())
    }

    async fn find_item(&self, id: i32) -> OrmResult<Option<Item>> {
        Ok(self.tables.lock().items.get(id))
    }

    async fn find_item_by_code(&self, codigo: &str) -> OrmResult<Option<Item>> {
        Ok(self.tables.lock().items.find(|i| i.codigo == codigo))
    }

    async fn create_stock(&self, nuevo: NuevoStock) -> OrmResult<Stock> {
        let mut t = self.tables.lock();
        let lote = nuevo.lote.as_deref().unwrap_or("");
        let duplicate = t.stock.live().any(|s| {
            s.item_id == nuevo.item_id
                && s.entidad_suministradora_id == nuevo.entidad_suministradora_id
                && s.lote.as_deref().unwrap_or("") == lote
        });
        if duplicate {
            return Err(conflict("stock_item_entidad_lote_key"));
        }
        let now = Utc::now();
        Ok(t.stock.insert(|id| Stock {
            id,
            item_id: nuevo.item_id,
            entidad_suministradora_id: nuevo.entidad_suministradora_id,
            cantidad_disponible: nuevo.cantidad_disponible,
            cantidad_en_uso: 0,
            cantidad_minima: nuevo.cantidad_minima,
            lote: nuevo.lote,
            fecha_vencimiento: nuevo.fecha_vencimiento,
            ubicacion_almacen: nuevo.ubicacion_almacen,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_stock(&self) -> OrmResult<Vec<Stock>> {
        Ok(self.tables.lock().stock.all())
    }

    async fn find_stock(&self, id: i32) -> OrmResult<Option<Stock>> {
        Ok(self.tables.lock().stock.get(id))
    }

    async fn update_stock(&self, stock: &Stock) -> OrmResult<Stock> {
        let mut row = stock.clone();
        row.updated_at = Utc::now();
        self.tables.lock().stock.replace(row)
    }

    async fn allocate_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosAsignacion,
    ) -> OrmResult<Vec<CirugiaStockAsignado>> {
        let mut t = self.tables.lock();
        let now = Utc::now();
        let picked = t.reserve_lines(lineas, now)?;

        let mut created = Vec::with_capacity(lineas.len());
        for (linea, stock_id) in lineas.iter().zip(picked) {
            let row = t.asignaciones.insert(|id| CirugiaStockAsignado {
                id,
                cirugia_id,
                stock_id,
                item_id: linea.item_id,
                entidad_suministradora_id: linea.entidad_suministradora_id,
                cantidad_asignada: linea.cantidad,
                es_adicional: datos.es_adicional,
                motivo_adicional: datos.motivo_adicional.clone(),
                fecha_asignacion: now,
                asignado_por_id: datos.asignado_por_id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            created.push(row);
        }
        Ok(created)
    }

    async fn list_allocations(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaStockAsignado>> {
        let t = self.tables.lock();
        Ok(t.asignaciones
            .live()
            .filter(|a| a.cirugia_id == cirugia_id)
            .cloned()
            .collect())
    }

    async fn deliver_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosEntrega,
    ) -> OrmResult<Vec<EntregaStock>> {
        let mut t = self.tables.lock();
        let now = Utc::now();
        let picked = t.reserve_lines(lineas, now)?;

        let mut created = Vec::with_capacity(lineas.len());
        for (linea, stock_id) in lineas.iter().zip(picked) {
            let row = t.entregas.insert(|id| EntregaStock {
                id,
                cirugia_id,
                stock_id,
                item_id: linea.item_id,
                entidad_suministradora_id: linea.entidad_suministradora_id,
                cantidad_entregada: linea.cantidad,
                fecha_entrega: now,
                entregado_por_id: datos.entregado_por_id,
                recibido_por_id: Some(datos.recibido_por_id),
                es_urgente: datos.es_urgente,
                observaciones: datos.observaciones.clone(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            created.push(row);
        }
        Ok(created)
    }

    async fn find_delivery(&self, id: i32) -> OrmResult<Option<EntregaStock>> {
        Ok(self.tables.lock().entregas.get(id))
    }

    async fn update_delivery(&self, entrega: &EntregaStock) -> OrmResult<EntregaStock> {
        let mut row = entrega.clone();
        row.updated_at = Utc::now();
        self.tables.lock().entregas.replace(row)
    }

    async fn create_request(&self, nueva: NuevaSolicitud) -> OrmResult<SolicitudCirugia> {
        let mut t = self.tables.lock();
        let now = Utc::now();
        Ok(t.solicitudes.insert(|id| SolicitudCirugia {
            id,
            cirugia_id: nueva.cirugia_id,
            item_id: nueva.item_id,
            entidad_suministradora_id: nueva.entidad_suministradora_id,
            cantidad_solicitada: nueva.cantidad_solicitada,
            prioridad: nueva.prioridad,
            estado: EstadoSolicitud::Pendiente,
            fecha_solicitud: now,
            solicitado_por_id: nueva.solicitado_por_id,
            observaciones: nueva.observaciones,
            fecha_entrega: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn list_requests(&self, cirugia_id: i32) -> OrmResult<Vec<SolicitudCirugia>> {
        let t = self.tables.lock();
        Ok(t.solicitudes
            .live()
            .filter(|s| s.cirugia_id == cirugia_id)
            .cloned()
            .collect())
    }

    async fn create_sterilizations(
        &self,
        nuevas: Vec<NuevaEsterilizacion>,
    ) -> OrmResult<Vec<Esterilizacion>> {
        let mut t = self.tables.lock();
        let now = Utc::now();
        let mut created = Vec::with_capacity(nuevas.len());
        for nueva in nuevas {
            let row = t.esterilizaciones.insert(|id| Esterilizacion {
                id,
                item_id: nueva.item_id,
                cirugia_origen_id: nueva.cirugia_origen_id,
                entidad_suministradora_id: nueva.entidad_suministradora_id,
                estado: EstadoEsterilizacion::EnProceso,
                metodo: nueva.metodo,
                fecha_inicio: nueva.fecha_inicio,
                fecha_fin_estimada: nueva.fecha_fin_estimada,
                fecha_fin: None,
                responsable_id: nueva.responsable_id,
                lote_esterilizacion: nueva.lote_esterilizacion,
                temperatura: nueva.temperatura,
                tiempo_minutos: nueva.tiempo_minutos,
                observaciones: nueva.observaciones,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            created.push(row);
        }
        Ok(created)
    }

    async fn find_sterilization(&self, id: i32) -> OrmResult<Option<Esterilizacion>> {
        Ok(self.tables.lock().esterilizaciones.get(id))
    }

    async fn update_sterilization(
        &self,
        esterilizacion: &Esterilizacion,
    ) -> OrmResult<Esterilizacion> {
        let mut row = esterilizacion.clone();
        row.updated_at = Utc::now();
        self.tables.lock().esterilizaciones.replace(row)
    }

    async fn list_sterilizations(
        &self,
        filtro: &FiltroEsterilizaciones,
    ) -> OrmResult<Vec<Esterilizacion>> {
        let t = self.tables.lock();
        let mut rows: Vec<Esterilizacion> = t
            .esterilizaciones
            .live()
            .filter(|e| filtro.matches(e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.fecha_inicio, b.id).cmp(&(a.fecha_inicio, a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl InstrumentationStore for MemoryStore {
    async fn open_count(
        &self,
        nuevo: NuevoConteo,
        cirugia: &Cirugia,
        expected_estado: EstadoCirugia,
    ) -> OrmResult<ConteoInstrumentacion> {
        let mut t = self.tables.lock();
        let current = t.check_surgery_state(cirugia.id, expected_estado)?;
        let now = Utc::now();
        let conteo = t.conteos.insert(|id| ConteoInstrumentacion {
            id,
            cirugia_id: nuevo.cirugia_id,
            tipo_conteo: nuevo.tipo_conteo,
            fecha_conteo: now,
            realizado_por_id: nuevo.realizado_por_id,
            confirmado: false,
            observaciones: nuevo.observaciones,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        t.write_surgery(cirugia, &current, now)?;
        Ok(conteo)
    }

    async fn close_count(
        &self,
        conteo: &ConteoInstrumentacion,
        detalles: Vec<NuevoDetalle>,
        incidentes: Vec<NuevoIncidente>,
        cirugia: &Cirugia,
        expected_estado: EstadoCirugia,
    ) -> OrmResult<(Vec<DetalleConteo>, Vec<Incidente>)> {
        let mut t = self.tables.lock();
        let current = t.check_surgery_state(cirugia.id, expected_estado)?;
        let now = Utc::now();

        let mut conteo_row = conteo.clone();
        conteo_row.updated_at = now;
        t.conteos.replace(conteo_row)?;

        let mut saved_detalles = Vec::with_capacity(detalles.len());
        for detalle in detalles {
            let row = t.detalles.insert(|id| DetalleConteo {
                id,
                conteo_id: conteo.id,
                item_id: detalle.item_id,
                cantidad_esperada: detalle.cantidad_esperada,
                cantidad_contada: detalle.cantidad_contada,
                estado: detalle.estado,
                observaciones: detalle.observaciones,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            saved_detalles.push(row);
        }

        let saved_incidentes: Vec<Incidente> = incidentes
            .into_iter()
            .map(|nuevo| t.insert_incident(nuevo, now))
            .collect();

        t.write_surgery(cirugia, &current, now)?;
        Ok((saved_detalles, saved_incidentes))
    }

    async fn list_counts(&self, cirugia_id: i32) -> OrmResult<Vec<ConteoInstrumentacion>> {
        let t = self.tables.lock();
        Ok(t.conteos
            .live()
            .filter(|c| c.cirugia_id == cirugia_id)
            .cloned()
            .collect())
    }

    async fn list_count_details(&self, conteo_id: i32) -> OrmResult<Vec<DetalleConteo>> {
        let t = self.tables.lock();
        Ok(t.detalles
            .live()
            .filter(|d| d.conteo_id == conteo_id)
            .cloned()
            .collect())
    }

    async fn create_incident(&self, nuevo: NuevoIncidente) -> OrmResult<Incidente> {
        let mut t = self.tables.lock();
        Ok(t.insert_incident(nuevo, Utc::now()))
    }

    async fn list_incidents(&self, cirugia_id: i32) -> OrmResult<Vec<Incidente>> {
        let t = self.tables.lock();
        Ok(t.incidentes
            .live()
            .filter(|i| i.cirugia_id == Some(cirugia_id))
            .cloned()
            .collect())
    }

    async fn count_incidents_since(&self, desde: DateTime<Utc>) -> OrmResult<i64> {
        let t = self.tables.lock();
        Ok(t.incidentes
            .live()
            .filter(|i| i.fecha_incidente >= desde)
            .count() as i64)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, nueva: NuevaNotificacion) -> OrmResult<Notificacion> {
        let mut t = self.tables.lock();
        Ok(t.notificaciones.insert(|id| Notificacion {
            id,
            usuario_id: nueva.usuario_id,
            entidad_suministradora_id: nueva.entidad_suministradora_id,
            tipo: nueva.tipo,
            titulo: nueva.titulo,
            mensaje: nueva.mensaje,
            prioridad: nueva.prioridad,
            leida: false,
            url_accion: nueva.url_accion,
            fecha_creacion: Utc::now(),
            fecha_lectura: None,
            deleted_at: None,
        }))
    }

    async fn find_notification(&self, id: i32) -> OrmResult<Option<Notificacion>> {
        Ok(self.tables.lock().notificaciones.get(id))
    }

    async fn update_notification(&self, notificacion: &Notificacion) -> OrmResult<Notificacion> {
        self.tables.lock().notificaciones.replace(notificacion.clone())
    }

    async fn list_notifications(
        &self,
        filtro: &FiltroNotificaciones,
    ) -> OrmResult<Vec<Notificacion>> {
        let t = self.tables.lock();
        let entity_matches = |n: &Notificacion| match filtro.tipo_entidad {
            None => true,
            Some(tipo) => n
                .entidad_suministradora_id
                .and_then(|id| t.entidades.get(id))
                .map_or(false, |e| e.tipo == tipo),
        };
        let mut rows: Vec<Notificacion> = t
            .notificaciones
            .live()
            .filter(|n| filtro.matches(n) && entity_matches(n))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.fecha_creacion, b.id).cmp(&(a.fecha_creacion, a.id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn store_with_room() -> (MemoryStore, Quirofano) {
        let store = MemoryStore::new();
        let room = store
            .create_room(NuevoQuirofano {
                nombre: "Quirófano 1".to_string(),
                numero: 1,
                categoria_id: None,
                estado: EstadoQuirofano::Libre,
                capacidad_personas: 10,
                equipamiento_especial: None,
                ubicacion: None,
                activo: true,
            })
            .await
            .unwrap();
        (store, room)
    }

    fn nueva(quirofano_id: i32, fecha: DateTime<Utc>) -> NuevaCirugia {
        NuevaCirugia {
            paciente_id: 1,
            tipo_cirugia_id: 1,
            quirofano_id,
            cirujano_principal_id: 1,
            instrumentador_id: None,
            fecha_programada: fecha,
            prioridad: Prioridad::Media,
            observaciones_previas: None,
            diagnostico_preoperatorio: None,
        }
    }

    async fn stock_row(store: &MemoryStore, item_id: i32, cantidad: i32) -> Stock {
        store
            .create_stock(NuevoStock {
                item_id,
                entidad_suministradora_id: 1,
                cantidad_disponible: cantidad,
                cantidad_minima: 1,
                lote: None,
                fecha_vencimiento: None,
                ubicacion_almacen: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_returns_same_fields() {
        let store = MemoryStore::new();
        let role = store
            .create_role(NuevoRol {
                nombre: "administrador".to_string(),
                descripcion: Some("Acceso completo".to_string()),
            })
            .await
            .unwrap();

        let found = store.find_role(role.id).await.unwrap().unwrap();
        assert_eq!(found, role);
        assert_eq!(
            store.find_role_by_name("administrador").await.unwrap(),
            Some(role)
        );
    }

    #[tokio::test]
    async fn test_soft_deleted_users_stay_unique() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NuevoUsuario {
                nombre: "Ana".to_string(),
                apellido: "Ruiz".to_string(),
                email: "ana@hospital.com".to_string(),
                password_hash: "hash".to_string(),
                cedula: "V1".to_string(),
                telefono: None,
                rol_id: 1,
                activo: true,
            })
            .await
            .unwrap();

        store.soft_delete_user(user.id).await.unwrap();

        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.email_taken("ana@hospital.com", None).await.unwrap());
        assert!(!store.email_taken("ana@hospital.com", Some(user.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_schedule_rejects_overlapping_booking() {
        let (store, room) = store_with_room().await;
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();

        store.schedule_surgery(nueva(room.id, at), vec![]).await.unwrap();

        let overlapping = store
            .schedule_surgery(nueva(room.id, at + Duration::minutes(90)), vec![])
            .await;
        assert_eq!(overlapping.unwrap_err(), ModelError::RoomUnavailable);

        let later = store
            .schedule_surgery(nueva(room.id, at + Duration::minutes(121)), vec![])
            .await;
        assert!(later.is_ok());
    }

    #[tokio::test]
    async fn test_save_surgery_detects_stale_state() {
        let (store, room) = store_with_room().await;
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let mut cirugia = store.schedule_surgery(nueva(room.id, at), vec![]).await.unwrap();

        cirugia.start(Utc::now());
        store
            .save_surgery(&cirugia, SurgerySave::transition(EstadoCirugia::Programada))
            .await
            .unwrap();

        let again = store
            .save_surgery(&cirugia, SurgerySave::transition(EstadoCirugia::Programada))
            .await;
        assert_eq!(again.unwrap_err(), ModelError::StaleState { cirugia_id: cirugia.id });
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let (store, room) = store_with_room().await;
        let mut edited = room.clone();
        edited.ubicacion = Some("Piso 2".to_string());

        let first = store.update_room(&edited).await.unwrap();
        let second = store.update_room(&edited).await.unwrap();

        assert_eq!(first.ubicacion, second.ubicacion);
        assert_eq!(first.numero, second.numero);
        assert_eq!(store.list_rooms().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_staff_replacement() {
        let (store, room) = store_with_room().await;
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let staff = vec![
            NuevoPersonal {
                medico_id: 2,
                rol_en_cirugia: RolCirugia::Anestesiologo,
            },
            NuevoPersonal {
                medico_id: 2,
                rol_en_cirugia: RolCirugia::Anestesiologo,
            },
        ];
        let cirugia = store.schedule_surgery(nueva(room.id, at), staff).await.unwrap();
        assert_eq!(store.list_staff(cirugia.id).await.unwrap().len(), 1);

        let save = SurgerySave {
            expected_estado: EstadoCirugia::Programada,
            check_room: false,
            staff: Some(vec![NuevoPersonal {
                medico_id: 3,
                rol_en_cirugia: RolCirugia::Residente,
            }]),
        };
        store.save_surgery(&cirugia, save).await.unwrap();

        let staff = store.list_staff(cirugia.id).await.unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].medico_id, 3);
    }

    #[tokio::test]
    async fn test_allocation_is_all_or_nothing() {
        let store = MemoryStore::new();
        let gauze = stock_row(&store, 1, 10).await;
        let scalpel = stock_row(&store, 2, 1).await;

        let lineas = vec![
            LineaStock {
                item_id: 1,
                entidad_suministradora_id: 1,
                cantidad: 4,
            },
            LineaStock {
                item_id: 2,
                entidad_suministradora_id: 1,
                cantidad: 2,
            },
        ];
        let datos = DatosAsignacion {
            asignado_por_id: 1,
            es_adicional: false,
            motivo_adicional: None,
        };

        let err = store.allocate_stock(1, &lineas, datos.clone()).await.unwrap_err();
        assert_eq!(err, ModelError::InsufficientStock { item_id: 2 });
        assert_eq!(
            store.find_stock(gauze.id).await.unwrap().unwrap().cantidad_disponible,
            10
        );
        assert!(store.list_allocations(1).await.unwrap().is_empty());

        let created = store.allocate_stock(1, &lineas[..1], datos).await.unwrap();
        assert_eq!(created.len(), 1);
        let gauze = store.find_stock(gauze.id).await.unwrap().unwrap();
        assert_eq!(gauze.cantidad_disponible, 6);
        assert_eq!(gauze.cantidad_en_uso, 4);
        assert_eq!(
            store.find_stock(scalpel.id).await.unwrap().unwrap().cantidad_disponible,
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_stock_lot_conflicts() {
        let store = MemoryStore::new();
        stock_row(&store, 1, 10).await;

        let duplicate = store
            .create_stock(NuevoStock {
                item_id: 1,
                entidad_suministradora_id: 1,
                cantidad_disponible: 3,
                cantidad_minima: 1,
                lote: None,
                fecha_vencimiento: None,
                ubicacion_almacen: None,
            })
            .await;
        assert!(matches!(duplicate, Err(ModelError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_notifications_filter_by_entity_kind() {
        let store = MemoryStore::new();
        let farmacia = store
            .create_entity(NuevaEntidad {
                nombre: "Farmacia".to_string(),
                tipo: TipoEntidad::Farmacia,
                ubicacion: None,
                telefono: None,
                responsable_id: None,
            })
            .await
            .unwrap();

        for (entidad, prioridad) in [(Some(farmacia.id), Prioridad::Urgente), (None, Prioridad::Media)] {
            store
                .create_notification(NuevaNotificacion {
                    usuario_id: Some(1),
                    entidad_suministradora_id: entidad,
                    tipo: TipoNotificacion::SolicitudMaterial,
                    titulo: "Solicitud".to_string(),
                    mensaje: "Material requerido".to_string(),
                    prioridad,
                    url_accion: None,
                })
                .await
                .unwrap();
        }

        let filtro = FiltroNotificaciones {
            tipo_entidad: Some(TipoEntidad::Farmacia),
            ..Default::default()
        };
        assert_eq!(store.list_notifications(&filtro).await.unwrap().len(), 1);

        let filtro = FiltroNotificaciones {
            urgente: Some(false),
            ..Default::default()
        };
        let rows = store.list_notifications(&filtro).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prioridad, Prioridad::Media);
    }
}
