//! PostgreSQL storage backend.
//!
//! Plain runtime `sqlx` queries over a shared pool. Composite operations run
//! in one transaction and take row locks (`FOR UPDATE`) on the room or the
//! stock rows they touch, so concurrent requests serialize on the same rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use super::{
    ClinicalStore, FacilityStore, InstrumentationStore, NotificationStore, SupplyStore,
    SurgeryStore, UserStore,
};
use crate::error::{ModelError, OrmResult};
use crate::models::*;
use crate::scheduling::conflict_window;

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_by_id<T>(&self, table: &str, id: i32) -> OrmResult<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL", table);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_all<T>(&self, table: &str) -> OrmResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE deleted_at IS NULL ORDER BY id", table);
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_by_column<T>(&self, table: &str, column: &str, value: &str) -> OrmResult<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 AND deleted_at IS NULL",
            table, column
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn value_taken(
        &self,
        table: &str,
        column: &str,
        value: &str,
        except: Option<i32>,
    ) -> OrmResult<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1 AND ($2::int IS NULL OR id <> $2))",
            table, column
        );
        Ok(sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(except)
            .fetch_one(&self.pool)
            .await?)
    }
}

/// Lock the room row and look for a blocking booking
async fn room_is_free(
    conn: &mut PgConnection,
    quirofano_id: i32,
    at: DateTime<Utc>,
    exclude: Option<i32>,
) -> OrmResult<bool> {
    sqlx::query("SELECT id FROM quirofanos WHERE id = $1 FOR UPDATE")
        .bind(quirofano_id)
        .fetch_optional(&mut *conn)
        .await?;

    let (start, end) = conflict_window(at);
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM cirugias
            WHERE quirofano_id = $1
              AND deleted_at IS NULL
              AND estado NOT IN ('cancelada', 'finalizada')
              AND fecha_programada BETWEEN $2 AND $3
              AND ($4::int IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(quirofano_id)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    Ok(!taken)
}

/// Write every mutable column if the row is still in `expected`
async fn write_surgery(
    conn: &mut PgConnection,
    cirugia: &Cirugia,
    expected: EstadoCirugia,
) -> OrmResult<Cirugia> {
    let saved = sqlx::query_as::<_, Cirugia>(
        r#"
        UPDATE cirugias SET
            paciente_id = $2,
            tipo_cirugia_id = $3,
            quirofano_id = $4,
            cirujano_principal_id = $5,
            instrumentador_id = $6,
            fecha_programada = $7,
            fecha_inicio = $8,
            fecha_fin = $9,
            estado = $10,
            prioridad = $11,
            observaciones_previas = $12,
            observaciones_finales = $13,
            diagnostico_preoperatorio = $14,
            diagnostico_postoperatorio = $15,
            duracion_real_minutos = $16,
            updated_at = NOW()
        WHERE id = $1 AND estado = $17 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(cirugia.id)
    .bind(cirugia.paciente_id)
    .bind(cirugia.tipo_cirugia_id)
    .bind(cirugia.quirofano_id)
    .bind(cirugia.cirujano_principal_id)
    .bind(cirugia.instrumentador_id)
    .bind(cirugia.fecha_programada)
    .bind(cirugia.fecha_inicio)
    .bind(cirugia.fecha_fin)
    .bind(cirugia.estado)
    .bind(cirugia.prioridad)
    .bind(&cirugia.observaciones_previas)
    .bind(&cirugia.observaciones_finales)
    .bind(&cirugia.diagnostico_preoperatorio)
    .bind(&cirugia.diagnostico_postoperatorio)
    .bind(cirugia.duracion_real_minutos)
    .bind(expected)
    .fetch_optional(&mut *conn)
    .await?;

    saved.ok_or(ModelError::StaleState {
        cirugia_id: cirugia.id,
    })
}

async fn insert_staff(
    conn: &mut PgConnection,
    cirugia_id: i32,
    staff: &[NuevoPersonal],
) -> OrmResult<()> {
    for miembro in staff {
        sqlx::query(
            r#"
            INSERT INTO cirugia_personal (cirugia_id, medico_id, rol_en_cirugia)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(cirugia_id)
        .bind(miembro.medico_id)
        .bind(miembro.rol_en_cirugia)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Reserve each line against the lowest-id stock row that covers it
async fn reserve_lines(conn: &mut PgConnection, lineas: &[LineaStock]) -> OrmResult<Vec<i32>> {
    let mut picked = Vec::with_capacity(lineas.len());
    for linea in lineas {
        let stock_id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id FROM stock
            WHERE item_id = $1
              AND entidad_suministradora_id = $2
              AND deleted_at IS NULL
              AND cantidad_disponible >= $3
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(linea.item_id)
        .bind(linea.entidad_suministradora_id)
        .bind(linea.cantidad)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ModelError::InsufficientStock {
            item_id: linea.item_id,
        })?;

        sqlx::query(
            r#"
            UPDATE stock SET
                cantidad_disponible = cantidad_disponible - $2,
                cantidad_en_uso = cantidad_en_uso + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(stock_id)
        .bind(linea.cantidad)
        .execute(&mut *conn)
        .await?;

        picked.push(stock_id);
    }
    Ok(picked)
}

async fn insert_incident(conn: &mut PgConnection, nuevo: &NuevoIncidente) -> OrmResult<Incidente> {
    Ok(sqlx::query_as::<_, Incidente>(
        r#"
        INSERT INTO incidentes
            (cirugia_id, tipo_incidente, severidad, descripcion, reportado_por_id, acciones_tomadas)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(nuevo.cirugia_id)
    .bind(nuevo.tipo_incidente)
    .bind(nuevo.severidad)
    .bind(&nuevo.descripcion)
    .bind(nuevo.reportado_por_id)
    .bind(&nuevo.acciones_tomadas)
    .fetch_one(&mut *conn)
    .await?)
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn list_roles(&self) -> OrmResult<Vec<Role>> {
        self.list_all("roles").await
    }

    async fn find_role(&self, id: i32) -> OrmResult<Option<Role>> {
        self.find_by_id("roles", id).await
    }

    async fn find_role_by_name(&self, nombre: &str) -> OrmResult<Option<Role>> {
        self.find_by_column("roles", "nombre", nombre).await
    }

    async fn create_role(&self, nuevo: NuevoRol) -> OrmResult<Role> {
        Ok(sqlx::query_as::<_, Role>(
            "INSERT INTO roles (nombre, descripcion) VALUES ($1, $2) RETURNING *",
        )
        .bind(&nuevo.nombre)
        .bind(&nuevo.descripcion)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_users(&self) -> OrmResult<Vec<Usuario>> {
        self.list_all("usuarios").await
    }

    async fn find_user(&self, id: i32) -> OrmResult<Option<Usuario>> {
        self.find_by_id("usuarios", id).await
    }

    async fn find_user_by_email(&self, email: &str) -> OrmResult<Option<Usuario>> {
        self.find_by_column("usuarios", "email", email).await
    }

    async fn email_taken(&self, email: &str, except: Option<i32>) -> OrmResult<bool> {
        self.value_taken("usuarios", "email", email, except).await
    }

    async fn cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool> {
        self.value_taken("usuarios", "cedula", cedula, except).await
    }

    async fn create_user(&self, nuevo: NuevoUsuario) -> OrmResult<Usuario> {
        Ok(sqlx::query_as::<_, Usuario>(
            r#"
            INSERT INTO usuarios
                (nombre, apellido, email, password_hash, cedula, telefono, rol_id, activo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre)
        .bind(&nuevo.apellido)
        .bind(&nuevo.email)
        .bind(&nuevo.password_hash)
        .bind(&nuevo.cedula)
        .bind(&nuevo.telefono)
        .bind(nuevo.rol_id)
        .bind(nuevo.activo)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_user(&self, usuario: &Usuario) -> OrmResult<Usuario> {
        sqlx::query_as::<_, Usuario>(
            r#"
            UPDATE usuarios SET
                nombre = $2, apellido = $3, email = $4, password_hash = $5,
                cedula = $6, telefono = $7, rol_id = $8, activo = $9, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(usuario.id)
        .bind(&usuario.nombre)
        .bind(&usuario.apellido)
        .bind(&usuario.email)
        .bind(&usuario.password_hash)
        .bind(&usuario.cedula)
        .bind(&usuario.telefono)
        .bind(usuario.rol_id)
        .bind(usuario.activo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("usuarios".to_string()))
    }

    async fn soft_delete_user(&self, id: i32) -> OrmResult<()> {
        let result = sqlx::query(
            "UPDATE usuarios SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ModelError::NotFound("usuarios".to_string()));
        }
        Ok(())
    }

    async fn create_session(&self, nueva: NuevaSesion) -> OrmResult<Sesion> {
        Ok(sqlx::query_as::<_, Sesion>(
            r#"
            INSERT INTO sesiones_usuario
                (usuario_id, token_sesion, fecha_expiracion, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(nueva.usuario_id)
        .bind(&nueva.token_sesion)
        .bind(nueva.fecha_expiracion)
        .bind(&nueva.ip_address)
        .bind(&nueva.user_agent)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_session(&self, token_sesion: &str) -> OrmResult<Option<Sesion>> {
        self.find_by_column("sesiones_usuario", "token_sesion", token_sesion)
            .await
    }

    async fn deactivate_session(&self, token_sesion: &str) -> OrmResult<()> {
        sqlx::query("UPDATE sesiones_usuario SET activa = FALSE WHERE token_sesion = $1")
            .bind(token_sesion)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ClinicalStore for PostgresStore {
    async fn create_patient(&self, nuevo: NuevoPaciente) -> OrmResult<Paciente> {
        Ok(sqlx::query_as::<_, Paciente>(
            r#"
            INSERT INTO pacientes
                (nombre, apellido, cedula, fecha_nacimiento, telefono, direccion, tipo_sangre,
                 alergias, condiciones_medicas, contacto_emergencia_nombre,
                 contacto_emergencia_telefono)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre)
        .bind(&nuevo.apellido)
        .bind(&nuevo.cedula)
        .bind(nuevo.fecha_nacimiento)
        .bind(&nuevo.telefono)
        .bind(&nuevo.direccion)
        .bind(nuevo.tipo_sangre)
        .bind(&nuevo.alergias)
        .bind(&nuevo.condiciones_medicas)
        .bind(&nuevo.contacto_emergencia_nombre)
        .bind(&nuevo.contacto_emergencia_telefono)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_patients(&self) -> OrmResult<Vec<Paciente>> {
        self.list_all("pacientes").await
    }

    async fn find_patient(&self, id: i32) -> OrmResult<Option<Paciente>> {
        self.find_by_id("pacientes", id).await
    }

    async fn patient_cedula_taken(&self, cedula: &str, except: Option<i32>) -> OrmResult<bool> {
        self.value_taken("pacientes", "cedula", cedula, except).await
    }

    async fn update_patient(&self, paciente: &Paciente) -> OrmResult<Paciente> {
        sqlx::query_as::<_, Paciente>(
            r#"
            UPDATE pacientes SET
                nombre = $2, apellido = $3, cedula = $4, fecha_nacimiento = $5,
                telefono = $6, direccion = $7, tipo_sangre = $8, alergias = $9,
                condiciones_medicas = $10, contacto_emergencia_nombre = $11,
                contacto_emergencia_telefono = $12, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(paciente.id)
        .bind(&paciente.nombre)
        .bind(&paciente.apellido)
        .bind(&paciente.cedula)
        .bind(paciente.fecha_nacimiento)
        .bind(&paciente.telefono)
        .bind(&paciente.direccion)
        .bind(paciente.tipo_sangre)
        .bind(&paciente.alergias)
        .bind(&paciente.condiciones_medicas)
        .bind(&paciente.contacto_emergencia_nombre)
        .bind(&paciente.contacto_emergencia_telefono)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("pacientes".to_string()))
    }

    async fn create_specialty(&self, nueva: NuevaEspecialidad) -> OrmResult<Especialidad> {
        Ok(sqlx::query_as::<_, Especialidad>(
            "INSERT INTO especialidades (nombre, descripcion) VALUES ($1, $2) RETURNING *",
        )
        .bind(&nueva.nombre)
        .bind(&nueva.descripcion)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_specialties(&self) -> OrmResult<Vec<Especialidad>> {
        self.list_all("especialidades").await
    }

    async fn find_specialty(&self, id: i32) -> OrmResult<Option<Especialidad>> {
        self.find_by_id("especialidades", id).await
    }

    async fn find_specialty_by_name(&self, nombre: &str) -> OrmResult<Option<Especialidad>> {
        self.find_by_column("especialidades", "nombre", nombre).await
    }

    async fn create_doctor(&self, nuevo: NuevoMedico) -> OrmResult<Medico> {
        Ok(sqlx::query_as::<_, Medico>(
            r#"
            INSERT INTO medicos (usuario_id, numero_licencia, especialidad_id, anos_experiencia)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(nuevo.usuario_id)
        .bind(&nuevo.numero_licencia)
        .bind(nuevo.especialidad_id)
        .bind(nuevo.anos_experiencia)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_doctors(&self) -> OrmResult<Vec<Medico>> {
        self.list_all("medicos").await
    }

    async fn find_doctor(&self, id: i32) -> OrmResult<Option<Medico>> {
        self.find_by_id("medicos", id).await
    }

    async fn find_doctor_by_user(&self, usuario_id: i32) -> OrmResult<Option<Medico>> {
        Ok(sqlx::query_as::<_, Medico>(
            "SELECT * FROM medicos WHERE usuario_id = $1 AND deleted_at IS NULL",
        )
        .bind(usuario_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_doctor_by_license(&self, numero_licencia: &str) -> OrmResult<Option<Medico>> {
        self.find_by_column("medicos", "numero_licencia", numero_licencia)
            .await
    }
}

#[async_trait]
impl FacilityStore for PostgresStore {
    async fn create_room_category(
        &self,
        nueva: NuevaCategoriaQuirofano,
    ) -> OrmResult<CategoriaQuirofano> {
        Ok(sqlx::query_as::<_, CategoriaQuirofano>(
            "INSERT INTO categorias_quirofanos (nombre, descripcion) VALUES ($1, $2) RETURNING *",
        )
        .bind(&nueva.nombre)
        .bind(&nueva.descripcion)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_room_categories(&self) -> OrmResult<Vec<CategoriaQuirofano>> {
        self.list_all("categorias_quirofanos").await
    }

    async fn find_room_category(&self, id: i32) -> OrmResult<Option<CategoriaQuirofano>> {
        self.find_by_id("categorias_quirofanos", id).await
    }

    async fn find_room_category_by_name(
        &self,
        nombre: &str,
    ) -> OrmResult<Option<CategoriaQuirofano>> {
        self.find_by_column("categorias_quirofanos", "nombre", nombre)
            .await
    }

    async fn create_room(&self, nuevo: NuevoQuirofano) -> OrmResult<Quirofano> {
        Ok(sqlx::query_as::<_, Quirofano>(
            r#"
            INSERT INTO quirofanos
                (nombre, numero, categoria_id, estado, capacidad_personas,
                 equipamiento_especial, ubicacion, activo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre)
        .bind(nuevo.numero)
        .bind(nuevo.categoria_id)
        .bind(nuevo.estado)
        .bind(nuevo.capacidad_personas)
        .bind(&nuevo.equipamiento_especial)
        .bind(&nuevo.ubicacion)
        .bind(nuevo.activo)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_rooms(&self) -> OrmResult<Vec<Quirofano>> {
        self.list_all("quirofanos").await
    }

    async fn find_room(&self, id: i32) -> OrmResult<Option<Quirofano>> {
        self.find_by_id("quirofanos", id).await
    }

    async fn find_room_by_number(&self, numero: i32) -> OrmResult<Option<Quirofano>> {
        Ok(sqlx::query_as::<_, Quirofano>(
            "SELECT * FROM quirofanos WHERE numero = $1 AND deleted_at IS NULL",
        )
        .bind(numero)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_room(&self, quirofano: &Quirofano) -> OrmResult<Quirofano> {
        sqlx::query_as::<_, Quirofano>(
            r#"
            UPDATE quirofanos SET
                nombre = $2, numero = $3, categoria_id = $4, estado = $5,
                capacidad_personas = $6, equipamiento_especial = $7, ubicacion = $8,
                activo = $9, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(quirofano.id)
        .bind(&quirofano.nombre)
        .bind(quirofano.numero)
        .bind(quirofano.categoria_id)
        .bind(quirofano.estado)
        .bind(quirofano.capacidad_personas)
        .bind(&quirofano.equipamiento_especial)
        .bind(&quirofano.ubicacion)
        .bind(quirofano.activo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("quirofanos".to_string()))
    }

    async fn create_surgery_type(&self, nuevo: NuevoTipoCirugia) -> OrmResult<TipoCirugia> {
        Ok(sqlx::query_as::<_, TipoCirugia>(
            r#"
            INSERT INTO tipos_cirugia
                (nombre, descripcion, duracion_estimada_minutos, nivel_complejidad)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre)
        .bind(&nuevo.descripcion)
        .bind(nuevo.duracion_estimada_minutos)
        .bind(nuevo.nivel_complejidad)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_surgery_types(&self) -> OrmResult<Vec<TipoCirugia>> {
        self.list_all("tipos_cirugia").await
    }

    async fn find_surgery_type(&self, id: i32) -> OrmResult<Option<TipoCirugia>> {
        self.find_by_id("tipos_cirugia", id).await
    }

    async fn find_surgery_type_by_name(&self, nombre: &str) -> OrmResult<Option<TipoCirugia>> {
        self.find_by_column("tipos_cirugia", "nombre", nombre).await
    }
}

#[async_trait]
impl SurgeryStore for PostgresStore {
    async fn schedule_surgery(
        &self,
        nueva: NuevaCirugia,
        staff: Vec<NuevoPersonal>,
    ) -> OrmResult<Cirugia> {
        let mut tx = self.pool.begin().await?;

        if !room_is_free(&mut tx, nueva.quirofano_id, nueva.fecha_programada, None).await? {
            return Err(ModelError::RoomUnavailable);
        }

        let cirugia = sqlx::query_as::<_, Cirugia>(
            r#"
            INSERT INTO cirugias
                (paciente_id, tipo_cirugia_id, quirofano_id, cirujano_principal_id,
                 instrumentador_id, fecha_programada, estado, prioridad,
                 observaciones_previas, diagnostico_preoperatorio)
            VALUES ($1, $2, $3, $4, $5, $6, 'programada', $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(nueva.paciente_id)
        .bind(nueva.tipo_cirugia_id)
        .bind(nueva.quirofano_id)
        .bind(nueva.cirujano_principal_id)
        .bind(nueva.instrumentador_id)
        .bind(nueva.fecha_programada)
        .bind(nueva.prioridad)
        .bind(&nueva.observaciones_previas)
        .bind(&nueva.diagnostico_preoperatorio)
        .fetch_one(&mut *tx)
        .await?;

        insert_staff(&mut tx, cirugia.id, &staff).await?;
        tx.commit().await?;
        Ok(cirugia)
    }

    async fn save_surgery(&self, cirugia: &Cirugia, save: SurgerySave) -> OrmResult<Cirugia> {
        let mut tx = self.pool.begin().await?;

        if save.check_room
            && !room_is_free(
                &mut tx,
                cirugia.quirofano_id,
                cirugia.fecha_programada,
                Some(cirugia.id),
            )
            .await?
        {
            return Err(ModelError::RoomUnavailable);
        }

        let saved = write_surgery(&mut tx, cirugia, save.expected_estado).await?;

        if let Some(staff) = save.staff {
            sqlx::query("DELETE FROM cirugia_personal WHERE cirugia_id = $1")
                .bind(cirugia.id)
                .execute(&mut *tx)
                .await?;
            insert_staff(&mut tx, cirugia.id, &staff).await?;
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_surgery(&self, id: i32) -> OrmResult<Option<Cirugia>> {
        self.find_by_id("cirugias", id).await
    }

    async fn list_surgeries(&self, filtro: &FiltroCirugias) -> OrmResult<Vec<Cirugia>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM cirugias WHERE deleted_at IS NULL");
        if let Some(desde) = filtro.desde {
            qb.push(" AND fecha_programada >= ").push_bind(desde);
        }
        if let Some(hasta) = filtro.hasta {
            qb.push(" AND fecha_programada <= ").push_bind(hasta);
        }
        if !filtro.estados.is_empty() {
            qb.push(" AND estado IN (");
            let mut estados = qb.separated(", ");
            for estado in &filtro.estados {
                estados.push_bind(*estado);
            }
            estados.push_unseparated(")");
        }
        if let Some(id) = filtro.quirofano_id {
            qb.push(" AND quirofano_id = ").push_bind(id);
        }
        if let Some(id) = filtro.cirujano_id {
            qb.push(" AND cirujano_principal_id = ").push_bind(id);
        }
        if let Some(id) = filtro.instrumentador_id {
            qb.push(" AND instrumentador_id = ").push_bind(id);
        }
        if let Some(id) = filtro.tipo_cirugia_id {
            qb.push(" AND tipo_cirugia_id = ").push_bind(id);
        }
        if let Some(prioridad) = filtro.prioridad {
            qb.push(" AND prioridad = ").push_bind(prioridad);
        }
        let orden = filtro.orden.as_sql();
        qb.push(format!(" ORDER BY fecha_programada {}, id {}", orden, orden));

        Ok(qb.build_query_as::<Cirugia>().fetch_all(&self.pool).await?)
    }

    async fn list_staff(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaPersonal>> {
        Ok(sqlx::query_as::<_, CirugiaPersonal>(
            "SELECT * FROM cirugia_personal WHERE cirugia_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(cirugia_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl SupplyStore for PostgresStore {
    async fn create_entity(&self, nueva: NuevaEntidad) -> OrmResult<EntidadSuministradora> {
        Ok(sqlx::query_as::<_, EntidadSuministradora>(
            r#"
            INSERT INTO entidades_suministradoras (nombre, tipo, ubicacion, telefono, responsable_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&nueva.nombre)
        .bind(nueva.tipo)
        .bind(&nueva.ubicacion)
        .bind(&nueva.telefono)
        .bind(nueva.responsable_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_entities(&self) -> OrmResult<Vec<EntidadSuministradora>> {
        self.list_all("entidades_suministradoras").await
    }

    async fn find_entity(&self, id: i32) -> OrmResult<Option<EntidadSuministradora>> {
        self.find_by_id("entidades_suministradoras", id).await
    }

    async fn create_item_category(&self, nueva: NuevaCategoriaItem) -> OrmResult<CategoriaItem> {
        Ok(sqlx::query_as::<_, CategoriaItem>(
            "INSERT INTO categorias_items (nombre, tipo, descripcion) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&nueva.nombre)
        .bind(nueva.tipo)
        .bind(&nueva.descripcion)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_item_categories(&self) -> OrmResult<Vec<CategoriaItem>> {
        self.list_all("categorias_items").await
    }

    async fn find_item_category(&self, id: i32) -> OrmResult<Option<CategoriaItem>> {
        self.find_by_id("categorias_items", id).await
    }

    async fn find_item_category_by_name(&self, nombre: &str) -> OrmResult<Option<CategoriaItem>> {
        self.find_by_column("categorias_items", "nombre", nombre).await
    }

    async fn create_item(&self, nuevo: NuevoItem) -> OrmResult<Item> {
        Ok(sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items
                (nombre, codigo, categoria_id, descripcion, es_reutilizable,
                 requiere_esterilizacion, precio_unitario, unidad_medida, proveedor,
                 fecha_vencimiento)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&nuevo.nombre)
        .bind(&nuevo.codigo)
        .bind(nuevo.categoria_id)
        .bind(&nuevo.descripcion)
        .bind(nuevo.es_reutilizable)
        .bind(nuevo.requiere_esterilizacion)
        .bind(nuevo.precio_unitario)
        .bind(&nuevo.unidad_medida)
        .bind(&nuevo.proveedor)
        .bind(nuevo.fecha_vencimiento)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_items(&self) -> OrmResult<Vec<Item>> {
        self.list_all("items").await
    }

    async fn find_item(&self, id: i32) -> OrmResult<Option<Item>> {
        self.find_by_id("items", id).await
    }

    async fn find_item_by_code(&self, codigo: &str) -> OrmResult<Option<Item>> {
        self.find_by_column("items", "codigo", codigo).await
    }

    async fn create_stock(&self, nuevo: NuevoStock) -> OrmResult<Stock> {
        Ok(sqlx::query_as::<_, Stock>(
            r#"
            INSERT INTO stock
                (item_id, entidad_suministradora_id, cantidad_disponible, cantidad_minima,
                 lote, fecha_vencimiento, ubicacion_almacen)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(nuevo.item_id)
        .bind(nuevo.entidad_suministradora_id)
        .bind(nuevo.cantidad_disponible)
        .bind(nuevo.cantidad_minima)
        .bind(&nuevo.lote)
        .bind(nuevo.fecha_vencimiento)
        .bind(&nuevo.ubicacion_almacen)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_stock(&self) -> OrmResult<Vec<Stock>> {
        self.list_all("stock").await
    }

    async fn find_stock(&self, id: i32) -> OrmResult<Option<Stock>> {
        self.find_by_id("stock", id).await
    }

    async fn update_stock(&self, stock: &Stock) -> OrmResult<Stock> {
        sqlx::query_as::<_, Stock>(
            r#"
            UPDATE stock SET
                cantidad_disponible = $2, cantidad_en_uso = $3, cantidad_minima = $4,
                lote = $5, fecha_vencimiento = $6, ubicacion_almacen = $7, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(stock.id)
        .bind(stock.cantidad_disponible)
        .bind(stock.cantidad_en_uso)
        .bind(stock.cantidad_minima)
        .bind(&stock.lote)
        .bind(stock.fecha_vencimiento)
        .bind(&stock.ubicacion_almacen)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("stock".to_string()))
    }

    async fn allocate_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosAsignacion,
    ) -> OrmResult<Vec<CirugiaStockAsignado>> {
        let mut tx = self.pool.begin().await?;
        let picked = reserve_lines(&mut tx, lineas).await?;

        let mut created = Vec::with_capacity(lineas.len());
        for (linea, stock_id) in lineas.iter().zip(picked) {
            let row = sqlx::query_as::<_, CirugiaStockAsignado>(
                r#"
                INSERT INTO cirugia_stock_asignado
                    (cirugia_id, stock_id, item_id, entidad_suministradora_id, cantidad_asignada,
                     es_adicional, motivo_adicional, asignado_por_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(cirugia_id)
            .bind(stock_id)
            .bind(linea.item_id)
            .bind(linea.entidad_suministradora_id)
            .bind(linea.cantidad)
            .bind(datos.es_adicional)
            .bind(&datos.motivo_adicional)
            .bind(datos.asignado_por_id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_allocations(&self, cirugia_id: i32) -> OrmResult<Vec<CirugiaStockAsignado>> {
        Ok(sqlx::query_as::<_, CirugiaStockAsignado>(
            "SELECT * FROM cirugia_stock_asignado WHERE cirugia_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(cirugia_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn deliver_stock(
        &self,
        cirugia_id: i32,
        lineas: &[LineaStock],
        datos: DatosEntrega,
    ) -> OrmResult<Vec<EntregaStock>> {
        let mut tx = self.pool.begin().await?;
        let picked = reserve_lines(&mut tx, lineas).await?;

        let mut created = Vec::with_capacity(lineas.len());
        for (linea, stock_id) in lineas.iter().zip(picked) {
            let row = sqlx::query_as::<_, EntregaStock>(
                r#"
                INSERT INTO entregas_stock
                    (cirugia_id, stock_id, item_id, entidad_suministradora_id, cantidad_entregada,
                     entregado_por_id, recibido_por_id, es_urgente, observaciones)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(cirugia_id)
            .bind(stock_id)
            .bind(linea.item_id)
            .bind(linea.entidad_suministradora_id)
            .bind(linea.cantidad)
            .bind(datos.entregado_por_id)
            .bind(datos.recibido_por_id)
            .bind(datos.es_urgente)
            .bind(&datos.observaciones)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_delivery(&self, id: i32) -> OrmResult<Option<EntregaStock>> {
        self.find_by_id("entregas_stock", id).await
    }

    async fn update_delivery(&self, entrega: &EntregaStock) -> OrmResult<EntregaStock> {
        sqlx::query_as::<_, EntregaStock>(
            r#"
            UPDATE entregas_stock SET
                recibido_por_id = $2, es_urgente = $3, observaciones = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(entrega.id)
        .bind(entrega.recibido_por_id)
        .bind(entrega.es_urgente)
        .bind(&entrega.observaciones)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("entregas_stock".to_string()))
    }

    async fn create_request(&self, nueva: NuevaSolicitud) -> OrmResult<SolicitudCirugia> {
        Ok(sqlx::query_as::<_, SolicitudCirugia>(
            r#"
            INSERT INTO solicitudes_cirugia
                (cirugia_id, item_id, entidad_suministradora_id, cantidad_solicitada, prioridad,
                 estado, solicitado_por_id, observaciones)
            VALUES ($1, $2, $3, $4, $5, 'pendiente', $6, $7)
            RETURNING *
            "#,
        )
        .bind(nueva.cirugia_id)
        .bind(nueva.item_id)
        .bind(nueva.entidad_suministradora_id)
        .bind(nueva.cantidad_solicitada)
        .bind(nueva.prioridad)
        .bind(nueva.solicitado_por_id)
        .bind(&nueva.observaciones)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_requests(&self, cirugia_id: i32) -> OrmResult<Vec<SolicitudCirugia>> {
        Ok(sqlx::query_as::<_, SolicitudCirugia>(
            "SELECT * FROM solicitudes_cirugia WHERE cirugia_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(cirugia_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_sterilizations(
        &self,
        nuevas: Vec<NuevaEsterilizacion>,
    ) -> OrmResult<Vec<Esterilizacion>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(nuevas.len());
        for nueva in &nuevas {
            let row = sqlx::query_as::<_, Esterilizacion>(
                r#"
                INSERT INTO esterilizaciones
                    (item_id, cirugia_origen_id, entidad_suministradora_id, estado, metodo,
                     fecha_inicio, fecha_fin_estimada, responsable_id, lote_esterilizacion,
                     temperatura, tiempo_minutos, observaciones)
                VALUES ($1, $2, $3, 'en_proceso', $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(nueva.item_id)
            .bind(nueva.cirugia_origen_id)
            .bind(nueva.entidad_suministradora_id)
            .bind(nueva.metodo)
            .bind(nueva.fecha_inicio)
            .bind(nueva.fecha_fin_estimada)
            .bind(nueva.responsable_id)
            .bind(&nueva.lote_esterilizacion)
            .bind(nueva.temperatura)
            .bind(nueva.tiempo_minutos)
            .bind(&nueva.observaciones)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn find_sterilization(&self, id: i32) -> OrmResult<Option<Esterilizacion>> {
        self.find_by_id("esterilizaciones", id).await
    }

    async fn update_sterilization(
        &self,
        esterilizacion: &Esterilizacion,
    ) -> OrmResult<Esterilizacion> {
        sqlx::query_as::<_, Esterilizacion>(
            r#"
            UPDATE esterilizaciones SET
                estado = $2, fecha_fin = $3, temperatura = $4, tiempo_minutos = $5,
                observaciones = $6, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(esterilizacion.id)
        .bind(esterilizacion.estado)
        .bind(esterilizacion.fecha_fin)
        .bind(esterilizacion.temperatura)
        .bind(esterilizacion.tiempo_minutos)
        .bind(&esterilizacion.observaciones)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("esterilizaciones".to_string()))
    }

    async fn list_sterilizations(
        &self,
        filtro: &FiltroEsterilizaciones,
    ) -> OrmResult<Vec<Esterilizacion>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM esterilizaciones WHERE deleted_at IS NULL");
        if let Some(id) = filtro.item_id {
            qb.push(" AND item_id = ").push_bind(id);
        }
        if let Some(id) = filtro.cirugia_id {
            qb.push(" AND cirugia_origen_id = ").push_bind(id);
        }
        if let Some(desde) = filtro.desde {
            qb.push(" AND fecha_inicio >= ").push_bind(desde);
        }
        if let Some(hasta) = filtro.hasta {
            qb.push(" AND fecha_inicio <= ").push_bind(hasta);
        }
        qb.push(" ORDER BY fecha_inicio DESC, id DESC");

        Ok(qb
            .build_query_as::<Esterilizacion>()
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl InstrumentationStore for PostgresStore {
    async fn open_count(
        &self,
        nuevo: NuevoConteo,
        cirugia: &Cirugia,
        expected_estado: EstadoCirugia,
    ) -> OrmResult<ConteoInstrumentacion> {
        let mut tx = self.pool.begin().await?;

        write_surgery(&mut tx, cirugia, expected_estado).await?;

        let conteo = sqlx::query_as::<_, ConteoInstrumentacion>(
            r#"
            INSERT INTO conteos_instrumentacion
                (cirugia_id, tipo_conteo, realizado_por_id, observaciones)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(nuevo.cirugia_id)
        .bind(nuevo.tipo_conteo)
        .bind(nuevo.realizado_por_id)
        .bind(&nuevo.observaciones)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        write_surgery(&mut tx, cirugia, expected_estado).await?;

        sqlx::query(
            r#"
            UPDATE conteos_instrumentacion SET
                confirmado = $2, observaciones = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(conteo.id)
        .bind(conteo.confirmado)
        .bind(&conteo.observaciones)
        .execute(&mut *tx)
        .await?;

        let mut saved_detalles = Vec::with_capacity(detalles.len());
        for detalle in &detalles {
            let row = sqlx::query_as::<_, DetalleConteo>(
                r#"
                INSERT INTO detalle_conteos
                    (conteo_id, item_id, cantidad_esperada, cantidad_contada, estado, observaciones)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(conteo.id)
            .bind(detalle.item_id)
            .bind(detalle.cantidad_esperada)
            .bind(detalle.cantidad_contada)
            .bind(detalle.estado)
            .bind(&detalle.observaciones)
            .fetch_one(&mut *tx)
            .await?;
            saved_detalles.push(row);
        }

        let mut saved_incidentes = Vec::with_capacity(incidentes.len());
        for incidente in &incidentes {
            saved_incidentes.push(insert_incident(&mut tx, incidente).await?);
        }

        tx.commit().await?;
        Ok((saved_detalles, saved_incidentes))
    }

    async fn list_counts(&self, cirugia_id: i32) -> OrmResult<Vec<ConteoInstrumentacion>> {
        Ok(sqlx::query_as::<_, ConteoInstrumentacion>(
            "SELECT * FROM conteos_instrumentacion WHERE cirugia_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(cirugia_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_count_details(&self, conteo_id: i32) -> OrmResult<Vec<DetalleConteo>> {
        Ok(sqlx::query_as::<_, DetalleConteo>(
            "SELECT * FROM detalle_conteos WHERE conteo_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(conteo_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_incident(&self, nuevo: NuevoIncidente) -> OrmResult<Incidente> {
        let mut conn = self.pool.acquire().await?;
        insert_incident(&mut conn, &nuevo).await
    }

    async fn list_incidents(&self, cirugia_id: i32) -> OrmResult<Vec<Incidente>> {
        Ok(sqlx::query_as::<_, Incidente>(
            "SELECT * FROM incidentes WHERE cirugia_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(cirugia_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_incidents_since(&self, desde: DateTime<Utc>) -> OrmResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM incidentes WHERE fecha_incidente >= $1 AND deleted_at IS NULL",
        )
        .bind(desde)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn create_notification(&self, nueva: NuevaNotificacion) -> OrmResult<Notificacion> {
        Ok(sqlx::query_as::<_, Notificacion>(
            r#"
            INSERT INTO notificaciones
                (usuario_id, entidad_suministradora_id, tipo, titulo, mensaje, prioridad, url_accion)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(nueva.usuario_id)
        .bind(nueva.entidad_suministradora_id)
        .bind(nueva.tipo)
        .bind(&nueva.titulo)
        .bind(&nueva.mensaje)
        .bind(nueva.prioridad)
        .bind(&nueva.url_accion)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_notification(&self, id: i32) -> OrmResult<Option<Notificacion>> {
        self.find_by_id("notificaciones", id).await
    }

    async fn update_notification(&self, notificacion: &Notificacion) -> OrmResult<Notificacion> {
        sqlx::query_as::<_, Notificacion>(
            r#"
            UPDATE notificaciones SET leida = $2, fecha_lectura = $3
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(notificacion.id)
        .bind(notificacion.leida)
        .bind(notificacion.fecha_lectura)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ModelError::NotFound("notificaciones".to_string()))
    }

    async fn list_notifications(
        &self,
        filtro: &FiltroNotificaciones,
    ) -> OrmResult<Vec<Notificacion>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM notificaciones WHERE deleted_at IS NULL");
        if let Some(tipo) = filtro.tipo {
            qb.push(" AND tipo = ").push_bind(tipo);
        }
        if let Some(tipo) = filtro.tipo_entidad {
            qb.push(
                " AND entidad_suministradora_id IN \
                 (SELECT id FROM entidades_suministradoras WHERE deleted_at IS NULL AND tipo = ",
            )
            .push_bind(tipo)
            .push(")");
        }
        if let Some(urgente) = filtro.urgente {
            qb.push(" AND (prioridad = 'urgente') = ").push_bind(urgente);
        }
        if let Some(leida) = filtro.leida {
            qb.push(" AND leida = ").push_bind(leida);
        }
        if let Some(desde) = filtro.desde {
            qb.push(" AND fecha_creacion >= ").push_bind(desde);
        }
        if let Some(hasta) = filtro.hasta {
            qb.push(" AND fecha_creacion <= ").push_bind(hasta);
        }
        qb.push(" ORDER BY fecha_creacion DESC, id DESC");

        Ok(qb
            .build_query_as::<Notificacion>()
            .fetch_all(&self.pool)
            .await?)
    }
}
