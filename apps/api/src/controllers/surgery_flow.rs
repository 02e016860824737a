//! Surgery start and finish, shared by the head-nurse and instrument-tech
//! route groups, plus the assignment check for instrument techs.

use chrono::Utc;
use quirofano_auth::UserContext;
use quirofano_http::{HttpError, HttpResult};
use quirofano_orm::models::{Cirugia, Role, SurgerySave};
use quirofano_orm::{CierreCirugia, Store};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{found, non_blank, CIRUGIA_NO_ENCONTRADA};

#[derive(Debug, Default, Deserialize)]
pub struct FinishRequest {
    pub observaciones_finales: Option<String>,
    pub diagnostico_postoperatorio: Option<String>,
    pub observaciones_cirujano: Option<String>,
    pub observaciones_anestesiologo: Option<String>,
}

pub async fn load_surgery(store: &dyn Store, id: i32) -> HttpResult<Cirugia> {
    found(store.find_surgery(id).await?, CIRUGIA_NO_ENCONTRADA)
}

/// Instrument techs may only touch surgeries assigned to them
pub fn ensure_assigned(user: &UserContext, cirugia: &Cirugia) -> HttpResult<()> {
    if user.has_role(Role::INSTRUMENTADOR) && cirugia.instrumentador_id != Some(user.user_id) {
        return Err(HttpError::forbidden("No estás asignado a esta cirugía"));
    }
    Ok(())
}

pub async fn start(store: &dyn Store, mut cirugia: Cirugia) -> HttpResult<Value> {
    if !cirugia.estado.can_start() {
        return Err(HttpError::bad_request(
            "La cirugía no puede ser iniciada desde su estado actual",
        ));
    }
    let previous = cirugia.estado;
    cirugia.start(Utc::now());
    let cirugia = store
        .save_surgery(&cirugia, SurgerySave::transition(previous))
        .await?;

    tracing::info!(cirugia_id = cirugia.id, "Surgery started");
    Ok(json!({
        "id": cirugia.id,
        "estado": cirugia.estado,
        "fecha_inicio": cirugia.fecha_inicio,
    }))
}

pub async fn finish(store: &dyn Store, mut cirugia: Cirugia, req: FinishRequest) -> HttpResult<Value> {
    if !cirugia.estado.can_finish() {
        return Err(HttpError::bad_request(
            "Solo se pueden finalizar cirugías que estén en curso",
        ));
    }
    let previous = cirugia.estado;
    let cierre = CierreCirugia {
        generales: req.observaciones_finales,
        cirujano: req.observaciones_cirujano,
        anestesiologo: req.observaciones_anestesiologo,
    };
    cirugia.finish(Utc::now(), &cierre, non_blank(req.diagnostico_postoperatorio));
    let cirugia = store
        .save_surgery(&cirugia, SurgerySave::transition(previous))
        .await?;

    tracing::info!(
        cirugia_id = cirugia.id,
        duracion_minutos = ?cirugia.duracion_real_minutos,
        "Surgery finished"
    );
    Ok(json!({
        "id": cirugia.id,
        "estado": cirugia.estado,
        "fecha_fin": cirugia.fecha_fin,
        "duracion_real_minutos": cirugia.duracion_real_minutos,
        "observaciones_finales": cirugia.observaciones_finales,
        "diagnostico_postoperatorio": cirugia.diagnostico_postoperatorio,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quirofano_orm::models::{EstadoCirugia, Prioridad};

    fn cirugia(instrumentador_id: Option<i32>) -> Cirugia {
        let now = Utc::now();
        Cirugia {
            id: 9,
            paciente_id: 1,
            tipo_cirugia_id: 1,
            quirofano_id: 1,
            cirujano_principal_id: 1,
            instrumentador_id,
            fecha_programada: now,
            fecha_inicio: None,
            fecha_fin: None,
            estado: EstadoCirugia::Programada,
            prioridad: Prioridad::Media,
            observaciones_previas: None,
            observaciones_finales: None,
            diagnostico_preoperatorio: None,
            diagnostico_postoperatorio: None,
            duracion_real_minutos: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn user(id: i32, rol: &str) -> UserContext {
        UserContext {
            user_id: id,
            email: "x@hospital.com".to_string(),
            rol: rol.to_string(),
            session_id: "jti".to_string(),
        }
    }

    #[test]
    fn test_instrument_tech_must_be_assigned() {
        assert!(ensure_assigned(&user(4, Role::INSTRUMENTADOR), &cirugia(Some(4))).is_ok());
        assert_eq!(
            ensure_assigned(&user(5, Role::INSTRUMENTADOR), &cirugia(Some(4))),
            Err(HttpError::forbidden("No estás asignado a esta cirugía"))
        );
        assert!(ensure_assigned(&user(5, Role::INSTRUMENTADOR), &cirugia(None)).is_err());
    }

    #[test]
    fn test_supervisors_bypass_assignment() {
        assert!(ensure_assigned(&user(1, Role::ADMINISTRADOR), &cirugia(Some(4))).is_ok());
        assert!(ensure_assigned(&user(2, Role::ENFERMERA_JEFE), &cirugia(None)).is_ok());
    }
}
