//! Surgery life-cycle rules.
//!
//! The state is a flat enum; each mutation checks membership of the current
//! state in the set it accepts. Transition history lives only in the
//! free-text observations.

use chrono::{DateTime, Utc};

use crate::models::{Cirugia, EstadoCirugia};

impl EstadoCirugia {
    /// Edit, postpone and cancel are refused once the patient is in the room
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            EstadoCirugia::EnCurso | EstadoCirugia::ConteoFinal | EstadoCirugia::Finalizada
        )
    }

    /// Postpone and cancel also refuse a surgery that was already cancelled
    pub fn is_closed(&self) -> bool {
        self.is_locked() || matches!(self, EstadoCirugia::Cancelada)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, EstadoCirugia::Programada | EstadoCirugia::EnPreparacion)
    }

    pub fn can_finish(&self) -> bool {
        matches!(self, EstadoCirugia::EnCurso | EstadoCirugia::ConteoFinal)
    }

    pub fn can_open_initial_count(&self) -> bool {
        matches!(self, EstadoCirugia::Programada | EstadoCirugia::EnPreparacion)
    }

    pub fn can_open_final_count(&self) -> bool {
        *self == EstadoCirugia::EnCurso
    }

    pub fn accepts_additional_stock(&self) -> bool {
        *self == EstadoCirugia::EnCurso
    }

    pub fn accepts_instrument_request(&self) -> bool {
        !matches!(
            self,
            EstadoCirugia::EnCurso
                | EstadoCirugia::ConteoFinal
                | EstadoCirugia::Finalizada
                | EstadoCirugia::Cancelada
        )
    }

    pub fn accepts_damage_report(&self) -> bool {
        matches!(
            self,
            EstadoCirugia::EnPreparacion
                | EstadoCirugia::ConteoInicial
                | EstadoCirugia::EnCurso
                | EstadoCirugia::ConteoFinal
        )
    }

    /// Cancelled and finished surgeries release their room
    pub fn blocks_room(&self) -> bool {
        !matches!(self, EstadoCirugia::Cancelada | EstadoCirugia::Finalizada)
    }

    /// States the instrumentalist sees as still to come
    pub fn pending() -> Vec<EstadoCirugia> {
        vec![
            EstadoCirugia::Programada,
            EstadoCirugia::EnPreparacion,
            EstadoCirugia::ConteoInicial,
            EstadoCirugia::Pospuesta,
        ]
    }
}

/// Observation sections written when a surgery finishes
#[derive(Debug, Clone, Default)]
pub struct CierreCirugia {
    pub generales: Option<String>,
    pub cirujano: Option<String>,
    pub anestesiologo: Option<String>,
}

impl CierreCirugia {
    /// Concatenate the non-empty sections, `None` when all are empty
    pub fn observaciones(&self) -> Option<String> {
        let mut text = String::new();
        let sections = [
            ("OBSERVACIONES GENERALES", &self.generales),
            ("OBSERVACIONES DEL CIRUJANO", &self.cirujano),
            ("OBSERVACIONES DEL ANESTESIÓLOGO", &self.anestesiologo),
        ];
        for (title, body) in sections {
            if let Some(body) = body.as_deref().filter(|b| !b.trim().is_empty()) {
                text.push_str(&format!("{}:\n{}\n\n", title, body));
            }
        }
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

impl Cirugia {
    /// Append a labelled note to the pre-surgery observations
    pub fn append_nota(&mut self, etiqueta: &str, motivo: Option<&str>) {
        let motivo = motivo
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("Sin motivo especificado");
        let nota = format!("{}: {}", etiqueta, motivo);
        self.observaciones_previas = Some(match self.observaciones_previas.take() {
            Some(previas) if !previas.is_empty() => format!("{}\n\n{}", previas, nota),
            _ => nota,
        });
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.estado = EstadoCirugia::EnCurso;
        self.fecha_inicio = Some(now);
    }

    pub fn finish(&mut self, now: DateTime<Utc>, cierre: &CierreCirugia, diagnostico: Option<String>) {
        self.estado = EstadoCirugia::Finalizada;
        self.fecha_fin = Some(now);
        if let Some(inicio) = self.fecha_inicio {
            let segundos = (now - inicio).num_seconds() as f64;
            self.duracion_real_minutos = Some((segundos / 60.0).round() as i32);
        }
        self.observaciones_finales = cierre.observaciones();
        if diagnostico.is_some() {
            self.diagnostico_postoperatorio = diagnostico;
        }
    }

    /// Whole minutes since start, up to the end or `now`
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let inicio = self.fecha_inicio?;
        let fin = self.fecha_fin.unwrap_or(now);
        Some((fin - inicio).num_minutes().max(0))
    }
}
