//! String-backed domain enumerations.
//!
//! Every enum is stored as its lowercase text in a `VARCHAR` column and
//! travels as the same text in JSON.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use std::fmt;

/// Text that does not name a variant of the target enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as sqlx::Encode<'q, Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as sqlx::Decode<'r, Postgres>>::decode(value)?;
                Ok(raw.parse::<$name>()?)
            }
        }
    };
}

string_enum! {
    /// Life-cycle state of a surgery
    EstadoCirugia {
        Programada => "programada",
        EnPreparacion => "en_preparacion",
        ConteoInicial => "conteo_inicial",
        EnCurso => "en_curso",
        ConteoFinal => "conteo_final",
        Finalizada => "finalizada",
        Cancelada => "cancelada",
        Pospuesta => "pospuesta",
        Otro => "otro",
    }
}

string_enum! {
    Prioridad {
        Baja => "baja",
        Media => "media",
        Alta => "alta",
        Urgente => "urgente",
        Otro => "otro",
    }
}

string_enum! {
    NivelComplejidad {
        Baja => "baja",
        Media => "media",
        Alta => "alta",
        Critica => "critica",
        Otro => "otro",
    }
}

string_enum! {
    Severidad {
        Baja => "baja",
        Media => "media",
        Alta => "alta",
        Critica => "critica",
        Otro => "otro",
    }
}

string_enum! {
    EstadoQuirofano {
        Libre => "libre",
        Ocupado => "ocupado",
        Mantenimiento => "mantenimiento",
        Limpieza => "limpieza",
        FueraServicio => "fuera_servicio",
        Otro => "otro",
    }
}

string_enum! {
    /// Kind of supplying entity: the sterile central or the pharmacy
    TipoEntidad {
        Central => "central",
        Farmacia => "farmacia",
        Otro => "otro",
    }
}

string_enum! {
    TipoItem {
        Instrumento => "instrumento",
        Medicamento => "medicamento",
        Material => "material",
        Equipo => "equipo",
        Otro => "otro",
    }
}

string_enum! {
    /// Role of an auxiliary doctor inside a surgery
    RolCirugia {
        CirujanoAuxiliar => "cirujano_auxiliar",
        Anestesiologo => "anestesiologo",
        Residente => "residente",
        Observador => "observador",
        Otro => "otro",
    }
}

string_enum! {
    TipoConteo {
        Inicial => "inicial",
        Final => "final",
        Otro => "otro",
    }
}

string_enum! {
    EstadoConteo {
        Correcto => "correcto",
        Faltante => "faltante",
        Sobrante => "sobrante",
        Danado => "dañado" | "danado",
        Otro => "otro",
    }
}

string_enum! {
    EstadoSolicitud {
        Pendiente => "pendiente",
        EnProceso => "en_proceso",
        Entregada => "entregada",
        Cancelada => "cancelada",
        Otro => "otro",
    }
}

string_enum! {
    MetodoEsterilizacion {
        Autoclave => "autoclave",
        OxidoEtileno => "oxido_etileno",
        Plasma => "plasma",
        Vapor => "vapor",
        Otro => "otro",
    }
}

string_enum! {
    EstadoEsterilizacion {
        EnProceso => "en_proceso",
        Completada => "completada",
    }
}

string_enum! {
    TipoIncidente {
        InstrumentoPerdido => "instrumento_perdido",
        InstrumentoContaminado => "instrumento_contaminado",
        InstrumentoDanado => "instrumento_dañado" | "instrumento_danado",
        ComplicacionMedica => "complicacion_medica",
        FaltaMaterial => "falta_material",
        Otro => "otro",
    }
}

string_enum! {
    TipoNotificacion {
        SolicitudMaterial => "solicitud_material",
        StockBajo => "stock_bajo",
        CirugiaProgramada => "cirugia_programada",
        Incidente => "incidente",
        Sistema => "sistema",
        Otro => "otro",
    }
}

string_enum! {
    TipoSangre {
        APositivo => "A+",
        ANegativo => "A-",
        BPositivo => "B+",
        BNegativo => "B-",
        AbPositivo => "AB+",
        AbNegativo => "AB-",
        OPositivo => "O+",
        ONegativo => "O-",
        Otro => "OTRO",
    }
}
