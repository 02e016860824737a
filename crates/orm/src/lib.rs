//! # quirofano-orm
//!
//! Persistence for the surgery-management service: entities, life-cycle
//! rules, the booking window, storage backends, migrations and seeding.

pub mod backends;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod migrations;
pub mod models;
pub mod scheduling;
pub mod seeding;

pub use backends::{
    ClinicalStore, FacilityStore, InstrumentationStore, MemoryStore, NotificationStore,
    PostgresStore, Store, SupplyStore, SurgeryStore, UserStore,
};
pub use database::create_database_pool;
pub use error::*;
pub use lifecycle::CierreCirugia;
pub use migrations::{MigrationRunResult, MigrationRunner};
pub use seeding::SeederManager;
