//! Table rows and the inputs used to create them.

pub mod cirugia;
pub mod clinica;
pub mod enums;
pub mod instrumentacion;
pub mod notificacion;
pub mod quirofano;
pub mod suministro;
pub mod usuario;

pub use cirugia::*;
pub use clinica::*;
pub use enums::*;
pub use instrumentacion::*;
pub use notificacion::*;
pub use quirofano::*;
pub use suministro::*;
pub use usuario::*;
