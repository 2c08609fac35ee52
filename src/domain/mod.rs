//! Domain layer: value objects, pure billing and geofence rules, and the
//! store ports the application layer is written against.

pub mod billing;
pub mod clock;
pub mod geofence;
pub mod money;
pub mod ports;
pub mod session;
pub mod user;
