//! Adapters for the collaborators around the core: CSV report export,
//! location providers and UPI payment intents.

pub mod csv;
pub mod location;
pub mod payment;
