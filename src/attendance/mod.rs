//! Geo-fenced attendance core: fence evaluation, zone classification and the
//! check-in/check-out session lifecycle. Persistence and the fence settings
//! are reached through the traits in [`store`].

pub mod classifier;
pub mod geofence;
pub mod mysql_store;
pub mod store;
pub mod tracker;

#[cfg(test)]
pub mod fake_store;
