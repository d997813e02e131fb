//! Birthplace coordinate resolution against the GeoNames gazetteer.

pub mod config;
pub mod gazetteer;
pub mod report;
pub mod server;
