pub mod config;
pub mod routes;
pub mod startup;
pub mod templates;

pub use config::*;
pub use startup::*;
