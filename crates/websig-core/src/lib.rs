//! websig-core: Shared types for the WebSig embed client and host server
//!
//! This crate contains the settings, wire messages and error taxonomy that are
//! shared between the browser client and the server that hosts the page.

pub mod errors;
pub mod messages;
pub mod types;
pub mod urls;

pub use errors::*;
pub use messages::*;
pub use types::*;
pub use urls::*;
