//! Core types and trait definitions for the Stagehand event platform.
//!
//! No HTTP or database code lives here. Geometry and compliance checks are
//! in [`measure`]; the service layer every backend implements is in
//! [`store`].

pub mod account;
pub mod booking;
pub mod error;
pub mod event;
pub mod feed;
pub mod measure;
pub mod message;
pub mod profile;
pub mod site_map;
pub mod store;
pub mod ticket;
pub mod travel;

pub use error::{Classify, Error, ErrorKind, Result};
