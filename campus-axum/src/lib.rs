//! campus-axum: Axum adapter for the campus backend.
//!
//! Builds the HTTP router over a [`campus_core::CampusApp`] and maps
//! `CampusError`s onto JSON error responses.

pub mod app;
pub mod rest;
pub mod state;
mod error;
pub use error::CampusAxumError;
pub use state::CampusAxumState;

pub use app::{axum, AxumApp};
