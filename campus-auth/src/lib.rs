//! campus-auth: local authentication for the campus backend.
//!
//! - [`PasswordHasher`] hashes and verifies bcrypt credentials.
//! - [`AuthGate`] checks a (tenant code, email, password) login against the
//!   principals a [`PrincipalResolver`] returns.

pub mod gate;
pub mod password;

pub use gate::{AuthGate, AuthGateOptions, CredentialRecord, PrincipalResolver};
pub use password::PasswordHasher;
