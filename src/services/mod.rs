//! Business logic services layer

pub mod role_service;

pub use role_service::{PermissionPreview, RoleService, SelectionOutcome};
