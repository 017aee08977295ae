use serde::{Deserialize, Serialize};

pub mod recipe_models;
pub mod tag_models;

pub use recipe_models::*;
pub use tag_models::*;

// JWT claims issued by the external auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i32,
    pub exp: usize,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub subject: String,
}

/// Whether a request body must carry every required field (create and PUT)
/// or only the fields being changed (PATCH).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    Full,
    Partial,
}

pub(crate) const MAX_NAME_LENGTH: usize = 255;

pub(crate) const FIELD_REQUIRED: &str = "This field is required.";
pub(crate) const FIELD_BLANK: &str = "This field may not be blank.";

pub(crate) fn too_long_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}
