use serde::{Deserialize, Serialize};

use crate::db::entities::{ingredient, tag};
use crate::web::error::{AppError, FieldErrors};
use crate::web::models::{FIELD_BLANK, FIELD_REQUIRED, MAX_NAME_LENGTH, PayloadMode, too_long_message};

/// `{ "name": ... }`, used both for tag/ingredient bodies and for the nested
/// items of a recipe body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamePayload {
    pub name: Option<String>,
}

impl NamePayload {
    /// Trimmed name, or a field error recorded under `field`.
    pub(crate) fn check(&self, field: &str, mode: PayloadMode, errors: &mut FieldErrors) -> Option<String> {
        match &self.name {
            None => {
                if mode == PayloadMode::Full {
                    errors.add(field, FIELD_REQUIRED);
                }
                None
            }
            Some(raw) => {
                let name = raw.trim();
                if name.is_empty() {
                    errors.add(field, FIELD_BLANK);
                    None
                } else if name.chars().count() > MAX_NAME_LENGTH {
                    errors.add(field, too_long_message(MAX_NAME_LENGTH));
                    None
                } else {
                    Some(name.to_owned())
                }
            }
        }
    }

    /// Validates a tag or ingredient rename body.
    pub fn validate(self, mode: PayloadMode) -> Result<Option<String>, AppError> {
        let mut errors = FieldErrors::default();
        let name = self.check("name", mode, &mut errors);
        errors.into_result()?;
        Ok(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
