use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

/// Errors surfaced by the order, cart and analytics operations.
///
/// Every variant is scoped to the single call that produced it; nothing here is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum ShopError {
    /// A write would break an invariant. Nothing was committed.
    #[error("{message}")]
    Validation { field: String, message: String },
    #[error("No {entity} with {id} id was found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ShopError {
    /// `billing_id is invalid` style error for a rejected reference or value.
    pub fn invalid(field: &str) -> Self {
        Self::Validation {
            field: field.to_owned(),
            message: format!("{field} is invalid"),
        }
    }

    pub fn rule(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    /// Name of the offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ShopError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();

        match fields.first() {
            Some(field) => Self::invalid(field),
            None => Self::rule("base", errors.to_string()),
        }
    }
}
