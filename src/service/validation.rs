//! Required-value validation from field definitions.

use crate::codec::is_empty_value;
use crate::error::AppError;
use crate::schema::FieldDefinition;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate an insert payload. All required fields must be present and non-empty.
    pub fn validate(data: &Map<String, Value>, fields: &[FieldDefinition]) -> Result<(), AppError> {
        for field in fields.iter().filter(|f| f.required) {
            match data.get(&field.name) {
                Some(v) => Self::validate_value(field, v)?,
                None => return Err(AppError::Unprocessable(format!("{} is required", field.name))),
            }
        }
        Ok(())
    }

    /// Validate only the fields present in data (for updates). Missing required fields are fine.
    pub fn validate_partial(data: &Map<String, Value>, fields: &[FieldDefinition]) -> Result<(), AppError> {
        for field in fields {
            if let Some(v) = data.get(&field.name) {
                Self::validate_value(field, v)?;
            }
        }
        Ok(())
    }

    pub fn validate_value(field: &FieldDefinition, v: &Value) -> Result<(), AppError> {
        if field.required && is_empty_value(v) {
            return Err(AppError::Unprocessable(format!("{} is required", field.name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::scalar("title").required(),
            FieldDefinition::scalar("body"),
            FieldDefinition::upload("cover", FieldType::Image),
        ]
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_requires_present_non_empty() {
        assert!(RequestValidator::validate(&obj(json!({"title": "x"})), &fields()).is_ok());
        assert!(matches!(
            RequestValidator::validate(&obj(json!({"body": "x"})), &fields()),
            Err(AppError::Unprocessable(_))
        ));
        assert!(matches!(
            RequestValidator::validate(&obj(json!({"title": ""})), &fields()),
            Err(AppError::Unprocessable(_))
        ));
    }

    #[test]
    fn partial_only_checks_present_fields() {
        assert!(RequestValidator::validate_partial(&obj(json!({"body": ""})), &fields()).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"title": null})), &fields()).is_err());
        assert!(RequestValidator::validate_partial(&obj(json!({"title": 0})), &fields()).is_ok());
    }
}
