//! Field definitions and the closed set of field types.

use crate::codec::UploadResult;
use crate::config::FieldKindConfig;
use serde::Serialize;
use serde_json::Value;

/// Variant segment used in upload URLs when a field does not configure one.
pub const DEFAULT_THUMBNAIL_VARIANT: &str = "thumbnail";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Scalar,
    /// Single image; a new upload replaces the previous one.
    Image,
    /// Ordered image gallery; uploads accumulate.
    Pictures,
    /// Generic file; uploads accumulate.
    Storage,
}

impl FieldType {
    /// Upload behaviour of this type; `None` for scalars.
    pub fn upload_kind(self) -> Option<UploadKind> {
        match self {
            FieldType::Scalar => None,
            FieldType::Image => Some(UploadKind::Image),
            FieldType::Pictures => Some(UploadKind::Pictures),
            FieldType::Storage => Some(UploadKind::Storage),
        }
    }

    pub fn is_upload(self) -> bool {
        self.upload_kind().is_some()
    }
}

/// The upload-capable subset of [`FieldType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Image,
    Pictures,
    Storage,
}

impl UploadKind {
    /// Combine the previously stored uploads with a new one into the list to persist.
    /// Only [`UploadKind::Image`] replaces; the other kinds append.
    pub fn merge_upload(self, mut previous: Vec<UploadResult>, upload: UploadResult) -> Vec<UploadResult> {
        match self {
            UploadKind::Image => vec![upload],
            UploadKind::Pictures | UploadKind::Storage => {
                previous.push(upload);
                previous
            }
        }
    }

    /// Whether a new upload leaves the earlier files orphaned.
    pub fn replaces_on_upload(self) -> bool {
        matches!(self, UploadKind::Image)
    }
}

impl From<FieldKindConfig> for FieldType {
    fn from(k: FieldKindConfig) -> Self {
        match k {
            FieldKindConfig::Scalar => FieldType::Scalar,
            FieldKindConfig::Image => FieldType::Image,
            FieldKindConfig::Pictures => FieldType::Pictures,
            FieldKindConfig::Storage => FieldType::Storage,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldOptions {
    pub thumbnail_variant: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    /// PostgreSQL type for casts and DDL. None binds untyped.
    pub sql_type: Option<String>,
    pub options: FieldOptions,
}

impl FieldDefinition {
    pub fn scalar(name: impl Into<String>) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type: FieldType::Scalar,
            required: false,
            sql_type: None,
            options: FieldOptions::default(),
        }
    }

    pub fn upload(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
            required: false,
            sql_type: Some("text".into()),
            options: FieldOptions::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn thumbnail_variant(&self) -> &str {
        self.options
            .thumbnail_variant
            .as_deref()
            .unwrap_or(DEFAULT_THUMBNAIL_VARIANT)
    }

    /// Value written when the field is reset. Text-like columns get '' and everything else NULL.
    pub fn empty_value(&self) -> Value {
        let textual = self.field_type.is_upload()
            || match self.sql_type.as_deref() {
                None => true,
                Some(t) => {
                    let t = t.to_lowercase();
                    t == "text" || t.starts_with("varchar") || t.starts_with("character") || t.starts_with("char")
                }
            };
        if textual {
            Value::String(String::new())
        } else {
            Value::Null
        }
    }
}
