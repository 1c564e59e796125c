/// Errors raised while loading a form version. All of them are fatal for
/// the form: nothing can be rendered from a schema that fails these checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The document is not valid form version JSON.
    #[error("malformed form schema: {0}")]
    Malformed(String),

    /// The version envelope carries no `schema` object.
    #[error("form version {version_id} has no schema")]
    MissingSchema { version_id: String },

    /// A field was declared with an empty id.
    #[error("field in section '{section}' has an empty id")]
    EmptyFieldId { section: String },

    /// Field ids must be unique across the whole schema, not only per section.
    #[error("duplicate field id '{field_id}'")]
    DuplicateFieldId { field_id: String },

    /// A condition rule names a source field that does not exist.
    #[error("field '{field_id}' has a condition on unknown field '{source_field_id}'")]
    UnknownSourceField {
        field_id: String,
        source_field_id: String,
    },
}
