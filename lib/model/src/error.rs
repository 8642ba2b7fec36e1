/// An error raised when a datatype name or IRI is not part of the supported set.
#[derive(Debug, thiserror::Error)]
#[error("'{name}' is not a supported source datatype")]
pub struct DataTypeParseError {
    name: String,
}

impl DataTypeParseError {
    pub(crate) fn msg(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
