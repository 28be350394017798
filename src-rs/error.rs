use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("{0}")]
    WrongFileKind(String),

    #[error("Error reading JSON file: {0}")]
    ParseFailure(String),

    #[error("Unrecognized JSON format")]
    UnrecognizedFormat,

    #[error(
        "Image dimensions do not match JSON specification: image is {image_w}x{image_h}, sheet declares {sheet}"
    )]
    DimensionMismatch {
        image_w: u32,
        image_h: u32,
        sheet: String,
    },

    #[error("Error loading image: {0}")]
    ImageDecodeFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl ViewerError {
    /// Short machine-readable name, used in JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::WrongFileKind(_) => "wrong_file_kind",
            ViewerError::ParseFailure(_) => "parse_failure",
            ViewerError::UnrecognizedFormat => "unrecognized_format",
            ViewerError::DimensionMismatch { .. } => "dimension_mismatch",
            ViewerError::ImageDecodeFailure(_) => "image_decode_failure",
            ViewerError::Io(_) => "io",
            ViewerError::Json(_) => "json",
            ViewerError::TomlDe(_) | ViewerError::TomlSer(_) => "preferences",
        }
    }
}

impl serde::Serialize for ViewerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;
