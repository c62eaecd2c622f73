use std::path::PathBuf;

use gcmsquery::errors::{
    DataShapeError,
    GcmsQueryError,
    InsufficientDataError,
    ParameterError,
};

#[derive(Debug)]
pub enum ConfigError {
    Parse {
        source: serde_json::Error,
        context: String,
    },
    FileReading {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub enum GcmsSeekError {
    Query(GcmsQueryError),
    Config(ConfigError),
}

impl std::fmt::Display for GcmsSeekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for GcmsSeekError {}

pub type Result<T> = std::result::Result<T, GcmsSeekError>;

impl GcmsSeekError {
    pub fn append_to_context(self, context: &str) -> Self {
        match self {
            Self::Query(e) => Self::Query(e.append_to_context(context)),
            Self::Config(ConfigError::Parse {
                source,
                context: mut owned,
            }) => {
                if !owned.is_empty() {
                    owned.push_str(" <- ");
                }
                owned.push_str(context);
                Self::Config(ConfigError::Parse {
                    source,
                    context: owned,
                })
            }
            other => other,
        }
    }

    pub fn is_parameter_error(&self) -> bool {
        matches!(self, Self::Query(GcmsQueryError::Parameter(_)))
    }

    pub fn is_data_shape_error(&self) -> bool {
        matches!(self, Self::Query(GcmsQueryError::DataShape(_)))
    }

    pub fn is_insufficient_data_error(&self) -> bool {
        matches!(self, Self::Query(GcmsQueryError::InsufficientData(_)))
    }
}

impl From<GcmsQueryError> for GcmsSeekError {
    fn from(x: GcmsQueryError) -> Self {
        Self::Query(x)
    }
}

impl From<ParameterError> for GcmsSeekError {
    fn from(x: ParameterError) -> Self {
        Self::Query(x.into())
    }
}

impl From<DataShapeError> for GcmsSeekError {
    fn from(x: DataShapeError) -> Self {
        Self::Query(x.into())
    }
}

impl From<InsufficientDataError> for GcmsSeekError {
    fn from(x: InsufficientDataError) -> Self {
        Self::Query(x.into())
    }
}

impl From<ConfigError> for GcmsSeekError {
    fn from(x: ConfigError) -> Self {
        Self::Config(x)
    }
}

impl From<serde_json::Error> for GcmsSeekError {
    fn from(val: serde_json::Error) -> Self {
        Self::Config(ConfigError::Parse {
            source: val,
            context: "".to_string(),
        })
    }
}
