use std::fmt::Display;

/// Top level error for everything that reads or reshapes GC-MS signal data.
///
/// The three variants follow the failure classes callers care about:
/// a bad knob (`Parameter`), malformed input (`DataShape`) and input that
/// is well formed but too small for the requested statistic
/// (`InsufficientData`).
#[derive(Debug, Clone, PartialEq)]
pub enum GcmsQueryError {
    Parameter(ParameterError),
    DataShape(DataShapeError),
    InsufficientData(InsufficientDataError),
}

impl Display for GcmsQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for GcmsQueryError {}

pub type Result<T> = std::result::Result<T, GcmsQueryError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    ExpectedPositive {
        parameter: &'static str,
        value: f64,
        context: String,
    },
    ExpectedOddWindow {
        parameter: &'static str,
        value: usize,
        context: String,
    },
    BinBoundsMismatch {
        lower: f64,
        upper: f64,
        width: f64,
        context: String,
    },
    InvalidRange {
        parameter: &'static str,
        low: f64,
        high: f64,
        context: String,
    },
    InvalidValue {
        parameter: &'static str,
        value: String,
        context: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataShapeError {
    ExpectedNonEmptyData {
        context: String,
    },
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    ExpectedStrictlyIncreasing {
        index: usize,
        context: String,
    },
    ExpectedFiniteNonNanData {
        index: usize,
        context: String,
    },
    ValueOutOfRange {
        value: f64,
        min: f64,
        max: f64,
        context: String,
    },
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsufficientDataError {
    TooFewPoints {
        real: usize,
        expected: usize,
        context: String,
    },
    NoUsableValues {
        context: String,
    },
}

impl ParameterError {
    pub fn append_to_context(mut self, extra: &str) -> Self {
        match &mut self {
            Self::ExpectedPositive { context, .. }
            | Self::ExpectedOddWindow { context, .. }
            | Self::BinBoundsMismatch { context, .. }
            | Self::InvalidRange { context, .. }
            | Self::InvalidValue { context, .. } => push_context(context, extra),
        }
        self
    }
}

impl DataShapeError {
    pub fn append_to_context(mut self, extra: &str) -> Self {
        match &mut self {
            Self::ExpectedNonEmptyData { context }
            | Self::ExpectedSlicesSameLength { context, .. }
            | Self::ExpectedStrictlyIncreasing { context, .. }
            | Self::ExpectedFiniteNonNanData { context, .. }
            | Self::ValueOutOfRange { context, .. }
            | Self::IndexOutOfBounds { context, .. } => push_context(context, extra),
        }
        self
    }
}

impl InsufficientDataError {
    pub fn append_to_context(mut self, extra: &str) -> Self {
        match &mut self {
            Self::TooFewPoints { context, .. } | Self::NoUsableValues { context } => {
                push_context(context, extra)
            }
        }
        self
    }
}

impl GcmsQueryError {
    pub fn append_to_context(self, extra: &str) -> Self {
        match self {
            Self::Parameter(e) => Self::Parameter(e.append_to_context(extra)),
            Self::DataShape(e) => Self::DataShape(e.append_to_context(extra)),
            Self::InsufficientData(e) => Self::InsufficientData(e.append_to_context(extra)),
        }
    }
}

fn push_context(context: &mut String, extra: &str) {
    if !context.is_empty() {
        context.push_str(" <- ");
    }
    context.push_str(extra);
}

impl From<ParameterError> for GcmsQueryError {
    fn from(e: ParameterError) -> Self {
        GcmsQueryError::Parameter(e)
    }
}

impl From<DataShapeError> for GcmsQueryError {
    fn from(e: DataShapeError) -> Self {
        GcmsQueryError::DataShape(e)
    }
}

impl From<InsufficientDataError> for GcmsQueryError {
    fn from(e: InsufficientDataError) -> Self {
        GcmsQueryError::InsufficientData(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_accumulates() {
        let err: GcmsQueryError = DataShapeError::ExpectedNonEmptyData {
            context: "scans".to_string(),
        }
        .into();
        let err = err.append_to_context("binning");
        match err {
            GcmsQueryError::DataShape(DataShapeError::ExpectedNonEmptyData { context }) => {
                assert_eq!(context, "scans <- binning");
            }
            other => panic!("Unexpected error {:?}", other),
        }
    }
}
