use std::str::FromStr;

use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    GcmsQueryError,
    ParameterError,
};

/// A span or point in retention time with its unit.
///
/// Everything downstream works in seconds, this only exists so
/// configs and callers can say "1.5m" or "30s".
///
/// ```
/// use gcmsquery::utils::time::TimeSpec;
///
/// let t: TimeSpec = "1.5m".parse().unwrap();
/// assert_eq!(t.seconds(), 90.0);
/// let t: TimeSpec = "12s".parse().unwrap();
/// assert_eq!(t, TimeSpec::Seconds(12.0));
/// assert!("12".parse::<TimeSpec>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeSpec {
    #[serde(rename = "seconds")]
    Seconds(f64),
    #[serde(rename = "minutes")]
    Minutes(f64),
}

impl TimeSpec {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeSpec::Seconds(x) => *x,
            TimeSpec::Minutes(x) => *x * 60.0,
        }
    }
}

impl FromStr for TimeSpec {
    type Err = GcmsQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || -> GcmsQueryError {
            ParameterError::InvalidValue {
                parameter: "time",
                value: s.to_string(),
                context: "expected a number followed by 's' or 'm'".to_string(),
            }
            .into()
        };

        let (number, ctor): (&str, fn(f64) -> TimeSpec) = if let Some(x) = trimmed.strip_suffix('s')
        {
            (x, TimeSpec::Seconds)
        } else if let Some(x) = trimmed.strip_suffix('m') {
            (x, TimeSpec::Minutes)
        } else {
            return Err(invalid());
        };

        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(ctor(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_strings() {
        assert_eq!("10s".parse::<TimeSpec>().unwrap().seconds(), 10.0);
        assert_eq!(" 2 m".parse::<TimeSpec>().unwrap().seconds(), 120.0);
        assert!("m".parse::<TimeSpec>().is_err());
        assert!("tens".parse::<TimeSpec>().is_err());
        assert!("infs".parse::<TimeSpec>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let t: TimeSpec = serde_json::from_str(r#"{"minutes": 0.5}"#).unwrap();
        assert_eq!(t.seconds(), 30.0);
    }
}
