//! Sequence chunking settings (`"size:step"`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

const KEY: &str = "chunking";

/// Splits long sequences into windows of `size` frames, advancing by `step`.
///
/// A size of zero disables chunking.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chunking {
    size: usize,
    step: usize,
}

impl Chunking {
    /// Creates chunking settings. A zero `size` yields [`Chunking::disabled`]
    /// whatever the step.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when chunking is enabled with a
    /// zero step.
    pub fn new(size: usize, step: usize) -> Result<Self> {
        if size == 0 {
            return Ok(Self::disabled());
        }
        if step == 0 {
            return Err(ConfigError::invalid(KEY, "step must be positive"));
        }
        Ok(Self { size, step })
    }

    /// Chunking turned off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { size: 0, step: 0 }
    }

    /// Window length in frames.
    #[must_use]
    pub const fn size(self) -> usize {
        self.size
    }

    /// Window advance in frames.
    #[must_use]
    pub const fn step(self) -> usize {
        self.step
    }

    /// Whether sequences are chunked at all.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.size > 0
    }

    /// Whether consecutive windows share frames.
    #[must_use]
    pub const fn overlaps(self) -> bool {
        self.is_enabled() && self.step < self.size
    }
}

fn parse_component(part: &str) -> Result<usize> {
    part.trim().parse().map_err(|_| {
        ConfigError::invalid(
            KEY,
            format!("`{}` is not a non-negative integer", part.trim()),
        )
    })
}

impl FromStr for Chunking {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((size, step)) => Self::new(parse_component(size)?, parse_component(step)?),
            None => {
                let size = parse_component(s)?;
                Self::new(size, size)
            }
        }
    }
}

impl Display for Chunking {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_enabled() {
            write!(f, "{}:{}", self.size, self.step)
        } else {
            f.write_str("0")
        }
    }
}

impl TryFrom<String> for Chunking {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Chunking> for String {
    fn from(value: Chunking) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_and_step() {
        let chunking: Chunking = "200:200".parse().unwrap();
        assert_eq!(chunking.size(), 200);
        assert_eq!(chunking.step(), 200);
        assert!(chunking.is_enabled());
        assert!(!chunking.overlaps());
    }

    #[test]
    fn single_value_uses_size_as_step() {
        let chunking: Chunking = "50".parse().unwrap();
        assert_eq!((chunking.size(), chunking.step()), (50, 50));
    }

    #[test]
    fn zero_disables() {
        let chunking: Chunking = "0".parse().unwrap();
        assert!(!chunking.is_enabled());
        assert_eq!(chunking, Chunking::disabled());
        assert_eq!(chunking.to_string(), "0");
    }

    #[test]
    fn zero_size_ignores_step() {
        let chunking: Chunking = "0:5".parse().unwrap();
        assert_eq!(chunking, Chunking::disabled());
        assert_eq!(chunking.step(), 0);

        let text = chunking.to_string();
        assert_eq!(text, "0");
        assert_eq!(text.parse::<Chunking>().unwrap(), chunking);
    }

    #[test]
    fn serde_uses_text_form() {
        for text in ["200:200", "100:50", "0:5", "0"] {
            let chunking: Chunking = text.parse().unwrap();
            let value = serde_json::to_value(chunking).unwrap();
            let back: Chunking = serde_json::from_value(value).unwrap();
            assert_eq!(back, chunking, "{text}");
        }
        assert!(serde_json::from_str::<Chunking>(r#""10:0""#).is_err());
    }

    #[test]
    fn overlapping_windows() {
        let chunking: Chunking = "100:50".parse().unwrap();
        assert!(chunking.overlaps());
        assert_eq!(chunking.to_string(), "100:50");
    }

    #[test]
    fn rejects_non_integer_components() {
        for text in ["A:B", "200:x", "1.5:2", ":", "-3:3"] {
            let err = text.parse::<Chunking>().expect_err(text);
            assert_eq!(err.key(), Some("chunking"));
        }
    }

    #[test]
    fn rejects_zero_step() {
        assert!("10:0".parse::<Chunking>().is_err());
    }
}
