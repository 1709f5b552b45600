//! Enumerated option values: execution mode and batching policy.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Execution mode requested from the training engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Task {
    /// Train the network on the `train` dataset.
    Train,
    /// Forward data through a trained network and dump the outputs.
    Forward,
    /// Evaluate a trained network on held-out data.
    Eval,
    /// Decode with search.
    Search,
    /// Estimate label priors from the network outputs.
    ComputePriors,
}

impl Task {
    const ALL: [Self; 5] = [
        Self::Train,
        Self::Forward,
        Self::Eval,
        Self::Search,
        Self::ComputePriors,
    ];

    /// The tag used in configuration documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Forward => "forward",
            Self::Eval => "eval",
            Self::Search => "search",
            Self::ComputePriors => "compute_priors",
        }
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|task| task.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                ConfigError::invalid(
                    "task",
                    format!("unknown task `{s}` (expected one of {})", known.join(", ")),
                )
            })
    }
}

impl TryFrom<String> for Task {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Task> for String {
    fn from(value: Task) -> Self {
        value.as_str().to_owned()
    }
}

/// Policy for grouping variable-length sequences into minibatches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Batching {
    /// Dataset order.
    #[default]
    Default,
    /// Shuffled order.
    Random,
    /// Shortest sequences first.
    Sorted,
    /// Longest sequences first.
    SortedReverse,
    /// Shuffled bins of the given size, each sorted by length.
    Laplace(usize),
}

impl Display for Batching {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Random => f.write_str("random"),
            Self::Sorted => f.write_str("sorted"),
            Self::SortedReverse => f.write_str("sorted_reverse"),
            Self::Laplace(bins) => write!(f, "laplace:{bins}"),
        }
    }
}

impl FromStr for Batching {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Self::Default),
            "random" => Ok(Self::Random),
            "sorted" => Ok(Self::Sorted),
            "sorted_reverse" => Ok(Self::SortedReverse),
            other => {
                let Some(bins) = other.strip_prefix("laplace:") else {
                    return Err(ConfigError::invalid(
                        "batching",
                        format!("unknown batching policy `{other}`"),
                    ));
                };
                match bins.parse::<usize>() {
                    Ok(bins) if bins > 0 => Ok(Self::Laplace(bins)),
                    _ => Err(ConfigError::invalid(
                        "batching",
                        format!("laplace bin size `{bins}` must be a positive integer"),
                    )),
                }
            }
        }
    }
}

impl TryFrom<String> for Batching {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Batching> for String {
    fn from(value: Batching) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tasks() {
        assert_eq!("train".parse::<Task>().unwrap(), Task::Train);
        assert_eq!(
            "compute_priors".parse::<Task>().unwrap(),
            Task::ComputePriors
        );
        let err = "fly".parse::<Task>().expect_err("unknown task");
        assert_eq!(err.key(), Some("task"));
    }

    #[test]
    fn parses_batching() {
        assert_eq!("random".parse::<Batching>().unwrap(), Batching::Random);
        assert_eq!(
            "laplace:1000".parse::<Batching>().unwrap(),
            Batching::Laplace(1000)
        );
        assert_eq!(Batching::Laplace(7).to_string(), "laplace:7");
        assert!("laplace:0".parse::<Batching>().is_err());
        assert!("shuffled".parse::<Batching>().is_err());
    }
}
