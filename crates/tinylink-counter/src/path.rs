use crate::error::{CounterError, Result};
use std::fmt::Display;
use std::str::FromStr;

/// An absolute, `/`-separated location of a node in the coordination service.
///
/// Empty segments are dropped, so `//tinylink//counter/` and
/// `/tinylink/counter` name the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterPath {
    segments: Vec<String>,
}

impl CounterPath {
    pub fn new(path: &str) -> Result<Self> {
        if !path.starts_with('/') {
            return Err(CounterError::InvalidPath {
                path: path.to_string(),
                reason: "path must be absolute".to_string(),
            });
        }

        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(CounterError::InvalidPath {
                path: path.to_string(),
                reason: "path must name at least one node".to_string(),
            });
        }

        Ok(Self { segments })
    }

    /// Every path from the topmost ancestor down to and including this one.
    pub fn ancestors(&self) -> Vec<String> {
        let mut current = String::new();
        self.segments
            .iter()
            .map(|segment| {
                current.push('/');
                current.push_str(segment);
                current.clone()
            })
            .collect()
    }
}

impl FromStr for CounterPath {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Display for CounterPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
