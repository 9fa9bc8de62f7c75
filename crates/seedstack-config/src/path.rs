//! Configuration path expressions.
//!
//! A path addresses a node inside a configuration tree. Segments are separated
//! by dots and array elements are addressed with a bracketed index:
//!
//! ```text
//! application.name
//! security.users[0].roles[1]
//! ```
//!
//! The empty string addresses the root.

use std::fmt;
use std::str::FromStr;

use crate::{ConfigError, ConfigResult};

/// One step of a [`ConfigPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map key.
    Key(String),
    /// Array index.
    Index(usize),
}

/// A parsed configuration path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfigPath {
    segments: Vec<PathSegment>,
}

impl ConfigPath {
    /// The root path (no segments).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path expression.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::{ConfigPath, PathSegment};
    ///
    /// let path = ConfigPath::parse("users[1].name").unwrap();
    /// assert_eq!(path.segments()[1], PathSegment::Index(1));
    /// ```
    pub fn parse(expression: &str) -> ConfigResult<Self> {
        let mut segments = Vec::new();
        if expression.is_empty() {
            return Ok(Self { segments });
        }

        for part in expression.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(open) => (&part[..open], &part[open..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(ConfigError::invalid_path(expression, "empty key segment"));
            }
            segments.push(PathSegment::Key(key.to_string()));

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| ConfigError::invalid_path(expression, "unclosed '['"))?;
                let index = rest[1..close].trim().parse::<usize>().map_err(|_| {
                    ConfigError::invalid_path(
                        expression,
                        format!("invalid array index '{}'", &rest[1..close]),
                    )
                })?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(ConfigError::invalid_path(
                        expression,
                        "unexpected text after ']'",
                    ));
                }
            }
        }

        Ok(Self { segments })
    }

    pub(crate) fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Returns the segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with a key appended.
    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Returns a new path with an array index appended.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }
}

impl FromStr for ConfigPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
