//! Multi-part catalog object names.
//!
//! An [`ObjectName`] has one to three parts (`catalog.schema.name`, `schema.name`, or
//! just `name`) and two renderings:
//!
//! - the **escaped** form `[dbo].[Order Lines]`, used whenever the name lands in SQL;
//! - the **simple** form `dbo.Order Lines`, where a `.` inside a part is written `..`,
//!   used as a stable lookup key and as the relation name the root table uses.
//!
//! The distinguished root name has no parts. It names the synthetic root table of a
//! circular model and never appears in generated SQL, so asking for its escaped form
//! is an error.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{BrowseError, Result};

const MAX_PARTS: usize = 3;

/// Immutable catalog object name.
#[derive(Clone)]
pub struct ObjectName {
    parts: Vec<String>,
    /// `None` only for the root name.
    escaped: Option<String>,
    simple: String,
}

impl ObjectName {
    /// Build a name from one to three non-empty parts.
    pub fn new<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() || parts.len() > MAX_PARTS {
            return Err(BrowseError::InvalidNamePart {
                part: parts.join("."),
                reason: "a name has one to three parts",
            });
        }
        for part in &parts {
            validate_part(part)?;
        }

        let escaped = parts
            .iter()
            .map(|p| escape_part(p))
            .collect::<Vec<_>>()
            .join(".");
        let simple = parts
            .iter()
            .map(|p| p.replace('.', ".."))
            .collect::<Vec<_>>()
            .join(".");

        Ok(Self {
            parts,
            escaped: Some(escaped),
            simple,
        })
    }

    /// Convenience for the common `schema.name` case.
    pub fn qualified(schema: &str, name: &str) -> Result<Self> {
        Self::new([schema, name])
    }

    /// The name of the synthetic root table.
    pub fn root() -> Self {
        Self {
            parts: Vec::new(),
            escaped: None,
            simple: String::new(),
        }
    }

    /// Parse a bracketed dotted identifier such as `[dbo].[Order]`.
    ///
    /// Only the outermost brackets of the first and last segment are stripped and the
    /// text is split on `].[`; doubled `]]` inside a segment collapses to `]`. Text
    /// without a leading bracket is split on single dots.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BrowseError::InvalidEscapedName {
                text: text.to_string(),
            });
        }

        if let Some(inner) = trimmed.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| BrowseError::InvalidEscapedName {
                    text: text.to_string(),
                })?;
            let parts: Vec<String> = inner.split("].[").map(|p| p.replace("]]", "]")).collect();
            return Self::new(parts);
        }

        Self::new(trimmed.split('.'))
    }

    pub fn is_root(&self) -> bool {
        self.escaped.is_none()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last part, i.e. the object's own name. Empty for the root name.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// The part before the object's own name, if any.
    pub fn schema(&self) -> Option<&str> {
        if self.parts.len() >= 2 {
            Some(&self.parts[self.parts.len() - 2])
        } else {
            None
        }
    }

    /// Bracket-escaped rendering for SQL text.
    pub fn escaped(&self) -> Result<&str> {
        self.escaped.as_deref().ok_or(BrowseError::RootNameInSql)
    }

    /// Dot-joined rendering used for lookups.
    pub fn simple(&self) -> &str {
        &self.simple
    }

    fn identity(&self) -> &str {
        self.escaped.as_deref().unwrap_or("")
    }
}

/// Reject empty parts and the characters the bracket syntax cannot carry safely.
fn validate_part(part: &str) -> Result<()> {
    if part.is_empty() {
        return Err(BrowseError::InvalidNamePart {
            part: part.to_string(),
            reason: "name parts must not be empty",
        });
    }
    if part.contains(['[', ']', '"']) {
        return Err(BrowseError::InvalidNamePart {
            part: part.to_string(),
            reason: "name parts must not contain '[', ']' or '\"'",
        });
    }
    Ok(())
}

/// Wrap a single identifier in brackets, doubling any closing bracket.
pub fn escape_part(part: &str) -> String {
    format!("[{}]", part.replace(']', "]]"))
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for ObjectName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(other.identity())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.escaped {
            Some(escaped) => f.write_str(escaped),
            None => f.write_str("<root>"),
        }
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self)
    }
}
