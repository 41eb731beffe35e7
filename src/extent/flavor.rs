//! Flavors: how much of the relation graph an extent expands into
//!
//! A [`Flavor`] pairs an intent ([`FlavorType`]) with a residual depth. Moving one
//! relation hop away from a parent reduces the flavor through
//! [`next_flavor_type`]; a child whose flavor reduces to `None` or whose depth goes
//! negative is not expanded at all.

use std::fmt;
use std::str::FromStr;

use crate::error::BrowseError;

/// Rendering intent of an extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlavorType {
    None,
    /// Only whether a related row exists.
    Existence,
    /// Second-level inline mention.
    Inline2,
    Inline,
    Block,
    Page,
    BlockList,
    PageList,
    /// Plain tabular listing.
    Table,
}

const ALL_TYPES: [FlavorType; 9] = [
    FlavorType::None,
    FlavorType::Existence,
    FlavorType::Inline2,
    FlavorType::Inline,
    FlavorType::Block,
    FlavorType::Page,
    FlavorType::BlockList,
    FlavorType::PageList,
    FlavorType::Table,
];

impl FlavorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlavorType::None => "none",
            FlavorType::Existence => "existence",
            FlavorType::Inline2 => "inline2",
            FlavorType::Inline => "inline",
            FlavorType::Block => "block",
            FlavorType::Page => "page",
            FlavorType::BlockList => "blocklist",
            FlavorType::PageList => "pagelist",
            FlavorType::Table => "table",
        }
    }
}

impl fmt::Display for FlavorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlavorType {
    type Err = BrowseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_TYPES
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| BrowseError::UnknownFlavor {
                name: s.to_string(),
            })
    }
}

/// The flavor type a child gets one hop below a parent of type `parent`.
///
/// `navigates_to_many` is true when the hop can yield several rows;
/// `uniquely_typed` when it is the only such hop between the two tables.
pub fn next_flavor_type(
    parent: FlavorType,
    navigates_to_many: bool,
    uniquely_typed: bool,
) -> FlavorType {
    match parent {
        FlavorType::PageList => FlavorType::Page,
        FlavorType::BlockList => FlavorType::Block,
        FlavorType::Page | FlavorType::Block => FlavorType::Inline,
        FlavorType::Inline if !navigates_to_many || uniquely_typed => FlavorType::Inline2,
        FlavorType::Inline
        | FlavorType::Inline2
        | FlavorType::None
        | FlavorType::Existence
        | FlavorType::Table => FlavorType::None,
    }
}

/// Depth a reduced child flavor starts with before clamping to the parent's budget.
const CHILD_DEPTH: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flavor {
    pub flavor_type: FlavorType,
    pub depth: i32,
}

impl Flavor {
    pub fn new(flavor_type: FlavorType, depth: i32) -> Self {
        Self { flavor_type, depth }
    }

    /// The child flavor for one hop, or `None` when the child is not expanded.
    pub fn reduce(&self, navigates_to_many: bool, uniquely_typed: bool) -> Option<Flavor> {
        let flavor_type = next_flavor_type(self.flavor_type, navigates_to_many, uniquely_typed);
        let depth = CHILD_DEPTH.min(self.depth.saturating_sub(1));
        if flavor_type == FlavorType::None || depth < 0 {
            return None;
        }
        Some(Flavor::new(flavor_type, depth))
    }

    /// Row limit for an extent of this flavor.
    pub fn limit(&self, default_limit: Option<usize>) -> usize {
        match self.flavor_type {
            FlavorType::Existence => 1,
            FlavorType::Inline2 => 2,
            FlavorType::Inline => 3,
            FlavorType::Block | FlavorType::Page => 4,
            FlavorType::BlockList => 10,
            FlavorType::PageList => 2,
            FlavorType::None | FlavorType::Table => default_limit.unwrap_or(2),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.flavor_type, self.depth)
    }
}

/// Parses `block` (depth 1) or `block:2`.
impl FromStr for Flavor {
    type Err = BrowseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || BrowseError::UnknownFlavor {
            name: s.to_string(),
        };
        match s.split_once(':') {
            Some((name, depth)) => {
                let depth = depth.trim().parse::<i32>().map_err(|_| unknown())?;
                if depth < 0 {
                    return Err(unknown());
                }
                Ok(Flavor::new(name.parse()?, depth))
            }
            None => Ok(Flavor::new(s.parse()?, 1)),
        }
    }
}
