//! Entity Tags and Capabilities
//!
//! Entity "kinds" are a set of tags rather than a type hierarchy. Each tag
//! maps to a row in a capability table, and behavior systems query the
//! union of those rows instead of checking concrete types.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A label attached to an entity for lookup and behavior selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    /// Placed building (house, barn, well) - clickable and solid
    Structure,
    /// Purely visual scenery
    Decoration,
    /// Picked up when a collector overlaps it
    Collectible,
    /// The player's avatar
    Player,
    /// Any animated character
    Character,
    /// Floors and platforms
    Ground,
    /// Game-specific label with no built-in capabilities
    Custom(String),
}

impl Tag {
    /// Capability row for this tag
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Tag::Structure => Capabilities { solid: true, clickable: true, ..Capabilities::NONE },
            Tag::Decoration => Capabilities::NONE,
            Tag::Collectible => Capabilities { collectible: true, ..Capabilities::NONE },
            Tag::Player => Capabilities { solid: true, collector: true, ..Capabilities::NONE },
            Tag::Character => Capabilities { solid: true, clickable: true, ..Capabilities::NONE },
            Tag::Ground => Capabilities { solid: true, ..Capabilities::NONE },
            Tag::Custom(_) => Capabilities::NONE,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Structure => write!(f, "structure"),
            Tag::Decoration => write!(f, "decoration"),
            Tag::Collectible => write!(f, "collectible"),
            Tag::Player => write!(f, "player"),
            Tag::Character => write!(f, "character"),
            Tag::Ground => write!(f, "ground"),
            Tag::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Tag {
    type Err = std::convert::Infallible;

    /// Known names map to built-in tags (case-insensitive); anything else
    /// becomes `Custom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "structure" => Tag::Structure,
            "decoration" => Tag::Decoration,
            "collectible" => Tag::Collectible,
            "player" => Tag::Player,
            "character" => Tag::Character,
            "ground" => Tag::Ground,
            _ => Tag::Custom(s.to_string()),
        })
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(tag) => tag,
            Err(never) => match never {},
        }
    }
}

/// What an entity is allowed to do in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Takes part in positional collision resolution
    pub solid: bool,
    /// Receives pointer hover/click signals
    pub clickable: bool,
    /// Can be picked up by a collector
    pub collectible: bool,
    /// Picks up collectibles it overlaps
    pub collector: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        solid: false,
        clickable: false,
        collectible: false,
        collector: false,
    };

    /// Entities without any tags behave as plain solid bodies
    pub const UNTAGGED: Capabilities = Capabilities { solid: true, ..Capabilities::NONE };

    pub fn union(self, other: Capabilities) -> Capabilities {
        Capabilities {
            solid: self.solid || other.solid,
            clickable: self.clickable || other.clickable,
            collectible: self.collectible || other.collectible,
            collector: self.collector || other.collector,
        }
    }
}

/// Ordered set of tags on one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.0.remove(tag)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Union of the capability rows of every built-in tag in the set.
    /// Custom labels are neutral: a set holding only those behaves as
    /// untagged.
    pub fn capabilities(&self) -> Capabilities {
        let mut builtin = self.0.iter().filter(|tag| !matches!(tag, Tag::Custom(_))).peekable();
        if builtin.peek().is_none() {
            return Capabilities::UNTAGGED;
        }
        builtin.fold(Capabilities::NONE, |caps, tag| caps.union(tag.capabilities()))
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
