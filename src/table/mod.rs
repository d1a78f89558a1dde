//! Oracle table data model.
//!
//! A table maps inclusive roll ranges to result text. Tables are either
//! built in (see [`crate::builtin`]) or loaded from JSON files, in which
//! case they carry [`Provenance`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Separator used in hierarchical category names (`"A/B/C"`).
pub const CATEGORY_SEPARATOR: char = '/';

/// Descriptive table kind. Not used by validation beyond the enum check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableKind {
    /// Helper tables used while running a session.
    Tool,
    /// Alternative versions of another table.
    Variation,
    /// Regular oracle tables.
    Standard,
    /// Description/meaning word tables.
    Descriptor,
}

impl TableKind {
    /// All kinds, in the order they are listed in error messages.
    pub const ALL: [TableKind; 4] = [
        TableKind::Tool,
        TableKind::Variation,
        TableKind::Standard,
        TableKind::Descriptor,
    ];

    /// Convert kind to its JSON identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Tool => "Tool",
            TableKind::Variation => "Variation",
            TableKind::Standard => "Standard",
            TableKind::Descriptor => "Descriptor",
        }
    }

    /// Parse a JSON identifier. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// Dice used to roll on a table.
///
/// Fixed-size dice define the domain `[1, N]` that a table's entries must
/// partition exactly. `Custom` tables have no domain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiceSpec {
    /// 100-sided (percentile).
    #[serde(rename = "d100")]
    D100,
    /// 20-sided.
    #[serde(rename = "d20")]
    D20,
    /// 10-sided.
    #[serde(rename = "d10")]
    D10,
    /// 6-sided.
    #[serde(rename = "d6")]
    D6,
    /// Unconstrained ranges.
    #[serde(rename = "custom")]
    Custom,
}

impl DiceSpec {
    /// All dice specs, in the order they are listed in error messages.
    pub const ALL: [DiceSpec; 5] = [
        DiceSpec::D100,
        DiceSpec::D20,
        DiceSpec::D10,
        DiceSpec::D6,
        DiceSpec::Custom,
    ];

    /// Convert to the JSON identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiceSpec::D100 => "d100",
            DiceSpec::D20 => "d20",
            DiceSpec::D10 => "d10",
            DiceSpec::D6 => "d6",
            DiceSpec::Custom => "custom",
        }
    }

    /// Parse a JSON identifier. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dice| dice.as_str() == value)
    }

    /// Domain size `N`, or `None` for custom dice.
    pub fn sides(&self) -> Option<i64> {
        match self {
            DiceSpec::D100 => Some(100),
            DiceSpec::D20 => Some(20),
            DiceSpec::D10 => Some(10),
            DiceSpec::D6 => Some(6),
            DiceSpec::Custom => None,
        }
    }
}

/// Inclusive roll range `[min, max]`. Serializes as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RollRange(pub i64, pub i64);

impl RollRange {
    /// Lower bound (inclusive).
    pub fn min(&self) -> i64 {
        self.0
    }

    /// Upper bound (inclusive).
    pub fn max(&self) -> i64 {
        self.1
    }

    /// Whether `value` falls inside the range.
    pub fn contains(&self, value: i64) -> bool {
        self.0 <= value && value <= self.1
    }
}

impl fmt::Display for RollRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.0, self.1)
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    /// Roll range this row answers.
    pub range: RollRange,
    /// Result text.
    pub result: String,
}

impl TableEntry {
    /// Create an entry.
    pub fn new(min: i64, max: i64, result: impl Into<String>) -> Self {
        Self {
            range: RollRange(min, max),
            result: result.into(),
        }
    }
}

/// Where a custom table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// File the table was loaded from.
    pub source: PathBuf,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// A validated oracle table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    /// Globally unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category, possibly `/`-separated.
    pub category: String,
    /// Descriptive kind.
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// Dice rolled on this table.
    #[serde(rename = "diceType")]
    pub dice: DiceSpec,
    /// Rows in authoring order.
    pub entries: Vec<TableEntry>,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set for custom tables only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl TableDefinition {
    /// Whether the table was loaded from a user file.
    pub fn is_custom(&self) -> bool {
        self.provenance.is_some()
    }

    /// Category split into its non-empty, trimmed segments.
    ///
    /// `"Mythic//Events/ "` yields `["Mythic", "Events"]`.
    pub fn category_path(&self) -> Vec<&str> {
        self.category
            .split(CATEGORY_SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Entry whose range contains `value`.
    ///
    /// For custom dice, ranges are not guaranteed disjoint; the first
    /// matching entry in authoring order wins.
    pub fn lookup(&self, value: i64) -> Option<&TableEntry> {
        self.entries.iter().find(|entry| entry.range.contains(value))
    }
}
