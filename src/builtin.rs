//! Built-in oracle tables.
//!
//! These ship with the crate and are trusted: they are not run through
//! the validator at load time, but the tests below hold them to the same
//! rules as user tables.

use crate::table::{DiceSpec, TableDefinition, TableEntry, TableKind};

fn table(
    id: &str,
    name: &str,
    category: &str,
    kind: TableKind,
    dice: DiceSpec,
    description: &str,
    rows: &[(i64, i64, &str)],
) -> TableDefinition {
    TableDefinition {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        kind,
        dice,
        entries: rows
            .iter()
            .map(|&(min, max, result)| TableEntry::new(min, max, result))
            .collect(),
        description: Some(description.to_string()),
        provenance: None,
    }
}

/// The built-in table set.
pub fn builtin_tables() -> Vec<TableDefinition> {
    vec![
        table(
            "mythic-event-focus",
            "Event Focus",
            "Mythic/Events",
            TableKind::Standard,
            DiceSpec::D100,
            "What a random event is about.",
            &[
                (1, 5, "Remote Event"),
                (6, 10, "Ambiguous Event"),
                (11, 20, "New NPC"),
                (21, 40, "NPC Action"),
                (41, 45, "NPC Negative"),
                (46, 50, "NPC Positive"),
                (51, 55, "Move Toward A Thread"),
                (56, 65, "Move Away From A Thread"),
                (66, 70, "Close A Thread"),
                (71, 80, "PC Negative"),
                (81, 85, "PC Positive"),
                (86, 100, "Current Context"),
            ],
        ),
        table(
            "mythic-scene-adjustment",
            "Scene Adjustment",
            "Mythic/Scenes",
            TableKind::Tool,
            DiceSpec::D10,
            "How an altered scene differs from the expected one.",
            &[
                (1, 1, "Remove A Character"),
                (2, 2, "Add A Character"),
                (3, 3, "Reduce/Remove An Activity"),
                (4, 4, "Increase An Activity"),
                (5, 5, "Remove An Object"),
                (6, 6, "Add An Object"),
                (7, 10, "Make 2 Adjustments"),
            ],
        ),
        table(
            "mythic-fate-answer",
            "Fate Answer (50/50)",
            "Mythic/Fate",
            TableKind::Standard,
            DiceSpec::D100,
            "Answer to a yes/no question at even odds.",
            &[
                (1, 10, "Exceptional Yes"),
                (11, 50, "Yes"),
                (51, 90, "No"),
                (91, 100, "Exceptional No"),
            ],
        ),
    ]
}
