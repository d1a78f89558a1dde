//! Table schema and range validation.
//!
//! Validation is pure: it takes a parsed JSON value and the file it came
//! from, and returns either a [`TableDefinition`] or every problem found.
//! Structural failures stop validation early; field-level failures
//! accumulate so a user sees all of them at once.

use crate::table::{DiceSpec, Provenance, RollRange, TableDefinition, TableEntry, TableKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Fields every table object must carry, in check order.
pub const REQUIRED_FIELDS: [&str; 6] = ["id", "name", "category", "type", "diceType", "entries"];

/// Severity of a validation problem.
///
/// Only `Error` blocks acceptance. No current rule emits `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the table from loading.
    Error,
    /// Informational.
    Warning,
}

impl Severity {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Which id set a duplicate collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DuplicateScope {
    /// Same id earlier in the same file.
    InFile,
    /// Same id as a built-in table.
    Builtin,
    /// Same id as a table accepted from another file.
    CrossFile,
}

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Value is not a table object.
    Structural,
    /// Required field absent, null or blank.
    MissingField,
    /// Field has the wrong JSON type.
    FieldType,
    /// `type` or `diceType` outside the known set.
    InvalidEnum,
    /// Malformed entry (range or result).
    EntryShape,
    /// Ranges do not cover the dice domain.
    RangeCoverage,
    /// Two ranges overlap.
    RangeOverlap,
    /// Table id already taken.
    DuplicateId(DuplicateScope),
    /// File could not be read.
    Io,
    /// File is not valid JSON.
    Parse,
    /// Table folder could not be created.
    FolderCreate,
}

/// One problem found while loading a table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// File the problem was found in.
    pub file: PathBuf,
    /// Table id, when the table had a usable one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    /// Offending field, e.g. `name` or `entries[2].range`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Position of the table within a file holding an array of tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: Severity,
    /// Classification.
    pub kind: ErrorKind,
}

impl ValidationError {
    /// Create an error-severity problem with no table or field context.
    pub fn new(kind: ErrorKind, file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            table_id: None,
            field: None,
            element: None,
            message: message.into(),
            severity: Severity::Error,
            kind,
        }
    }

    /// Attach a table id.
    pub fn with_table(mut self, table_id: Option<&str>) -> Self {
        self.table_id = table_id.map(str::to_string);
        self
    }

    /// Attach a field name.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach the element index within the file.
    pub fn with_element(mut self, element: usize) -> Self {
        self.element = Some(element);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(element) = self.element {
            write!(f, " #{}", element)?;
        }
        if let Some(table_id) = &self.table_id {
            write!(f, " [{}]", table_id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " ({})", field)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of validating one table value.
pub type TableResult = std::result::Result<TableDefinition, Vec<ValidationError>>;

/// Validate one table value, stamping provenance with the current time.
pub fn validate_table(raw: &Value, origin: &Path) -> TableResult {
    validate_table_at(raw, origin, Utc::now())
}

/// Validate a whole parsed document.
///
/// An array is validated element by element; any other value is treated
/// as a single table. Errors from array elements carry their index.
pub fn validate_document(raw: &Value, origin: &Path, loaded_at: DateTime<Utc>) -> Vec<TableResult> {
    match raw {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                validate_table_at(item, origin, loaded_at).map_err(|errors| {
                    errors
                        .into_iter()
                        .map(|error| error.with_element(index))
                        .collect()
                })
            })
            .collect(),
        other => vec![validate_table_at(other, origin, loaded_at)],
    }
}

/// Validate one table value with an explicit load timestamp.
pub fn validate_table_at(raw: &Value, origin: &Path, loaded_at: DateTime<Utc>) -> TableResult {
    let object = match raw {
        Value::Object(object) => object,
        other => {
            return Err(vec![ValidationError::new(
                ErrorKind::Structural,
                origin,
                format!(
                    "table definition must be a JSON object, found {}",
                    json_type_name(other)
                ),
            )]);
        }
    };

    let table_id = object
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let mut checker = Checker {
        origin,
        table_id,
        errors: Vec::new(),
    };

    checker.check_required(object);
    let id = checker.string_field(object, "id");
    let name = checker.string_field(object, "name");
    let category = checker.string_field(object, "category");
    let description = checker.optional_string_field(object, "description");
    let kind = checker.kind(object);
    let dice = checker.dice(object);
    let entries = checker.entries(object);

    if let (Some(entries), Some(sides)) = (&entries, dice.and_then(|d| d.sides())) {
        checker.check_coverage(entries, sides);
    }

    if !checker.errors.is_empty() {
        return Err(checker.errors);
    }

    match (id, name, category, kind, dice, entries) {
        (Some(id), Some(name), Some(category), Some(kind), Some(dice), Some(entries)) => {
            Ok(TableDefinition {
                id,
                name,
                category,
                kind,
                dice,
                entries,
                description,
                provenance: Some(Provenance {
                    source: origin.to_path_buf(),
                    loaded_at,
                }),
            })
        }
        // Every None above has recorded an error.
        _ => Err(vec![ValidationError::new(
            ErrorKind::Structural,
            origin,
            "table definition is incomplete",
        )
        .with_table(table_id)]),
    }
}

struct Checker<'a> {
    origin: &'a Path,
    table_id: Option<&'a str>,
    errors: Vec<ValidationError>,
}

impl Checker<'_> {
    fn push(&mut self, kind: ErrorKind, field: impl Into<String>, message: String) {
        self.errors.push(
            ValidationError::new(kind, self.origin, message)
                .with_table(self.table_id)
                .with_field(field),
        );
    }

    fn check_required(&mut self, object: &Map<String, Value>) {
        for field in REQUIRED_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => self.push(
                    ErrorKind::MissingField,
                    field,
                    format!("missing required field '{}'", field),
                ),
                Some(Value::String(text)) if text.trim().is_empty() => self.push(
                    ErrorKind::MissingField,
                    field,
                    format!("required field '{}' must not be empty", field),
                ),
                Some(_) => {}
            }
        }
    }

    /// Present, non-blank string. Missing and blank were reported by
    /// `check_required`; only type mismatches are reported here.
    fn string_field(&mut self, object: &Map<String, Value>, field: &str) -> Option<String> {
        match object.get(field)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::String(_) | Value::Null => None,
            other => {
                self.push(
                    ErrorKind::FieldType,
                    field,
                    format!("field '{}' must be a string, found {}", field, json_type_name(other)),
                );
                None
            }
        }
    }

    fn optional_string_field(&mut self, object: &Map<String, Value>, field: &str) -> Option<String> {
        match object.get(field)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => {
                self.push(
                    ErrorKind::FieldType,
                    field,
                    format!("field '{}' must be a string, found {}", field, json_type_name(other)),
                );
                None
            }
        }
    }

    fn kind(&mut self, object: &Map<String, Value>) -> Option<TableKind> {
        let value = object.get("type")?;
        if is_blank(value) {
            return None;
        }
        let parsed = value.as_str().and_then(TableKind::parse);
        if parsed.is_none() {
            let valid: Vec<&str> = TableKind::ALL.iter().map(TableKind::as_str).collect();
            self.push(
                ErrorKind::InvalidEnum,
                "type",
                format!(
                    "invalid type {}; expected one of: {}",
                    value,
                    valid.join(", ")
                ),
            );
        }
        parsed
    }

    fn dice(&mut self, object: &Map<String, Value>) -> Option<DiceSpec> {
        let value = object.get("diceType")?;
        if is_blank(value) {
            return None;
        }
        let parsed = value.as_str().and_then(DiceSpec::parse);
        if parsed.is_none() {
            let valid: Vec<&str> = DiceSpec::ALL.iter().map(DiceSpec::as_str).collect();
            self.push(
                ErrorKind::InvalidEnum,
                "diceType",
                format!(
                    "invalid diceType {}; expected one of: {}",
                    value,
                    valid.join(", ")
                ),
            );
        }
        parsed
    }

    /// Parse the entry list. Returns `None` if any entry is malformed.
    fn entries(&mut self, object: &Map<String, Value>) -> Option<Vec<TableEntry>> {
        let items = match object.get("entries")? {
            Value::Null => return None,
            Value::Array(items) => items,
            other => {
                self.push(
                    ErrorKind::EntryShape,
                    "entries",
                    format!("field 'entries' must be an array, found {}", json_type_name(other)),
                );
                return None;
            }
        };

        if items.is_empty() {
            self.push(
                ErrorKind::EntryShape,
                "entries",
                "entries must not be empty".to_string(),
            );
            return None;
        }

        let before = self.errors.len();
        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if let Some(entry) = self.entry(index, item) {
                entries.push(entry);
            }
        }

        if self.errors.len() == before {
            Some(entries)
        } else {
            None
        }
    }

    fn entry(&mut self, index: usize, item: &Value) -> Option<TableEntry> {
        let prefix = format!("entries[{}]", index);
        let Value::Object(entry) = item else {
            self.push(
                ErrorKind::EntryShape,
                prefix,
                format!("entry {} must be an object, found {}", index, json_type_name(item)),
            );
            return None;
        };

        let range = self.range(index, &prefix, entry.get("range"));

        let result = match entry.get("result") {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            _ => {
                self.push(
                    ErrorKind::EntryShape,
                    format!("{}.result", prefix),
                    format!("entry {}: 'result' must be a non-empty string", index),
                );
                None
            }
        };

        Some(TableEntry {
            range: range?,
            result: result?,
        })
    }

    fn range(&mut self, index: usize, prefix: &str, value: Option<&Value>) -> Option<RollRange> {
        let field = format!("{}.range", prefix);
        let bounds = match value {
            Some(Value::Array(bounds)) if bounds.len() == 2 => bounds,
            _ => {
                self.push(
                    ErrorKind::EntryShape,
                    field,
                    format!("entry {}: 'range' must be an array of exactly 2 numbers", index),
                );
                return None;
            }
        };

        let (Some(min), Some(max)) = (as_integer(&bounds[0]), as_integer(&bounds[1])) else {
            self.push(
                ErrorKind::EntryShape,
                field,
                format!("entry {}: range bounds must be integers", index),
            );
            return None;
        };

        if min > max {
            self.push(
                ErrorKind::EntryShape,
                field,
                format!(
                    "entry {}: range minimum {} is greater than maximum {}",
                    index, min, max
                ),
            );
            return None;
        }

        Some(RollRange(min, max))
    }

    /// Check that ranges partition `[1, sides]`.
    ///
    /// Gap and overlap are independent checks over adjacent pairs, so one
    /// input may report both against different neighbours.
    fn check_coverage(&mut self, entries: &[TableEntry], sides: i64) {
        let mut ranges: Vec<RollRange> = entries.iter().map(|entry| entry.range).collect();
        ranges.sort_by_key(RollRange::min);

        let (Some(first), Some(last)) = (ranges.first().copied(), ranges.last().copied()) else {
            return;
        };

        if first.min() != 1 {
            self.push(
                ErrorKind::RangeCoverage,
                "entries",
                format!("first range must start at 1, but starts at {}", first.min()),
            );
        }

        for pair in ranges.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            // No gap can follow a range ending at i64::MAX.
            let Some(expected) = prev.max().checked_add(1) else {
                continue;
            };
            if next.min() > expected {
                self.push(
                    ErrorKind::RangeCoverage,
                    "entries",
                    format!(
                        "gap between {} and {}: expected next range to start at {}, but it starts at {}",
                        prev,
                        next,
                        expected,
                        next.min()
                    ),
                );
            }
        }

        if last.max() != sides {
            self.push(
                ErrorKind::RangeCoverage,
                "entries",
                format!("last range must end at {}, but ends at {}", sides, last.max()),
            );
        }

        for pair in ranges.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.max() >= next.min() {
                self.push(
                    ErrorKind::RangeOverlap,
                    "entries",
                    format!("range {} overlaps range {}", prev, next),
                );
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Integer value of a JSON number, accepting whole floats such as `3.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(integer) = value.as_i64() {
        return Some(integer);
    }
    let float = value.as_f64()?;
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
