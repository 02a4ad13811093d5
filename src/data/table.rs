//! Loaded table shape

use std::fmt;

/// Value domain of a column
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    /// Categorical column with its values in sorted order
    Discrete { values: Vec<String> },
    Continuous,
    String,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Discrete { .. } => write!(f, "DiscreteVariable"),
            VariableKind::Continuous => write!(f, "ContinuousVariable"),
            VariableKind::String => write!(f, "StringVariable"),
        }
    }
}

/// Place of a column in the table schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    Attribute,
    Class,
    Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub role: VariableRole,
}

/// Row count and schema of a loaded data source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    pub row_count: usize,
    pub variables: Vec<Variable>,
}

impl DataTable {
    pub fn attributes(&self) -> impl Iterator<Item = &Variable> {
        self.with_role(VariableRole::Attribute)
    }

    pub fn class_vars(&self) -> impl Iterator<Item = &Variable> {
        self.with_role(VariableRole::Class)
    }

    fn with_role(&self, role: VariableRole) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |v| v.role == role)
    }

    /// Number of schema variables, metas excluded
    pub fn schema_len(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.role != VariableRole::Meta)
            .count()
    }

    /// At least one row and at least one schema variable
    pub fn has_content(&self) -> bool {
        self.row_count > 0 && self.schema_len() > 0
    }
}

const SHOWN_FEATURES: usize = 3;

/// One-line summary of a table
///
/// `Total 303 rows | Features(13): age(ContinuousVariable), ... | Class(1): ...`
pub fn describe(table: &DataTable) -> String {
    let attributes: Vec<&Variable> = table.attributes().collect();
    let mut features: Vec<String> = attributes
        .iter()
        .take(SHOWN_FEATURES)
        .map(|v| format!("{}({})", v.name, v.kind))
        .collect();
    if attributes.len() > SHOWN_FEATURES {
        if let Some(last) = features.last_mut() {
            last.push_str(",...");
        }
    }

    let class_vars: Vec<&Variable> = table.class_vars().collect();
    let mut classes = Vec::new();
    if let Some(first) = class_vars.first() {
        let values = match &first.kind {
            VariableKind::Discrete { values } => format!("{values:?}"),
            VariableKind::Continuous => "continuous".to_string(),
            VariableKind::String => "unknown".to_string(),
        };
        classes.push(format!("{}({}, values: {values})", first.name, first.kind));
        if class_vars.len() > 1 {
            classes.push("...".to_string());
        }
    }

    format!(
        "Total {} rows | Features({}): {} | Class({}): {}",
        table.row_count,
        attributes.len(),
        join_or_none(&features),
        class_vars.len(),
        join_or_none(&classes)
    )
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
