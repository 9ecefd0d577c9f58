use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::ColumnDescriptor;

/// Per-column transformation applied while rendering a row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ColumnRule {
    /// Render the stored value as-is.
    #[default]
    Default,
    /// Replace every occurrence of `old` in the stored value with `new`.
    ReplaceLiteral { old: String, new: String },
    /// Emit the generation instant shared by the whole batch.
    CurrentTimestamp,
    /// Emit an operator-supplied value coerced to the column type.
    UserSupplied { value: String },
}

static DEFAULT_RULE: ColumnRule = ColumnRule::Default;

/// Rules keyed by column name. Columns without an entry use `Default`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ColumnRules {
    rules: BTreeMap<String, ColumnRule>,
}

impl ColumnRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, rule: ColumnRule) -> Self {
        self.insert(column, rule);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, rule: ColumnRule) {
        self.rules.insert(column.into(), rule);
    }

    /// Rule for a column, `Default` when none was configured.
    pub fn rule_for(&self, column: &str) -> &ColumnRule {
        self.rules.get(column).unwrap_or(&DEFAULT_RULE)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnRule)> {
        self.rules.iter().map(|(column, rule)| (column.as_str(), rule))
    }

    /// Reject rules that can never apply: empty replace patterns and rules
    /// naming columns the table does not declare.
    pub fn validate(&self, columns: &[ColumnDescriptor]) -> Result<()> {
        for (column, rule) in &self.rules {
            if !columns.iter().any(|descriptor| &descriptor.name == column) {
                return Err(Error::Validation(format!(
                    "rule configured for unknown column '{column}'"
                )));
            }
            if let ColumnRule::ReplaceLiteral { old, .. } = rule {
                if old.is_empty() {
                    return Err(Error::Validation(format!(
                        "replace rule for column '{column}' has an empty search value"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, ColumnRule)> for ColumnRules {
    fn from_iter<I: IntoIterator<Item = (String, ColumnRule)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
