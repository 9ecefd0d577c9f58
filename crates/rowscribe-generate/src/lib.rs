//! INSERT statement synthesis from extracted rows.
//!
//! `rules` turns one raw value into a SQL literal, `builder` assembles a row's
//! literals into an INSERT, and `custom` drives operator-configured
//! generation for a single table.

pub mod builder;
pub mod custom;
pub mod rules;

pub use builder::{StatementBuilder, build};
pub use custom::{generate_custom, generate_custom_at};
pub use rules::{RuleContext, apply, render_value, validate_rules};
