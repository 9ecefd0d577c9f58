use rowscribe_core::{ColumnRule, ColumnRules};

/// One `--rule column=...` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub column: String,
    pub rule: ColumnRule,
}

/// Parse `col=default`, `col=replace:OLD:NEW`, `col=now` or `col=value:VALUE`.
///
/// In `replace`, a literal `:` inside OLD or NEW is written `\:` and a literal
/// backslash `\\`.
pub fn parse_rule_spec(input: &str) -> Result<RuleSpec, String> {
    let (column, rule) = input
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=RULE, got '{input}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{input}'"));
    }

    let rule = match rule.split_once(':') {
        None if rule.trim() == "default" => ColumnRule::Default,
        None if rule.trim() == "now" => ColumnRule::CurrentTimestamp,
        Some(("value", value)) => ColumnRule::UserSupplied {
            value: value.to_string(),
        },
        Some(("replace", pattern)) => {
            let (old, new) = split_replace(pattern)
                .ok_or_else(|| format!("replace rule needs OLD:NEW in '{input}'"))?;
            ColumnRule::ReplaceLiteral { old, new }
        }
        _ => {
            return Err(format!(
                "unknown rule '{rule}', expected default, replace:OLD:NEW, now or value:VALUE"
            ));
        }
    };

    Ok(RuleSpec {
        column: column.to_string(),
        rule,
    })
}

// Splits on the one unescaped `:`, unescaping both halves.
fn split_replace(pattern: &str) -> Option<(String, String)> {
    let mut parts = vec![String::new()];
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next @ (':' | '\\')) => parts.last_mut()?.push(next),
                Some(next) => {
                    let part = parts.last_mut()?;
                    part.push('\\');
                    part.push(next);
                }
                None => parts.last_mut()?.push('\\'),
            },
            ':' => parts.push(String::new()),
            other => parts.last_mut()?.push(other),
        }
    }
    let new = parts.pop()?;
    let old = parts.pop()?;
    parts.is_empty().then_some((old, new))
}

pub fn collect_rules(specs: Vec<RuleSpec>) -> ColumnRules {
    specs
        .into_iter()
        .map(|spec| (spec.column, spec.rule))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_rule_form() {
        assert_eq!(
            parse_rule_spec("ne_id=replace:NE001:NE777"),
            Ok(RuleSpec {
                column: "ne_id".to_string(),
                rule: ColumnRule::ReplaceLiteral {
                    old: "NE001".to_string(),
                    new: "NE777".to_string(),
                },
            })
        );
        assert_eq!(
            parse_rule_spec("eff_dt=now").map(|spec| spec.rule),
            Ok(ColumnRule::CurrentTimestamp)
        );
        assert_eq!(
            parse_rule_spec("send_path=value:/a:b").map(|spec| spec.rule),
            Ok(ColumnRule::UserSupplied {
                value: "/a:b".to_string()
            })
        );
        assert_eq!(
            parse_rule_spec("memo=value:").map(|spec| spec.rule),
            Ok(ColumnRule::UserSupplied {
                value: String::new()
            })
        );
        assert_eq!(
            parse_rule_spec("ne_id=default").map(|spec| spec.rule),
            Ok(ColumnRule::Default)
        );
    }

    #[test]
    fn replace_accepts_escaped_colons() {
        assert_eq!(
            parse_rule_spec(r"start_tm=replace:08\:30\:00:09\:00\:00").map(|spec| spec.rule),
            Ok(ColumnRule::ReplaceLiteral {
                old: "08:30:00".to_string(),
                new: "09:00:00".to_string(),
            })
        );
        assert_eq!(
            parse_rule_spec(r"send_path=replace:C\\dir:D\\dir").map(|spec| spec.rule),
            Ok(ColumnRule::ReplaceLiteral {
                old: r"C\dir".to_string(),
                new: r"D\dir".to_string(),
            })
        );
        assert_eq!(
            parse_rule_spec(r"send_path=replace:\x0a:\x0b").map(|spec| spec.rule),
            Ok(ColumnRule::ReplaceLiteral {
                old: r"\x0a".to_string(),
                new: r"\x0b".to_string(),
            })
        );
        assert!(parse_rule_spec("eff_dt=replace:08:30:09:00").is_err());
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(parse_rule_spec("ne_id").is_err());
        assert!(parse_rule_spec("=now").is_err());
        assert!(parse_rule_spec("ne_id=replace:NE001").is_err());
        assert!(parse_rule_spec("ne_id=uppercase").is_err());
    }

    #[test]
    fn later_flags_override_earlier_ones() {
        let rules = collect_rules(vec![
            parse_rule_spec("ne_id=now").expect("valid"),
            parse_rule_spec("ne_id=value:NE9").expect("valid"),
        ]);
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.rule_for("ne_id"),
            &ColumnRule::UserSupplied {
                value: "NE9".to_string()
            }
        );
    }
}
