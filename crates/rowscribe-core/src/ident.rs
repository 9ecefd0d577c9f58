//! SQL identifier rendering.

/// Reserved words that must be quoted even when lowercase.
const RESERVED: &[&str] = &[
    "all", "and", "any", "array", "as", "asc", "case", "cast", "check", "collate", "column",
    "constraint", "create", "default", "desc", "distinct", "do", "else", "end", "except",
    "false", "for", "foreign", "from", "grant", "group", "having", "in", "into", "is", "join",
    "limit", "not", "null", "offset", "on", "or", "order", "primary", "references", "select",
    "table", "then", "to", "true", "union", "unique", "user", "using", "when", "where", "with",
];

/// Always double-quote, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bare identifier when Postgres would read it back unchanged, quoted otherwise.
pub fn display_ident(name: &str) -> String {
    if is_plain_ident(name) {
        name.to_string()
    } else {
        quote_ident(name)
    }
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '$')
        && !RESERVED.contains(&name)
}
