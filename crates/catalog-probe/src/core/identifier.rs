//! Identifier validation and quoting for caller-supplied table and column names.
//!
//! Catalog lookups bind table names as parameters, but validation primitives
//! (`table_count`, `find_min_max`, ...) must splice identifiers into SQL text.
//! Identifiers are therefore validated and rendered through this module.
//!
//! # Case folding
//!
//! Engines fold unquoted identifiers (Oracle and DB2 to upper case,
//! PostgreSQL to lower case). Quoting a name freezes its case, which would
//! change which object a caller's `orders` resolves to. Plain identifiers
//! (`[A-Za-z_][A-Za-z0-9_]*`, plus the symbols a dialect accepts unquoted)
//! are therefore emitted unquoted, keeping the engine's folding, and only
//! names that need it are quoted and escaped. Parts the caller already
//! quoted are passed through after validation.
//!
//! `$` and `#` are ordinary identifier characters in Oracle, DB2 and
//! SQL Server. PostgreSQL reads `a#b` as a XOR and MySQL reads `#` as the
//! start of a comment, so those dialects quote them.

use crate::error::{ProbeError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - Oracle 12.2+: 128 bytes
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Identifier quoting convention of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `"name"` (Oracle, PostgreSQL, DB2)
    DoubleQuote,
    /// `[name]` (SQL Server, Azure SQL)
    Bracket,
    /// `` `name` `` (MySQL)
    Backtick,
}

impl QuoteStyle {
    fn open(self) -> char {
        match self {
            QuoteStyle::DoubleQuote => '"',
            QuoteStyle::Bracket => '[',
            QuoteStyle::Backtick => '`',
        }
    }

    fn close(self) -> char {
        match self {
            QuoteStyle::DoubleQuote => '"',
            QuoteStyle::Bracket => ']',
            QuoteStyle::Backtick => '`',
        }
    }
}

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProbeError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(ProbeError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ProbeError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// True for identifiers the engine accepts unquoted. `symbols` are the
/// characters beyond `[A-Za-z0-9_]` allowed after the first character.
pub fn is_plain_identifier(name: &str, symbols: &[char]) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || symbols.contains(&c))
}

/// Quote an identifier unconditionally, escaping the closing quote character.
pub fn quote(style: QuoteStyle, name: &str) -> Result<String> {
    validate_identifier(name)?;
    let close = style.close();
    let escaped = name.replace(close, &format!("{}{}", close, close));
    Ok(format!("{}{}{}", style.open(), escaped, close))
}

/// Render one identifier part: plain names stay bare, pre-quoted names pass
/// through, anything else is quoted.
pub fn render_ident(style: QuoteStyle, name: &str, symbols: &[char]) -> Result<String> {
    validate_identifier(name)?;
    if is_plain_identifier(name, symbols) || is_quoted(style, name) {
        return Ok(name.to_string());
    }
    quote(style, name)
}

/// Render a possibly qualified name such as `hr.employees` or `[dbo].[My Table]`.
pub fn render_qualified(style: QuoteStyle, name: &str, symbols: &[char]) -> Result<String> {
    let parts = split_qualified(style, name)?;
    let rendered = parts
        .iter()
        .map(|part| render_ident(style, part, symbols))
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("."))
}

/// Case folding an engine applies to unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folding {
    /// Oracle, DB2
    Upper,
    /// PostgreSQL
    Lower,
    /// SQL Server, MySQL
    Preserve,
}

/// The name a catalog view stores for a caller-supplied table name.
///
/// Quoted names lose their quotes and keep their case; plain names are
/// folded the way the engine folds them on `CREATE`.
pub fn catalog_name(style: QuoteStyle, name: &str, folding: Folding) -> Result<String> {
    validate_identifier(name)?;
    if is_quoted(style, name) {
        let close = style.close();
        let inner = &name[style.open().len_utf8()..name.len() - close.len_utf8()];
        return Ok(inner.replace(&format!("{}{}", close, close), &close.to_string()));
    }
    Ok(match folding {
        Folding::Upper => name.to_uppercase(),
        Folding::Lower => name.to_lowercase(),
        Folding::Preserve => name.to_string(),
    })
}

/// Split a possibly qualified table name into the schema the catalog
/// stores and the table name it stores, both folded like [`catalog_name`].
///
/// `orders` yields no schema; `hr.orders` and `db.hr.orders` yield `hr`.
pub fn catalog_target(
    style: QuoteStyle,
    name: &str,
    folding: Folding,
) -> Result<(Option<String>, String)> {
    validate_identifier(name)?;
    let mut parts = split_qualified(style, name)?;
    let table = match parts.pop() {
        Some(table) => catalog_name(style, &table, folding)?,
        None => return Err(ProbeError::Config("Identifier cannot be empty".to_string())),
    };
    let schema = match parts.pop() {
        Some(schema) => Some(catalog_name(style, &schema, folding)?),
        None => None,
    };
    Ok((schema, table))
}

fn is_quoted(style: QuoteStyle, name: &str) -> bool {
    let open = style.open();
    let close = style.close();
    if name.len() < 2 || !name.starts_with(open) || !name.ends_with(close) {
        return false;
    }
    // Inner closing quotes must be doubled.
    let inner = &name[open.len_utf8()..name.len() - close.len_utf8()];
    let doubled = format!("{}{}", close, close);
    !inner.replace(&doubled, "").contains(close)
}

/// Split on dots that are not inside quotes.
fn split_qualified(style: QuoteStyle, name: &str) -> Result<Vec<String>> {
    if name.is_empty() {
        return Err(ProbeError::Config("Identifier cannot be empty".to_string()));
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in name.chars() {
        if in_quotes {
            current.push(c);
            if c == style.close() {
                in_quotes = false;
            }
        } else if c == style.open() {
            current.push(c);
            in_quotes = true;
        } else if c == '.' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    if in_quotes {
        return Err(ProbeError::Config(format!(
            "Unterminated quoted identifier: {:?}",
            name
        )));
    }
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(ProbeError::Config(format!(
            "Invalid qualified name: {:?}",
            name
        )));
    }
    Ok(parts)
}

/// Validate a caller-supplied filter fragment appended to a count query.
///
/// The fragment is trusted SQL (typically `WHERE ...`), but must stay a
/// single statement: semicolons, comment markers and EXEC are rejected.
pub fn validate_where_clause(fragment: &str) -> Result<()> {
    if fragment.contains('\0') {
        return Err(ProbeError::Config(format!(
            "SECURITY: Filter contains null byte (possible injection attempt): {:?}",
            fragment
        )));
    }

    if fragment.contains(';') {
        return Err(ProbeError::Config(format!(
            "SECURITY: Filter contains semicolon (possible injection): {:?}",
            fragment
        )));
    }

    if fragment.contains("--") || fragment.contains("/*") || fragment.contains("*/") {
        return Err(ProbeError::Config(format!(
            "SECURITY: Filter contains SQL comment markers (possible injection): {:?}",
            fragment
        )));
    }

    let lower = fragment.to_lowercase();
    if lower.split_whitespace().any(|word| {
        word == "exec"
            || word == "execute"
            || word.starts_with("exec(")
            || word.starts_with("execute(")
    }) {
        return Err(ProbeError::Config(format!(
            "SECURITY: Filter contains EXEC/EXECUTE keyword (possible injection): {:?}",
            fragment
        )));
    }

    Ok(())
}
