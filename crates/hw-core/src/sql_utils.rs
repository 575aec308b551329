//! SQL identifier quoting utilities
//!
//! Every table and column name the loader interpolates into SQL goes through
//! these helpers; batch column names come from upstream sources and are not
//! trusted.

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use hw_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("cases"), r#""cases""#);
/// assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name component by component.
///
/// # Examples
/// ```
/// use hw_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("facts.weekly_deaths"), r#""facts"."weekly_deaths""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a table name into (schema, table) on the last `.`; the schema
/// defaults to `main`.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

/// Quote and join a list of column names: `"a", "b", "c"`.
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
