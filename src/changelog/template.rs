use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // `$NAME`, `${NAME}` or `${{NAME}}`
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\$(?:\{\{?([A-Z][A-Z0-9_]*)\}?\}|([A-Z][A-Z0-9_]*))").unwrap();
}

/// Replaces every known placeholder in `template` in a single pass.
///
/// Substituted values are never scanned again, and placeholders missing from
/// `values` are left untouched.
pub fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match values.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Makes free text safe inside a markdown table cell.
///
/// Backslashes are doubled before pipes are escaped, so every `|` in the
/// output is preceded by an odd number of backslashes.
pub fn escape_cell(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
