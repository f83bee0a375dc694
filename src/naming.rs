//! Identifier sanitizing for sheet labels, table and column names
//!
//! Export files label their columns with free-form text such as
//! `OptionalItemIsHQ{Reward}[0]` or `#`. Everything that ends up as a table or
//! column identifier passes through [`sanitize`] (column labels) or
//! [`to_snake_case`] (file and directory names).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::PRIMARY_KEY_COLUMN;

/// Label the export format uses for the key column
pub const KEY_LABEL: &str = "#";

/// Punctuation substitutions, longest match first
pub const SPECIAL_CHARS: &[(&str, &str)] = &[
    ("][", "_"),
    ("}[", "_"),
    ("]{", "_"),
    ("[", "_"),
    ("]", "_"),
    ("{", "_"),
    ("}", "_"),
    ("<", "_"),
    (">", "_"),
    ("/", "_"),
    ("(", "_"),
    (")", "_"),
    ("-", "_"),
    ("'", ""),
    ("%", ""),
    (" ", ""),
];

static RE_CASE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("Invalid regex"));

/// Convert a raw column label into a column identifier
///
/// `position` is the label's index in its header row and only shows up in the
/// placeholder name of unlabeled columns.
///
/// # Example
///
/// ```rust
/// use sheet_ingest::naming::sanitize;
///
/// assert_eq!(sanitize("#", 0), "pk");
/// assert_eq!(sanitize("", 3), "column_3");
/// assert_eq!(sanitize("ClassJobCategory[0]", 4), "class_job_category_0");
/// assert_eq!(sanitize("11ab", 1), "ab1");
/// ```
pub fn sanitize(label: &str, position: usize) -> String {
    if label == KEY_LABEL {
        return PRIMARY_KEY_COLUMN.to_string();
    }
    if label.is_empty() {
        return placeholder(position);
    }

    let rotated = rotate_leading_digits(label);
    let substituted = substitute_special_chars(&rotated);
    let trimmed = substituted.trim_end_matches('_');

    if trimmed == KEY_LABEL {
        return PRIMARY_KEY_COLUMN.to_string();
    }
    if trimmed.is_empty() {
        return placeholder(position);
    }

    // removed characters can expose a digit again, e.g. `'2nd`
    let rotated = rotate_leading_digits(trimmed);
    to_snake_case(&rotated)
}

/// Sanitize a whole header row, keeping identifiers unique within the row
///
/// A label that sanitizes to an identifier already taken gets `_<position>`
/// appended.
pub fn sanitize_row<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(labels.len());

    labels
        .iter()
        .enumerate()
        .map(|(position, label)| {
            let mut name = sanitize(label.as_ref(), position);
            while seen.contains(&name) {
                name = format!("{}_{}", name, position);
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Candidate table a declared-type token points at
///
/// The substitution table is tried in order and the token is cut at the first
/// entry it contains: `Quest[0]` yields `Quest`, `Item{Reward}[0]` yields
/// `Item{Reward` (cut at `}[`), `int32` yields itself.
pub fn extract_reference_target(token: &str) -> Option<&str> {
    let candidate = SPECIAL_CHARS
        .iter()
        .find_map(|(from, _)| token.split_once(*from).map(|(head, _)| head))
        .unwrap_or(token);

    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

/// `ClassJobCategory` -> `class_job_category`
pub fn to_snake_case(name: &str) -> String {
    RE_CASE_BOUNDARY
        .replace_all(name, "${1}_${2}")
        .to_ascii_lowercase()
}

/// Whether the first character is an ASCII uppercase letter
pub fn is_first_letter_uppercase(value: &str) -> bool {
    value.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn placeholder(position: usize) -> String {
    format!("column_{}", position)
}

fn substitute_special_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    'scan: while !rest.is_empty() {
        for (from, to) in SPECIAL_CHARS {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Move leading digits to the end until the label starts with something else
///
/// Each step strips the whole leading run of one digit and appends a single
/// copy of it. A label made only of digits becomes `column_<label>`.
fn rotate_leading_digits(label: &str) -> String {
    let mut current = label.to_string();

    while let Some(first) = current.chars().next().filter(|c| c.is_ascii_digit()) {
        if current.chars().all(|c| c.is_ascii_digit()) {
            return placeholder_for_digits(&current);
        }
        let rest = current.trim_start_matches(first);
        current = format!("{}{}", rest, first);
    }

    current
}

fn placeholder_for_digits(digits: &str) -> String {
    format!("column_{}", digits)
}
