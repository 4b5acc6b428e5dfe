//! Identifier casing rules for folders, file names and property names.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContractError;

const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
    "any",
    "boolean",
    "number",
    "string",
    "symbol",
    "never",
    "object",
    "unknown",
    "bigint",
];

/// Casing applied to output folder segments and file names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    #[default]
    Pascal,
    Camel,
    Snake,
    Kebab,
}

impl FromStr for Casing {
    type Err = ContractError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pascal" => Ok(Casing::Pascal),
            "camel" => Ok(Casing::Camel),
            "snake" => Ok(Casing::Snake),
            "kebab" => Ok(Casing::Kebab),
            other => Err(ContractError::ConfigError(format!(
                "unknown casing '{other}', expected one of pascal, camel, snake, kebab"
            ))),
        }
    }
}

impl fmt::Display for Casing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Casing::Pascal => "pascal",
            Casing::Camel => "camel",
            Casing::Snake => "snake",
            Casing::Kebab => "kebab",
        };
        f.write_str(name)
    }
}

/// Converts an identifier to the requested casing.
///
/// Pascal is the identity transform because source names already are Pascal
/// case. The other casings split the input into words first: runs of
/// capitals stay together (`ABBRWord` is `ABBR` + `Word`) and digits stick to
/// the word before them.
pub fn to_casing(input: &str, casing: Casing) -> String {
    match casing {
        Casing::Pascal => input.to_string(),
        Casing::Camel => {
            let mut out = String::new();
            for (index, token) in word_tokens(input).iter().enumerate() {
                if index == 0 {
                    out.push_str(&token.to_lowercase());
                } else {
                    out.push_str(&capitalize(token));
                }
            }
            out
        }
        Casing::Snake => join_lowercase(input, "_"),
        Casing::Kebab => join_lowercase(input, "-"),
    }
}

fn join_lowercase(input: &str, separator: &str) -> String {
    word_tokens(input)
        .iter()
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

fn word_tokens(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in raw.split(|c: char| !c.is_alphanumeric()) {
        if chunk.is_empty() {
            continue;
        }
        tokens.extend(split_camel_tokens(chunk));
    }
    tokens
}

fn split_camel_tokens(chunk: &str) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    let mut tokens = Vec::new();
    let mut start = 0usize;

    for i in 1..chars.len() {
        let prev = chars[i - 1];
        let curr = chars[i];
        let next = chars.get(i + 1).copied();

        let boundary = (prev.is_lowercase() && curr.is_uppercase())
            || (prev.is_ascii_digit() && curr.is_uppercase())
            || (prev.is_uppercase()
                && curr.is_uppercase()
                && next.is_some_and(|n| n.is_lowercase()));

        if boundary {
            tokens.push(chars[start..i].iter().collect());
            start = i;
        }
    }

    if start < chars.len() {
        tokens.push(chars[start..].iter().collect());
    }
    tokens
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Maps a source member name to the property name used in generated code.
///
/// Underscores and spaces separate words that are joined camel-style, then
/// the leading run of capitals is lowercased the same way JSON serializers
/// camel-case names (`MyID` becomes `myID`, `IANATimeZone` becomes `ianaTimeZone`).
pub fn to_typescript_name(source_name: &str) -> String {
    let mut joined = String::new();
    for (index, segment) in source_name
        .split(['_', ' '])
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        if index == 0 {
            joined.push_str(segment);
        } else {
            joined.push_str(&capitalize(segment));
        }
    }
    lower_leading_capitals(&joined)
}

fn lower_leading_capitals(input: &str) -> String {
    let mut chars: Vec<char> = input.chars().collect();
    if !chars.first().is_some_and(|c| c.is_uppercase()) {
        return input.to_string();
    }

    for i in 0..chars.len() {
        if i == 1 && !chars[i].is_uppercase() {
            break;
        }
        let has_next = i + 1 < chars.len();
        if i > 0 && has_next && !chars[i + 1].is_uppercase() {
            break;
        }
        chars[i] = chars[i].to_lowercase().next().unwrap_or(chars[i]);
    }
    chars.into_iter().collect()
}

/// Turns a source type name segment into a usable TypeScript type name.
///
/// Generic arity suffixes (`` Paged`1 ``) and enclosing type prefixes
/// (`Outer+Inner`) are dropped.
pub fn sanitize_type_name(raw: &str) -> String {
    let without_arity = raw.split('`').next().unwrap_or(raw);
    let nested = without_arity.rsplit('+').next().unwrap_or(without_arity);
    let mut out: String = nested
        .chars()
        .filter(|c| *c == '_' || *c == '$' || c.is_alphanumeric())
        .collect();
    if out.is_empty() {
        out = "Type".to_string();
    }

    if !starts_with_ident_char(&out) {
        out = format!("Type{out}");
    }

    if is_typescript_keyword(&out) {
        out.push_str("Type");
    }
    out
}

/// Renders an object member name, quoting it when it is not a plain identifier.
pub fn render_property_name(raw: &str) -> String {
    if is_valid_ts_identifier(raw) {
        raw.to_string()
    } else {
        format!("\"{}\"", escape_string(raw))
    }
}

/// Appends 2, 3, ... to `base` until it is not in `used`.
pub fn unique_identifier(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }

    let mut idx = 2usize;
    loop {
        let candidate = format!("{base}{idx}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        idx += 1;
    }
}

pub fn is_valid_ts_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !(first == '_' || first == '$' || first.is_ascii_alphabetic()) {
        return false;
    }

    chars.all(|ch| ch == '_' || ch == '$' || ch.is_ascii_alphanumeric())
}

fn starts_with_ident_char(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c == '_' || c == '$' || c.is_ascii_alphabetic())
        .unwrap_or(false)
}

pub fn is_typescript_keyword(text: &str) -> bool {
    TYPESCRIPT_KEYWORDS.iter().any(|kw| kw == &text)
}

pub fn escape_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_is_identity() {
        assert_eq!(to_casing("ABBRWord", Casing::Pascal), "ABBRWord");
        assert_eq!(to_casing("some_thing", Casing::Pascal), "some_thing");
        let mixed = "You_ShouldAlways-Send A Pascal_Case_SoThisIsWrong";
        assert_eq!(to_casing(mixed, Casing::Pascal), mixed);
        assert_eq!(to_casing(&to_casing(mixed, Casing::Pascal), Casing::Pascal), mixed);
    }

    #[test]
    fn camel_keeps_trailing_acronym_upper() {
        assert_eq!(to_casing("MyID", Casing::Camel), "myID");
    }

    #[test]
    fn camel_keeps_abbreviation_together() {
        assert_eq!(to_casing("ABBRWord", Casing::Camel), "abbrWord");
        assert_eq!(to_casing("TypeContractor", Casing::Camel), "typeContractor");
        assert_eq!(to_casing("TypeScript", Casing::Camel), "typeScript");
    }

    #[test]
    fn snake_and_kebab_split_words() {
        assert_eq!(to_casing("ABBRWord", Casing::Snake), "abbr_word");
        assert_eq!(to_casing("ABBRWord", Casing::Kebab), "abbr-word");
        assert_eq!(to_casing("TestStringIsLong", Casing::Snake), "test_string_is_long");
        assert_eq!(to_casing("SimpleTypes", Casing::Kebab), "simple-types");
    }

    #[test]
    fn digits_stay_with_previous_word() {
        assert_eq!(to_casing("V1Contracts", Casing::Snake), "v1_contracts");
        assert_eq!(to_casing("Version2", Casing::Kebab), "version2");
    }

    #[test]
    fn casing_is_idempotent() {
        for input in ["ABBRWord", "TestStringIsLong", "TypeContractor", "V1Contracts"] {
            for casing in [Casing::Pascal, Casing::Camel, Casing::Snake, Casing::Kebab] {
                let once = to_casing(input, casing);
                assert_eq!(to_casing(&once, casing), once, "{input} as {casing}");
            }
        }
    }

    #[test]
    fn typescript_names_follow_json_camel_casing() {
        assert_eq!(to_typescript_name("Hello"), "hello");
        assert_eq!(to_typescript_name("HelloWorld"), "helloWorld");
        assert_eq!(to_typescript_name("_weirdFlex"), "weirdFlex");
        assert_eq!(to_typescript_name("_weirder_flex"), "weirderFlex");
        assert_eq!(to_typescript_name("MyID"), "myID");
        assert_eq!(to_typescript_name("IANATimeZoneName"), "ianaTimeZoneName");
        assert_eq!(to_typescript_name("ID"), "id");
    }

    #[test]
    fn sanitizes_generic_and_nested_names() {
        assert_eq!(sanitize_type_name("Paged`1"), "Paged");
        assert_eq!(sanitize_type_name("Outer+Inner"), "Inner");
        assert_eq!(sanitize_type_name("string"), "stringType");
    }

    #[test]
    fn parses_casing_names() {
        assert_eq!("Kebab".parse::<Casing>().unwrap(), Casing::Kebab);
        assert!("screaming".parse::<Casing>().is_err());
    }

    #[test]
    fn quotes_invalid_property_names() {
        assert_eq!(render_property_name("name"), "name");
        assert_eq!(render_property_name("content-type"), "\"content-type\"");
    }
}
