//! Strict-then-lenient parsing of model output into typed verdicts.
//!
//! The service is asked for JSON but nothing enforces it. Parsing tries the
//! raw text once; on failure it applies a single lenient repair pass and
//! tries once more. The outcome is a tagged [`ParseOutcome`], never a panic
//! or a silent default.

use serde::de::DeserializeOwned;

/// Repair step labels, as recorded in [`ParseOutcome`].
pub const STRIP_CODE_FENCE: &str = "strip_code_fence";
pub const EXTRACT_OBJECT: &str = "extract_object";
pub const NORMALIZE_QUOTES: &str = "normalize_quotes";
pub const STRIP_TRAILING_COMMAS: &str = "strip_trailing_commas";
pub const PYTHON_LITERALS: &str = "python_literals";

/// Result of parsing one model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Parsed, either directly (`repairs` empty) or after the repair pass.
    Parsed { value: T, repairs: Vec<&'static str> },
    /// Neither the raw text nor its repaired form matched the shape.
    ParseFailed {
        raw_text: String,
        attempted_repairs: Vec<&'static str>,
    },
}

/// Parse `raw` as `T`: strict first, then at most one repaired attempt.
pub fn parse_verdict<T: DeserializeOwned>(raw: &str) -> ParseOutcome<T> {
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return ParseOutcome::Parsed {
            value,
            repairs: Vec::new(),
        };
    }

    let (repaired, applied) = repair(raw);
    if !applied.is_empty()
        && let Ok(value) = serde_json::from_str::<T>(&repaired)
    {
        return ParseOutcome::Parsed {
            value,
            repairs: applied,
        };
    }

    ParseOutcome::ParseFailed {
        raw_text: raw.to_string(),
        attempted_repairs: applied,
    }
}

/// The lenient repair pass. Returns the rewritten text and the steps that
/// changed it.
pub fn repair(raw: &str) -> (String, Vec<&'static str>) {
    let mut applied = Vec::new();
    let mut text = raw.trim().to_string();

    if let Some(inner) = strip_code_fence(&text) {
        text = inner;
        applied.push(STRIP_CODE_FENCE);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}'))
        && start < end
        && (start > 0 || end + 1 < text.len())
    {
        text = text[start..=end].to_string();
        applied.push(EXTRACT_OBJECT);
    }

    let normalized = normalize_quotes(&text);
    if normalized != text {
        text = normalized;
        applied.push(NORMALIZE_QUOTES);
    }

    let (cleaned, commas, literals) = clean_tokens(&text);
    if commas {
        applied.push(STRIP_TRAILING_COMMAS);
    }
    if literals {
        applied.push(PYTHON_LITERALS);
    }

    (cleaned, applied)
}

// ── Internal ──

fn strip_code_fence(text: &str) -> Option<String> {
    let rest = text.strip_prefix("```")?;
    // Drop the info string (```json) up to the first newline.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    Some(body.trim().to_string())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Delim {
    Double,
    SmartDouble,
    Single,
}

fn is_single(c: char) -> bool {
    matches!(c, '\'' | '\u{2018}' | '\u{2019}')
}

fn is_smart_double(c: char) -> bool {
    matches!(c, '\u{201C}' | '\u{201D}')
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

/// Rewrite smart-quoted and single-quoted strings as JSON double-quoted
/// strings, escaping raw control characters inside strings.
///
/// A non-ASCII or single quote only closes a string when the next
/// significant character is `:`, `,`, `}`, `]` or end of input, so
/// apostrophes inside words survive.
fn normalize_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut inside: Option<Delim> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match inside {
            None => match c {
                '"' => {
                    out.push('"');
                    inside = Some(Delim::Double);
                }
                c if is_smart_double(c) => {
                    out.push('"');
                    inside = Some(Delim::SmartDouble);
                }
                c if is_single(c) => {
                    out.push('"');
                    inside = Some(Delim::Single);
                }
                c => out.push(c),
            },
            Some(delim) => {
                let closes = match delim {
                    Delim::Double => c == '"',
                    Delim::SmartDouble => c == '"' || is_smart_double(c),
                    Delim::Single => is_single(c),
                };
                let confirmed = delim == Delim::Double
                    || next_significant(&chars, i + 1)
                        .is_none_or(|n| matches!(n, ':' | ',' | '}' | ']'));

                if c == '\\' {
                    match chars.get(i + 1) {
                        Some('\'') => out.push('\''),
                        Some(&n) => {
                            out.push('\\');
                            out.push(n);
                        }
                        None => out.push_str("\\\\"),
                    }
                    i += 1;
                } else if closes && confirmed {
                    out.push('"');
                    inside = None;
                } else {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
            }
        }
        i += 1;
    }
    out
}

/// Drop trailing commas before `}`/`]` and map `True`/`False`/`None`
/// outside strings. Expects double-quoted strings.
fn clean_tokens(text: &str) -> (String, bool, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut commas = false;
    let mut literals = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&n) = chars.get(i + 1) {
                    out.push(n);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' && matches!(next_significant(&chars, i + 1), Some('}' | ']')) {
            commas = true;
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while i + 1 < chars.len() && chars[i + 1].is_ascii_alphanumeric() {
                i += 1;
            }
            let word: String = chars[start..=i].iter().collect();
            let mapped = match word.as_str() {
                "True" => "true",
                "False" => "false",
                "None" => "null",
                _ => {
                    out.push_str(&word);
                    i += 1;
                    continue;
                }
            };
            literals = true;
            out.push_str(mapped);
        } else {
            out.push(c);
        }
        i += 1;
    }
    (out, commas, literals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct GapSample {
        ambiguous: bool,
        #[serde(default)]
        notes: Vec<String>,
    }

    fn parsed(outcome: ParseOutcome<GapSample>) -> (GapSample, Vec<&'static str>) {
        match outcome {
            ParseOutcome::Parsed { value, repairs } => (value, repairs),
            ParseOutcome::ParseFailed { raw_text, attempted_repairs } => {
                panic!("parse failed: {raw_text:?} after {attempted_repairs:?}")
            }
        }
    }

    #[test]
    fn strict_json_needs_no_repair() {
        let (v, repairs) = parsed(parse_verdict(r#"{"ambiguous": true, "notes": ["a"]}"#));
        assert!(v.ambiguous);
        assert!(repairs.is_empty());
    }

    #[test]
    fn smart_quotes_are_normalized() {
        let (v, repairs) = parsed(parse_verdict("{\u{201C}ambiguous\u{201D}: true, \u{201C}notes\u{201D}: []}"));
        assert!(v.ambiguous);
        assert_eq!(repairs, vec![NORMALIZE_QUOTES]);
    }

    #[test]
    fn single_quotes_with_apostrophes() {
        let (v, _) = parsed(parse_verdict(
            "{'ambiguous': false, 'notes': ['the bank's \"fair\" share', 'x']}",
        ));
        assert!(!v.ambiguous);
        assert_eq!(v.notes[0], "the bank's \"fair\" share");
        assert_eq!(v.notes[1], "x");
    }

    #[test]
    fn code_fence_and_prose_are_stripped() {
        let raw = "```json\n{\"ambiguous\": true}\n```";
        let (v, repairs) = parsed(parse_verdict(raw));
        assert!(v.ambiguous);
        assert_eq!(repairs, vec![STRIP_CODE_FENCE]);

        let raw = "Here is the analysis:\n{\"ambiguous\": false} Hope this helps.";
        let (_, repairs) = parsed(parse_verdict(raw));
        assert_eq!(repairs, vec![EXTRACT_OBJECT]);
    }

    #[test]
    fn trailing_commas_and_python_literals() {
        let (v, repairs) = parsed(parse_verdict("{\"ambiguous\": True, \"notes\": [\"None of it\",],}"));
        assert!(v.ambiguous);
        assert_eq!(v.notes, vec!["None of it"]);
        assert_eq!(repairs, vec![STRIP_TRAILING_COMMAS, PYTHON_LITERALS]);
    }

    #[test]
    fn raw_newlines_inside_strings_are_escaped() {
        let (v, _) = parsed(parse_verdict("{'ambiguous': true, 'notes': ['line one\nline two']}"));
        assert_eq!(v.notes[0], "line one\nline two");
    }

    #[test]
    fn unrepairable_text_is_a_tagged_failure() {
        let outcome: ParseOutcome<GapSample> = parse_verdict("The rule looks compliant to me.");
        match outcome {
            ParseOutcome::ParseFailed { raw_text, attempted_repairs } => {
                assert_eq!(raw_text, "The rule looks compliant to me.");
                assert!(attempted_repairs.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_fails_after_repair() {
        let outcome: ParseOutcome<GapSample> = parse_verdict("{'has_gaps': true}");
        match outcome {
            ParseOutcome::ParseFailed { attempted_repairs, .. } => {
                assert_eq!(attempted_repairs, vec![NORMALIZE_QUOTES]);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
