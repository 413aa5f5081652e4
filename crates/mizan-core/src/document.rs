//! Regulation documents and the field decomposer.
//!
//! A regulation payload is a list of groups, each mapping a top-level category
//! ("External Regulation", "Internal Rulebook", ...) to an ordered list of
//! `{section_name: text}` entries. Decomposition flattens it into [`Field`]s
//! addressed by `"{category} > {section}"`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Separator between category and section in a field location.
pub const LOCATION_SEPARATOR: &str = " > ";

pub const EXTERNAL_REGULATION: &str = "External Regulation";
pub const INTERNAL_RULEBOOK: &str = "Internal Rulebook";

/// Built-in section names under "External Regulation".
pub const EXTERNAL_SECTIONS: &[&str] = &[
    "Capital Adequacy & Risk Management",
    "Liquidity Rules & Funding",
    "AntiMoney Laundering AML and Know Your Customer KYC",
    "Accounting Standards",
    "Legal Permissions & Product Approval",
];

/// Built-in section names under "Internal Rulebook".
pub const INTERNAL_SECTIONS: &[&str] = &[
    "Governance Policies",
    "Risk Management Framework",
    "Product Manuals",
    "Financial Policies",
    "Compliance & Ethics",
];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("regulation payload is empty")]
    Empty,

    #[error("expected {expected} at {path}, found {found}")]
    Shape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One named section of regulation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub text: String,
}

/// A top-level category and its sections, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub sections: Vec<Section>,
}

/// An independently analyzable unit of regulation text.
///
/// `location` is unique within one decomposition and is the join key for
/// every later stage. `text` is the section body verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub location: String,
    pub category: String,
    pub section: String,
    pub text: String,
}

/// Fields of one category, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub category: String,
    pub fields: Vec<Field>,
}

/// A parsed regulation document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegulationDocument {
    categories: Vec<Category>,
}

impl RegulationDocument {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Parse a regulation payload.
    ///
    /// Accepts a list of `{category: [{section: text}, ...]}` groups or a
    /// single such object. A `null` or empty category yields no sections.
    /// Null, empty arrays and empty objects are rejected as [`DocumentError::Empty`].
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let groups: Vec<&serde_json::Map<String, Value>> = match value {
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_object().ok_or_else(|| DocumentError::Shape {
                        path: format!("[{i}]"),
                        expected: "an object of categories",
                        found: kind(item),
                    })
                })
                .collect::<Result<_, _>>()?,
            Value::Object(map) if !map.is_empty() => vec![map],
            Value::Null | Value::Array(_) | Value::Object(_) => return Err(DocumentError::Empty),
            other => {
                return Err(DocumentError::Shape {
                    path: "$".into(),
                    expected: "an array or object",
                    found: kind(other),
                });
            }
        };

        let mut categories = Vec::new();
        for group in groups {
            for (name, entries) in group {
                categories.push(parse_category(name, entries)?);
            }
        }
        Ok(Self { categories })
    }

    pub fn from_json_str(s: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Total number of section entries across all categories.
    pub fn section_count(&self) -> usize {
        self.categories.iter().map(|c| c.sections.len()).sum()
    }

    /// Flatten the document into fields, grouped by category.
    ///
    /// A location already taken, by a repeated `{category, section}` pair or
    /// by a literal section named like a suffixed one, gets the next free
    /// ` #2`, ` #3`, ... suffix so every location stays unique.
    pub fn decompose_grouped(&self) -> Vec<FieldGroup> {
        let mut emitted: HashSet<String> = HashSet::new();
        let mut suffix: HashMap<String, usize> = HashMap::new();
        self.categories
            .iter()
            .map(|category| {
                let fields = category
                    .sections
                    .iter()
                    .map(|section| {
                        let base = format!(
                            "{}{LOCATION_SEPARATOR}{}",
                            category.name, section.name
                        );
                        let n = suffix.entry(base.clone()).or_insert(1);
                        let mut location = base.clone();
                        while !emitted.insert(location.clone()) {
                            *n += 1;
                            location = format!("{base} #{n}");
                        }
                        Field {
                            location,
                            category: category.name.clone(),
                            section: section.name.clone(),
                            text: section.text.clone(),
                        }
                    })
                    .collect();
                FieldGroup {
                    category: category.name.clone(),
                    fields,
                }
            })
            .collect()
    }

    /// Flatten the document into an ordered list of fields.
    pub fn decompose(&self) -> Vec<Field> {
        self.decompose_grouped()
            .into_iter()
            .flat_map(|g| g.fields)
            .collect()
    }

    /// Text of the first section with this name.
    ///
    /// `name` may be a bare section name or a `"{category} > {section}"` path.
    pub fn section_text(&self, name: &str) -> Option<&str> {
        let (category, section) = split_location(name);
        self.categories
            .iter()
            .filter(|c| category.is_none_or(|cat| c.name == cat))
            .flat_map(|c| c.sections.iter())
            .find(|s| s.name == section)
            .map(|s| s.text.as_str())
    }

    /// The closed set of section names this document defines.
    pub fn vocabulary(&self) -> SectionVocabulary {
        let mut vocab = SectionVocabulary::default();
        for category in &self.categories {
            for section in &category.sections {
                vocab.insert(&category.name, &section.name);
            }
        }
        vocab
    }
}

/// Split `"Category > Section"` into its parts; a bare name has no category.
pub fn split_location(name: &str) -> (Option<&str>, &str) {
    match name.split_once(LOCATION_SEPARATOR) {
        Some((category, section)) => (Some(category.trim()), section.trim()),
        None => (None, name.trim()),
    }
}

fn parse_category(name: &str, entries: &Value) -> Result<Category, DocumentError> {
    let items = match entries {
        Value::Null => return Ok(Category { name: name.to_string(), sections: vec![] }),
        Value::Array(items) => items,
        other => {
            return Err(DocumentError::Shape {
                path: name.to_string(),
                expected: "an array of sections",
                found: kind(other),
            });
        }
    };

    let mut sections = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let entry = item.as_object().ok_or_else(|| DocumentError::Shape {
            path: format!("{name}[{i}]"),
            expected: "a {section: text} object",
            found: kind(item),
        })?;
        for (section, text) in entry {
            let text = text.as_str().ok_or_else(|| DocumentError::Shape {
                path: format!("{name}[{i}].{section}"),
                expected: "a string",
                found: kind(text),
            })?;
            sections.push(Section {
                name: section.clone(),
                text: text.to_string(),
            });
        }
    }
    Ok(Category {
        name: name.to_string(),
        sections,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Section vocabulary ──

/// Valid section names grouped by category, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionVocabulary {
    categories: Vec<(String, Vec<String>)>,
}

impl SectionVocabulary {
    /// The built-in External Regulation / Internal Rulebook vocabulary.
    pub fn builtin() -> Self {
        let mut vocab = Self::default();
        for s in EXTERNAL_SECTIONS {
            vocab.insert(EXTERNAL_REGULATION, s);
        }
        for s in INTERNAL_SECTIONS {
            vocab.insert(INTERNAL_RULEBOOK, s);
        }
        vocab
    }

    pub fn insert(&mut self, category: &str, section: &str) {
        match self.categories.iter_mut().find(|(c, _)| c == category) {
            Some((_, sections)) => {
                if !sections.iter().any(|s| s == section) {
                    sections.push(section.to_string());
                }
            }
            None => self
                .categories
                .push((category.to_string(), vec![section.to_string()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|(_, s)| s.is_empty())
    }

    /// Whether `name` is a known section, given as a bare name or a
    /// `"{category} > {section}"` path.
    pub fn contains(&self, name: &str) -> bool {
        let (category, section) = split_location(name);
        self.categories
            .iter()
            .filter(|(c, _)| category.is_none_or(|cat| c == cat))
            .any(|(_, sections)| sections.iter().any(|s| s == section))
    }

    pub fn contains_in(&self, category: &str, section: &str) -> bool {
        self.categories
            .iter()
            .any(|(c, sections)| c == category && sections.iter().any(|s| s == section))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(c, s)| (c.as_str(), s.as_slice()))
    }

    /// `{category: [section, ...]}` as shown to the section identifier.
    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .categories
            .iter()
            .map(|(c, s)| (c.clone(), Value::from(s.clone())))
            .collect();
        Value::Object(map)
    }
}
