//! Query-answering plan types.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Sections judged relevant to a query, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevantSections {
    groups: Vec<(String, Vec<String>)>,
}

impl RelevantSections {
    pub fn new(groups: Vec<(String, Vec<String>)>) -> Self {
        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(c, s)| (c.as_str(), s.as_slice()))
    }

    /// All section names, as `"{category} > {section}"` paths.
    pub fn qualified_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|(c, sections)| sections.iter().map(move |s| format!("{c} > {s}")))
            .collect()
    }

    pub fn contains_section(&self, section: &str) -> bool {
        self.groups
            .iter()
            .any(|(_, sections)| sections.iter().any(|s| s == section))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, s)| s.is_empty())
    }
}

impl Serialize for RelevantSections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (category, sections) in &self.groups {
            map.serialize_entry(category, sections)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RelevantSections {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = RelevantSections;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to section names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((category, sections)) =
                    access.next_entry::<String, Vec<String>>()?
                {
                    groups.push((category, sections));
                }
                Ok(RelevantSections { groups })
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// One planner step: run `agent` over `input_sections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub agent: String,
    #[serde(default)]
    pub input_sections: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

/// Ordered steps plus the declared aggregation strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub final_aggregation_strategy: String,
}

/// The result of executing one plan step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutput {
    pub step: usize,
    pub agent: String,
    pub input_sections: Vec<String>,
    /// Section name → verdict, note, or error object.
    pub output: Value,
}
