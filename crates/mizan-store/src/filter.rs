use serde_json::{Value, json};

/// Metadata constraints on a vector search, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub document_types: Vec<String>,
    pub section_heading: Option<String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_type(mut self, t: impl Into<String>) -> Self {
        self.document_types.push(t.into());
        self
    }

    pub fn section_heading(mut self, heading: impl Into<String>) -> Self {
        self.section_heading = Some(heading.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.document_types.is_empty() && self.section_heading.is_none()
    }

    /// Index filter expression, or `None` when unconstrained.
    ///
    /// One type → `$eq`, several → `$in`; a heading adds an `$eq` clause,
    /// joined with the type clause under `$and`.
    pub fn to_json(&self) -> Option<Value> {
        let types = match self.document_types.as_slice() {
            [] => None,
            [one] => Some(json!({"document_type": {"$eq": one}})),
            many => Some(json!({"document_type": {"$in": many}})),
        };
        let heading = self
            .section_heading
            .as_ref()
            .map(|h| json!({"section_heading": {"$eq": h}}));

        match (types, heading) {
            (None, None) => None,
            (Some(t), None) => Some(t),
            (None, Some(h)) => Some(h),
            (Some(t), Some(h)) => Some(json!({"$and": [t, h]})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_is_none() {
        assert!(MetadataFilter::new().to_json().is_none());
        assert!(MetadataFilter::new().is_empty());
    }

    #[test]
    fn single_type_uses_eq() {
        let f = MetadataFilter::new().document_type("SS");
        assert_eq!(f.to_json().unwrap(), json!({"document_type": {"$eq": "SS"}}));
    }

    #[test]
    fn several_types_use_in() {
        let f = MetadataFilter::new().document_type("SS").document_type("FAS");
        assert_eq!(
            f.to_json().unwrap(),
            json!({"document_type": {"$in": ["SS", "FAS"]}})
        );
    }

    #[test]
    fn heading_alone_and_combined() {
        let f = MetadataFilter::new().section_heading("Murabaha");
        assert_eq!(
            f.to_json().unwrap(),
            json!({"section_heading": {"$eq": "Murabaha"}})
        );

        let f = f.document_type("SS");
        assert_eq!(
            f.to_json().unwrap(),
            json!({"$and": [
                {"document_type": {"$eq": "SS"}},
                {"section_heading": {"$eq": "Murabaha"}}
            ]})
        );
    }
}
