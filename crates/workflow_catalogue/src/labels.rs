use serde::{Deserialize, Serialize};

use crate::CatalogueVersion;

/// Which part of the issue state machine a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelCategory {
    /// AI is working on the stage
    Needs,
    /// Stage output awaits human review
    Review,
    /// Stage failed and needs human intervention
    Error,
}

impl LabelCategory {
    pub const ALL: [Self; 3] = [Self::Needs, Self::Review, Self::Error];

    pub fn title(self) -> &'static str {
        match self {
            Self::Needs => "needs:* (AI working)",
            Self::Review => "review:* (human review)",
            Self::Error => "error:* (needs help)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    pub description: String,
    /// Six hex digits, no leading `#`
    pub color: String,
    pub category: LabelCategory,
}

impl LabelSpec {
    pub fn new(name: &str, description: &str, color: &str, category: LabelCategory) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            category,
        }
    }
}

// (name, description, color)
type Row = (&'static str, &'static str, &'static str);

const V1_NEEDS: &[Row] = &[
    ("needs:triage", "AI is analyzing and triaging this issue", "0052cc"),
    ("needs:triage-revision", "AI is revising triage analysis based on feedback", "0052cc"),
    ("needs:spec", "AI is creating BDD specification for this issue", "5319e7"),
    ("needs:spec-revision", "AI is revising BDD specification based on feedback", "5319e7"),
    ("needs:architect", "AI is designing technical architecture for this issue", "f57c00"),
    ("needs:architect-revision", "AI is revising architecture design based on feedback", "f57c00"),
    ("needs:develop", "AI is implementing code for this issue", "2e7d32"),
    ("needs:develop-revision", "AI is revising implementation based on feedback", "2e7d32"),
];

const V1_REVIEW: &[Row] = &[
    ("review:triage", "Triage analysis ready for human review", "81c784"),
    ("review:spec", "BDD specification ready for human review", "ba68c8"),
    ("review:architect", "Architecture design ready for human review", "ffb74d"),
    ("review:develop", "Implementation ready for human review", "a5d6a7"),
];

const V1_ERROR: &[Row] = &[
    ("error:triage", "Triage stage encountered an error", "d32f2f"),
    ("error:spec", "Specification stage encountered an error", "d32f2f"),
    ("error:architect", "Architecture stage encountered an error", "d32f2f"),
    ("error:develop", "Development stage encountered an error", "d32f2f"),
];

const V2_NEEDS: &[Row] = &[
    ("needs:specify", "AI is writing the feature specification for this issue", "5319e7"),
    ("needs:specify-revision", "AI is revising the specification based on feedback", "5319e7"),
    ("needs:plan", "AI is creating the implementation plan for this issue", "f57c00"),
    ("needs:plan-revision", "AI is revising the implementation plan based on feedback", "f57c00"),
    ("needs:develop", "AI is implementing code for this issue", "2e7d32"),
    ("needs:develop-revision", "AI is revising implementation based on feedback", "2e7d32"),
];

const V2_REVIEW: &[Row] = &[
    ("review:specify", "Specification ready for human review", "ba68c8"),
    ("review:plan", "Implementation plan ready for human review", "ffb74d"),
    ("review:develop", "Implementation ready for human review", "a5d6a7"),
];

const V2_ERROR: &[Row] = &[
    ("error:specify", "Specification stage encountered an error", "d32f2f"),
    ("error:plan", "Planning stage encountered an error", "d32f2f"),
    ("error:develop", "Development stage encountered an error", "d32f2f"),
];

/// The label alphabet of one configuration version, in catalogue order.
///
/// Built once per run and handed to whoever needs it; there is no global
/// catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalogue {
    labels: Vec<LabelSpec>,
}

impl LabelCatalogue {
    pub fn for_version(version: CatalogueVersion) -> Self {
        let groups: [(&[Row], LabelCategory); 3] = match version {
            CatalogueVersion::V1 => [
                (V1_NEEDS, LabelCategory::Needs),
                (V1_REVIEW, LabelCategory::Review),
                (V1_ERROR, LabelCategory::Error),
            ],
            CatalogueVersion::V2 => [
                (V2_NEEDS, LabelCategory::Needs),
                (V2_REVIEW, LabelCategory::Review),
                (V2_ERROR, LabelCategory::Error),
            ],
        };

        let labels = groups
            .iter()
            .flat_map(|(rows, category)| {
                rows.iter()
                    .map(move |(name, desc, color)| LabelSpec::new(name, desc, color, *category))
            })
            .collect();

        Self { labels }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabelSpec> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<'a> IntoIterator for &'a LabelCatalogue {
    type Item = &'a LabelSpec;
    type IntoIter = std::slice::Iter<'a, LabelSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn has(catalogue: &LabelCatalogue, name: &str) -> bool {
        catalogue.iter().any(|l| l.name == name)
    }

    fn is_hex_color(color: &str) -> bool {
        color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_catalogue_sizes() {
        assert_eq!(LabelCatalogue::for_version(CatalogueVersion::V1).len(), 16);
        assert_eq!(LabelCatalogue::for_version(CatalogueVersion::V2).len(), 12);
    }

    #[test]
    fn test_names_are_unique() {
        for version in [CatalogueVersion::V1, CatalogueVersion::V2] {
            let catalogue = LabelCatalogue::for_version(version);
            let unique: HashSet<&str> = catalogue.iter().map(|l| l.name.as_str()).collect();
            assert_eq!(unique.len(), catalogue.len(), "duplicate label in {}", version);
        }
    }

    #[test]
    fn test_colors_are_six_hex_digits() {
        for version in [CatalogueVersion::V1, CatalogueVersion::V2] {
            for label in &LabelCatalogue::for_version(version) {
                assert!(is_hex_color(&label.color), "bad color on {}", label.name);
            }
        }
    }

    #[test]
    fn test_category_matches_prefix() {
        for version in [CatalogueVersion::V1, CatalogueVersion::V2] {
            for label in &LabelCatalogue::for_version(version) {
                let prefix = match label.category {
                    LabelCategory::Needs => "needs:",
                    LabelCategory::Review => "review:",
                    LabelCategory::Error => "error:",
                };
                assert!(label.name.starts_with(prefix), "{}", label.name);
            }
        }
    }

    #[test]
    fn test_alphabet_covers_every_stage() {
        for version in [CatalogueVersion::V1, CatalogueVersion::V2] {
            let catalogue = LabelCatalogue::for_version(version);
            for stage in version.stages() {
                assert!(has(&catalogue, &format!("needs:{}", stage)));
                assert!(has(&catalogue, &format!("needs:{}-revision", stage)));
                assert!(has(&catalogue, &format!("review:{}", stage)));
                assert!(has(&catalogue, &format!("error:{}", stage)));
            }
            assert_eq!(catalogue.len(), version.stages().len() * 4);
        }
    }

    #[test]
    fn test_versions_use_distinct_alphabets() {
        let v1 = LabelCatalogue::for_version(CatalogueVersion::V1);
        let v2 = LabelCatalogue::for_version(CatalogueVersion::LATEST);

        assert!(has(&v1, "needs:triage"));
        assert!(!has(&v2, "needs:triage"));
        assert!(has(&v2, "needs:specify"));
    }

    #[test]
    fn test_category_sizes() {
        let catalogue = LabelCatalogue::for_version(CatalogueVersion::LATEST);
        let count = |category| catalogue.iter().filter(|l| l.category == category).count();
        assert_eq!(count(LabelCategory::Needs), 6);
        assert_eq!(count(LabelCategory::Review), 3);
        assert_eq!(count(LabelCategory::Error), 3);
    }
}
