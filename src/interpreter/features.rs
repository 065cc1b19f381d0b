use std::fmt;

/// Gated syntactic/semantic extensions. Each maps to a proposal; unknown
/// names are construction-time errors, and `list()` feeds the shell's
/// `--list-features` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    OptionalChaining,
    NullishCoalescing,
    NumericSeparators,
    ClassFields,
    LogicalAssignment,
}

pub struct FeatureInfo {
    pub feature: Feature,
    pub name: &'static str,
    pub url: &'static str,
}

impl Feature {
    /// The enumerable `{name, url}` listing behind `--list-features`.
    pub fn list() -> &'static [FeatureInfo] {
        FEATURES
    }
}

pub const FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        feature: Feature::OptionalChaining,
        name: "optional-chaining",
        url: "https://github.com/tc39/proposal-optional-chaining",
    },
    FeatureInfo {
        feature: Feature::NullishCoalescing,
        name: "nullish-coalescing",
        url: "https://github.com/tc39/proposal-nullish-coalescing",
    },
    FeatureInfo {
        feature: Feature::NumericSeparators,
        name: "numeric-separators",
        url: "https://github.com/tc39/proposal-numeric-separator",
    },
    FeatureInfo {
        feature: Feature::ClassFields,
        name: "class-fields",
        url: "https://github.com/tc39/proposal-class-fields",
    },
    FeatureInfo {
        feature: Feature::LogicalAssignment,
        name: "logical-assignment",
        url: "https://github.com/tc39/proposal-logical-assignment",
    },
];

#[derive(Clone, Debug)]
pub struct UnknownFeature(pub String);

impl fmt::Display for UnknownFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown feature flag '{}'", self.0)
    }
}

impl std::error::Error for UnknownFeature {}

#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    enabled: Vec<Feature>,
}

impl FeatureSet {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<FeatureSet, UnknownFeature> {
        let mut enabled = Vec::new();
        for name in names {
            let name = name.as_ref();
            let info = FEATURES
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| UnknownFeature(name.to_string()))?;
            if !enabled.contains(&info.feature) {
                enabled.push(info.feature);
            }
        }
        Ok(FeatureSet { enabled })
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn parser_options(&self) -> crate::parser::ParserOptions {
        crate::parser::ParserOptions {
            optional_chaining: self.has(Feature::OptionalChaining),
            nullish_coalescing: self.has(Feature::NullishCoalescing),
            numeric_separators: self.has(Feature::NumericSeparators),
            class_fields: self.has(Feature::ClassFields),
            logical_assignment: self.has(Feature::LogicalAssignment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_round_trip() {
        let set = FeatureSet::from_names(&["optional-chaining", "class-fields"]).unwrap();
        assert!(set.has(Feature::OptionalChaining));
        assert!(set.has(Feature::ClassFields));
        assert!(!set.has(Feature::NullishCoalescing));
    }

    #[test]
    fn unknown_name_is_error() {
        assert!(FeatureSet::from_names(&["do-expressions"]).is_err());
    }

    #[test]
    fn every_feature_has_a_url() {
        for info in FEATURES {
            assert!(info.url.starts_with("https://"));
        }
    }
}
