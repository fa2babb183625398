//! Resource Transformer
//!
//! Per-kind normalization of an attribute view before it is hashed. The only
//! transformation so far is dropping null-valued attributes, which keeps a
//! backend that reports unset optionals as `null` from registering drift
//! against a target that never mentioned them.

use crate::types::AttributeMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Declarative transformation of a resource view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTransformer {
    /// Drop attributes whose value is null
    #[serde(default, deserialize_with = "bool_or_string")]
    pub ignore_null_attributes: bool,

    /// Restrict null-dropping to these names; unset means every attribute
    #[serde(default, deserialize_with = "set_or_csv")]
    pub attributes: Option<BTreeSet<String>>,
}

impl ResourceTransformer {
    pub fn ignore_nulls() -> Self {
        Self {
            ignore_null_attributes: true,
            attributes: None,
        }
    }

    pub fn ignore_nulls_in<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignore_null_attributes: true,
            attributes: Some(attributes.into_iter().map(Into::into).collect()),
        }
    }

    pub fn transform(&self, view: AttributeMap) -> AttributeMap {
        if !self.ignore_null_attributes {
            return view;
        }

        match &self.attributes {
            None => view.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            Some(attributes) => view
                .into_iter()
                .filter(|(k, v)| !(v.is_null() && attributes.contains(k)))
                .collect(),
        }
    }
}

/// Transformers keyed by resource kind
#[derive(Debug, Clone, Default)]
pub struct TransformerMap(HashMap<String, ResourceTransformer>);

impl TransformerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: impl Into<String>, transformer: ResourceTransformer) {
        self.0.insert(kind.into(), transformer);
    }

    pub fn get(&self, kind: &str) -> Option<&ResourceTransformer> {
        self.0.get(kind)
    }

    /// Apply the kind's transformer, or pass the view through unchanged
    pub fn apply(&self, kind: &str, view: AttributeMap) -> AttributeMap {
        match self.0.get(kind) {
            Some(transformer) => transformer.transform(view),
            None => view,
        }
    }
}

impl From<HashMap<String, ResourceTransformer>> for TransformerMap {
    fn from(value: HashMap<String, ResourceTransformer>) -> Self {
        Self(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    Str(String),
}

fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::Str(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SetOrCsv {
    Set(BTreeSet<String>),
    Csv(String),
}

fn set_or_csv<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeSet<String>>, D::Error> {
    Ok(match Option::<SetOrCsv>::deserialize(deserializer)? {
        None => None,
        Some(SetOrCsv::Set(set)) => Some(set),
        Some(SetOrCsv::Csv(csv)) => Some(
            csv.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    })
}
