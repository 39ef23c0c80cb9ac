//! # Filter Signatures
//!
//! Canonical matching key built from the five search facets, in this order:
//! age group, relation type, gender, max distance, country.
//!
//! - Unset facets become the wildcard `any`
//! - `null`, `""`, `false` and `0` count as unset
//! - Everything else is compared as opaque text, no fuzzy matching
//!
//! Two searchers only meet when every facet is equal, so `any|any|f|any|any`
//! and `any|any|any|any|any` never match each other.
use std::fmt;

use protocol::events::Filters;
use serde_json::Value;

use crate::utils::is_blank;

pub const WILDCARD: &str = "any";
const SEPARATOR: char = '|';

/// Normalized facets in canonical order. Compared facet by facet, the joined form is only for logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature([String; 5]);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, facet) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(facet)?;
        }

        Ok(())
    }
}

pub fn normalize(filters: &Filters) -> Signature {
    Signature(
        [
            &filters.age_group,
            &filters.relation_type,
            &filters.gender,
            &filters.max_distance_km,
            &filters.country,
        ]
        .map(|facet| facet_text(facet.as_ref())),
    )
}

fn facet_text(value: Option<&Value>) -> String {
    match value {
        Some(value) if !is_blank(value) => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        _ => WILDCARD.to_string(),
    }
}
