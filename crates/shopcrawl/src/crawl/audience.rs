// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Keyword heuristic for the demographic a product is aimed at.

use serde::{Deserialize, Serialize};

/// Demographic bucket derived from a product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Female,
    Male,
    Children,
    Unspecified,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Female => "female",
            Audience::Male => "male",
            Audience::Children => "children",
            Audience::Unspecified => "unspecified",
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets in priority order. Keywords match as substrings.
const BUCKETS: [(Audience, &[&str]); 3] = [
    (Audience::Female, &["woman", "girl", "ladies", "female"]),
    (Audience::Male, &["men", "boy", "male"]),
    (Audience::Children, &["kid", "child", "children"]),
];

/// Classify a product name. The first bucket with a matching keyword wins.
pub fn classify(product_name: &str) -> Audience {
    let name = product_name.to_lowercase();
    BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(audience, _)| *audience)
        .unwrap_or(Audience::Unspecified)
}
