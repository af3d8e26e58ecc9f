// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output record types and the fixed column schema.

use crate::crawl::audience::Audience;
use serde::{Deserialize, Serialize};

/// Output columns, in export order.
pub const COLUMNS: [&str; 22] = [
    "created_at",
    "top_section",
    "sub_category",
    "product_name",
    "brand_heuristic_listing",
    "price",
    "original_price",
    "discount",
    "rating_listing",
    "rating_detail",
    "reviews_count_listing",
    "reviews_count_detail",
    "target_audience",
    "availability",
    "seller",
    "product_url",
    "image_url_listing",
    "image_url_detail",
    "short_description",
    "full_description",
    "bread_crumbs",
    "page",
];

/// Fields read from a product's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEnrichment {
    pub brand: String,
    pub full_description: String,
    pub seller: String,
    pub availability: String,
    pub rating: String,
    pub reviews_count: u64,
    pub breadcrumbs: String,
    pub image_url_detail: String,
}

/// One product observation on one listing page.
///
/// Field order matches [`COLUMNS`]; serializers emit fields in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub created_at: String,
    pub top_section: String,
    pub sub_category: String,
    pub product_name: String,
    pub brand_heuristic_listing: String,
    pub price: String,
    pub original_price: String,
    pub discount: String,
    pub rating_listing: String,
    pub rating_detail: String,
    pub reviews_count_listing: String,
    pub reviews_count_detail: u64,
    pub target_audience: Audience,
    pub availability: String,
    pub seller: String,
    pub product_url: String,
    pub image_url_listing: String,
    pub image_url_detail: String,
    pub short_description: String,
    pub full_description: String,
    pub bread_crumbs: String,
    pub page: u32,
}

impl ProductRecord {
    /// Cells in [`COLUMNS`] order.
    pub fn to_row(&self) -> [String; 22] {
        [
            self.created_at.clone(),
            self.top_section.clone(),
            self.sub_category.clone(),
            self.product_name.clone(),
            self.brand_heuristic_listing.clone(),
            self.price.clone(),
            self.original_price.clone(),
            self.discount.clone(),
            self.rating_listing.clone(),
            self.rating_detail.clone(),
            self.reviews_count_listing.clone(),
            self.reviews_count_detail.to_string(),
            self.target_audience.to_string(),
            self.availability.clone(),
            self.seller.clone(),
            self.product_url.clone(),
            self.image_url_listing.clone(),
            self.image_url_detail.clone(),
            self.short_description.clone(),
            self.full_description.clone(),
            self.bread_crumbs.clone(),
            self.page.to_string(),
        ]
    }
}
