//! Storefront read models.

use crate::ids::{ProductId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seller attribution embedded in a product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    /// Backend user identifier.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// A listed story/project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Listing title.
    pub title: String,
    /// Listing description, if the seller wrote one.
    #[serde(default)]
    pub description: Option<String>,
    /// Asking price in the storefront currency.
    #[serde(default)]
    pub price: Option<f64>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Seller attribution, when the backend embeds it.
    #[serde(default)]
    pub seller: Option<Seller>,
}

/// One buyer who swiped right on a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Backend match identifier.
    pub match_id: String,
    /// The user who matched, when the backend embeds their profile.
    #[serde(default)]
    pub matcher: Option<Seller>,
    /// Whether the product owner has already responded.
    #[serde(default)]
    pub responded_by_owner: bool,
    /// When the match was created.
    pub created_at: DateTime<Utc>,
}

/// Matches recorded against one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchList {
    /// Total match count reported by the backend.
    #[serde(default)]
    pub count: u64,
    /// Match entries; absent in the response when there are none.
    #[serde(default)]
    pub matches: Vec<MatchEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_tolerates_sparse_listing() {
        let raw = r#"{"_id": "p1", "title": "Unfinished novel"}"#;
        let product: Product = serde_json::from_str(raw).unwrap();

        assert_eq!(product.id, ProductId::new("p1"));
        assert!(product.description.is_none());
        assert!(product.tags.is_empty());
        assert!(product.seller.is_none());
    }

    #[test]
    fn test_match_list_without_matches_field() {
        let raw = r#"{"count": 0}"#;
        let list: MatchList = serde_json::from_str(raw).unwrap();
        assert!(list.matches.is_empty());
    }
}
