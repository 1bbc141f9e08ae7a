//! Product moderation: paged listing with filters, approve and reject.

use super::{lenient_string, lenient_timestamp, Paged};
use crate::gateway::{ApiError, Gateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PER_PAGE: u32 = 12;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Product {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub metal: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub karat: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub weight: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub reviews_count: u64,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Approval {
    #[default]
    All,
    Approved,
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub approval: Approval,
    pub search: Option<String>,
    pub metal: Option<String>,
    pub category: Option<String>,
    pub karat: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub product_type: Option<String>,
    pub city: Option<String>,
}

/// Listing path for `page` with the filter's query parameters. Empty
/// text filters and zero prices are left out.
pub fn query_path(page: u32, filter: &ProductFilter) -> String {
    let mut url = format!("/admin/products?page={}&per_page={}", page, PER_PAGE);
    match filter.approval {
        Approval::All => {}
        Approval::Approved => url.push_str("&is_approved=1"),
        Approval::Pending => url.push_str("&is_approved=0"),
    }

    let text = [
        ("search", &filter.search),
        ("metal", &filter.metal),
        ("category", &filter.category),
        ("karat", &filter.karat),
    ];
    for (name, value) in text {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(v)));
        }
    }
    // A zero bound means no bound
    let prices = [("min_price", filter.min_price), ("max_price", filter.max_price)];
    for (name, value) in prices {
        if let Some(v) = value.filter(|v| *v != 0.0) {
            url.push_str(&format!("&{}={}", name, v));
        }
    }
    for (name, value) in [("product_type", &filter.product_type), ("city", &filter.city)] {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(v)));
        }
    }
    url
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub last_page: u32,
}

pub fn list(gateway: &Gateway, page: u32, filter: &ProductFilter) -> Result<ProductPage, ApiError> {
    let page = page.max(1);
    let resp: Paged<Product> = gateway.get(&query_path(page, filter))?;
    Ok(ProductPage {
        products: resp.data,
        page,
        last_page: resp.meta.map(|m| m.last_page).unwrap_or(page),
    })
}

pub fn approve(gateway: &Gateway, id: u64) -> Result<(), ApiError> {
    gateway.post_empty(&format!("/admin/products/{}/approve", id))
}

pub fn reject(gateway: &Gateway, id: u64) -> Result<(), ApiError> {
    gateway.post_empty(&format!("/admin/products/{}/reject", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::gateway;
    use crate::gateway::Method;

    #[test]
    fn test_query_path_defaults() {
        assert_eq!(
            query_path(1, &ProductFilter::default()),
            "/admin/products?page=1&per_page=12"
        );
    }

    #[test]
    fn test_query_path_with_filters() {
        let filter = ProductFilter {
            approval: Approval::Pending,
            search: Some("gold ring".to_string()),
            metal: Some(String::new()),
            karat: Some("21".to_string()),
            min_price: Some(1000.0),
            max_price: Some(2500.5),
            city: Some("Cairo".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query_path(3, &filter),
            "/admin/products?page=3&per_page=12&is_approved=0&search=gold%20ring&karat=21&min_price=1000&max_price=2500.5&city=Cairo"
        );
    }

    #[test]
    fn test_zero_price_bounds_are_left_out() {
        let filter = ProductFilter {
            min_price: Some(0.0),
            max_price: Some(500.0),
            ..Default::default()
        };
        assert_eq!(
            query_path(1, &filter),
            "/admin/products?page=1&per_page=12&max_price=500"
        );
    }

    #[test]
    fn test_null_text_fields_decode() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"{"data":[{"id":9,"title":null,"metal":null,"category":"rings","product_type":null}]}"#,
        );
        let listing = list(&gw, 1, &ProductFilter::default()).unwrap();
        assert_eq!(listing.products[0].title, "");
        assert_eq!(listing.products[0].category, "rings");
    }

    #[test]
    fn test_list_reads_last_page() {
        let (gw, transport) = gateway();
        transport.reply(
            200,
            r#"{"data":[{"id":9,"title":"Ring","metal":"gold","category":"rings",
                "product_type":"new","karat":21,"weight":"4.50","price":"12000.00",
                "label":null,"images":["p/1.jpg"],"description":"","is_active":true,
                "is_approved":false,"average_rating":0,"reviews_count":0,
                "city":"Giza","user_id":3,"created_at":"2024-01-01T00:00:00Z"}],
                "meta":{"last_page":4}}"#,
        );

        let page = list(&gw, 2, &ProductFilter::default()).unwrap();
        assert_eq!(page.last_page, 4);
        assert_eq!(page.page, 2);
        assert_eq!(page.products[0].karat, "21");
        assert!(!page.products[0].is_approved);
    }

    #[test]
    fn test_approve_and_reject() {
        let (gw, transport) = gateway();
        approve(&gw, 9).unwrap();
        assert_eq!(transport.last().method, Method::Post);
        assert!(transport.last().url.ends_with("/admin/products/9/approve"));

        reject(&gw, 9).unwrap();
        assert!(transport.last().url.ends_with("/admin/products/9/reject"));
    }
}
