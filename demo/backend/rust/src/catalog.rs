/* demo/backend/rust/src/catalog.rs */

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Product {
  pub id: u32,
  pub name: &'static str,
  pub category: &'static str,
  /// Price in cents.
  pub price: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
  pub slug: &'static str,
  pub name: &'static str,
}

pub const CATEGORIES: &[Category] = &[
  Category { slug: "shoes", name: "Shoes" },
  Category { slug: "bags", name: "Bags" },
  Category { slug: "hats", name: "Hats" },
];

pub const PRODUCTS: &[Product] = &[
  Product { id: 1, name: "Trail Runner", category: "shoes", price: 11_900, image: Some("/img/1.jpg") },
  Product { id: 2, name: "City Loafer", category: "shoes", price: 8_950, image: None },
  Product { id: 3, name: "Canvas Tote", category: "bags", price: 3_200, image: Some("/img/3.jpg") },
  Product { id: 4, name: "Weekender", category: "bags", price: 15_400, image: None },
  Product { id: 5, name: "Wool Beanie", category: "hats", price: 2_500, image: None },
];

pub fn product(id: u32) -> Option<&'static Product> {
  PRODUCTS.iter().find(|p| p.id == id)
}

pub fn category(slug: &str) -> Option<&'static Category> {
  CATEGORIES.iter().find(|c| c.slug == slug)
}

/// Products in a category, cheapest first when `sort` is `"price"`.
pub fn in_category(slug: &str, sort: Option<&str>) -> Vec<&'static Product> {
  let mut products: Vec<_> = PRODUCTS.iter().filter(|p| p.category == slug).collect();
  if sort == Some("price") {
    products.sort_by_key(|p| p.price);
  }
  products
}

pub fn featured() -> Vec<&'static Product> {
  PRODUCTS.iter().filter(|p| p.image.is_some()).collect()
}
