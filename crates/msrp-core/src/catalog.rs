//! Mirrored catalog types and the default-variation matching rule.
//!
//! The service does not own the product catalog; the host commerce platform
//! pushes snapshots (or a YAML fixture seeds them) and the list-price layer
//! keys its meta off the mirrored ids.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::price::{normalize_price, PriceInput};
use crate::ConfigError;

/// Maximum accepted product name length, matching the write-side limit.
pub const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Simple,
    Variable,
}

impl ProductKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProductKind::Simple => "simple",
            ProductKind::Variable => "variable",
        }
    }

    /// Parses the stored column value. Returns `None` for unknown kinds.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(ProductKind::Simple),
            "variable" => Some(ProductKind::Variable),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One variation of a variable product, as mirrored from the host.
///
/// `attributes` maps attribute names to concrete values ("size" -> "small").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: i64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

/// A full product snapshot as pushed by the host catalog.
///
/// Simple products carry no variations; variable products list each
/// purchasable variation plus the shopper-facing default attribute selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: i64,
    pub name: String,
    pub kind: ProductKind,
    #[serde(default)]
    pub default_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

/// Seed fixture: product snapshots plus optional initial list prices keyed by
/// owner id (product id for simple products, variation id for variable ones).
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductSnapshot>,
    #[serde(default)]
    pub price_meta: BTreeMap<i64, String>,
}

/// Load and validate a catalog fixture from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile = serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

/// Validate a single product snapshot.
///
/// Shared by the sync endpoint and fixture loading: names must be non-empty
/// and within length, simple products may not carry variations, and ids must
/// not collide within the snapshot.
///
/// # Errors
///
/// Returns `ConfigError::Validation` describing the first problem found.
pub fn validate_snapshot(product: &ProductSnapshot) -> Result<(), ConfigError> {
    if product.id <= 0 {
        return Err(ConfigError::Validation(format!(
            "product id must be positive, got {}",
            product.id
        )));
    }

    if product.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "product name must be non-empty".to_string(),
        ));
    }

    if product.name.len() > MAX_NAME_LEN {
        return Err(ConfigError::Validation(format!(
            "product name must be at most {MAX_NAME_LEN} characters"
        )));
    }

    if product.kind == ProductKind::Simple && !product.variations.is_empty() {
        return Err(ConfigError::Validation(format!(
            "simple product {} must not carry variations",
            product.id
        )));
    }

    let mut seen_ids = HashSet::new();
    seen_ids.insert(product.id);
    for variation in &product.variations {
        if variation.id <= 0 {
            return Err(ConfigError::Validation(format!(
                "variation id must be positive, got {}",
                variation.id
            )));
        }
        if !seen_ids.insert(variation.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate id {} in product {}",
                variation.id, product.id
            )));
        }
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for product in &catalog.products {
        validate_snapshot(product)?;

        if !seen_ids.insert(product.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate catalog id: {}",
                product.id
            )));
        }
        for variation in &product.variations {
            if !seen_ids.insert(variation.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate catalog id: {}",
                    variation.id
                )));
            }
        }
    }

    for (owner_id, value) in &catalog.price_meta {
        if !seen_ids.contains(owner_id) {
            return Err(ConfigError::Validation(format!(
                "price_meta owner {owner_id} does not exist in the catalog"
            )));
        }
        if !matches!(normalize_price(value), PriceInput::Value(_)) {
            return Err(ConfigError::Validation(format!(
                "price_meta for owner {owner_id} is not a valid price: '{value}'"
            )));
        }
    }

    Ok(())
}

/// Returns the first available variation matching the default selection.
///
/// A variation matches when every default attribute is present with an equal
/// value; extra attributes on the variation do not disqualify it. An empty
/// default selection matches the first available variation.
#[must_use]
pub fn match_default_variation<'a>(
    defaults: &BTreeMap<String, String>,
    variations: &'a [Variation],
) -> Option<&'a Variation> {
    variations
        .iter()
        .filter(|v| v.is_available)
        .find(|v| defaults.iter().all(|(key, value)| v.attributes.get(key) == Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(id: i64, pairs: &[(&str, &str)], available: bool) -> Variation {
        Variation {
            id,
            attributes: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            is_available: available,
        }
    }

    fn defaults(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn product_kind_round_trips() {
        assert_eq!(ProductKind::parse("simple"), Some(ProductKind::Simple));
        assert_eq!(ProductKind::parse("variable"), Some(ProductKind::Variable));
        assert_eq!(ProductKind::parse("grouped"), None);
        assert_eq!(ProductKind::Variable.to_string(), "variable");
    }

    #[test]
    fn match_picks_exact_attribute_match() {
        let variations = vec![
            variation(101, &[("size", "small"), ("color", "red")], true),
            variation(102, &[("size", "large"), ("color", "red")], true),
        ];
        let found = match_default_variation(&defaults(&[("size", "large"), ("color", "red")]), &variations);
        assert_eq!(found.map(|v| v.id), Some(102));
    }

    #[test]
    fn match_requires_every_default_pair() {
        let variations = vec![variation(101, &[("size", "small")], true)];
        let found = match_default_variation(
            &defaults(&[("size", "small"), ("color", "red")]),
            &variations,
        );
        assert!(found.is_none());
    }

    #[test]
    fn match_skips_unavailable_variations() {
        let variations = vec![
            variation(101, &[("size", "small")], false),
            variation(102, &[("size", "small")], true),
        ];
        let found = match_default_variation(&defaults(&[("size", "small")]), &variations);
        assert_eq!(found.map(|v| v.id), Some(102));
    }

    #[test]
    fn match_with_empty_defaults_takes_first_available() {
        let variations = vec![
            variation(101, &[("size", "small")], false),
            variation(102, &[("size", "large")], true),
        ];
        let found = match_default_variation(&BTreeMap::new(), &variations);
        assert_eq!(found.map(|v| v.id), Some(102));
    }

    #[test]
    fn match_ignores_extra_variation_attributes() {
        let variations = vec![variation(101, &[("size", "small"), ("color", "red")], true)];
        let found = match_default_variation(&defaults(&[("size", "small")]), &variations);
        assert_eq!(found.map(|v| v.id), Some(101));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let product = ProductSnapshot {
            id: 1,
            name: "  ".to_string(),
            kind: ProductKind::Simple,
            default_attributes: BTreeMap::new(),
            variations: vec![],
        };
        let err = validate_snapshot(&product).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_simple_with_variations() {
        let product = ProductSnapshot {
            id: 1,
            name: "Tincture".to_string(),
            kind: ProductKind::Simple,
            default_attributes: BTreeMap::new(),
            variations: vec![variation(2, &[], true)],
        };
        let err = validate_snapshot(&product).unwrap_err();
        assert!(err.to_string().contains("must not carry variations"));
    }

    #[test]
    fn validate_rejects_colliding_ids() {
        let product = ProductSnapshot {
            id: 10,
            name: "Gummies".to_string(),
            kind: ProductKind::Variable,
            default_attributes: BTreeMap::new(),
            variations: vec![variation(11, &[], true), variation(11, &[], true)],
        };
        let err = validate_snapshot(&product).unwrap_err();
        assert!(err.to_string().contains("duplicate id 11"));
    }

    #[test]
    fn catalog_rejects_unknown_price_meta_owner() {
        let catalog = CatalogFile {
            products: vec![ProductSnapshot {
                id: 1,
                name: "Tincture".to_string(),
                kind: ProductKind::Simple,
                default_attributes: BTreeMap::new(),
                variations: vec![],
            }],
            price_meta: [(99, "19.99".to_string())].into_iter().collect(),
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn catalog_rejects_unparseable_price_meta() {
        let catalog = CatalogFile {
            products: vec![ProductSnapshot {
                id: 1,
                name: "Tincture".to_string(),
                kind: ProductKind::Simple,
                default_attributes: BTreeMap::new(),
                variations: vec![],
            }],
            price_meta: [(1, "free".to_string())].into_iter().collect(),
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("not a valid price"));
    }

    #[test]
    fn snapshot_deserializes_from_yaml() {
        let yaml = r"
id: 100
name: Seltzer Variety Pack
kind: variable
default_attributes:
  size: small
variations:
  - id: 101
    attributes:
      size: small
  - id: 102
    attributes:
      size: large
    is_available: false
";
        let product: ProductSnapshot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(product.kind, ProductKind::Variable);
        assert_eq!(product.variations.len(), 2);
        assert!(product.variations[0].is_available);
        assert!(!product.variations[1].is_available);
    }

    #[test]
    fn load_catalog_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("catalog.yaml");
        assert!(
            path.exists(),
            "catalog.yaml missing at {path:?}; required for this test"
        );
        let result = load_catalog(&path);
        assert!(result.is_ok(), "failed to load catalog.yaml: {result:?}");
        let catalog = result.unwrap();
        assert!(!catalog.products.is_empty());
    }
}
