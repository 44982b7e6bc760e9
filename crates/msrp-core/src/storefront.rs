//! Storefront presentation: display-price resolution, the scoped CSS block,
//! and variation-payload augmentation.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::{match_default_variation, ProductKind, Variation};
use crate::render::escape_html;
use crate::settings::sanitize_css;

/// Class carried by the storefront badge element; the CSS override scopes to it.
pub const BADGE_CLASS: &str = "msrp-badge";
/// Element id of the emitted style block.
pub const STYLE_BLOCK_ID: &str = "msrp-custom-css";
/// Key under which a variation's list price rides in the switcher payload.
pub const VARIATION_PAYLOAD_KEY: &str = "msrp";

/// The catalog view a display-price resolution runs over.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i64,
    pub kind: ProductKind,
    pub default_attributes: BTreeMap<String, String>,
    pub variations: Vec<Variation>,
}

/// A resolved display price: which owner it came from and the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub owner_id: i64,
    pub value: String,
}

/// Resolves the list price a product page should display.
///
/// Simple products read their own meta. Variable products read the meta of
/// the default variation: the first available one matching the default
/// attribute selection. Missing meta and stored empty strings both resolve
/// to `None`; the storefront shows nothing rather than an empty badge.
#[must_use]
pub fn resolve_display_price(
    product: &ProductView,
    meta: &BTreeMap<i64, String>,
) -> Option<ResolvedPrice> {
    let owner_id = match product.kind {
        ProductKind::Simple => product.id,
        ProductKind::Variable => {
            match_default_variation(&product.default_attributes, &product.variations)?.id
        }
    };

    let value = meta.get(&owner_id)?;
    if value.is_empty() {
        return None;
    }

    Some(ResolvedPrice {
        owner_id,
        value: value.clone(),
    })
}

/// Where a storefront page render is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageContext {
    ProductDetail,
    Other,
}

impl PageContext {
    /// Maps the host's page hint onto a context. Anything that is not a
    /// product detail page gets no CSS block.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "product" => PageContext::ProductDetail,
            _ => PageContext::Other,
        }
    }
}

/// Builds the scoped style block for the badge CSS override.
///
/// Emitted only on product detail pages and only when the configured CSS is
/// non-empty after sanitization. Declarations are wrapped in the badge-class
/// selector; the setting cannot style anything else on the page.
#[must_use]
pub fn custom_css_block(page: PageContext, css: &str) -> Option<String> {
    if page != PageContext::ProductDetail {
        return None;
    }
    let cleaned = sanitize_css(css);
    if cleaned.is_empty() {
        return None;
    }
    Some(format!(
        "<style id=\"{STYLE_BLOCK_ID}\">.{BADGE_CLASS} {{ {cleaned} }}</style>"
    ))
}

/// Builds the badge markup shown next to the product price.
#[must_use]
pub fn badge_html(label: &str, formatted_price: &str) -> String {
    format!(
        "<p class=\"{BADGE_CLASS}\">{}: {}</p>",
        escape_html(label),
        escape_html(formatted_price)
    )
}

/// Attaches a variation's list price to its switcher payload object.
///
/// Returns `true` when a value was attached. Payloads without meta (or with
/// a stored empty string) are left untouched so the switcher falls back to
/// hiding the badge.
pub fn augment_variation_payload(payload: &mut Value, meta: Option<&str>) -> bool {
    let Some(value) = meta.filter(|v| !v.is_empty()) else {
        return false;
    };
    let Some(object) = payload.as_object_mut() else {
        return false;
    };
    object.insert(
        VARIATION_PAYLOAD_KEY.to_string(),
        Value::String(value.to_string()),
    );
    true
}
