//! Edit-form field fragments for product and variation admin forms.
//!
//! The host embeds these fragments in its own pricing panels and posts them
//! back to the form-save endpoints, so field names here and the names those
//! endpoints read must stay in sync.

/// Form field carrying a simple product's list price.
pub const SIMPLE_FIELD_NAME: &str = "list_price";
/// Form field family carrying variation list prices, indexed per row.
pub const VARIATION_FIELD_NAME: &str = "variation_list_price";
/// Hidden field carrying the write token.
pub const TOKEN_FIELD_NAME: &str = "msrp_form_token";

/// Tracks what has already been emitted during a single page render.
///
/// The host may invoke the pricing-panel hook more than once per page; the
/// simple-product field must appear exactly once, so emission latches here.
#[derive(Debug, Default)]
pub struct RenderContext {
    simple_field_rendered: bool,
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn simple_field_rendered(&self) -> bool {
        self.simple_field_rendered
    }
}

/// Renders the simple-product price field, at most once per context.
///
/// The write token rides along as a hidden input so the fragment posts back
/// as a complete form. Returns `None` on repeat calls; the caller emits
/// nothing in that case.
#[must_use]
pub fn render_simple_field(
    ctx: &mut RenderContext,
    label: &str,
    value: Option<&str>,
    token: &str,
) -> Option<String> {
    if ctx.simple_field_rendered {
        return None;
    }
    ctx.simple_field_rendered = true;

    let label = escape_html(label);
    let value = escape_html(value.unwrap_or(""));
    Some(format!(
        concat!(
            "<p class=\"form-field {name}_field\">",
            "<label for=\"{name}\">{label}</label>",
            "<input type=\"text\" class=\"short\" id=\"{name}\" name=\"{name}\" value=\"{value}\" />",
            "{token_field}",
            "</p>"
        ),
        name = SIMPLE_FIELD_NAME,
        label = label,
        value = value,
        token_field = render_token_field(token),
    ))
}

/// Renders one variation price row. Rows are keyed by loop index so the bulk
/// save can pair submitted values with variation ids.
#[must_use]
pub fn render_variation_field(index: usize, label: &str, value: Option<&str>) -> String {
    let label = escape_html(label);
    let value = escape_html(value.unwrap_or(""));
    format!(
        concat!(
            "<div class=\"form-row form-row-full\">",
            "<p class=\"form-field {name}_field\">",
            "<label for=\"{name}_{index}\">{label}</label>",
            "<input type=\"text\" class=\"short\" id=\"{name}_{index}\" name=\"{name}[{index}]\" value=\"{value}\" />",
            "</p>",
            "</div>"
        ),
        name = VARIATION_FIELD_NAME,
        index = index,
        label = label,
        value = value,
    )
}

/// Renders the hidden write-token field included once per form.
#[must_use]
pub fn render_token_field(token: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\" />",
        TOKEN_FIELD_NAME,
        escape_html(token)
    )
}

/// Minimal HTML escape for text and attribute positions.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_field_renders_once_per_context() {
        let mut ctx = RenderContext::new();
        let first = render_simple_field(&mut ctx, "List Price", Some("19.99"), "tok");
        assert!(first.is_some());
        assert!(ctx.simple_field_rendered());

        let second = render_simple_field(&mut ctx, "List Price", Some("19.99"), "tok");
        assert!(second.is_none(), "repeat render must emit nothing");
    }

    #[test]
    fn fresh_context_renders_again() {
        let mut first_ctx = RenderContext::new();
        assert!(render_simple_field(&mut first_ctx, "MSRP", None, "tok").is_some());

        let mut second_ctx = RenderContext::new();
        assert!(render_simple_field(&mut second_ctx, "MSRP", None, "tok").is_some());
    }

    #[test]
    fn simple_field_contains_name_label_value_and_token() {
        let mut ctx = RenderContext::new();
        let html = render_simple_field(&mut ctx, "List Price", Some("19.99"), "tok123").unwrap();
        assert!(html.contains("name=\"list_price\""));
        assert!(html.contains(">List Price</label>"));
        assert!(html.contains("value=\"19.99\""));
        assert!(html.contains("name=\"msrp_form_token\" value=\"tok123\""));
    }

    #[test]
    fn simple_field_empty_when_no_stored_value() {
        let mut ctx = RenderContext::new();
        let html = render_simple_field(&mut ctx, "List Price", None, "tok").unwrap();
        assert!(html.contains("value=\"\""));
    }

    #[test]
    fn variation_field_is_indexed() {
        let html = render_variation_field(3, "List Price", Some("34.99"));
        assert!(html.contains("name=\"variation_list_price[3]\""));
        assert!(html.contains("id=\"variation_list_price_3\""));
        assert!(html.contains("value=\"34.99\""));
    }

    #[test]
    fn variation_field_renders_without_latch() {
        let first = render_variation_field(0, "MSRP", None);
        let second = render_variation_field(1, "MSRP", None);
        assert!(first.contains("[0]"));
        assert!(second.contains("[1]"));
    }

    #[test]
    fn token_field_is_hidden_and_named() {
        let html = render_token_field("abc123");
        assert!(html.contains("type=\"hidden\""));
        assert!(html.contains("name=\"msrp_form_token\""));
        assert!(html.contains("value=\"abc123\""));
    }

    #[test]
    fn escape_html_covers_attribute_breakers() {
        assert_eq!(
            escape_html(r#"<x a="1" b='2'>&"#),
            "&lt;x a=&quot;1&quot; b=&#39;2&#39;&gt;&amp;"
        );
    }

    #[test]
    fn label_is_escaped_in_markup() {
        let mut ctx = RenderContext::new();
        let html = render_simple_field(&mut ctx, "<script>x</script>", None, "tok").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
