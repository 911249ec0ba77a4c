//! Named templates turning JSON contexts into page fragments.
use std::collections::HashMap;
use std::sync::Arc;

use casedesk_wire::{DEFAULT_DATA_ATTR, ItemRecord};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::facet_filter::FacetValue;
use crate::page::{Fragment, ItemFacets, OptionRecord};

pub const CASE_SELECT: &str = "case_select";
pub const CASE_ATTACHMENT: &str = "case_attachment";
pub const CASE_ATTACHMENT_INPUT: &str = "case_attachment_input";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("No template named {0}")]
    Missing(String),
    #[error("Invalid context for template {template}: {source}")]
    Context {
        template: &'static str,
        source: serde_json::Error,
    },
}

pub trait Template: Send + Sync {
    fn render(&self, context: &Value) -> Result<Fragment, TemplateError>;
}

impl<F> Template for F
where
    F: Fn(&Value) -> Result<Fragment, TemplateError> + Send + Sync,
{
    fn render(&self, context: &Value) -> Result<Fragment, TemplateError> {
        self(context)
    }
}

fn context<'de, T: Deserialize<'de>>(
    template: &'static str,
    value: &'de Value,
) -> Result<T, TemplateError> {
    T::deserialize(value).map_err(|source| TemplateError::Context { template, source })
}

pub fn escape_html(raw: &str) -> String {
    v_htmlescape::escape(raw).to_string()
}

/// Renders `{items: [...]}` as selectable rows of the dual-list widget.
///
/// Every row carries its item's product key under `data_attr`, so the option filter
/// can act on panes exactly like on plain selects, plus the tags, author and scalar
/// fields the facet pass matches against.
#[derive(Debug, Clone)]
pub struct ItemListTemplate {
    data_attr: String,
}

impl Default for ItemListTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ATTR)
    }
}

#[derive(Deserialize)]
struct ItemsContext {
    items: Vec<ItemRecord>,
}

impl ItemListTemplate {
    #[must_use]
    pub fn new(data_attr: &str) -> Self {
        Self {
            data_attr: data_attr.to_string(),
        }
    }

    pub fn row(&self, item: &ItemRecord) -> OptionRecord {
        let id = item.id().unwrap_or_default();
        let name = item.name().unwrap_or_default();
        let mut row = OptionRecord::new(id.clone(), name);
        if let Some(product) = item.product_id() {
            row.data.insert(self.data_attr.clone(), product);
        }
        row.data.insert("id".to_string(), id.clone());

        let tags = item.tag_names();
        row.facets = ItemFacets {
            tags: tags.iter().map(|t| FacetValue::new(t)).collect(),
            author: item.author().map(FacetValue::new),
            fields: item
                .0
                .keys()
                .filter_map(|field| Some((field.clone(), FacetValue::new(&item.text(field)?))))
                .collect(),
        };

        let data_attrs = row
            .data
            .iter()
            .map(|(k, v)| format!(r#" data-{}="{}""#, escape_html(k), escape_html(v)))
            .join("");
        let author = item
            .author()
            .map(|a| format!(r#"<span class="author"><span>{}</span></span>"#, escape_html(a)))
            .unwrap_or_default();
        let tag_links = tags
            .iter()
            .map(|t| format!("<a>{}</a>", escape_html(t)))
            .join("");
        row.html = format!(
            r#"<li class="selectitem"{data_attrs}><span class="name">{}</span>{author}<span class="tags">{tag_links}</span></li>"#,
            escape_html(name)
        );
        row
    }
}

impl Template for ItemListTemplate {
    fn render(&self, value: &Value) -> Result<Fragment, TemplateError> {
        let ctx: ItemsContext = context(CASE_SELECT, value)?;
        Ok(Fragment::new(ctx.items.iter().map(|i| self.row(i)).collect()))
    }
}

#[derive(Deserialize)]
struct AttachmentContext {
    name: String,
    input: String,
    counter: u64,
}

/// `{name, input, counter}` -> one attachment row flagged as new.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentRowTemplate;

impl Template for AttachmentRowTemplate {
    fn render(&self, value: &Value) -> Result<Fragment, TemplateError> {
        let ctx: AttachmentContext = context(CASE_ATTACHMENT, value)?;
        let mut row = OptionRecord::new(ctx.counter.to_string(), ctx.name.clone());
        row.data.insert("id".to_string(), ctx.input.clone());
        row.html = format!(
            r#"<li class="attachment-item new"><input type="checkbox" class="check" id="remove-attachment-{counter}" data-id="{input}"><label for="remove-attachment-{counter}">{name}</label></li>"#,
            counter = ctx.counter,
            input = escape_html(&ctx.input),
            name = escape_html(&ctx.name),
        );
        Ok(Fragment::new(vec![row]))
    }
}

#[derive(Deserialize)]
struct AttachmentInputContext {
    counter: u64,
}

/// `{counter}` -> the next hidden file input.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentInputTemplate;

impl Template for AttachmentInputTemplate {
    fn render(&self, value: &Value) -> Result<Fragment, TemplateError> {
        let ctx: AttachmentInputContext = context(CASE_ATTACHMENT_INPUT, value)?;
        let mut row = OptionRecord::new(ctx.counter.to_string(), "");
        row.html = format!(
            r#"<input type="file" name="add_attachment" id="id_add_attachment_{}">"#,
            ctx.counter
        );
        Ok(Fragment::new(vec![row]))
    }
}

/// Templates by name.
#[derive(Clone)]
pub struct TemplateSet {
    templates: HashMap<String, Arc<dyn Template>>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.templates.keys().sorted().collect_vec())
            .finish()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.register(CASE_SELECT, ItemListTemplate::default());
        set.register(CASE_ATTACHMENT, AttachmentRowTemplate);
        set.register(CASE_ATTACHMENT_INPUT, AttachmentInputTemplate);
        set
    }
}

impl TemplateSet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, template: impl Template + 'static) {
        self.templates.insert(name.into(), Arc::new(template));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Template>, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::Missing(name.to_string()))
    }

    pub fn render(&self, name: &str, context: &Value) -> Result<Fragment, TemplateError> {
        self.get(name)?.render(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_rows_carry_key_and_facets() {
        let template = ItemListTemplate::new("product-id");
        let fragment = template
            .render(&json!({"items": [{
                "id": 12,
                "name": "Login <works>",
                "product_id": "7",
                "status": "Active",
                "created_by": {"username": "camd"},
                "tags": [{"name": "Smoke"}]
            }]}))
            .unwrap();
        let row = &fragment.rows[0];
        assert_eq!(row.value, "12");
        assert_eq!(row.key("product-id"), Some("7"));
        assert_eq!(row.facets.tags, vec![FacetValue::new("smoke")]);
        assert_eq!(row.facets.author, Some(FacetValue::new("camd")));
        assert_eq!(row.facets.fields.get("status"), Some(&FacetValue::new("active")));
        assert!(row.html.contains("Login &lt;works&gt;"));
        assert!(row.html.contains(r#"data-product-id="7""#));
        assert!(row.html.contains("<a>Smoke</a>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = ItemListTemplate::default();
        let ctx = json!({"items": [{"id": 1, "name": "a", "product_id": 7}, {"id": 2, "name": "b"}]});
        let first = template.render(&ctx).unwrap();
        assert_eq!(first, template.render(&ctx).unwrap());
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[1].key("product-id"), None);
    }

    #[test]
    fn bad_context_is_reported() {
        let err = ItemListTemplate::default().render(&json!({"things": []})).unwrap_err();
        assert!(matches!(err, TemplateError::Context { template: CASE_SELECT, .. }));
    }

    #[test]
    fn attachment_templates() {
        let set = TemplateSet::default();
        let row = set
            .render(
                CASE_ATTACHMENT,
                &json!({"name": "log.txt", "input": "id_add_attachment", "counter": 0}),
            )
            .unwrap();
        assert!(row.markup().contains(r#"data-id="id_add_attachment""#));
        assert!(row.markup().contains("attachment-item new"));

        let input = set
            .render(CASE_ATTACHMENT_INPUT, &json!({"counter": 1}))
            .unwrap();
        assert!(input.markup().contains(r#"id="id_add_attachment_1""#));
    }

    #[test]
    fn closures_are_templates() {
        let mut set = TemplateSet::empty();
        set.register("count", |ctx: &Value| -> Result<Fragment, TemplateError> {
            let n = ctx["items"].as_array().map(Vec::len).unwrap_or(0);
            Ok(Fragment::new(vec![OptionRecord::new(n.to_string(), "")]))
        });
        let fragment = set.render("count", &json!({"items": [1, 2, 3]})).unwrap();
        assert_eq!(fragment.rows[0].value, "3");
        assert!(matches!(set.render("nope", &json!({})), Err(TemplateError::Missing(_))));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x/y">&'"#),
            "&lt;a href=&quot;x&#x2f;y&quot;&gt;&amp;&#x27;"
        );
    }
}
