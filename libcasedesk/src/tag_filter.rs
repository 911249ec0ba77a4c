//! Deactivation of product-specific tags that do not belong to the chosen product.
use casedesk_wire::DEFAULT_DATA_ATTR;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub label: String,
    /// Key of the product the tag is restricted to. Global tags have none.
    pub key: Option<String>,
    pub checked: bool,
}

impl TagRow {
    #[must_use]
    pub fn new(label: impl Into<String>, key: Option<&str>) -> Self {
        Self {
            label: label.into(),
            key: key.filter(|k| !k.is_empty()).map(str::to_string),
            checked: true,
        }
    }

    /// Same outcome as clicking the row's label: flips its checkbox.
    pub fn activate(&mut self) {
        self.checked = !self.checked;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    pub rows: Vec<TagRow>,
}

impl TagList {
    #[must_use]
    pub fn new(rows: Vec<TagRow>) -> Self {
        Self { rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TagFilterOptions {
    pub enabled: bool,
    pub trigger_field: String,
    pub data_attr: String,
}

impl Default for TagFilterOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_field: "id_product".to_string(),
            data_attr: DEFAULT_DATA_ATTR.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagFilter {
    options: TagFilterOptions,
}

impl TagFilter {
    #[must_use]
    pub fn new(options: TagFilterOptions) -> Self {
        Self { options }
    }

    pub fn trigger_field(&self) -> &str {
        &self.options.trigger_field
    }

    /// Activates every keyed tag row whose key differs from the selected product.
    /// Returns the number of rows activated.
    pub fn on_trigger_changed(&self, page: &mut Page) -> usize {
        let Some(key) = page
            .control(&self.options.trigger_field)
            .and_then(|c| c.selected_key(&self.options.data_attr))
        else {
            debug!("No product selected, leaving tags untouched");
            return 0;
        };
        let Some(tags) = page.tags.as_mut() else {
            return 0;
        };

        let mut activated = 0;
        for row in &mut tags.rows {
            if row.key.as_ref().is_some_and(|k| *k != key) {
                row.activate();
                activated += 1;
            }
        }
        debug!("Deactivated {activated} tags not belonging to product {key}");
        activated
    }
}
