//! Narrowing of a dependent control to the options belonging to the trigger's choice.
use casedesk_wire::DEFAULT_DATA_ATTR;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::facet_filter::{uncheck_all, update_facet_availability};
use crate::page::{OptionRecord, Page};

/// Name under which the available pane of the dual-list widget is addressed in config.
pub const UNSELECTED_PANE: &str = "multiunselected";

/// Where the filtered options live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FilterTarget {
    /// The options of the select with this id.
    Field(String),
    /// The rows of the dual-list widget's available pane.
    UnselectedPane,
}

impl From<String> for FilterTarget {
    fn from(name: String) -> Self {
        if name == UNSELECTED_PANE {
            FilterTarget::UnselectedPane
        } else {
            FilterTarget::Field(name)
        }
    }
}

impl From<FilterTarget> for String {
    fn from(target: FilterTarget) -> Self {
        match target {
            FilterTarget::Field(name) => name,
            FilterTarget::UnselectedPane => UNSELECTED_PANE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionFilterOptions {
    pub data_attr: String,
    pub trigger_field: String,
    pub target: FilterTarget,
    /// Also reset and re-evaluate the facet checkboxes of the dual-list widget.
    pub multiselect_widget: bool,
    /// Keep the valueless placeholder options and append the matches after them.
    pub optional: bool,
    /// Like `optional`, and auto-select a single match.
    pub no_default: bool,
}

impl Default for OptionFilterOptions {
    fn default() -> Self {
        Self {
            data_attr: DEFAULT_DATA_ATTR.to_string(),
            trigger_field: "id_product".to_string(),
            target: FilterTarget::Field("id_productversion".to_string()),
            multiselect_widget: false,
            optional: false,
            no_default: false,
        }
    }
}

pub type FilterCallback = Box<dyn FnMut(&Page)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInit {
    /// Filtered once and now follows trigger changes.
    Listening,
    /// Items were rendered up front; only the facet checkboxes were evaluated.
    FacetsOnly,
    Inactive,
}

/// Order-preserving subset of `options` whose `attr` equals `key`.
#[must_use]
pub fn matching(options: &[OptionRecord], attr: &str, key: &str) -> Vec<OptionRecord> {
    options
        .iter()
        .filter(|o| o.key(attr) == Some(key))
        .cloned()
        .collect()
}

pub struct OptionFilter {
    options: OptionFilterOptions,
    /// Snapshot of the target's options taken at construction. Never mutated.
    allopts: Vec<OptionRecord>,
    listening: bool,
    callback: Option<FilterCallback>,
}

impl std::fmt::Debug for OptionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionFilter")
            .field("options", &self.options)
            .field("allopts", &self.allopts)
            .field("listening", &self.listening)
            .field("callback", &self.callback.as_ref().map(|_| "..."))
            .finish()
    }
}

fn target_rows<'a>(page: &'a Page, target: &FilterTarget) -> Option<&'a Vec<OptionRecord>> {
    match target {
        FilterTarget::Field(id) => page.select(id).map(|s| &s.options),
        FilterTarget::UnselectedPane => page.multiselect.as_ref().map(|m| &m.unselected.content.rows),
    }
}

fn target_rows_mut<'a>(
    page: &'a mut Page,
    target: &FilterTarget,
) -> Option<&'a mut Vec<OptionRecord>> {
    match target {
        FilterTarget::Field(id) => page
            .control_mut(id)
            .and_then(|c| c.as_select_mut())
            .map(|s| &mut s.options),
        FilterTarget::UnselectedPane => page
            .multiselect
            .as_mut()
            .map(|m| &mut m.unselected.content.rows),
    }
}

impl OptionFilter {
    /// Snapshots the target's options. `None` if the page has no such target.
    #[must_use]
    pub fn new(options: OptionFilterOptions, page: &Page) -> Option<Self> {
        let allopts = target_rows(page, &options.target)?.clone();
        Some(Self {
            options,
            allopts,
            listening: false,
            callback: None,
        })
    }

    /// Called with the page after every filter pass.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnMut(&Page) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn options(&self) -> &OptionFilterOptions {
        &self.options
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn init(&mut self, page: &mut Page) -> FilterInit {
        let trigger_is_select = page
            .control(&self.options.trigger_field)
            .is_some_and(|c| c.is_select());
        let selected_populated = page
            .multiselect
            .as_ref()
            .is_some_and(|m| !m.selected.rows().is_empty());

        if trigger_is_select && !selected_populated {
            self.filter(page);
            self.listening = true;
            FilterInit::Listening
        } else if self.options.multiselect_widget {
            let mut visible = target_rows(page, &self.options.target)
                .cloned()
                .unwrap_or_default();
            if let Some(multiselect) = page.multiselect.as_mut() {
                visible.extend(multiselect.selected.rows().iter().cloned());
                update_facet_availability(&mut multiselect.facets, &visible);
            }
            FilterInit::FacetsOnly
        } else {
            FilterInit::Inactive
        }
    }

    /// Re-filters if `init` attached the filter to the trigger. Returns whether a
    /// pass took place.
    pub fn on_trigger_changed(&mut self, page: &mut Page) -> bool {
        self.listening && self.filter(page).is_some()
    }

    /// Replaces (or, in additive mode, extends) the target's options with the
    /// snapshot options matching the trigger's key. Returns the number of matches,
    /// or `None` when no pass took place.
    pub fn filter(&mut self, page: &mut Page) -> Option<usize> {
        let attr = &self.options.data_attr;
        let Some(key) = page
            .control(&self.options.trigger_field)
            .and_then(|c| c.selected_key(attr))
        else {
            debug!(
                "No key selected in {}, skipping filter pass",
                self.options.trigger_field
            );
            return None;
        };
        let newopts = matching(&self.allopts, attr, &key);
        let target = target_rows_mut(page, &self.options.target)?;

        if self.options.optional || self.options.no_default {
            target.retain(|o| !o.has_value());
            let first_new = target.len();
            target.extend(newopts.iter().cloned());
            if self.options.no_default && newopts.len() == 1 {
                for (i, option) in target.iter_mut().enumerate() {
                    option.selected = i == first_new;
                }
            }
        } else {
            *target = newopts.clone();
        }

        if self.options.multiselect_widget
            && let Some(multiselect) = page.multiselect.as_mut()
        {
            let unchecked = uncheck_all(&mut multiselect.facets);
            if !unchecked.is_empty() {
                debug!("Reset {} facet checkboxes", unchecked.len());
            }
            multiselect.selected.clear();
            update_facet_availability(&mut multiselect.facets, &newopts);
        }

        debug!(
            "Filtered {} down to {} options for key {key}",
            String::from(self.options.target.clone()),
            newopts.len()
        );

        if let Some(callback) = self.callback.as_mut() {
            callback(page);
        }
        Some(newopts.len())
    }
}
