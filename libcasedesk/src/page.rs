//! In-memory model of the form page the filters and populators act upon.
//!
//! Every lookup returns an `Option`: a page without a given control or widget simply
//! does not take part in the corresponding behavior.
use std::collections::BTreeMap;

use itertools::Itertools;

use crate::facet_filter::{FacetGroup, FacetValue};
use crate::tag_filter::TagList;

/// `data-*` attributes of an element, without the `data-` prefix.
pub type DataAttrs = BTreeMap<String, String>;

/// Returns the attribute value if it is present and non-empty.
#[must_use]
pub fn key_of<'a>(data: &'a DataAttrs, attr: &str) -> Option<&'a str> {
    data.get(attr).map(String::as_str).filter(|v| !v.is_empty())
}

/// Values the facet pass compares against, already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFacets {
    pub tags: Vec<FacetValue>,
    pub author: Option<FacetValue>,
    pub fields: BTreeMap<String, FacetValue>,
}

/// One `<option>` of a select, or one row of a dual-list pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRecord {
    pub value: String,
    pub label: String,
    pub data: DataAttrs,
    pub selected: bool,
    pub facets: ItemFacets,
    /// Rendered markup of this row, empty for plain options.
    pub html: String,
}

impl OptionRecord {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_data(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(attr.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn key(&self, attr: &str) -> Option<&str> {
        key_of(&self.data, attr)
    }

    /// Placeholder options such as `<option value="">---</option>` have no value.
    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

/// A run of rows produced by a template. Panes hold one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub rows: Vec<OptionRecord>,
}

impl Fragment {
    #[must_use]
    pub fn new(rows: Vec<OptionRecord>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn markup(&self) -> String {
        self.rows.iter().map(|r| r.html.as_str()).join("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectControl {
    pub options: Vec<OptionRecord>,
}

impl SelectControl {
    #[must_use]
    pub fn new(options: Vec<OptionRecord>) -> Self {
        Self { options }
    }

    /// The explicitly selected option, falling back to the first one like a
    /// single-choice browser select does.
    pub fn selected_option(&self) -> Option<&OptionRecord> {
        self.options
            .iter()
            .find(|o| o.selected)
            .or_else(|| self.options.first())
    }

    /// Selects the first option with `value`. Returns false if there is none.
    pub fn select_value(&mut self, value: &str) -> bool {
        let Some(idx) = self.options.iter().position(|o| o.value == value) else {
            return false;
        };
        self.select_index(idx);
        true
    }

    pub fn select_index(&mut self, idx: usize) {
        for (i, option) in self.options.iter_mut().enumerate() {
            option.selected = i == idx;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputControl {
    pub value: String,
    pub data: DataAttrs,
}

impl InputControl {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            data: DataAttrs::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Select(SelectControl),
    Input(InputControl),
}

impl Control {
    pub fn is_select(&self) -> bool {
        matches!(self, Control::Select(_))
    }

    pub fn as_select(&self) -> Option<&SelectControl> {
        match self {
            Control::Select(select) => Some(select),
            Control::Input(_) => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectControl> {
        match self {
            Control::Select(select) => Some(select),
            Control::Input(_) => None,
        }
    }

    /// Key stored on the selected option. Inputs have no selected option.
    pub fn selected_key(&self, attr: &str) -> Option<String> {
        self.as_select()?
            .selected_option()?
            .key(attr)
            .map(str::to_string)
    }

    /// Key of a select's selected option, or the literal value of an input.
    pub fn current_key(&self, attr: &str) -> Option<String> {
        match self {
            Control::Select(_) => self.selected_key(attr),
            Control::Input(input) => Some(input.value.clone()).filter(|v| !v.is_empty()),
        }
    }
}

/// One side of the dual-list widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pane {
    pub content: Fragment,
    pub loading: bool,
}

impl Pane {
    pub fn rows(&self) -> &[OptionRecord] {
        &self.content.rows
    }

    pub fn set_content(&mut self, content: Fragment) {
        self.content = content;
    }

    pub fn clear(&mut self) {
        self.content.rows.clear();
    }

    pub fn show_loading(&mut self) {
        self.loading = true;
    }

    pub fn hide_loading(&mut self) {
        self.loading = false;
    }
}

/// Dual-list widget: the already associated items, the available ones, and the
/// facet checkboxes shown above the available pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multiselect {
    pub selected: Pane,
    pub unselected: Pane,
    pub facets: Vec<FacetGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    controls: BTreeMap<String, Control>,
    pub multiselect: Option<Multiselect>,
    pub tags: Option<TagList>,
    /// `for_type -> id` of the entity being edited. Empty on creation forms.
    edit_ids: BTreeMap<String, String>,
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_control(mut self, id: impl Into<String>, control: Control) -> Self {
        self.insert_control(id, control);
        self
    }

    #[must_use]
    pub fn with_multiselect(mut self, multiselect: Multiselect) -> Self {
        self.multiselect = Some(multiselect);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagList) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub fn with_edit_id(mut self, for_type: impl Into<String>, id: impl Into<String>) -> Self {
        self.edit_ids.insert(for_type.into(), id.into());
        self
    }

    pub fn insert_control(&mut self, id: impl Into<String>, control: Control) {
        self.controls.insert(id.into(), control);
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.get(id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.controls.get_mut(id)
    }

    pub fn select(&self, id: &str) -> Option<&SelectControl> {
        self.control(id)?.as_select()
    }

    /// Id of the entity being edited, present only on edit forms.
    pub fn included_id(&self, for_type: &str) -> Option<&str> {
        self.edit_ids
            .get(for_type)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Changes the selection of a select control. Returns true if the selected
    /// option actually changed, i.e. a change event would fire.
    pub fn choose_option(&mut self, id: &str, value: &str) -> bool {
        let Some(select) = self.control_mut(id).and_then(Control::as_select_mut) else {
            return false;
        };
        let before = select.selected_option().map(|o| o.value.clone());
        if !select.select_value(value) {
            return false;
        }
        before.as_deref() != Some(value)
    }

    /// Sets the literal value of an input control. Returns true if it changed.
    pub fn set_input_value(&mut self, id: &str, value: &str) -> bool {
        match self.control_mut(id) {
            Some(Control::Input(input)) if input.value != value => {
                input.value = value.to_string();
                true
            }
            _ => false,
        }
    }
}
