//! Adding and removing attachments on a case form before it is submitted.
//!
//! Every chosen file stays in its hidden input; choosing a file appends a visible row
//! for it and a fresh hidden input for the next file, and points the "add" label at
//! that new input.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::template::{CASE_ATTACHMENT, CASE_ATTACHMENT_INPUT, TemplateError, TemplateSet};

pub const ADD_ATTACHMENT_INPUT: &str = "id_add_attachment";
pub const ADD_ATTACHMENT_NAME: &str = "add_attachment";

static PATH_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.*[\\/]").unwrap());

/// Display name of a chosen file: the path with everything up to the last separator removed.
#[must_use]
pub fn display_filename(path: &str) -> String {
    PATH_PREFIX.replace(path, "").into_owned()
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("No attachment input with id {0}")]
    UnknownInput(String),
    #[error("No file chosen in {0}")]
    EmptyFilename(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRow {
    pub name: String,
    /// Id of the element the removal checkbox refers to.
    pub input_id: String,
    /// Counter value the row was rendered with. Rows from the initial page have none.
    pub counter: Option<u64>,
    /// Added in this session, and therefore removable.
    pub new: bool,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenInput {
    pub id: String,
    pub name: String,
    pub file: Option<String>,
    pub html: String,
}

impl HiddenInput {
    fn new(id: impl Into<String>, html: String) -> Self {
        Self {
            id: id.into(),
            name: ADD_ATTACHMENT_NAME.to_string(),
            file: None,
            html,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttachmentList {
    counter: u64,
    rows: Vec<AttachmentRow>,
    inputs: Vec<HiddenInput>,
    label_for: String,
    placeholder: bool,
}

impl Default for AttachmentList {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentList {
    /// Empty list showing the "no attachments" placeholder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: 0,
            rows: vec![],
            inputs: vec![HiddenInput::new(ADD_ATTACHMENT_INPUT, String::new())],
            label_for: ADD_ATTACHMENT_INPUT.to_string(),
            placeholder: true,
        }
    }

    /// Adds a row rendered with the page. Such rows cannot be removed here.
    #[must_use]
    pub fn with_existing(mut self, input_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.rows.push(AttachmentRow {
            name: name.into(),
            input_id: input_id.into(),
            counter: None,
            new: false,
            html: String::new(),
        });
        self.placeholder = false;
        self
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn rows(&self) -> &[AttachmentRow] {
        &self.rows
    }

    pub fn inputs(&self) -> &[HiddenInput] {
        &self.inputs
    }

    pub fn input(&self, id: &str) -> Option<&HiddenInput> {
        self.inputs.iter().find(|i| i.id == id)
    }

    pub fn label_for(&self) -> &str {
        &self.label_for
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Clicking the visible label opens the file picker of the input it targets.
    pub fn click_add_label(&self) -> &str {
        &self.label_for
    }

    pub fn file_chosen(
        &mut self,
        input_id: &str,
        path: &str,
        templates: &TemplateSet,
    ) -> Result<&AttachmentRow, AttachmentError> {
        let idx = self
            .inputs
            .iter()
            .position(|i| i.id == input_id)
            .ok_or_else(|| AttachmentError::UnknownInput(input_id.to_string()))?;
        let name = display_filename(path);
        if name.is_empty() {
            return Err(AttachmentError::EmptyFilename(input_id.to_string()));
        }

        let counter = self.counter;
        let row = templates.render(
            CASE_ATTACHMENT,
            &json!({"name": name, "input": input_id, "counter": counter}),
        )?;
        let next = counter + 1;
        let input = templates.render(CASE_ATTACHMENT_INPUT, &json!({"counter": next}))?;

        self.inputs[idx].file = Some(path.to_string());
        self.rows.push(AttachmentRow {
            name,
            input_id: input_id.to_string(),
            counter: Some(counter),
            new: true,
            html: row.markup(),
        });
        self.placeholder = false;
        self.counter = next;
        self.label_for = format!("{ADD_ATTACHMENT_INPUT}_{next}");
        self.inputs
            .push(HiddenInput::new(self.label_for.clone(), input.markup()));
        info!("Attached {path} through {input_id}");

        Ok(&self.rows[self.rows.len() - 1])
    }

    /// Removes the row whose checkbox refers to `input_id` together with that
    /// input, if the row was added in this session. Returns whether anything was removed.
    pub fn remove_toggled(&mut self, input_id: &str) -> bool {
        let Some(idx) = self.rows.iter().position(|r| r.input_id == input_id) else {
            return false;
        };
        if !self.rows[idx].new {
            debug!("Attachment {} was rendered with the page, keeping it", self.rows[idx].name);
            return false;
        }
        let row = self.rows.remove(idx);
        self.inputs.retain(|i| i.id != input_id);
        debug!("Removed attachment {}", row.name);
        true
    }
}
