use casedesk_wire::SelectionResponse;
use derive_more::Debug;

use crate::populator::FetchError;

/// Everything that happens to a form page: user interaction and background completions.
#[derive(Debug)]
pub enum Message {
    /// The document finished loading. Attaches the behaviors and runs the initial passes.
    PageLoaded,
    /// The user picked the option with `value` in the select `field`.
    SelectOption { field: String, value: String },
    /// The value of the input `field` was edited.
    SetInputValue { field: String, value: String },
    SelectionFetched {
        revision: u64,
        url: String,
        key: String,
        #[debug("{}", if result.is_ok() { "Ok(..)" } else { "Err(..)" })]
        result: Result<SelectionResponse, FetchError>,
    },
    AddAttachmentClicked,
    AttachmentChosen { input_id: String, path: String },
    AttachmentRemoveToggled { input_id: String },
}
