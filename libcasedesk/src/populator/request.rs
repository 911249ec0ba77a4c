use casedesk_wire::FOR_PARAM_PREFIX;
use derive_more::Display;

/// `root + key`, followed by `&for_<for_type>=<included_id>` on edit forms.
#[must_use]
pub fn request_url(
    ajax_url_root: &str,
    key: &str,
    for_type: Option<&str>,
    included_id: Option<&str>,
) -> String {
    let mut url = format!("{ajax_url_root}{key}");
    if let (Some(for_type), Some(id)) = (for_type, included_id.filter(|id| !id.is_empty())) {
        url.push_str(&format!("&{FOR_PARAM_PREFIX}{for_type}={id}"));
    }
    url
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Display)]
pub enum PopulateState {
    #[default]
    #[display("idle")]
    Idle,
    #[display("fetching {url} (revision {revision})")]
    Fetching {
        key: String,
        url: String,
        revision: u64,
    },
    #[display("rendered {url}")]
    Rendered { key: String, url: String },
    #[display("failed {url}")]
    Failed { key: String, url: String },
}

impl PopulateState {
    /// True if a completion of `revision` is the one being waited for.
    pub fn awaits(&self, revision: u64) -> bool {
        matches!(self, PopulateState::Fetching { revision: r, .. } if *r == revision)
    }
}
