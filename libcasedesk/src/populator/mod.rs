//! Population of the dual-list widget from the selection endpoint.
//!
//! Rendered panes are cached per request URL for the lifetime of the populator.
//! Fetches run in the background and report back as [`Message::SelectionFetched`];
//! only the completion the populator is currently waiting for is rendered, all
//! others are cached and dropped.
mod cache;
mod client;
mod request;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use casedesk_wire::{DEFAULT_DATA_ATTR, SelectionResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};
use web_time::Instant;

pub use cache::{FetchCache, FragmentPair};
pub use client::{FetchError, FetchFuture, HttpItemSource, ItemSource};
pub use request::{PopulateState, request_url};

use crate::async_util::perform_async_work;
use crate::facet_filter::update_facet_availability;
use crate::message::Message;
use crate::page::{Multiselect, Page};
use crate::template::{CASE_SELECT, Template, TemplateError, TemplateSet};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PopulatorOptions {
    pub enabled: bool,
    pub data_attr: String,
    /// Fetch again whenever a select trigger changes to a keyed option.
    pub refetch_on_trigger: bool,
    pub trigger_field: String,
    /// The trigger key is appended to this verbatim.
    pub ajax_url_root: String,
    /// Entity whose already included items are requested on edit forms, e.g. `suite`.
    pub for_type: Option<String>,
    /// Name of the template rendering `{items}` into pane rows.
    pub template: String,
}

impl Default for PopulatorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            data_attr: DEFAULT_DATA_ATTR.to_string(),
            refetch_on_trigger: true,
            trigger_field: "id_product".to_string(),
            ajax_url_root: "/api/v1/caseselection/?productversion__product=".to_string(),
            for_type: None,
            template: CASE_SELECT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateOutcome {
    /// The page has nothing to populate, or the populator does not follow the trigger.
    NotApplicable,
    NoKey,
    FromCache,
    /// A fetch with this revision was started.
    Fetching(u64),
    /// The URL is already being fetched under this revision.
    AlreadyFetching(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchApplied {
    Rendered,
    Failed,
    /// Not the awaited completion. A successful result is still cached.
    Stale,
}

pub struct Populator {
    options: PopulatorOptions,
    template: Arc<dyn Template>,
    source: Arc<dyn ItemSource>,
    cache: FetchCache,
    state: PopulateState,
    revision: u64,
    /// URL -> revision of the fetch running for it.
    inflight: HashMap<String, u64>,
    listening: bool,
    sender: Sender<Message>,
}

impl std::fmt::Debug for Populator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Populator")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .field("state", &self.state)
            .field("revision", &self.revision)
            .field("inflight", &self.inflight)
            .field("listening", &self.listening)
            .finish_non_exhaustive()
    }
}

fn apply(multiselect: &mut Multiselect, pair: &FragmentPair) {
    multiselect.unselected.set_content(pair.unselected.clone());
    multiselect.selected.set_content(pair.selected.clone());
    hide_loading(multiselect);
    let visible = [pair.unselected.rows.as_slice(), pair.selected.rows.as_slice()].concat();
    update_facet_availability(&mut multiselect.facets, &visible);
}

fn hide_loading(multiselect: &mut Multiselect) {
    multiselect.unselected.hide_loading();
    multiselect.selected.hide_loading();
}

impl Populator {
    pub fn new(
        options: PopulatorOptions,
        templates: &TemplateSet,
        source: Arc<dyn ItemSource>,
        sender: Sender<Message>,
    ) -> Result<Self, TemplateError> {
        let template = templates.get(&options.template)?;
        Ok(Self {
            options,
            template,
            source,
            cache: FetchCache::new(),
            state: PopulateState::Idle,
            revision: 0,
            inflight: HashMap::new(),
            listening: false,
            sender,
        })
    }

    pub fn options(&self) -> &PopulatorOptions {
        &self.options
    }

    pub fn state(&self) -> &PopulateState {
        &self.state
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Number of fetches whose completion has not been handled yet.
    pub fn outstanding(&self) -> usize {
        self.inflight.len()
    }

    fn current_key(&self, page: &Page) -> Option<String> {
        page.control(&self.options.trigger_field)?
            .current_key(&self.options.data_attr)
    }

    fn url_for(&self, page: &Page, key: &str) -> String {
        let for_type = self.options.for_type.as_deref();
        request_url(
            &self.options.ajax_url_root,
            key,
            for_type,
            for_type.and_then(|t| page.included_id(t)),
        )
    }

    /// Attaches to a select trigger and populates once if the page has a dual-list widget.
    pub fn on_page_load(&mut self, page: &mut Page) -> PopulateOutcome {
        self.listening = self.options.refetch_on_trigger
            && page
                .control(&self.options.trigger_field)
                .is_some_and(|c| c.is_select());
        if page.multiselect.is_none() {
            return PopulateOutcome::NotApplicable;
        }
        self.refresh(page)
    }

    pub fn on_trigger_changed(&mut self, page: &mut Page) -> PopulateOutcome {
        if !self.listening {
            return PopulateOutcome::NotApplicable;
        }
        self.refresh(page)
    }

    fn refresh(&mut self, page: &mut Page) -> PopulateOutcome {
        let Some(key) = self.current_key(page) else {
            debug!("No key in {}, not populating", self.options.trigger_field);
            return PopulateOutcome::NoKey;
        };
        let url = self.url_for(page, &key);
        self.populate(page, &key, &url)
    }

    /// Renders the panes from the cache, or starts fetching `url`.
    pub fn populate(&mut self, page: &mut Page, key: &str, url: &str) -> PopulateOutcome {
        let Some(multiselect) = page.multiselect.as_mut() else {
            return PopulateOutcome::NotApplicable;
        };

        if let Some(pair) = self.cache.get(url) {
            debug!("Rendering {url} from cache");
            apply(multiselect, pair);
            self.state = PopulateState::Rendered {
                key: key.to_string(),
                url: url.to_string(),
            };
            return PopulateOutcome::FromCache;
        }

        multiselect.unselected.show_loading();
        multiselect.selected.show_loading();

        if let Some(&revision) = self.inflight.get(url) {
            debug!("{url} is already being fetched");
            self.state = PopulateState::Fetching {
                key: key.to_string(),
                url: url.to_string(),
                revision,
            };
            return PopulateOutcome::AlreadyFetching(revision);
        }

        self.revision += 1;
        let revision = self.revision;
        self.inflight.insert(url.to_string(), revision);
        self.state = PopulateState::Fetching {
            key: key.to_string(),
            url: url.to_string(),
            revision,
        };
        info!("Fetching {url}");

        let source = self.source.clone();
        let sender = self.sender.clone();
        let url = url.to_string();
        let key = key.to_string();
        perform_async_work(async move {
            let start = Instant::now();
            let result = source.fetch(url.clone()).await;
            info!("Fetched {url} in {:?}", start.elapsed());
            if sender
                .send(Message::SelectionFetched {
                    revision,
                    url,
                    key,
                    result,
                })
                .is_err()
            {
                debug!("View dropped before the fetch completed");
            }
        });
        PopulateOutcome::Fetching(revision)
    }

    fn render(&self, response: &SelectionResponse) -> Result<FragmentPair, TemplateError> {
        let objects = &response.objects;
        Ok(FragmentPair {
            unselected: self.template.render(&json!({ "items": objects.unselected }))?,
            selected: self.template.render(&json!({ "items": objects.selected }))?,
        })
    }

    fn fail(&mut self, page: &mut Page, key: String, url: String) -> FetchApplied {
        if let Some(multiselect) = page.multiselect.as_mut() {
            hide_loading(multiselect);
        }
        self.state = PopulateState::Failed { key, url };
        FetchApplied::Failed
    }

    pub fn handle_fetched(
        &mut self,
        page: &mut Page,
        revision: u64,
        url: String,
        key: String,
        result: Result<SelectionResponse, FetchError>,
    ) -> FetchApplied {
        if self.inflight.get(&url) == Some(&revision) {
            self.inflight.remove(&url);
        }
        let awaited = self.state.awaits(revision);
        let current = awaited
            && self.current_key(page).as_deref() == Some(key.as_str())
            && self.url_for(page, &key) == url;

        let pair = match result.map(|response| self.render(&response)) {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) if current => {
                error!("Rendering {url} failed: {err}");
                return self.fail(page, key, url);
            }
            Err(err) if current => {
                error!("Fetching {url} failed: {err}");
                return self.fail(page, key, url);
            }
            Ok(Err(err)) => {
                warn!("Ignoring stale render failure for {url}: {err}");
                return self.settle_stale(page, awaited);
            }
            Err(err) => {
                warn!("Ignoring stale fetch failure for {url}: {err}");
                return self.settle_stale(page, awaited);
            }
        };

        self.cache.insert(url.clone(), pair);
        if !current {
            warn!("Discarding stale selection for {url} (revision {revision})");
            return self.settle_stale(page, awaited);
        }
        match self.populate(page, &key, &url) {
            PopulateOutcome::FromCache => FetchApplied::Rendered,
            _ => FetchApplied::Stale,
        }
    }

    /// The awaited completion no longer matches the trigger, which was cleared or
    /// edited without a new request. Nothing is left loading.
    fn settle_stale(&mut self, page: &mut Page, awaited: bool) -> FetchApplied {
        if awaited {
            if let Some(multiselect) = page.multiselect.as_mut() {
                hide_loading(multiselect);
            }
            self.state = PopulateState::Idle;
        }
        FetchApplied::Stale
    }
}
