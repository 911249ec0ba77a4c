//! The form page together with the behaviors attached to it.
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use eyre::Result;
use tracing::{debug, info, trace};
use web_time::Instant;

use crate::attachments::AttachmentList;
use crate::config::CasedeskConfig;
use crate::message::Message;
use crate::option_filter::{OptionFilter, OptionFilterOptions};
use crate::page::Page;
use crate::populator::{HttpItemSource, ItemSource, Populator, PopulatorOptions};
use crate::tag_filter::{TagFilter, TagFilterOptions};
use crate::template::{CASE_SELECT, ItemListTemplate, TemplateError, TemplateSet};
use crate::try_log_error;

pub struct Channels {
    pub msg_sender: Sender<Message>,
    pub msg_receiver: Receiver<Message>,
}

impl Channels {
    fn new() -> Self {
        let (msg_sender, msg_receiver) = mpsc::channel();
        Self {
            msg_sender,
            msg_receiver,
        }
    }
}

/// One page and everything that reacts to it.
///
/// All state changes go through [`View::update`]. Background fetches report back on
/// `channels`; call [`View::handle_async_messages`] to apply them.
pub struct View {
    pub page: Page,
    option_filters: Vec<OptionFilter>,
    tag_filter: Option<TagFilter>,
    populator: Option<Populator>,
    attachments: Option<AttachmentList>,
    templates: TemplateSet,
    pub channels: Channels,
}

impl View {
    #[must_use]
    pub fn new(page: Page, templates: TemplateSet) -> Self {
        Self {
            page,
            option_filters: vec![],
            tag_filter: None,
            populator: None,
            attachments: None,
            templates,
            channels: Channels::new(),
        }
    }

    /// Attaches the behaviors `config` enables, fetching over HTTP.
    pub fn from_config(page: Page, config: &CasedeskConfig) -> Result<Self> {
        let source = HttpItemSource::from_config(&config.http)?;
        let mut view = config
            .option_filters
            .iter()
            .fold(Self::new(page, TemplateSet::default()), |view, options| {
                view.with_option_filter(options.clone())
            });
        if config.tags.enabled {
            view = view.with_tag_filter(config.tags.clone());
        }
        if config.populator.enabled {
            view = view.with_populator(config.populator.clone(), Arc::new(source))?;
        }
        Ok(view)
    }

    /// Snapshots the filter's target now. Pages without the target are left alone.
    #[must_use]
    pub fn with_option_filter(mut self, options: OptionFilterOptions) -> Self {
        match OptionFilter::new(options, &self.page) {
            Some(filter) => self.option_filters.push(filter),
            None => debug!("Filter target not on this page, skipping"),
        }
        self
    }

    #[must_use]
    pub fn with_tag_filter(mut self, options: TagFilterOptions) -> Self {
        self.tag_filter = Some(TagFilter::new(options));
        self
    }

    /// The built-in `case_select` template is rebuilt to store the item keys under
    /// the populator's `data_attr`.
    pub fn with_populator(
        mut self,
        options: PopulatorOptions,
        source: Arc<dyn ItemSource>,
    ) -> Result<Self, TemplateError> {
        if options.template == CASE_SELECT {
            self.templates
                .register(CASE_SELECT, ItemListTemplate::new(&options.data_attr));
        }
        self.populator = Some(Populator::new(
            options,
            &self.templates,
            source,
            self.channels.msg_sender.clone(),
        )?);
        Ok(self)
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: AttachmentList) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn option_filters(&self) -> &[OptionFilter] {
        &self.option_filters
    }

    pub fn populator(&self) -> Option<&Populator> {
        self.populator.as_ref()
    }

    pub fn attachments(&self) -> Option<&AttachmentList> {
        self.attachments.as_ref()
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn update(&mut self, message: Message) -> Option<()> {
        match message {
            Message::PageLoaded => {
                for filter in &mut self.option_filters {
                    let init = filter.init(&mut self.page);
                    trace!("Option filter on {} is {init:?}", filter.options().trigger_field);
                }
                let outcome = self.populator.as_mut()?.on_page_load(&mut self.page);
                debug!("Initial population: {outcome:?}");
            }
            Message::SelectOption { field, value } => {
                if !self.page.choose_option(&field, &value) {
                    return None;
                }
                self.trigger_changed(&field);
            }
            Message::SetInputValue { field, value } => {
                // Only select triggers are followed.
                self.page.set_input_value(&field, &value);
            }
            Message::SelectionFetched {
                revision,
                url,
                key,
                result,
            } => {
                let populator = self.populator.as_mut()?;
                let applied =
                    populator.handle_fetched(&mut self.page, revision, url, key, result);
                debug!("Fetch {revision} completed: {applied:?}, now {}", populator.state());
            }
            Message::AddAttachmentClicked => {
                let input = self.attachments.as_ref()?.click_add_label();
                debug!("Opening file picker of {input}");
            }
            Message::AttachmentChosen { input_id, path } => {
                try_log_error!(
                    self.attachments
                        .as_mut()?
                        .file_chosen(&input_id, &path, &self.templates),
                    format!("Failed to attach {path}")
                );
            }
            Message::AttachmentRemoveToggled { input_id } => {
                self.attachments.as_mut()?.remove_toggled(&input_id);
            }
        }
        Some(())
    }

    /// Option filters first, so the populator and the tag filter see the narrowed page.
    fn trigger_changed(&mut self, field: &str) {
        for filter in &mut self.option_filters {
            if filter.options().trigger_field == field {
                filter.on_trigger_changed(&mut self.page);
            }
        }
        if let Some(populator) = self.populator.as_mut()
            && populator.options().trigger_field == field
        {
            populator.on_trigger_changed(&mut self.page);
        }
        if let Some(tag_filter) = &self.tag_filter
            && tag_filter.trigger_field() == field
        {
            tag_filter.on_trigger_changed(&mut self.page);
        }
    }

    pub fn handle_async_messages(&mut self) {
        let mut msgs = vec![];
        loop {
            match self.channels.msg_receiver.try_recv() {
                Ok(msg) => msgs.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    trace!("Message sender disconnected");
                    break;
                }
            }
        }

        for msg in msgs {
            self.update(msg);
        }
    }

    /// Number of fetches whose completion has not been applied.
    pub fn outstanding_fetches(&self) -> usize {
        self.populator.as_ref().map_or(0, Populator::outstanding)
    }

    /// Applies completions until no fetch is outstanding. Returns false if that did
    /// not happen within `timeout`.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.outstanding_fetches() > 0 {
            let Some(remaining) = timeout.checked_sub(start.elapsed()) else {
                return false;
            };
            match self.channels.msg_receiver.recv_timeout(remaining) {
                Ok(msg) => {
                    self.update(msg);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        info!("All fetches applied after {:?}", start.elapsed());
        true
    }
}
