//! Client-side behaviors of the product management forms: cascading option filters,
//! facet checkboxes, product tag filtering, cached population of the dual-list item
//! widget and the case attachment editor.
pub mod async_util;
pub mod attachments;
pub mod config;
pub mod facet_filter;
pub mod logs;
pub mod message;
pub mod option_filter;
pub mod page;
pub mod populator;
pub mod tag_filter;
pub mod template;
pub mod view;

pub use casedesk_wire as wire;

pub use config::CasedeskConfig;
pub use message::Message;
pub use page::Page;
pub use view::View;
