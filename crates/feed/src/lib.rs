//! Interest feed entries.
//!
//! An [`Entry`] is one item of a user's interests feed: something they want
//! to watch, are reading, or have listened to, with their rating. Entries are
//! produced fresh on every fetch by a [`FeedSource`]; the only fields ever
//! filled in afterwards are the two derived cover fields.

pub mod error;
mod models;
mod parse;
mod source;

pub use crate::models::{Category, Entry, Status};
pub use crate::parse::{parse_channel, parse_item};
pub use crate::source::{DoubanFeed, FeedSource};
