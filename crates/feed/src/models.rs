use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// What kind of subject an entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Unknown,
    MovieOrTv,
    Book,
    Music,
    Game,
}
impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MovieOrTv => "movie_or_tv",
            Self::Book => "book",
            Self::Music => "music",
            Self::Game => "game",
        }
    }

    /// Category implied by the verb in a feed action ("想看", "在读", ...).
    pub fn from_action(action: &str) -> Self {
        if action.contains('看') {
            Self::MovieOrTv
        } else if action.contains('读') {
            Self::Book
        } else if action.contains('听') {
            Self::Music
        } else if action.contains('玩') {
            Self::Game
        } else {
            Self::Unknown
        }
    }
}
impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The user's relationship to a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Unknown,
    /// Wants to watch/read/listen/play.
    Future,
    /// Currently watching/reading/listening/playing.
    Now,
    /// Has watched/read/listened/played.
    Past,
}
impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Future => "future",
            Self::Now => "now",
            Self::Past => "past",
        }
    }

    /// Status implied by the tense marker in a feed action.
    pub fn from_action(action: &str) -> Self {
        if action.contains('想') {
            Self::Future
        } else if action.contains('在') {
            Self::Now
        } else if action.contains('过') {
            Self::Past
        } else {
            Self::Unknown
        }
    }
}
impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One feed item, as persisted in the index file.
///
/// Field names are part of the index file format consumed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    pub subject_id: u64,
    /// Display title with the action prefix stripped.
    pub title: String,
    /// Remote cover image URL at fetch time.
    pub cover_source_url: String,
    pub link: String,
    pub category: Category,
    pub status: Status,
    /// 0 (unrated) to 5.
    pub rating: u8,
    /// Unix timestamp, seconds.
    pub pub_date: i64,
    /// Public URL of the locally cached cover; empty until resolved.
    #[serde(default)]
    pub ext_cover_url: String,
    /// Content digest of the locally cached cover; empty until resolved.
    #[serde(default)]
    pub ext_cover_hash: String,
}
impl Entry {
    /// File name the cover is cached under: the last path segment of
    /// [`cover_source_url`](Self::cover_source_url), ignoring any query
    /// string or fragment.
    ///
    /// Returns `None` when the URL has no usable final segment.
    ///
    /// ```
    /// use shelf_feed::Entry;
    /// let entry = Entry {
    ///     cover_source_url: "https://img9.doubanio.com/view/photo/s_ratio_poster/public/p2558480666.webp".into(),
    ///     ..Entry::default()
    /// };
    /// assert_eq!(entry.cover_file_name(), Some("p2558480666.webp"));
    /// assert_eq!(Entry::default().cover_file_name(), None);
    /// ```
    pub fn cover_file_name(&self) -> Option<&str> {
        let url = self.cover_source_url.trim();
        let url = url.split(['?', '#']).next().unwrap_or(url);
        let name = url.rsplit('/').next()?;
        match name {
            "" | "." | ".." => None,
            name if name.contains('\\') || name.contains('\0') => None,
            name => Some(name),
        }
    }

    /// Whether both derived cover fields have been resolved.
    pub fn is_resolved(&self) -> bool {
        !self.ext_cover_url.is_empty() && !self.ext_cover_hash.is_empty()
    }

    /// Clears the derived cover fields.
    pub fn clear_derived(&mut self) {
        self.ext_cover_url.clear();
        self.ext_cover_hash.clear();
    }
}
