//! Item parsing for the interests RSS feed.
//!
//! Each `<item>` looks like this:
//!
//! ```xml
//! <item>
//!   <title>在看三国演义</title>
//!   <link>https://movie.douban.com/subject/1830528/</link>
//!   <description><![CDATA[<table><tr><td width="80px"><a href="https://movie.douban.com/subject/1830528/" title="三国演义"><img src="https://img9.doubanio.com/view/photo/s_ratio_poster/public/p2558480666.webp" alt="三国演义"></a></td><td><p>推荐: 力荐</p></td></tr></table>]]></description>
//!   <pubDate>Thu, 27 Mar 2025 05:23:24 GMT</pubDate>
//! </item>
//! ```
//!
//! The first two characters of the title are the action ("在看": currently
//! watching), the rest is the subject's title.

use crate::error::{ErrorKind, Result};
use crate::models::{Category, Entry, Status};
use exn::{OptionExt, ResultExt};
use regex::Regex;
use rss::{Channel, Item};
use std::sync::LazyLock;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use tracing::instrument;

static SUBJECT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"subject/(\d+)").unwrap());
static COVER_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(https://[^"]+\.(jpg|png|webp))""#).unwrap());

/// Length of the action prefix at the start of every item title, in
/// characters.
const ACTION_LENGTH: usize = 2;

/// Rating phrases, in order of the rating they map to (1 to 5).
const RATINGS: [&str; 5] = ["推荐: 很差", "推荐: 较差", "推荐: 还行", "推荐: 推荐", "推荐: 力荐"];

/// Parses a raw RSS document into entries, preserving item order.
///
/// # Errors
/// - [`Malformed`](ErrorKind::Malformed) if the document isn't RSS.
/// - [`MissingItems`](ErrorKind::MissingItems) if the channel has no items.
/// - [`ParseError`](ErrorKind::ParseError) if any item fails to parse.
#[instrument(skip(body), fields(body_size = body.len()))]
pub fn parse_channel(body: &[u8], source: &str) -> Result<Vec<Entry>> {
    let channel = Channel::read_from(body).map_err(|e| ErrorKind::Malformed(e.to_string()))?;
    if channel.items().is_empty() {
        exn::bail!(ErrorKind::MissingItems(source.to_string()));
    }
    channel.items().iter().map(parse_item).collect()
}

/// Parses a single feed item into an [`Entry`] with unresolved derived
/// fields.
pub fn parse_item(item: &Item) -> Result<Entry> {
    let raw_title = item.title().unwrap_or_default().trim();
    let description = item.description().unwrap_or_default();
    let action: String = raw_title.chars().take(ACTION_LENGTH).collect();
    let title: String = raw_title.chars().skip(ACTION_LENGTH).collect();

    Ok(Entry {
        subject_id: subject_id(description)?,
        title,
        cover_source_url: cover(description),
        link: item.link().unwrap_or_default().to_string(),
        category: Category::from_action(&action),
        status: Status::from_action(&action),
        rating: rating(description),
        pub_date: pub_date(item.pub_date())?,
        ..Entry::default()
    })
}

fn subject_id(description: &str) -> Result<u64> {
    let Some(captures) = SUBJECT_ID.captures(description) else {
        return Ok(0);
    };
    let digits = &captures[1];
    digits.parse::<u64>().or_raise(|| ErrorKind::ParseError {
        field: "subject_id",
        value: digits.to_string(),
    })
}

fn cover(description: &str) -> String {
    COVER_SRC.captures(description).map(|c| c[1].to_string()).unwrap_or_default()
}

fn rating(description: &str) -> u8 {
    RATINGS
        .iter()
        .position(|phrase| description.contains(phrase))
        .map(|index| index as u8 + 1)
        .unwrap_or(0)
}

fn pub_date(raw: Option<&str>) -> Result<i64> {
    let raw = raw.map(str::trim).ok_or_raise(|| ErrorKind::ParseError {
        field: "pub_date",
        value: String::new(),
    })?;
    let parsed = OffsetDateTime::parse(raw, &Rfc2822).or_raise(|| ErrorKind::ParseError {
        field: "pub_date",
        value: raw.to_string(),
    })?;
    Ok(parsed.unix_timestamp())
}
