//! Feed-scoped identifiers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid feed-scoped identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid feed-scoped id: {reason}")]
pub struct InvalidFeedScopedId {
    reason: &'static str,
}

/// An identifier qualified by the feed it was loaded from.
///
/// The textual form is `feed:id`. Only the first colon separates the two
/// parts, so the local id may itself contain colons.
///
/// # Examples
///
/// ```
/// use transit_router::domain::FeedScopedId;
///
/// let id = FeedScopedId::parse("metro:T42").unwrap();
/// assert_eq!(id.feed_id(), "metro");
/// assert_eq!(id.id(), "T42");
/// assert_eq!(id.to_string(), "metro:T42");
///
/// assert!(FeedScopedId::parse("no-colon").is_err());
/// assert!(FeedScopedId::parse(":T42").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedScopedId {
    feed_id: Arc<str>,
    id: Arc<str>,
}

impl FeedScopedId {
    /// Create an id from its two parts.
    pub fn new(feed_id: &str, id: &str) -> Self {
        Self {
            feed_id: feed_id.into(),
            id: id.into(),
        }
    }

    /// Parse the `feed:id` form.
    pub fn parse(s: &str) -> Result<Self, InvalidFeedScopedId> {
        let (feed_id, id) = s.split_once(':').ok_or(InvalidFeedScopedId {
            reason: "expected feed:id",
        })?;

        if feed_id.is_empty() {
            return Err(InvalidFeedScopedId {
                reason: "feed id must not be empty",
            });
        }
        if id.is_empty() {
            return Err(InvalidFeedScopedId {
                reason: "id must not be empty",
            });
        }

        Ok(Self::new(feed_id, id))
    }

    /// Returns the feed part.
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Returns the local id part.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for FeedScopedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedScopedId({}:{})", self.feed_id, self.id)
    }
}

impl fmt::Display for FeedScopedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feed_id, self.id)
    }
}

impl TryFrom<String> for FeedScopedId {
    type Error = InvalidFeedScopedId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeedScopedId> for String {
    fn from(value: FeedScopedId) -> Self {
        value.to_string()
    }
}

/// Creates identifiers for one feed.
///
/// Every graph construction call that mints ids takes a factory
/// explicitly, so two graphs built from different feeds never share
/// ambient state.
#[derive(Debug, Clone)]
pub struct IdFactory {
    feed_id: Arc<str>,
}

impl IdFactory {
    /// Create a factory for the given feed.
    pub fn new(feed_id: &str) -> Self {
        Self {
            feed_id: feed_id.into(),
        }
    }

    /// Returns the feed this factory scopes ids to.
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Create an id in this factory's feed.
    pub fn create(&self, id: &str) -> FeedScopedId {
        FeedScopedId {
            feed_id: Arc::clone(&self.feed_id),
            id: id.into(),
        }
    }
}
