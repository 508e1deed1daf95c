use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// The role a scripted bot message plays in a response sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// An observation about what is moving in the market.
    Trend,
    /// A finding drawn from the (simulated) analytics.
    Insight,
    /// A suggested action, with hashtags and further reading.
    Recommendation,
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Trend => "trend",
            MessageKind::Insight => "insight",
            MessageKind::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A titled reference attached to a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Link {
    /// Text shown for the link.
    #[validate(length(min = 1))]
    pub title: String,
    /// Absolute URL the link points to.
    #[validate(url)]
    pub url: String,
}

impl Link {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Represents a single message within a conversation.
///
/// Messages are created once and never edited; the log only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The unique identifier for the message.
    pub id: Uuid,
    /// The text content of the message.
    pub text: String,
    /// The author of the message.
    pub sender: Sender,
    /// Role in a scripted sequence; `None` for user input and free-form bot text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
}

impl Message {
    fn new(text: String, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            sender,
            kind: None,
            created_at: Utc::now(),
            hashtags: None,
            links: None,
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Sender::User)
    }

    /// A free-form bot message, such as the session greeting.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text.into(), Sender::Bot)
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_hashtags(mut self, hashtags: Vec<String>) -> Self {
        self.hashtags = Some(hashtags);
        self
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}
