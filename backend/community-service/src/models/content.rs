use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a tip or warning text.
pub const MAX_TEXT_LEN: usize = 2000;
/// Maximum length of a photo caption.
pub const MAX_CAPTION_LEN: usize = 500;

/// Store-assigned content identifier. Allocated once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Tip,
    Warning,
    Photo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Tip => "tip",
            ContentKind::Warning => "warning",
            ContentKind::Photo => "photo",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentKind::Tip | ContentKind::Warning)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    /// Exact-match token; `"Tip"` is not a kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tip" => Ok(ContentKind::Tip),
            "warning" => Ok(ContentKind::Warning),
            "photo" => Ok(ContentKind::Photo),
            other => Err(format!("unknown content kind '{}'", other)),
        }
    }
}

/// Payload of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ContentBody {
    Text {
        text: String,
    },
    /// Reference to media already uploaded to the blob store.
    Photo {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl ContentBody {
    /// Checks the body against the kind it is submitted under.
    pub fn validate_for(&self, kind: ContentKind) -> Result<(), String> {
        match (kind.is_text(), self) {
            (true, ContentBody::Text { text }) => {
                if text.trim().is_empty() {
                    return Err(format!("{} body must not be empty", kind));
                }
                if text.chars().count() > MAX_TEXT_LEN {
                    return Err(format!(
                        "{} body exceeds {} characters",
                        kind, MAX_TEXT_LEN
                    ));
                }
                Ok(())
            }
            (false, ContentBody::Photo { url, caption }) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err("photo media url must not be empty".to_string());
                }
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err("photo media url must be http(s)".to_string());
                }
                if caption
                    .as_ref()
                    .map_or(false, |c| c.chars().count() > MAX_CAPTION_LEN)
                {
                    return Err(format!("caption exceeds {} characters", MAX_CAPTION_LEN));
                }
                Ok(())
            }
            (true, ContentBody::Photo { .. }) => {
                Err(format!("{} requires a text body, got photo", kind))
            }
            (false, ContentBody::Text { .. }) => {
                Err("photo requires a media url, got text".to_string())
            }
        }
    }
}

/// A single community contribution attached to one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub city_id: String,
    pub kind: ContentKind,
    pub author_id: String,
    pub author_display_name: String,
    pub created_at: DateTime<Utc>,
    pub body: ContentBody,
    pub upvote_count: u64,
    pub verified: bool,
    /// Bumped on every accepted mutation.
    pub version: u64,
}
