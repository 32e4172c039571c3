use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a page name and an attachment filename
pub const ATTACHMENT_SEPARATOR: char = '/';

/// Path identifying a page (and optionally one of its attachments)
///
/// Paths are case-preserving. Equality is exact; use
/// [`PagePath::eq_ignore_case`] where the wiki compares names loosely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PagePath(String);

impl PagePath {
    /// Create a path from its string form (surrounding whitespace is trimmed)
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.len() == path.len() {
            Self(path)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The page name, without any attachment suffix
    pub fn page_name(&self) -> &str {
        match self.0.find(ATTACHMENT_SEPARATOR) {
            Some(pos) => &self.0[..pos],
            None => &self.0,
        }
    }

    /// The attachment filename, if this path names an attachment
    pub fn attachment(&self) -> Option<&str> {
        self.0
            .find(ATTACHMENT_SEPARATOR)
            .map(|pos| &self.0[pos + 1..])
            .filter(|name| !name.is_empty())
    }

    pub fn is_attachment(&self) -> bool {
        self.attachment().is_some()
    }

    /// Case-insensitive comparison
    pub fn eq_ignore_case(&self, other: &PagePath) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PagePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PagePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for PagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A versioned unit of wiki content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique path of the page
    pub path: PagePath,

    /// Page body
    pub content: String,

    /// Version number, starting at 1
    pub version: u64,

    /// Last modification timestamp
    pub last_modified: DateTime<Utc>,

    /// Author of the latest version
    pub author: Option<String>,
}

impl Page {
    /// Create the first version of a page
    pub fn new(path: impl Into<PagePath>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            version: 1,
            last_modified: Utc::now(),
            author: None,
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set an explicit version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// The page name as shown to users (the full path, attachment included)
    pub fn name(&self) -> &str {
        self.path.as_str()
    }

    /// Produce the next version of this page with new content
    pub fn next_version(&self, content: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            content: content.into(),
            version: self.version + 1,
            last_modified: Utc::now(),
            author: self.author.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_split() {
        let path = PagePath::new("Main/diagram.png");
        assert_eq!(path.page_name(), "Main");
        assert_eq!(path.attachment(), Some("diagram.png"));
        assert!(path.is_attachment());

        let plain = PagePath::new("Main");
        assert_eq!(plain.page_name(), "Main");
        assert_eq!(plain.attachment(), None);
    }

    #[test]
    fn test_trailing_separator_is_not_an_attachment() {
        let path = PagePath::new("Main/");
        assert_eq!(path.page_name(), "Main");
        assert!(!path.is_attachment());
    }

    #[test]
    fn test_case_handling() {
        let a = PagePath::new("FrontPage");
        let b = PagePath::new("frontpage");
        assert_ne!(a, b);
        assert!(a.eq_ignore_case(&b));
    }

    #[test]
    fn test_next_version() {
        let page = Page::new("Foo", "one").with_author("alice");
        let next = page.next_version("two");
        assert_eq!(next.version, 2);
        assert_eq!(next.content, "two");
        assert_eq!(next.author.as_deref(), Some("alice"));
    }
}
