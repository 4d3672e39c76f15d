use std::{fmt, sync::LazyLock};

use percent_encoding::percent_decode_str;
use regex::Regex;

/// A wiki page identified by its title and the language edition it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRef {
    pub title: String,
    // language code, selects the `<language>.wikipedia.org` endpoint
    pub language: String,
}

impl PageRef {
    pub fn new(title: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            language: language.into(),
        }
    }

    /// Decompose a page URL of the form `https://<language>.wikipedia.org/wiki/<title>`.
    ///
    /// Returns `None` for anything that does not have that shape. The mobile host
    /// (`<language>.m.wikipedia.org`) is accepted as well; query strings and fragments are dropped.
    /// Percent-escapes in the title are decoded, so `Caf%C3%A9` becomes `Café`.
    ///
    /// ```
    /// use wikipersist::page::PageRef;
    ///
    /// let page = PageRef::from_url("https://fr.wikipedia.org/wiki/Anne_Conway").unwrap();
    /// assert_eq!(page, PageRef::new("Anne_Conway", "fr"));
    /// assert_eq!(PageRef::from_url("https://example.org/wiki/Anne_Conway"), None);
    /// ```
    pub fn from_url(url: &str) -> Option<Self> {
        static REGEX_WIKI_URL: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(?:https?://)?([A-Za-z0-9-]+)(?:\.m)?\.wikipedia\.org/wiki/([^?#]+)")
                .unwrap()
        });

        let captures = REGEX_WIKI_URL.captures(url.trim())?;
        let language = captures.get(1)?.as_str();
        // the request layer encodes the title again
        let title = percent_decode_str(captures.get(2)?.as_str()).decode_utf8().ok()?;

        Some(Self::new(title, language.to_ascii_lowercase()))
    }

    /// Base URL of the Action API serving this page, built from a template containing `{lang}`.
    pub fn endpoint(&self, template: &str) -> String {
        template.replace("{lang}", &self.language)
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.language)
    }
}
