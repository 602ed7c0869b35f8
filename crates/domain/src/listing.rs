//! Bulletin listing model: an insertion-ordered map of post identity to title.

use indexmap::IndexMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Post
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single bulletin entry.  `id` is non-empty; `title` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
}

impl Post {
    /// The `identity : title` line used in notification bodies.
    pub fn summary_line(&self) -> String {
        format!("{} : {}", self.id, self.title)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Listing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Mapping of post identity → title, iterated in first-insertion order.
///
/// Re-inserting an identity replaces its title but keeps its original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    posts: IndexMap<String, String>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite.  Returns the previous title when `id` was
    /// already present.
    pub fn insert(&mut self, id: impl Into<String>, title: impl Into<String>) -> Option<String> {
        self.posts.insert(id.into(), title.into())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.posts.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.posts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.posts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.posts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn posts(&self) -> impl Iterator<Item = Post> + '_ {
        self.iter().map(|(id, title)| Post {
            id: id.to_owned(),
            title: title.to_owned(),
        })
    }

    /// Entries whose title matches `filter`, in listing order.
    pub fn matching(&self, filter: &KeywordFilter) -> Listing {
        self.iter()
            .filter(|(_, title)| filter.matches(title))
            .map(|(id, title)| (id.to_owned(), title.to_owned()))
            .collect()
    }

    /// Newline-joined `identity : title` lines in listing order.
    pub fn summary(&self) -> String {
        self.posts()
            .map(|p| p.summary_line())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<(String, String)> for Listing {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut listing = Listing::new();
        for (id, title) in iter {
            listing.insert(id, title);
        }
        listing
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Keyword filter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Case-sensitive substring match, OR across keywords.
///
/// An empty keyword set matches nothing.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> KeywordFilter {
        KeywordFilter::new(["알바", "아르바이트"])
    }

    #[test]
    fn keyword_matches_substring() {
        assert!(jobs().matches("알바 모집합니다"));
        assert!(jobs().matches("주말 아르바이트 구해요"));
    }

    #[test]
    fn keyword_rejects_unrelated_title() {
        assert!(!jobs().matches("동아리 공지"));
        assert!(!jobs().matches(""));
    }

    #[test]
    fn keyword_match_is_case_sensitive() {
        let filter = KeywordFilter::new(["Job"]);
        assert!(filter.matches("Part-time Job"));
        assert!(!filter.matches("part-time job"));
    }

    #[test]
    fn empty_keyword_set_matches_nothing() {
        let filter = KeywordFilter::new(Vec::<String>::new());
        assert!(!filter.matches("알바"));
        // Blank entries are dropped rather than matching everything.
        let filter = KeywordFilter::new([""]);
        assert!(filter.keywords().is_empty());
        assert!(!filter.matches("anything"));
    }

    #[test]
    fn reinsert_keeps_position_and_takes_last_title() {
        let mut listing = Listing::new();
        listing.insert("1", "first");
        listing.insert("2", "second");
        assert_eq!(listing.insert("1", "replaced"), Some("first".into()));

        let ids: Vec<&str> = listing.ids().collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(listing.get("1"), Some("replaced"));
    }

    #[test]
    fn matching_preserves_order() {
        let listing: Listing = [
            ("3", "알바 A"),
            ("1", "공지"),
            ("2", "아르바이트 B"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        let matched = listing.matching(&jobs());
        assert_eq!(matched.ids().collect::<Vec<_>>(), vec!["3", "2"]);
        assert_eq!(matched.summary(), "3 : 알바 A\n2 : 아르바이트 B");
    }

    #[test]
    fn summary_of_empty_listing_is_empty() {
        assert_eq!(Listing::new().summary(), "");
    }
}
