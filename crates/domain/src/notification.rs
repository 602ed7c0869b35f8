use crate::listing::Listing;

/// A single outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

impl Notification {
    /// Build the new-posts notification: one `identity : title` line per
    /// post, in listing order.
    pub fn for_posts(subject: &str, recipient: &str, posts: &Listing) -> Self {
        Self {
            subject: subject.to_owned(),
            body: posts.summary(),
            recipient: recipient.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_lists_posts_in_order() {
        let mut posts = Listing::new();
        posts.insert("1001", "알바 공고");
        posts.insert("1003", "아르바이트 구함");

        let n = Notification::for_posts("새 게시글 알림", "me@example.com", &posts);
        assert_eq!(n.subject, "새 게시글 알림");
        assert_eq!(n.recipient, "me@example.com");
        assert_eq!(n.body, "1001 : 알바 공고\n1003 : 아르바이트 구함");
    }
}
