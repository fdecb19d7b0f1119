//! Field derivation and scoring rules
//!
//! Pure functions invoked by the service layer before a write (slug,
//! reading time, excerpt) or at read time (engagement and popularity
//! scores). Nothing here touches the store and nothing derived by the
//! score functions is ever persisted.

const WORDS_PER_MINUTE: u32 = 200;
const SLUG_MAX_LEN: usize = 100;
const EXCERPT_LEN: usize = 160;
const MS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Derive a URL-safe slug from a title.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen, strips leading/trailing hyphens, truncates to 100
/// characters. Applied only when a post has no slug yet; slugs are sticky
/// across later edits.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(SLUG_MAX_LEN);
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Estimated reading time in minutes at 200 words per minute, rounded up.
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count() as u32;
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Derive an excerpt: markup tags stripped, first 160 characters, ellipsis
/// appended. Applied only when no explicit excerpt was supplied.
pub fn excerpt(content: &str) -> String {
    let stripped = strip_tags(content);
    let mut out: String = stripped.chars().take(EXCERPT_LEN).collect();
    out.push_str("...");
    out
}

/// Remove `<...>` markup tags, keeping text content.
fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Weighted engagement: likes*2 + comments*3 + views*0.1
pub fn engagement_score(likes_count: i64, comments_count: i64, views: i64) -> f64 {
    (likes_count * 2) as f64 + (comments_count * 3) as f64 + views as f64 * 0.1
}

/// Engagement normalized by age: score / max(days since published, 1).
///
/// Timestamps are Unix milliseconds; `now_ms` is passed in so the score is
/// deterministic under test.
pub fn popularity_score(
    likes_count: i64,
    comments_count: i64,
    views: i64,
    published_at_ms: i64,
    now_ms: i64,
) -> f64 {
    let days = (now_ms - published_at_ms) as f64 / MS_PER_DAY;
    engagement_score(likes_count, comments_count, views) / days.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World! 2024"), "hello-world-2024");
        assert_eq!(slugify("  --Rust & Tokio--  "), "rust-tokio");
        assert_eq!(slugify("plain"), "plain");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_truncates_to_100() {
        let title = "word ".repeat(40);
        let slug = slugify(&title);
        assert!(slug.len() <= 100);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_reading_time() {
        let content = "word ".repeat(400);
        assert_eq!(reading_time(&content), 2);
        assert_eq!(reading_time("one two three"), 1);
        assert_eq!(reading_time(""), 0);
        // 201 words rounds up to 2 minutes
        assert_eq!(reading_time(&"w ".repeat(201)), 2);
    }

    #[test]
    fn test_excerpt_is_160_chars_plus_ellipsis() {
        let content = "a".repeat(500);
        let e = excerpt(&content);
        assert_eq!(e.chars().count(), 163);
        assert!(e.ends_with("..."));
    }

    #[test]
    fn test_excerpt_strips_markup() {
        let e = excerpt("<p>Hello <b>there</b></p>");
        assert_eq!(e, "Hello there...");
    }

    #[test]
    fn test_engagement_score() {
        // 10 likes, 5 comments, 100 views -> 20 + 15 + 10
        assert_eq!(engagement_score(10, 5, 100), 45.0);
        assert_eq!(engagement_score(0, 0, 0), 0.0);
    }

    #[test]
    fn test_popularity_clamps_age_to_one_day() {
        let now = 1_700_000_000_000_i64;
        // Published an hour ago: divisor clamps to 1 day
        let hour = 60 * 60 * 1000;
        let fresh = popularity_score(10, 0, 0, now - hour, now);
        assert_eq!(fresh, 20.0);

        // Published 4 days ago: divisor is 4
        let four_days = 4 * 24 * hour;
        let aged = popularity_score(10, 0, 0, now - four_days, now);
        assert_eq!(aged, 5.0);
    }
}
