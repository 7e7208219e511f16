//! Deep-link parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical reference to a message inside a channel or chat.
///
/// `scope` is the channel part of a `t.me` link with the private `c/`
/// marker already stripped: either a public username or the bare numeric id
/// of a private channel. `message_id` is always >= 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLocator {
    pub scope: String,
    pub message_id: i32,
}

#[allow(clippy::expect_used)]
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://t\.me/(?:c/)?([^/\s]+)/(\d+)").expect("static link pattern")
});

/// Find the first message link in `text`.
///
/// The scan is a substring match anywhere in the text; a candidate whose
/// message id does not fit an `i32 >= 1` is skipped and the scan continues.
/// `None` simply means "not a link", never an error.
pub fn resolve_link(text: &str) -> Option<MessageLocator> {
    LINK_RE.captures_iter(text).find_map(|caps| {
        let scope = caps.get(1)?.as_str();
        let message_id: i32 = caps.get(2)?.as_str().parse().ok()?;
        (message_id >= 1).then(|| MessageLocator { scope: scope.to_owned(), message_id })
    })
}

// ── tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://t.me/mychan/42", Some(("mychan", 42)))]
    #[case("grab this https://t.me/mychan/42 please", Some(("mychan", 42)))]
    #[case("https://t.me/c/123456/77", Some(("123456", 77)))]
    #[case("HTTP://T.me/MyChan/9", Some(("MyChan", 9)))]
    #[case("hello world", None)]
    #[case("t.me/mychan/42", None)]
    #[case("https://t.me/mychan/abc", None)]
    #[case("https://t.me/mychan", None)]
    #[case("https://t.me/chan/0", None)]
    fn resolves_message_links(#[case] text: &str, #[case] expected: Option<(&str, i32)>) {
        let locator = resolve_link(text);
        assert_eq!(
            locator.map(|l| (l.scope, l.message_id)),
            expected.map(|(scope, id)| (scope.to_owned(), id)),
            "input: {text}",
        );
    }

    #[test]
    fn first_match_wins() {
        let locator = resolve_link("https://t.me/first/1 https://t.me/second/2").unwrap();
        assert_eq!(locator.scope, "first");
        assert_eq!(locator.message_id, 1);
    }

    #[test]
    fn invalid_candidates_are_skipped() {
        // A zero id and an id too large for i32 are both passed over in
        // favour of the next parsable link.
        let locator =
            resolve_link("https://t.me/a/0 https://t.me/b/99999999999 https://t.me/c/3").unwrap();
        assert_eq!(locator.scope, "c");
        assert_eq!(locator.message_id, 3);
    }

    #[test]
    fn equal_inputs_resolve_to_equal_locators() {
        let text = "https://t.me/news/5";
        assert_eq!(resolve_link(text), resolve_link(text));
    }
}
