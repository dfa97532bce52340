use super::*;
use chrono::TimeZone;

fn comment(id: &str, author: &str, text: &str) -> Comment {
    Comment {
        id: id.into(),
        parent_id: None,
        author: author.into(),
        like_count: 0,
        published_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        text: text.into(),
        replies: Vec::new(),
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn search_matches_text_and_author_ignoring_case() {
    let comments = vec![
        comment("a", "Ferris", "crabs are great"),
        comment("b", "gopher", "Rust question"),
        comment("c", "someone", "hello"),
    ];
    assert_eq!(matching_comment_ids(&comments, "RUST"), ["b"]);
    assert_eq!(matching_comment_ids(&comments, "ferris"), ["a"]);
    assert_eq!(matching_comment_ids(&comments, " r"), ["a", "b"]);
}

#[test]
fn blank_search_matches_nothing() {
    let comments = vec![comment("a", "x", "text")];
    assert!(matching_comment_ids(&comments, "").is_empty());
    assert!(matching_comment_ids(&comments, "   ").is_empty());
}

#[test]
fn fraction_spans_first_to_last() {
    assert_eq!(fraction_at_time(at(0), at(100), at(0)), 0.0);
    assert_eq!(fraction_at_time(at(0), at(100), at(25)), 0.25);
    assert_eq!(fraction_at_time(at(0), at(100), at(500)), 1.0);
}

#[test]
fn single_instant_timeline_sits_at_end() {
    assert_eq!(fraction_at_time(at(5), at(5), at(5)), 1.0);
    assert_eq!(time_at_fraction(at(5), at(5), 0.3), at(5));
}

#[test]
fn time_at_fraction_inverts_fraction() {
    assert_eq!(time_at_fraction(at(0), at(100), 0.0), at(0));
    assert_eq!(time_at_fraction(at(0), at(100), 0.5), at(50));
    assert_eq!(time_at_fraction(at(0), at(100), 2.0), at(100));
}

#[test]
fn truncate_appends_ellipsis() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("abcdefgh", 3), "abc...");
}
