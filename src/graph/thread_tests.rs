use super::*;
use crate::graph::types::fixtures::comment;

fn layout_of(comments: Vec<Comment>) -> ThreadLayout {
    let mut layout = ThreadLayout::new(LayoutSettings::default());
    layout.construct_layout(comments);
    layout
}

fn branching() -> Vec<Comment> {
    vec![
        comment("R", None, 10, 0),
        comment("A", Some("R"), 5, 1),
        comment("B", Some("R"), 3, 2),
        comment("C", Some("A"), 1, 3),
    ]
}

fn ids(circles: &[&Circle]) -> Vec<String> {
    circles.iter().map(|c| c.id.clone()).collect()
}

#[test]
fn chain_example_is_one_nucleus() {
    let layout = layout_of(vec![
        comment("R", None, 10, 0),
        comment("A", Some("R"), 5, 1),
        comment("B", Some("A"), 2, 2),
    ]);
    assert_eq!(layout.geometry().rings.len(), 1);
    let nucleus = layout.ring("R").unwrap();
    assert!(nucleus.is_nucleus);
    assert!(nucleus.peripherals.is_empty());
    assert_eq!(ids(&layout.members_of_ring("R").unwrap()), ["R", "A", "B"]);
}

#[test]
fn branch_example_peels_peripheral() {
    let layout = layout_of(branching());
    assert_eq!(ids(&layout.members_of_ring("R").unwrap()), ["R", "B"]);
    assert_eq!(ids(&layout.members_of_ring("A").unwrap()), ["A", "C"]);

    let peripheral = layout.ring("A").unwrap();
    assert_eq!(peripheral.parent_ring, Some(layout.ring("R").unwrap().index));
    assert_eq!(layout.ring_of("C").map(|r| r.id.as_str()), Some("A"));
    assert_eq!(layout.pivot_of("C").map(|c| c.id.as_str()), Some("A"));
    assert_eq!(layout.pivot_of("B").map(|c| c.id.as_str()), Some("R"));
}

#[test]
fn bucket_accessors_aggregate_likes() {
    let layout = layout_of(branching());
    assert_eq!(layout.like_count("A"), Some(5));
    assert_eq!(layout.ring_like_count("R"), Some(13));
    assert_eq!(layout.ring_like_count("A"), Some(6));
    assert_eq!(layout.bucket_like_count("R"), Some(19));
    assert_eq!(
        ids(&layout.members_of_bucket("R").unwrap()),
        ["R", "A", "B", "C"]
    );
}

#[test]
fn lookup_misses_are_none() {
    let mut layout = layout_of(branching());
    assert!(layout.circle("nope").is_none());
    assert!(layout.ring("C").is_none());
    assert!(layout.members_of_bucket("A").is_none());
    assert!(layout.like_count("nope").is_none());
    assert!(layout.select(Some("nope")).is_none());
    assert!(layout.selected().is_none());
}

#[test]
fn empty_comment_list_is_empty_layout() {
    let mut layout = layout_of(Vec::new());
    assert!(layout.geometry().is_empty());
    assert!(layout.set_progress(5).is_empty());
    assert_eq!(layout.progress(), -1);
    assert!(layout.snapshot().rings.is_empty());
}

#[test]
fn select_twice_only_rezooms() {
    let mut layout = layout_of(branching());
    let first = layout.select(Some("A")).unwrap();
    assert!(first
        .iter()
        .any(|e| matches!(e, LayoutEvent::SelectionChanged { .. })));

    let rings_before = layout.geometry().rings.len();
    let second = layout.select(Some("A")).unwrap();
    assert_eq!(second.len(), 1);
    assert!(matches!(second[0], LayoutEvent::Zoom(_)));
    assert_eq!(layout.geometry().rings.len(), rings_before);

    let selected: Vec<&str> = layout
        .geometry()
        .rings
        .iter()
        .filter(|r| r.is_selected)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(selected, ["A"]);
}

#[test]
fn selecting_another_ring_moves_the_flag() {
    let mut layout = layout_of(branching());
    layout.select(Some("A"));
    layout.select(Some("R"));
    assert!(layout.ring("R").unwrap().is_selected);
    assert!(!layout.ring("A").unwrap().is_selected);

    let events = layout.select(None).unwrap();
    assert_eq!(events.len(), 1);
    assert!(layout.geometry().rings.iter().all(|r| !r.is_selected));
    assert!(layout.select(None).unwrap().is_empty());
}

#[test]
fn select_zoom_does_not_move_rings() {
    let mut layout = layout_of(branching());
    let before: Vec<Pos2> = layout.geometry().rings.iter().map(|r| r.pos).collect();
    layout.select(Some("R"));
    let after: Vec<Pos2> = layout.geometry().rings.iter().map(|r| r.pos).collect();
    assert_eq!(before, after);

    let ring = layout.ring("R").unwrap().pos;
    let viewport = Rect::from_min_size(
        Pos2::ZERO,
        egui::vec2(
            layout.settings().canvas_width,
            layout.settings().canvas_height,
        ),
    );
    let screen = layout.camera().to_screen(ring);
    assert!((screen - viewport.center()).length() < 1e-2);
}

#[test]
fn displayed_count_over_subset() {
    let mut layout = layout_of(branching());
    layout.set_progress(1);
    assert_eq!(layout.displayed_count(["R", "A", "B", "C"]), 2);
    assert_eq!(layout.displayed_count(["B", "C", "missing"]), 0);
}

#[test]
fn progress_round_trip_restores_initial_state() {
    let mut layout = layout_of(branching());
    layout.set_progress(3);
    assert_eq!(layout.displayed_count(["R", "A", "B", "C"]), 4);
    layout.set_progress(-1);
    assert!(layout.geometry().circles.iter().all(|c| !c.is_displayed));
    assert!(layout.geometry().rings.iter().all(|r| !r.is_displayed));
}

#[test]
fn rebuild_resets_overlays() {
    let mut layout = layout_of(branching());
    layout.set_progress(3);
    layout.select(Some("R"));
    layout.set_focused(["C"]);

    let events = layout.construct_layout(branching());
    assert!(matches!(events[0], LayoutEvent::Rebuilt { circles: 4, .. }));
    assert_eq!(layout.progress(), -1);
    assert!(layout.selected().is_none());
    assert!(layout.geometry().circles.iter().all(|c| !c.is_focused));
}

#[test]
fn index_at_time_finds_last_published() {
    let layout = layout_of(branching());
    let comments = &layout.geometry().comments;
    assert_eq!(layout.index_at_time(comments[2].published_at), 2);
    let before = comments[0].published_at - chrono::Duration::seconds(1);
    assert_eq!(layout.index_at_time(before), -1);
}

#[test]
fn orphans_show_up_in_snapshot() {
    let layout = layout_of(vec![
        comment("R", None, 1, 0),
        comment("X", Some("ghost"), 1, 1),
    ]);
    let snapshot = layout.snapshot();
    assert_eq!(snapshot.orphans, ["X"]);
    assert_eq!(snapshot.rings.len(), 2);
    assert!(snapshot.rings.iter().all(|r| r.parent.is_none()));
}

#[test]
fn ring_at_prefers_innermost() {
    let mut layout = layout_of(branching());
    layout.set_progress(3);
    let peripheral = layout.ring("A").unwrap().clone();
    let hit = layout.ring_at(peripheral.pos).unwrap();
    // The nucleus may also cover this point, but the smaller ring wins
    assert!(hit.radius <= peripheral.radius);
}

fn nested(id: &str, likes: u64, minute: i64, replies: Vec<Comment>) -> Comment {
    let mut c = comment(id, None, likes, minute);
    c.replies = replies;
    c
}

#[test]
fn nested_replies_are_flattened() {
    let thread = nested(
        "R",
        10,
        0,
        vec![
            nested("A", 5, 1, vec![nested("C", 1, 3, Vec::new())]),
            nested("B", 3, 2, Vec::new()),
        ],
    );
    let layout = layout_of(vec![thread]);

    assert_eq!(layout.geometry().circles.len(), 4);
    assert_eq!(ids(&layout.members_of_ring("R").unwrap()), ["R", "B"]);
    assert_eq!(ids(&layout.members_of_ring("A").unwrap()), ["A", "C"]);
    assert_eq!(layout.pivot_of("C").map(|c| c.id.as_str()), Some("A"));
}

#[test]
fn nested_chain_is_one_nucleus() {
    let thread = nested(
        "R",
        10,
        0,
        vec![nested("A", 5, 1, vec![nested("B", 2, 2, Vec::new())])],
    );
    let layout = layout_of(vec![thread]);
    assert_eq!(layout.geometry().rings.len(), 1);
    assert_eq!(ids(&layout.members_of_ring("R").unwrap()), ["R", "A", "B"]);
}

#[test]
fn unsorted_input_is_ordered_before_reveal() {
    let mut comments = branching();
    comments.reverse();
    let mut layout = layout_of(comments);

    let order: Vec<&str> = layout
        .geometry()
        .comments
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(order, ["R", "A", "B", "C"]);
    assert!(layout.geometry().orphans.is_empty());

    let third = layout.geometry().comments[2].published_at;
    assert_eq!(layout.index_at_time(third), 2);
    layout.set_progress(1);
    assert_eq!(layout.displayed_count(["R", "A"]), 2);
}
