//! Model types: input comments, Circles, Rings and Buckets.

use chrono::{DateTime, Utc};
use egui::{Color32, Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// A comment as delivered by the upstream data layer.
///
/// Either flat (replies point at their parent through `parent_id`) or
/// pre-nested through `replies`; [`flatten_comments`] normalizes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub author: String,
    #[serde(default)]
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

/// Hoist nested replies into one flat list and sort it chronologically.
///
/// Replies inherit their container's id as `parent_id` when they do not
/// declare one. The sort is stable, so equal timestamps keep input order.
pub fn flatten_comments(comments: Vec<Comment>) -> Vec<Comment> {
    let mut flat = Vec::with_capacity(comments.len());
    let mut stack: Vec<(Comment, Option<String>)> =
        comments.into_iter().rev().map(|c| (c, None)).collect();

    while let Some((mut comment, container)) = stack.pop() {
        if comment.parent_id.is_none() {
            comment.parent_id = container;
        }
        let replies = std::mem::take(&mut comment.replies);
        let id = comment.id.clone();
        flat.push(comment);
        for reply in replies.into_iter().rev() {
            stack.push((reply, Some(id.clone())));
        }
    }

    flat.sort_by_key(|c| c.published_at);
    flat
}

/// Read a JSON array of comments (flat or nested) from disk
pub fn load_comments(path: &Path) -> Result<Vec<Comment>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let comments: Vec<Comment> = serde_json::from_str(&contents)?;
    Ok(flatten_comments(comments))
}

/// Visual unit for one comment.
///
/// `index` is the comment's chronological position and doubles as its index
/// into [`Geometry::circles`] and [`Geometry::comments`].
#[derive(Debug, Clone)]
pub struct Circle {
    pub index: usize,
    /// Comment id
    pub id: String,
    pub radius: f32,
    pub color: Color32,
    /// Direct replies, chronological
    pub children: Vec<usize>,
    /// Predecessor in the ring chain; `None` for the pivot
    pub inner_parent: Option<usize>,
    pub ring: usize,
    pub is_pivot: bool,
    pub is_displayed: bool,
    pub is_highlighted: bool,
    pub is_focused: bool,
}

impl Circle {
    pub(crate) fn new(index: usize, comment: &Comment) -> Self {
        Self {
            index,
            id: comment.id.clone(),
            radius: 0.0,
            color: author_color(&comment.author),
            children: Vec::new(),
            inner_parent: None,
            ring: 0,
            is_pivot: false,
            is_displayed: false,
            is_highlighted: false,
            is_focused: false,
        }
    }
}

/// A maximal unbranched chain of Circles sharing one pivot
#[derive(Debug, Clone)]
pub struct Ring {
    pub index: usize,
    /// Same as the pivot's comment id
    pub id: String,
    pub pivot: usize,
    /// Chain order, pivot first
    pub members: Vec<usize>,
    pub pos: Pos2,
    pub velocity: Vec2,
    /// Largest member radius
    pub radius: f32,
    pub peripherals: Vec<usize>,
    pub bucket: usize,
    pub bucket_root_id: String,
    pub parent_ring: Option<usize>,
    /// Number of branching points between this ring and its nucleus
    pub depth: usize,
    pub is_nucleus: bool,
    pub is_selected: bool,
    pub is_focused: bool,
    pub is_displayed: bool,
}

/// All rings descending from one top-level comment
#[derive(Debug, Clone)]
pub struct Bucket {
    pub index: usize,
    /// Top-level comment id
    pub root_id: String,
    pub nucleus: usize,
    /// Every ring in the bucket, nucleus first
    pub rings: Vec<usize>,
}

/// The full model for one post: comments, circles, rings and lookups
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Chronological, flat
    pub comments: Vec<Comment>,
    pub circles: Vec<Circle>,
    pub rings: Vec<Ring>,
    pub buckets: Vec<Bucket>,
    pub circle_ids: HashMap<String, usize>,
    pub ring_ids: HashMap<String, usize>,
    /// Comments re-rooted because their parent was not found in scan order
    pub orphans: Vec<usize>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    pub fn circle_by_id(&self, id: &str) -> Option<&Circle> {
        self.circle_ids.get(id).map(|&i| &self.circles[i])
    }

    pub fn ring_by_id(&self, id: &str) -> Option<&Ring> {
        self.ring_ids.get(id).map(|&i| &self.rings[i])
    }

    /// Position of a circle: circles sit at their ring's center
    pub fn circle_pos(&self, index: usize) -> Option<Pos2> {
        let circle = self.circles.get(index)?;
        Some(self.rings[circle.ring].pos)
    }

    /// Ring indices of a ring's subtree, the ring itself first
    pub fn ring_subtree(&self, ring: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![ring];
        while let Some(r) = stack.pop() {
            out.push(r);
            stack.extend(self.rings[r].peripherals.iter().rev());
        }
        out
    }
}

/// 64-bit FNV-1a; stable across builds, unlike the std hasher
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Hue in degrees for an author name
pub fn author_hue(author: &str) -> f32 {
    (fnv1a(author.as_bytes()) % 360) as f32
}

/// Deterministic color for an author name
pub fn author_color(author: &str) -> Color32 {
    hsl_to_rgb(author_hue(author), 0.65, 0.55)
}

/// Convert HSL to RGB color
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Color32 {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Color32::from_rgb(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}


#[cfg(test)]
mod tests {
    use super::fixtures::comment;
    use super::*;

    #[test]
    fn flatten_hoists_nested_replies() {
        let mut root = comment("R", None, 3, 0);
        let mut a = comment("A", None, 1, 1);
        a.replies.push(comment("B", None, 0, 3));
        root.replies.push(a);
        root.replies.push(comment("C", None, 0, 2));

        let flat = flatten_comments(vec![root]);
        let ids: Vec<&str> = flat.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["R", "A", "C", "B"]);
        assert_eq!(flat[1].parent_id.as_deref(), Some("R"));
        assert_eq!(flat[3].parent_id.as_deref(), Some("A"));
        assert!(flat.iter().all(|c| c.replies.is_empty()));
    }

    #[test]
    fn flatten_keeps_declared_parent() {
        let mut root = comment("R", None, 0, 0);
        root.replies.push(comment("X", Some("elsewhere"), 0, 1));
        let flat = flatten_comments(vec![root]);
        assert_eq!(flat[1].parent_id.as_deref(), Some("elsewhere"));
    }

    #[test]
    fn flatten_sort_is_stable() {
        let flat = flatten_comments(vec![
            comment("first", None, 0, 5),
            comment("second", None, 0, 5),
            comment("early", None, 0, 1),
        ]);
        let ids: Vec<&str> = flat.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["early", "first", "second"]);
    }

    #[test]
    fn author_color_is_deterministic() {
        assert_eq!(author_color("alice"), author_color("alice"));
    }

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn author_hue_is_pinned() {
        assert_eq!(author_hue("alice"), 23.0);
        assert_eq!(author_hue("bob"), 252.0);
    }

    #[test]
    fn parses_minimal_json() {
        let json = r#"[{"id":"1","author":"a","published_at":"2024-01-01T00:00:00Z"}]"#;
        let comments: Vec<Comment> = serde_json::from_str(json).unwrap();
        assert_eq!(comments[0].like_count, 0);
        assert!(comments[0].parent_id.is_none());
    }
}
