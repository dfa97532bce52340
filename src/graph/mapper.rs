//! Geometry mapper: comments -> Circle forest -> Ring trees.
//!
//! A ring is a pivot plus the unbranched chain hanging off it. Where the
//! chain branches, replies that have replies of their own are peeled off
//! into peripheral rings; leaf replies stay in the ring. Ring tree depth
//! therefore follows branching points, not reply depth.

use std::collections::{HashMap, VecDeque};

use egui::{Pos2, Vec2};

use super::types::{flatten_comments, Bucket, Circle, Comment, Geometry, Ring};

/// Square-root scale from like counts to radii
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusScale {
    sqrt_min: f32,
    sqrt_max: f32,
    min_radius: f32,
    max_radius: f32,
}

impl RadiusScale {
    pub fn new(min_likes: u64, max_likes: u64, min_radius: f32, max_radius: f32) -> Self {
        Self {
            sqrt_min: (min_likes as f32).sqrt(),
            sqrt_max: (max_likes as f32).sqrt(),
            min_radius,
            max_radius,
        }
    }

    /// Domain spans the like counts of the whole comment set
    pub fn for_comments(comments: &[Comment], min_radius: f32, max_radius: f32) -> Self {
        let min = comments.iter().map(|c| c.like_count).min().unwrap_or(0);
        let max = comments.iter().map(|c| c.like_count).max().unwrap_or(0);
        Self::new(min, max, min_radius, max_radius)
    }

    pub fn radius(&self, likes: u64) -> f32 {
        let span = self.sqrt_max - self.sqrt_min;
        // Degenerate domain maps to the middle of the range
        let t = if span > 0.0 {
            ((likes as f32).sqrt() - self.sqrt_min) / span
        } else {
            0.5
        };
        self.min_radius + t * (self.max_radius - self.min_radius)
    }
}

/// Circles linked by the reply relation, before ring decomposition
#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub circles: Vec<Circle>,
    /// Thread roots in chronological order
    pub roots: Vec<usize>,
    pub ids: HashMap<String, usize>,
    /// Replies whose parent was not seen before them in the scan
    pub orphans: Vec<usize>,
}

/// Single chronological pass turning comments into a Circle forest.
///
/// A reply whose parent id has not been seen yet is demoted to a root. This
/// keeps the thread renderable but is logged, since it usually means the input
/// was not sorted.
pub fn build_forest(comments: &[Comment]) -> Forest {
    let mut forest = Forest {
        circles: Vec::with_capacity(comments.len()),
        ..Default::default()
    };

    for (index, comment) in comments.iter().enumerate() {
        forest.circles.push(Circle::new(index, comment));

        if forest.ids.contains_key(&comment.id) {
            tracing::warn!(id = %comment.id, "duplicate comment id, lookups resolve to the first");
        } else {
            forest.ids.insert(comment.id.clone(), index);
        }

        let parent = comment
            .parent_id
            .as_deref()
            .and_then(|pid| forest.ids.get(pid).copied())
            .filter(|&p| p != index);

        match parent {
            Some(p) => forest.circles[p].children.push(index),
            None => {
                if let Some(pid) = comment.parent_id.as_deref() {
                    tracing::warn!(
                        id = %comment.id,
                        parent = %pid,
                        "parent not found before reply, treating it as a thread root"
                    );
                    forest.orphans.push(index);
                }
                forest.roots.push(index);
            }
        }
    }

    forest
}

/// Walk one chain starting at `pivot`.
///
/// Returns the ring members in chain order and the replies to peel off as
/// peripheral pivots.
fn walk_chain(circles: &[Circle], pivot: usize) -> (Vec<usize>, Vec<usize>) {
    let mut members = vec![pivot];
    let mut peeled = Vec::new();
    let mut cursor = pivot;

    loop {
        let children = &circles[cursor].children;
        if let [only] = children.as_slice() {
            members.push(*only);
            cursor = *only;
            continue;
        }

        for &child in children {
            if circles[child].children.is_empty() {
                members.push(child);
            } else {
                peeled.push(child);
            }
        }
        return (members, peeled);
    }
}

/// Decompose every thread root of `forest` into a bucket of rings.
///
/// A peripheral pivot's radius offset restarts at zero: its radius is its own
/// scaled like count, not the parent chain's accumulated radius.
pub fn decompose_rings(comments: Vec<Comment>, forest: Forest, scale: &RadiusScale) -> Geometry {
    let Forest {
        mut circles,
        roots,
        ids,
        orphans,
    } = forest;

    let mut rings: Vec<Ring> = Vec::new();
    let mut buckets: Vec<Bucket> = Vec::with_capacity(roots.len());
    let mut ring_ids = HashMap::new();

    for root in roots {
        let bucket_index = buckets.len();
        let root_id = circles[root].id.clone();
        let mut bucket = Bucket {
            index: bucket_index,
            root_id: root_id.clone(),
            nucleus: rings.len(),
            rings: Vec::new(),
        };

        // (pivot, parent ring, depth); FIFO keeps parents ahead of peripherals
        let mut queue = VecDeque::from([(root, None::<usize>, 0usize)]);
        while let Some((pivot, parent_ring, depth)) = queue.pop_front() {
            let ring_index = rings.len();
            let (members, peeled) = walk_chain(&circles, pivot);

            let mut offset = 0.0;
            let mut previous = None;
            for &member in &members {
                let likes = comments[member].like_count;
                let circle = &mut circles[member];
                circle.radius = scale.radius(likes) + offset;
                circle.inner_parent = previous;
                circle.ring = ring_index;
                circle.is_pivot = previous.is_none();
                offset = circle.radius;
                previous = Some(member);
            }

            let ring_id = circles[pivot].id.clone();
            ring_ids.entry(ring_id.clone()).or_insert(ring_index);
            if let Some(parent) = parent_ring {
                rings[parent].peripherals.push(ring_index);
            }

            rings.push(Ring {
                index: ring_index,
                id: ring_id,
                pivot,
                radius: offset,
                members,
                pos: Pos2::ZERO,
                velocity: Vec2::ZERO,
                peripherals: Vec::new(),
                bucket: bucket_index,
                bucket_root_id: root_id.clone(),
                parent_ring,
                depth,
                is_nucleus: parent_ring.is_none(),
                is_selected: false,
                is_focused: false,
                is_displayed: false,
            });
            bucket.rings.push(ring_index);

            for p in peeled {
                queue.push_back((p, Some(ring_index), depth + 1));
            }
        }

        buckets.push(bucket);
    }

    tracing::debug!(
        circles = circles.len(),
        rings = rings.len(),
        buckets = buckets.len(),
        orphans = orphans.len(),
        "decomposed comment forest"
    );

    Geometry {
        comments,
        circles,
        rings,
        buckets,
        circle_ids: ids,
        ring_ids,
        orphans,
    }
}

/// Full mapping from comments to geometry (positions unset).
///
/// Accepts a flat list or one nested through `replies`; either way the
/// comments are flattened and sorted chronologically first.
pub fn build_geometry(comments: Vec<Comment>, min_radius: f32, max_radius: f32) -> Geometry {
    let comments = flatten_comments(comments);
    let scale = RadiusScale::for_comments(&comments, min_radius, max_radius);
    let forest = build_forest(&comments);
    decompose_rings(comments, forest, &scale)
}
