//! Barnes-Hut quadtree shared by the many-body and collision forces.
//!
//! Every cell summarizes its subtree (centroid, strength, largest radius and
//! the group its bodies share, if any) so filtered forces can decide about a
//! whole cell at once before approximating or descending. Coincident bodies
//! end up together in one leaf.

use std::ops::Range;

use egui::{Pos2, Vec2};

/// Depth limit; bodies still sharing a cell at this depth form one leaf
const MAX_DEPTH: usize = 32;

/// One simulated body as seen by the tree
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub pos: Pos2,
    /// Signed charge; centroid weighting uses its magnitude
    pub strength: f32,
    pub radius: f32,
    /// Filters may skip whole cells whose members share one group
    pub group: usize,
}

/// Axis-aligned bounding box for quadtree cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Pos2,
    pub max: Pos2,
}

impl Bounds {
    pub fn new(min: Pos2, max: Pos2) -> Self {
        Self { min, max }
    }

    /// Smallest square containing every position, or `None` if empty
    pub fn square_around(positions: impl IntoIterator<Item = Pos2>) -> Option<Self> {
        let mut min = Pos2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Pos2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for pos in positions {
            min = min.min(pos);
            max = max.max(pos);
        }
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let size = (max.x - min.x).max(max.y - min.y).max(1.0);
        Some(Self::new(min, min + Vec2::splat(size)))
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn size(&self) -> f32 {
        (self.max.x - self.min.x).max(self.max.y - self.min.y)
    }

    pub fn contains(&self, pos: Pos2) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    /// Whether a disc of `radius` around `pos` can reach this box
    pub fn within_reach(&self, pos: Pos2, radius: f32) -> bool {
        !(self.min.x > pos.x + radius
            || self.max.x < pos.x - radius
            || self.min.y > pos.y + radius
            || self.max.y < pos.y - radius)
    }

    /// Get the quadrant for a position (0=NW, 1=NE, 2=SW, 3=SE)
    pub fn quadrant(&self, pos: Pos2) -> usize {
        let center = self.center();
        let east = pos.x >= center.x;
        let south = pos.y >= center.y;
        match (south, east) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    /// Get bounds for a specific quadrant
    pub fn child_bounds(&self, quadrant: usize) -> Bounds {
        let center = self.center();
        match quadrant {
            0 => Bounds::new(self.min, center),
            1 => Bounds::new(Pos2::new(center.x, self.min.y), Pos2::new(self.max.x, center.y)),
            2 => Bounds::new(Pos2::new(self.min.x, center.y), Pos2::new(center.x, self.max.y)),
            _ => Bounds::new(center, self.max),
        }
    }
}

/// A cell of the tree. Leaves have no children and may hold several bodies.
#[derive(Debug)]
pub struct QuadNode {
    pub bounds: Bounds,
    /// Slice of [`QuadTree`]'s body order holding this subtree's members
    pub range: Range<usize>,
    /// Strength-weighted center (plain average when all strengths are zero)
    pub centroid: Pos2,
    /// Sum of member strengths
    pub strength: f32,
    /// Largest member radius
    pub max_radius: f32,
    /// Largest member index
    pub max_index: usize,
    /// The group every member shares, `None` when the cell mixes groups
    pub group: Option<usize>,
    /// Children: NW, NE, SW, SE
    pub children: Option<Box<[Option<QuadNode>; 4]>>,
}

impl QuadNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Child cells that exist
    pub fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children
            .iter()
            .flat_map(|children| children.iter())
            .flatten()
    }

    pub fn count(&self) -> usize {
        self.range.len()
    }
}

/// Quadtree over a body slice.
///
/// Bodies are reordered so every cell's members are contiguous; membership of
/// a body in a cell is then a range check.
#[derive(Debug)]
pub struct QuadTree {
    pub root: QuadNode,
    order: Vec<usize>,
    slot: Vec<usize>,
}

impl QuadTree {
    /// Build a tree over all bodies, or `None` when there are none
    pub fn build(bodies: &[Body]) -> Option<Self> {
        let bounds = Bounds::square_around(bodies.iter().map(|b| b.pos))?;
        let mut order = Vec::with_capacity(bodies.len());
        let root = build_node(bounds, (0..bodies.len()).collect(), bodies, 0, &mut order);

        let mut slot = vec![0; bodies.len()];
        for (position, &index) in order.iter().enumerate() {
            slot[index] = position;
        }
        Some(Self { root, order, slot })
    }

    pub fn members(&self, node: &QuadNode) -> &[usize] {
        &self.order[node.range.clone()]
    }

    /// Whether body `index` lies in `node`'s subtree
    pub fn contains(&self, node: &QuadNode, index: usize) -> bool {
        self.slot
            .get(index)
            .map_or(false, |slot| node.range.contains(slot))
    }
}

fn build_node(
    bounds: Bounds,
    members: Vec<usize>,
    bodies: &[Body],
    depth: usize,
    order: &mut Vec<usize>,
) -> QuadNode {
    let mut weighted = Vec2::ZERO;
    let mut plain = Vec2::ZERO;
    let mut weight = 0.0;
    let mut strength = 0.0;
    let mut max_radius = 0.0_f32;
    let mut max_index = 0;
    let mut group = members.first().map(|&i| bodies[i].group);
    for &i in &members {
        let body = bodies[i];
        let w = body.strength.abs();
        weighted += body.pos.to_vec2() * w;
        plain += body.pos.to_vec2();
        weight += w;
        strength += body.strength;
        max_radius = max_radius.max(body.radius);
        max_index = max_index.max(i);
        if group != Some(body.group) {
            group = None;
        }
    }
    let centroid = if weight > 0.0 {
        (weighted / weight).to_pos2()
    } else {
        (plain / members.len().max(1) as f32).to_pos2()
    };

    let start = order.len();
    let mut node = QuadNode {
        bounds,
        range: start..start,
        centroid,
        strength,
        max_radius,
        max_index,
        group,
        children: None,
    };

    let first = members.first().map(|&i| bodies[i].pos);
    let coincident = members.iter().all(|&i| Some(bodies[i].pos) == first);
    if members.len() <= 1 || depth >= MAX_DEPTH || coincident {
        order.extend_from_slice(&members);
        node.range = start..order.len();
        return node;
    }

    let mut quadrants: [Vec<usize>; 4] = Default::default();
    for &i in &members {
        quadrants[bounds.quadrant(bodies[i].pos)].push(i);
    }

    let mut children: [Option<QuadNode>; 4] = Default::default();
    for (q, indices) in quadrants.into_iter().enumerate() {
        if !indices.is_empty() {
            children[q] = Some(build_node(
                bounds.child_bounds(q),
                indices,
                bodies,
                depth + 1,
                order,
            ));
        }
    }
    node.children = Some(Box::new(children));
    node.range = start..order.len();
    node
}
