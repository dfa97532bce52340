//! Force primitives for the ring simulation.
//!
//! Many-body and collision both traverse a Barnes-Hut quadtree and take a
//! [`PairFilter`]: a pair the filter rejects never exchanges velocity. The
//! filter answers once per cell, so a cell it rejects outright is skipped
//! with its whole subtree and one it admits outright may be approximated.
//! Forces write into velocities only; integration happens in the simulation.

use egui::{Pos2, Vec2};
use rand::Rng;

use super::quadtree::{Body, QuadNode, QuadTree};

/// Tiny deterministic nudge for coincident positions
pub fn jiggle(rng: &mut impl Rng) -> f32 {
    (rng.gen::<f32>() - 0.5) * 1e-6
}

fn jiggle_zero(delta: &mut Vec2, rng: &mut impl Rng) {
    if delta.x == 0.0 {
        delta.x = jiggle(rng);
    }
    if delta.y == 0.0 {
        delta.y = jiggle(rng);
    }
}

/// How many of a cell's members, other than the source, a filter admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    None,
    Some,
    All,
}

impl Admission {
    pub fn from_counts(admitted: usize, total: usize) -> Self {
        if admitted == 0 {
            Self::None
        } else if admitted == total {
            Self::All
        } else {
            Self::Some
        }
    }
}

/// Decides which pairs of bodies interact
pub trait PairFilter {
    fn admits(&self, a: usize, b: usize) -> bool;

    /// Group a body is summarized under in the tree
    fn group(&self, _index: usize) -> usize {
        0
    }

    /// Admission of every member of `node` except `source`.
    ///
    /// The default asks [`PairFilter::admits`] member by member; filters with
    /// structure should answer from the cell summary instead.
    fn admits_cell(&self, source: usize, node: &QuadNode, tree: &QuadTree) -> Admission {
        let mut admitted = 0;
        let mut total = 0;
        for &other in tree.members(node) {
            if other == source {
                continue;
            }
            total += 1;
            if self.admits(source, other) {
                admitted += 1;
            }
        }
        Admission::from_counts(admitted, total)
    }
}

impl<F: Fn(usize, usize) -> bool> PairFilter for F {
    fn admits(&self, a: usize, b: usize) -> bool {
        self(a, b)
    }
}

/// Inverse-square repulsion with Barnes-Hut approximation
pub struct ManyBody<F> {
    /// Per-node strength, negative repels
    pub strengths: Vec<f32>,
    pub theta2: f32,
    pub distance_min2: f32,
    pub distance_max2: f32,
    pub filter: F,
}

impl<F: PairFilter> ManyBody<F> {
    pub fn new(strengths: Vec<f32>, theta2: f32, distance_min: f32, filter: F) -> Self {
        Self {
            strengths,
            theta2,
            distance_min2: distance_min * distance_min,
            distance_max2: f32::INFINITY,
            filter,
        }
    }

    pub fn apply(
        &self,
        positions: &[Pos2],
        velocities: &mut [Vec2],
        alpha: f32,
        rng: &mut impl Rng,
    ) {
        let bodies: Vec<Body> = positions
            .iter()
            .zip(&self.strengths)
            .enumerate()
            .map(|(i, (&pos, &strength))| Body {
                pos,
                strength,
                radius: 0.0,
                group: self.filter.group(i),
            })
            .collect();
        let Some(tree) = QuadTree::build(&bodies) else {
            return;
        };

        for (index, velocity) in velocities.iter_mut().enumerate().take(bodies.len()) {
            *velocity += self.accumulate(&tree, &tree.root, index, &bodies, alpha, rng);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn accumulate(
        &self,
        tree: &QuadTree,
        node: &QuadNode,
        index: usize,
        bodies: &[Body],
        alpha: f32,
        rng: &mut impl Rng,
    ) -> Vec2 {
        let admission = self.filter.admits_cell(index, node, tree);
        if admission == Admission::None {
            return Vec2::ZERO;
        }

        let pos = bodies[index].pos;
        let mut delta = node.centroid - pos;
        let distance_sq = delta.length_sq();
        let width = node.bounds.size();

        let uniform = admission == Admission::All && !tree.contains(node, index);
        if uniform && width * width / self.theta2 < distance_sq {
            if distance_sq >= self.distance_max2 {
                return Vec2::ZERO;
            }
            return self.pull(&mut delta, node.strength, alpha, rng);
        }

        if !node.is_leaf() {
            return node
                .children()
                .map(|child| self.accumulate(tree, child, index, bodies, alpha, rng))
                .fold(Vec2::ZERO, |acc, v| acc + v);
        }

        let mut force = Vec2::ZERO;
        for &other in tree.members(node) {
            if other == index || !self.filter.admits(index, other) {
                continue;
            }
            let mut delta = bodies[other].pos - pos;
            if delta.length_sq() >= self.distance_max2 {
                continue;
            }
            force += self.pull(&mut delta, self.strengths[other], alpha, rng);
        }
        force
    }

    /// Velocity change toward `delta` for a source of `strength`
    fn pull(&self, delta: &mut Vec2, strength: f32, alpha: f32, rng: &mut impl Rng) -> Vec2 {
        jiggle_zero(delta, rng);
        let mut l = delta.length_sq();
        if l < self.distance_min2 {
            l = (self.distance_min2 * l).sqrt();
        }
        *delta * (strength * alpha / l)
    }
}

/// Overlap resolution between discs
pub struct Collide<F> {
    pub radii: Vec<f32>,
    pub strength: f32,
    pub iterations: usize,
    pub filter: F,
}

impl<F: PairFilter> Collide<F> {
    pub fn new(radii: Vec<f32>, strength: f32, iterations: usize, filter: F) -> Self {
        Self {
            radii,
            strength,
            iterations: iterations.max(1),
            filter,
        }
    }

    pub fn apply(&self, positions: &[Pos2], velocities: &mut [Vec2], rng: &mut impl Rng) {
        let n = positions.len().min(velocities.len()).min(self.radii.len());
        for _ in 0..self.iterations {
            // Tree over predicted positions
            let bodies: Vec<Body> = (0..n)
                .map(|i| Body {
                    pos: positions[i] + velocities[i],
                    strength: 0.0,
                    radius: self.radii[i],
                    group: self.filter.group(i),
                })
                .collect();
            let Some(tree) = QuadTree::build(&bodies) else {
                return;
            };

            for index in 0..n {
                let predicted = bodies[index].pos;
                self.resolve(&tree, &tree.root, index, predicted, positions, velocities, rng);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        tree: &QuadTree,
        node: &QuadNode,
        index: usize,
        predicted: Pos2,
        positions: &[Pos2],
        velocities: &mut [Vec2],
        rng: &mut impl Rng,
    ) {
        // Pairs are resolved once, from the lower index
        if node.max_index <= index {
            return;
        }
        let ri = self.radii[index];
        if !node.bounds.within_reach(predicted, ri + node.max_radius) {
            return;
        }
        if self.filter.admits_cell(index, node, tree) == Admission::None {
            return;
        }

        if !node.is_leaf() {
            for child in node.children() {
                self.resolve(tree, child, index, predicted, positions, velocities, rng);
            }
            return;
        }

        for &other in tree.members(node) {
            if other <= index || !self.filter.admits(index, other) {
                continue;
            }
            let rj = self.radii[other];
            let reach = ri + rj;
            let mut delta = predicted - (positions[other] + velocities[other]);
            if delta.length_sq() >= reach * reach {
                continue;
            }
            jiggle_zero(&mut delta, rng);
            let distance = delta.length();
            let push = delta * ((reach - distance) / distance * self.strength);
            let (ri2, rj2) = (ri * ri, rj * rj);
            let share = if ri2 + rj2 > 0.0 { rj2 / (ri2 + rj2) } else { 0.5 };
            velocities[index] += push * share;
            velocities[other] -= push * (1.0 - share);
        }
    }
}

/// Spring between linked nodes (d3 link semantics)
pub struct Link {
    pub links: Vec<(usize, usize)>,
    pub distances: Vec<f32>,
    strengths: Vec<f32>,
    biases: Vec<f32>,
}

impl Link {
    /// Strength and bias derive from node degrees
    pub fn new(node_count: usize, links: Vec<(usize, usize)>, distances: Vec<f32>) -> Self {
        let mut degree = vec![0usize; node_count];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }
        let strengths = links
            .iter()
            .map(|&(s, t)| 1.0 / degree[s].min(degree[t]).max(1) as f32)
            .collect();
        let biases = links
            .iter()
            .map(|&(s, t)| degree[s] as f32 / (degree[s] + degree[t]).max(1) as f32)
            .collect();
        Self {
            links,
            distances,
            strengths,
            biases,
        }
    }

    pub fn apply(
        &self,
        positions: &[Pos2],
        velocities: &mut [Vec2],
        alpha: f32,
        rng: &mut impl Rng,
    ) {
        for (k, &(s, t)) in self.links.iter().enumerate() {
            let mut delta = (positions[t] + velocities[t]) - (positions[s] + velocities[s]);
            jiggle_zero(&mut delta, rng);
            let length = delta.length();
            let delta = delta * ((length - self.distances[k]) / length * alpha * self.strengths[k]);
            let bias = self.biases[k];
            velocities[t] -= delta * bias;
            velocities[s] += delta * (1.0 - bias);
        }
    }
}

/// Weak pull of every node toward `center`
pub fn apply_center(
    positions: &[Pos2],
    velocities: &mut [Vec2],
    center: Pos2,
    strength: f32,
    alpha: f32,
) {
    for (pos, velocity) in positions.iter().zip(velocities.iter_mut()) {
        *velocity += (center - *pos) * (strength * alpha);
    }
}
