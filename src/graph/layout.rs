//! Force-directed ring layout.
//!
//! Nodes are rings, links join each ring to its peripherals. A full pass runs
//! two fixed-length simulations from a neutral starting configuration:
//! - Link-only, to fold peripherals next to their parent ring
//! - Main: links, many-body repulsion within a bucket, centering, and three
//!   collision passes (linked rings, unlinked rings of one bucket, and rings
//!   of different buckets)
//!
//! `alpha` is held constant; the node set is rebuilt on every pass, so a
//! bounded tick count is all the settling the layout gets.

use std::time::Instant;

use egui::{Pos2, Rect, Vec2};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::forces::{apply_center, Admission, Collide, Link, ManyBody, PairFilter};
use super::quadtree::{QuadNode, QuadTree};
use super::types::Geometry;
use crate::settings::LayoutSettings;

/// Rings as simulation nodes, parent/peripheral pairs as edges.
///
/// Node `i` of the graph is ring `i` of the geometry.
pub struct SimulationGraph {
    graph: UnGraph<usize, ()>,
    buckets: Vec<usize>,
}

impl SimulationGraph {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let mut graph = UnGraph::with_capacity(geometry.rings.len(), geometry.rings.len());
        for ring in &geometry.rings {
            graph.add_node(ring.index);
        }
        for ring in &geometry.rings {
            for &peripheral in &ring.peripherals {
                graph.add_edge(NodeIndex::new(ring.index), NodeIndex::new(peripheral), ());
            }
        }
        Self {
            graph,
            buckets: geometry.rings.iter().map(|r| r.bucket).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn links(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect()
    }

    /// Rings linked to `index`: its parent and its peripherals
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(index))
            .map(|n| n.index())
    }

    pub fn bucket(&self, index: usize) -> usize {
        self.buckets[index]
    }

    /// Directly linked parent and peripheral
    pub fn is_immediate(&self, a: usize, b: usize) -> bool {
        self.graph
            .contains_edge(NodeIndex::new(a), NodeIndex::new(b))
    }

    pub fn same_bucket(&self, a: usize, b: usize) -> bool {
        self.buckets[a] == self.buckets[b]
    }

    /// Many-body pairs: same bucket, not directly linked
    pub fn repels(&self, a: usize, b: usize) -> bool {
        self.same_bucket(a, b) && !self.is_immediate(a, b)
    }

    pub fn collides_immediate(&self, a: usize, b: usize) -> bool {
        self.same_bucket(a, b) && self.is_immediate(a, b)
    }

    pub fn collides_related(&self, a: usize, b: usize) -> bool {
        self.repels(a, b)
    }

    pub fn collides_across(&self, a: usize, b: usize) -> bool {
        !self.same_bucket(a, b)
    }
}

/// Which pair relation of [`SimulationGraph`] a force uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Repel,
    CollideImmediate,
    CollideRelated,
    CollideAcross,
}

/// A [`SimulationGraph`] relation as a tree-force filter.
///
/// Cells are judged from their bucket summary and the source's links, so
/// asking about a cell costs the source's degree rather than the cell's
/// size. A cell mixing buckets may be answered `Some` when every member is
/// in fact admitted; traversal then descends instead of approximating.
#[derive(Clone, Copy)]
pub struct RingFilter<'a> {
    sim: &'a SimulationGraph,
    relation: Relation,
}

impl<'a> RingFilter<'a> {
    pub fn new(sim: &'a SimulationGraph, relation: Relation) -> Self {
        Self { sim, relation }
    }
}

impl PairFilter for RingFilter<'_> {
    fn admits(&self, a: usize, b: usize) -> bool {
        match self.relation {
            Relation::Repel => self.sim.repels(a, b),
            Relation::CollideImmediate => self.sim.collides_immediate(a, b),
            Relation::CollideRelated => self.sim.collides_related(a, b),
            Relation::CollideAcross => self.sim.collides_across(a, b),
        }
    }

    fn group(&self, index: usize) -> usize {
        self.sim.bucket(index)
    }

    fn admits_cell(&self, source: usize, node: &QuadNode, tree: &QuadTree) -> Admission {
        let others = node.count() - usize::from(tree.contains(node, source));
        if others == 0 {
            return Admission::None;
        }
        let own = self.sim.bucket(source);

        if self.relation == Relation::CollideAcross {
            return match node.group {
                Some(group) if group == own => Admission::None,
                Some(_) => Admission::All,
                None => Admission::Some,
            };
        }

        // Linked rings always share a bucket
        let linked = self
            .sim
            .neighbors(source)
            .filter(|&n| tree.contains(node, n))
            .count();
        if self.relation == Relation::CollideImmediate {
            return Admission::from_counts(linked, others);
        }
        match node.group {
            Some(group) if group != own => Admission::None,
            Some(_) => Admission::from_counts(others - linked, others),
            None if linked == others => Admission::None,
            None => Admission::Some,
        }
    }
}

/// Summary of one layout pass
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutStats {
    pub rings: usize,
    pub links: usize,
    pub ticks: usize,
}

/// Force layout parameters
pub struct ForceLayout {
    pub center: Pos2,
    pub alpha: f32,
    pub velocity_decay: f32,
    pub theta2: f32,
    pub charge: f32,
    pub distance_min: f32,
    pub center_strength: f32,
    pub collision_strength: f32,
    pub collision_iterations: usize,
    pub immediate_shrink: f32,
    pub bucket_margin: f32,
    pub link_iterations: usize,
    pub main_iterations: usize,
    pub seed: u64,
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self::from_settings(&LayoutSettings::default())
    }
}

impl ForceLayout {
    pub fn from_settings(settings: &LayoutSettings) -> Self {
        Self {
            center: Pos2::new(settings.canvas_width / 2.0, settings.canvas_height / 2.0),
            alpha: settings.alpha,
            velocity_decay: settings.velocity_decay,
            theta2: settings.theta2,
            charge: settings.charge,
            distance_min: settings.distance_min,
            center_strength: settings.center_strength,
            collision_strength: settings.collision_strength,
            collision_iterations: settings.collision_iterations,
            immediate_shrink: settings.immediate_shrink,
            bucket_margin: settings.bucket_margin,
            link_iterations: settings.link_iterations,
            main_iterations: settings.main_iterations,
            seed: settings.seed,
        }
    }

    /// Phyllotaxis spiral around the center, so every pass starts identically
    fn initial_positions(&self, count: usize) -> Vec<Pos2> {
        let angle_step = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        (0..count)
            .map(|i| {
                let radius = 10.0 * (0.5 + i as f32).sqrt();
                let angle = i as f32 * angle_step;
                self.center + Vec2::angled(angle) * radius
            })
            .collect()
    }

    fn integrate(&self, positions: &mut [Pos2], velocities: &mut [Vec2]) {
        let keep = 1.0 - self.velocity_decay;
        for (pos, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
            *velocity *= keep;
            *pos += *velocity;
        }
    }

    /// Position every ring of `geometry` from scratch
    pub fn run(&self, geometry: &mut Geometry) -> LayoutStats {
        let started = Instant::now();
        let n = geometry.rings.len();
        if n == 0 {
            return LayoutStats::default();
        }

        let sim = SimulationGraph::from_geometry(geometry);
        let radii: Vec<f32> = geometry.rings.iter().map(|r| r.radius).collect();
        let links = sim.links();
        let distances = links
            .iter()
            .map(|&(s, t)| radii[s].max(radii[t]))
            .collect();
        let link = Link::new(n, links, distances);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut positions = self.initial_positions(n);
        let mut velocities = vec![Vec2::ZERO; n];

        for _ in 0..self.link_iterations {
            link.apply(&positions, &mut velocities, self.alpha, &mut rng);
            self.integrate(&mut positions, &mut velocities);
        }

        let many_body = ManyBody::new(
            radii.iter().map(|r| -self.charge * r).collect(),
            self.theta2,
            self.distance_min,
            RingFilter::new(&sim, Relation::Repel),
        );
        let collide_immediate = Collide::new(
            radii.iter().map(|r| r * self.immediate_shrink).collect(),
            self.collision_strength,
            self.collision_iterations,
            RingFilter::new(&sim, Relation::CollideImmediate),
        );
        let collide_related = Collide::new(
            radii.clone(),
            self.collision_strength,
            self.collision_iterations,
            RingFilter::new(&sim, Relation::CollideRelated),
        );
        let collide_across = Collide::new(
            radii.iter().map(|r| r + self.bucket_margin).collect(),
            self.collision_strength,
            self.collision_iterations,
            RingFilter::new(&sim, Relation::CollideAcross),
        );

        for _ in 0..self.main_iterations {
            link.apply(&positions, &mut velocities, self.alpha, &mut rng);
            many_body.apply(&positions, &mut velocities, self.alpha, &mut rng);
            apply_center(
                &positions,
                &mut velocities,
                self.center,
                self.center_strength,
                self.alpha,
            );
            collide_immediate.apply(&positions, &mut velocities, &mut rng);
            collide_related.apply(&positions, &mut velocities, &mut rng);
            collide_across.apply(&positions, &mut velocities, &mut rng);
            self.integrate(&mut positions, &mut velocities);
        }

        for ((ring, pos), velocity) in geometry
            .rings
            .iter_mut()
            .zip(positions)
            .zip(velocities)
        {
            ring.pos = pos;
            ring.velocity = velocity;
        }

        let stats = LayoutStats {
            rings: n,
            links: link.links.len(),
            ticks: self.link_iterations + self.main_iterations,
        };
        tracing::debug!(
            rings = stats.rings,
            links = stats.links,
            ticks = stats.ticks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ring layout pass complete"
        );
        stats
    }
}

/// View transform: screen = world * scale + translate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f32,
    pub translate: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.scale + self.translate).to_pos2()
    }

    pub fn to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.translate) / self.scale).to_pos2()
    }

    /// Center `focus` in `viewport`, scaled so a disc of `extent` fills `fill` of it
    pub fn fit(
        focus: Pos2,
        extent: f32,
        viewport: Rect,
        fill: f32,
        min_scale: f32,
        max_scale: f32,
    ) -> Self {
        let span = viewport.width().min(viewport.height());
        let scale = (span * fill / (2.0 * extent.max(1e-3))).clamp(min_scale, max_scale);
        Self {
            scale,
            translate: viewport.center().to_vec2() - focus.to_vec2() * scale,
        }
    }

    /// Blend toward `target` by `t` in [0, 1]
    pub fn lerp(&self, target: &Camera, t: f32) -> Camera {
        let t = t.clamp(0.0, 1.0);
        Camera {
            scale: self.scale + (target.scale - self.scale) * t,
            translate: self.translate + (target.translate - self.translate) * t,
        }
    }
}

/// Radius around a ring's center that covers the ring and all its peripherals
pub fn subtree_extent(geometry: &Geometry, ring: usize) -> f32 {
    let center = geometry.rings[ring].pos;
    geometry
        .ring_subtree(ring)
        .into_iter()
        .map(|r| {
            let other = &geometry.rings[r];
            center.distance(other.pos) + other.radius
        })
        .fold(geometry.rings[ring].radius, f32::max)
}

/// Camera that frames `ring` and its peripherals; never touches the simulation
pub fn zoom_to(
    geometry: &Geometry,
    ring: usize,
    viewport: Rect,
    settings: &LayoutSettings,
) -> Option<Camera> {
    let target = geometry.rings.get(ring)?;
    Some(Camera::fit(
        target.pos,
        subtree_extent(geometry, ring),
        viewport,
        settings.zoom_fill,
        settings.min_zoom,
        settings.max_zoom,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mapper::build_geometry;
    use crate::graph::quadtree::Body;
    use crate::graph::types::fixtures::comment;
    use crate::graph::types::Comment;

    const RELATIONS: [Relation; 4] = [
        Relation::Repel,
        Relation::CollideImmediate,
        Relation::CollideRelated,
        Relation::CollideAcross,
    ];

    fn sample() -> Vec<Comment> {
        vec![
            comment("R", None, 10, 0),
            comment("A", Some("R"), 5, 1),
            comment("B", Some("R"), 3, 2),
            comment("C", Some("A"), 1, 3),
            comment("D", Some("R"), 2, 4),
            comment("D1", Some("D"), 8, 5),
            comment("S", None, 4, 6),
            comment("S1", Some("S"), 6, 7),
            comment("S2", Some("S"), 1, 8),
            comment("S1a", Some("S1"), 0, 9),
        ]
    }

    fn laid_out(settings: &LayoutSettings) -> Geometry {
        let mut geometry = build_geometry(sample(), settings.min_radius, settings.max_radius);
        ForceLayout::from_settings(settings).run(&mut geometry);
        geometry
    }

    #[test]
    fn filters_are_symmetric_and_stable() {
        let geometry = build_geometry(sample(), 4.0, 20.0);
        let sim = SimulationGraph::from_geometry(&geometry);
        let n = sim.node_count();
        for a in 0..n {
            for b in 0..n {
                let first = (sim.repels(a, b), sim.collides_immediate(a, b), sim.collides_across(a, b));
                assert_eq!(first, (sim.repels(b, a), sim.collides_immediate(b, a), sim.collides_across(b, a)));
                assert_eq!(first, (sim.repels(a, b), sim.collides_immediate(a, b), sim.collides_across(a, b)));
            }
        }
    }

    #[test]
    fn immediate_relation_follows_ring_tree() {
        let geometry = build_geometry(sample(), 4.0, 20.0);
        let sim = SimulationGraph::from_geometry(&geometry);
        for ring in &geometry.rings {
            if let Some(parent) = ring.parent_ring {
                assert!(sim.is_immediate(parent, ring.index));
                assert!(sim.is_immediate(ring.index, parent));
                assert!(!sim.repels(parent, ring.index));
            }
        }
        assert_eq!(sim.links().len(), geometry.rings.len() - geometry.buckets.len());
    }

    #[test]
    fn layout_is_deterministic() {
        let settings = LayoutSettings::default();
        let first = laid_out(&settings);
        let second = laid_out(&settings);
        for (a, b) in first.rings.iter().zip(&second.rings) {
            assert_eq!(a.pos, b.pos);
        }
        assert!(first.rings.iter().all(|r| r.pos.x.is_finite() && r.pos.y.is_finite()));
    }

    #[test]
    fn buckets_end_up_apart() {
        let settings = LayoutSettings::default();
        let geometry = laid_out(&settings);
        let a = &geometry.rings[geometry.buckets[0].nucleus];
        let b = &geometry.rings[geometry.buckets[1].nucleus];
        assert!(a.pos.distance(b.pos) > (a.radius + b.radius) * 0.5);
    }

    #[test]
    fn empty_geometry_is_a_noop() {
        let mut geometry = Geometry::default();
        let stats = ForceLayout::default().run(&mut geometry);
        assert_eq!(stats.rings, 0);
    }

    #[test]
    fn camera_round_trips_and_fits() {
        let viewport = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));
        let camera = Camera::fit(Pos2::new(100.0, 50.0), 30.0, viewport, 0.8, 0.01, 100.0);
        assert_eq!(camera.to_screen(Pos2::new(100.0, 50.0)), viewport.center());
        assert!((camera.scale - 8.0).abs() < 1e-4);
        let world = camera.to_world(Pos2::new(10.0, 20.0));
        let back = camera.to_screen(world);
        assert!((back - Pos2::new(10.0, 20.0)).length() < 1e-3);
    }

    #[test]
    fn zoom_covers_peripherals() {
        let settings = LayoutSettings::default();
        let geometry = laid_out(&settings);
        let nucleus = geometry.buckets[0].nucleus;
        let extent = subtree_extent(&geometry, nucleus);
        for r in geometry.ring_subtree(nucleus) {
            let ring = &geometry.rings[r];
            assert!(geometry.rings[nucleus].pos.distance(ring.pos) + ring.radius <= extent + 1e-3);
        }
        assert!(zoom_to(&geometry, 999, Rect::EVERYTHING, &settings).is_none());
    }

    fn bodies(positions: &[Pos2], sim: &SimulationGraph) -> Vec<Body> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| Body {
                pos,
                strength: -1.0,
                radius: 1.0,
                group: sim.bucket(i),
            })
            .collect()
    }

    /// Every cell answer is sound: `None` and `All` only when true of each member
    pub(super) fn check_cells(filter: &RingFilter, tree: &QuadTree, node: &QuadNode, source: usize) {
        let others: Vec<usize> = tree
            .members(node)
            .iter()
            .copied()
            .filter(|&m| m != source)
            .collect();
        let admitted = others.iter().filter(|&&m| filter.admits(source, m)).count();
        let exact = Admission::from_counts(admitted, others.len());

        match filter.admits_cell(source, node, tree) {
            Admission::None => assert_eq!(exact, Admission::None, "source {source}"),
            Admission::All => assert_eq!(exact, Admission::All, "source {source}"),
            Admission::Some => {}
        }
        if node.group.is_some() {
            assert_eq!(filter.admits_cell(source, node, tree), exact);
        }
        for child in node.children() {
            check_cells(filter, tree, child, source);
        }
    }

    #[test]
    fn cell_admission_agrees_with_pairs() {
        let geometry = laid_out(&LayoutSettings::default());
        let sim = SimulationGraph::from_geometry(&geometry);
        let positions: Vec<Pos2> = geometry.rings.iter().map(|r| r.pos).collect();
        let tree = QuadTree::build(&bodies(&positions, &sim)).unwrap();

        for relation in RELATIONS {
            let filter = RingFilter::new(&sim, relation);
            for source in 0..sim.node_count() {
                check_cells(&filter, &tree, &tree.root, source);
            }
        }
    }

    #[test]
    fn ring_filter_forces_match_pairwise_filter() {
        let settings = LayoutSettings::default();
        let geometry = laid_out(&settings);
        let sim = SimulationGraph::from_geometry(&geometry);
        let positions: Vec<Pos2> = geometry.rings.iter().map(|r| r.pos).collect();
        let radii: Vec<f32> = geometry.rings.iter().map(|r| r.radius).collect();
        let strengths: Vec<f32> = radii.iter().map(|r| -settings.charge * r).collect();
        let n = positions.len();

        let mut by_cell = vec![Vec2::ZERO; n];
        ManyBody::new(
            strengths.clone(),
            settings.theta2,
            settings.distance_min,
            RingFilter::new(&sim, Relation::Repel),
        )
        .apply(&positions, &mut by_cell, 1.0, &mut StdRng::seed_from_u64(3));
        let mut by_pair = vec![Vec2::ZERO; n];
        ManyBody::new(
            strengths,
            settings.theta2,
            settings.distance_min,
            |a: usize, b: usize| sim.repels(a, b),
        )
        .apply(&positions, &mut by_pair, 1.0, &mut StdRng::seed_from_u64(3));
        for (a, b) in by_cell.iter().zip(&by_pair) {
            assert!((*a - *b).length() <= 1e-4 * (1.0 + b.length()), "{a:?} vs {b:?}");
        }

        // Overlapping discs so every relation has work to do
        let big: Vec<f32> = radii.iter().map(|r| r * 4.0).collect();
        for relation in RELATIONS {
            let filter = RingFilter::new(&sim, relation);
            let mut by_cell = vec![Vec2::ZERO; n];
            Collide::new(big.clone(), 1.0, 1, filter).apply(
                &positions,
                &mut by_cell,
                &mut StdRng::seed_from_u64(5),
            );
            let mut by_pair = vec![Vec2::ZERO; n];
            Collide::new(big.clone(), 1.0, 1, |a: usize, b: usize| filter.admits(a, b)).apply(
                &positions,
                &mut by_pair,
                &mut StdRng::seed_from_u64(5),
            );
            for (a, b) in by_cell.iter().zip(&by_pair) {
                assert!((*a - *b).length() <= 1e-4 * (1.0 + b.length()), "{relation:?}");
            }
        }
    }
}
