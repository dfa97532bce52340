//! `ThreadLayout`: the engine facade consumed by the presentation layer.
//!
//! Owns the geometry for one post plus reveal progress, selection and the
//! camera. Rebuilding replaces everything; overlay and progress changes
//! mutate flags in place and report what changed as [`LayoutEvent`]s.

use chrono::{DateTime, Utc};
use egui::{Pos2, Rect};
use serde::Serialize;

use super::layout::{self, Camera, ForceLayout};
use super::mapper::build_geometry;
use super::reveal::{self, LayoutEvent, RevealState};
use super::types::{Bucket, Circle, Comment, Geometry, Ring};
use crate::settings::LayoutSettings;

pub struct ThreadLayout {
    settings: LayoutSettings,
    geometry: Geometry,
    reveal: RevealState,
    selected: Option<usize>,
    camera: Camera,
    viewport: Rect,
}

impl ThreadLayout {
    pub fn new(settings: LayoutSettings) -> Self {
        let viewport = Rect::from_min_size(
            Pos2::ZERO,
            egui::vec2(settings.canvas_width, settings.canvas_height),
        );
        Self {
            settings,
            geometry: Geometry::default(),
            reveal: RevealState::default(),
            selected: None,
            camera: Camera::default(),
            viewport,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Screen area the camera frames rings into
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Rebuild circles and rings from chronological comments and lay them out.
    ///
    /// Progress resets to -1 and all overlays clear; callers re-apply them.
    pub fn construct_layout(&mut self, comments: Vec<Comment>) -> Vec<LayoutEvent> {
        let mut geometry = build_geometry(
            comments,
            self.settings.min_radius,
            self.settings.max_radius,
        );
        ForceLayout::from_settings(&self.settings).run(&mut geometry);

        if !geometry.orphans.is_empty() {
            tracing::warn!(
                orphans = geometry.orphans.len(),
                "some replies were re-rooted as separate threads"
            );
        }
        tracing::info!(
            comments = geometry.circles.len(),
            rings = geometry.rings.len(),
            buckets = geometry.buckets.len(),
            "constructed ring layout"
        );

        self.geometry = geometry;
        self.reveal = RevealState::default();
        self.selected = None;
        self.camera = Camera::default();

        vec![LayoutEvent::Rebuilt {
            circles: self.geometry.circles.len(),
            rings: self.geometry.rings.len(),
            buckets: self.geometry.buckets.len(),
        }]
    }

    pub fn progress(&self) -> isize {
        self.reveal.progress()
    }

    pub fn set_progress(&mut self, index: isize) -> Vec<LayoutEvent> {
        self.reveal.set_progress(&mut self.geometry, index)
    }

    /// Index of the last comment published at or before `time`, -1 if none
    pub fn index_at_time(&self, time: DateTime<Utc>) -> isize {
        self.geometry
            .comments
            .partition_point(|c| c.published_at <= time) as isize
            - 1
    }

    pub fn selected(&self) -> Option<&Ring> {
        self.selected.map(|r| &self.geometry.rings[r])
    }

    /// Select a ring by id, or clear the selection with `None`.
    ///
    /// Re-selecting the current ring only re-issues the camera zoom. Returns
    /// `None` when `ring_id` names no ring; nothing changes in that case.
    pub fn select(&mut self, ring_id: Option<&str>) -> Option<Vec<LayoutEvent>> {
        let Some(ring_id) = ring_id else {
            let previous = self.selected.take();
            reveal::move_selection(&mut self.geometry, previous, None);
            let events = previous
                .map(|previous| LayoutEvent::SelectionChanged {
                    previous: Some(previous),
                    current: None,
                })
                .into_iter()
                .collect();
            return Some(events);
        };

        let ring = *self.geometry.ring_ids.get(ring_id)?;
        let mut events = Vec::new();
        if self.selected != Some(ring) {
            let previous = self.selected.replace(ring);
            reveal::move_selection(&mut self.geometry, previous, Some(ring));
            events.push(LayoutEvent::SelectionChanged {
                previous,
                current: Some(ring),
            });
        }
        if let Some(camera) = self.zoom_to(ring) {
            events.push(LayoutEvent::Zoom(camera));
        }
        Some(events)
    }

    /// Frame a ring and its peripherals without re-running the simulation
    pub fn zoom_to(&mut self, ring: usize) -> Option<Camera> {
        let camera = layout::zoom_to(&self.geometry, ring, self.viewport, &self.settings)?;
        self.camera = camera;
        Some(camera)
    }

    /// Camera that shows every ring
    pub fn zoom_to_fit(&mut self) -> Camera {
        let mut bounds = Rect::NOTHING;
        for ring in &self.geometry.rings {
            bounds = bounds.union(Rect::from_center_size(
                ring.pos,
                egui::Vec2::splat(ring.radius * 2.0),
            ));
        }
        self.camera = if bounds.is_positive() {
            Camera::fit(
                bounds.center(),
                bounds.width().max(bounds.height()) / 2.0,
                self.viewport,
                self.settings.zoom_fill,
                self.settings.min_zoom,
                self.settings.max_zoom,
            )
        } else {
            Camera::default()
        };
        self.camera
    }

    pub fn set_focused<I, S>(&mut self, ids: I) -> (usize, Vec<LayoutEvent>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        reveal::set_focused(&mut self.geometry, ids)
    }

    pub fn set_highlighted<I, S>(&mut self, ids: I) -> (usize, Vec<LayoutEvent>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        reveal::set_highlighted(&mut self.geometry, ids)
    }

    pub fn circle(&self, comment_id: &str) -> Option<&Circle> {
        self.geometry.circle_by_id(comment_id)
    }

    pub fn ring(&self, ring_id: &str) -> Option<&Ring> {
        self.geometry.ring_by_id(ring_id)
    }

    pub fn comment(&self, circle: &Circle) -> &Comment {
        &self.geometry.comments[circle.index]
    }

    /// Ring that owns the comment's circle
    pub fn ring_of(&self, comment_id: &str) -> Option<&Ring> {
        let circle = self.circle(comment_id)?;
        Some(&self.geometry.rings[circle.ring])
    }

    /// Pivot circle of the ring that owns the comment's circle
    pub fn pivot_of(&self, comment_id: &str) -> Option<&Circle> {
        let ring = self.ring_of(comment_id)?;
        Some(&self.geometry.circles[ring.pivot])
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.geometry.buckets
    }

    pub fn members_of_ring(&self, ring_id: &str) -> Option<Vec<&Circle>> {
        let ring = self.ring(ring_id)?;
        Some(ring.members.iter().map(|&m| &self.geometry.circles[m]).collect())
    }

    /// Every circle of the bucket rooted at `root_id`, chronological
    pub fn members_of_bucket(&self, root_id: &str) -> Option<Vec<&Circle>> {
        let bucket = self.geometry.buckets.iter().find(|b| b.root_id == root_id)?;
        let mut members: Vec<&Circle> = bucket
            .rings
            .iter()
            .flat_map(|&r| self.geometry.rings[r].members.iter())
            .map(|&m| &self.geometry.circles[m])
            .collect();
        members.sort_by_key(|c| c.index);
        Some(members)
    }

    pub fn like_count(&self, comment_id: &str) -> Option<u64> {
        let circle = self.circle(comment_id)?;
        Some(self.comment(circle).like_count)
    }

    /// Likes summed over a ring's own members
    pub fn ring_like_count(&self, ring_id: &str) -> Option<u64> {
        let members = self.members_of_ring(ring_id)?;
        Some(members.iter().map(|c| self.comment(c).like_count).sum())
    }

    pub fn bucket_like_count(&self, root_id: &str) -> Option<u64> {
        let members = self.members_of_bucket(root_id)?;
        Some(members.iter().map(|c| self.comment(c).like_count).sum())
    }

    /// How many of the given comments are currently displayed
    pub fn displayed_count<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter_map(|id| self.circle(id.as_ref()))
            .filter(|c| c.is_displayed)
            .count()
    }

    /// Innermost displayed ring whose footprint contains `world`
    pub fn ring_at(&self, world: Pos2) -> Option<&Ring> {
        self.geometry
            .rings
            .iter()
            .filter(|r| r.is_displayed && r.pos.distance(world) <= r.radius)
            .max_by(|a, b| {
                b.radius
                    .partial_cmp(&a.radius)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        let rings = self
            .geometry
            .rings
            .iter()
            .map(|ring| RingSnapshot {
                id: ring.id.clone(),
                bucket: ring.bucket_root_id.clone(),
                parent: ring.parent_ring.map(|p| self.geometry.rings[p].id.clone()),
                x: ring.pos.x,
                y: ring.pos.y,
                radius: ring.radius,
                displayed: ring.is_displayed,
                selected: ring.is_selected,
                members: ring
                    .members
                    .iter()
                    .map(|&m| {
                        let circle = &self.geometry.circles[m];
                        CircleSnapshot {
                            id: circle.id.clone(),
                            index: circle.index,
                            radius: circle.radius,
                            color: format!(
                                "#{:02x}{:02x}{:02x}",
                                circle.color.r(),
                                circle.color.g(),
                                circle.color.b()
                            ),
                            displayed: circle.is_displayed,
                        }
                    })
                    .collect(),
            })
            .collect();

        LayoutSnapshot {
            progress: self.progress(),
            orphans: self
                .geometry
                .orphans
                .iter()
                .map(|&o| self.geometry.circles[o].id.clone())
                .collect(),
            rings,
        }
    }
}

/// Serializable view of a laid-out thread
#[derive(Debug, Clone, Serialize)]
pub struct LayoutSnapshot {
    pub progress: isize,
    pub orphans: Vec<String>,
    pub rings: Vec<RingSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RingSnapshot {
    pub id: String,
    pub bucket: String,
    pub parent: Option<String>,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub displayed: bool,
    pub selected: bool,
    pub members: Vec<CircleSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircleSnapshot {
    pub id: String,
    pub index: usize,
    pub radius: f32,
    pub color: String,
    pub displayed: bool,
}

#[cfg(test)]
#[path = "thread_tests.rs"]
mod tests;
