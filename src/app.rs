//! Interactive ring viewer: canvas, thread sidebar and reveal timeline.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use comment_rings::graph::{load_comments, Camera, Comment, LayoutEvent, ThreadLayout};
use comment_rings::LayoutSettings;
use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

use crate::theme;

/// Comments revealed per second at 1x playback
const PLAYBACK_RATE: f32 = 4.0;

/// Fraction of the remaining camera distance covered each frame
const CAMERA_EASE: f32 = 0.18;

pub struct RingsApp {
    layout: ThreadLayout,
    settings: LayoutSettings,
    source: PathBuf,
    load_error: Option<String>,

    // Viewport state
    camera: Camera,
    camera_target: Option<Camera>,
    viewport: Rect,
    fit_pending: bool,
    hovered_ring: Option<usize>,

    // Timeline state
    pending_progress: Option<isize>,
    playing: bool,
    speed: f32,
    playback_accum: f32,
    last_playback_time: Instant,
    timeline_dragging: bool,

    // Overlays
    focus_bucket: bool,
    search: String,
    highlight_matches: usize,
}

impl RingsApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: LayoutSettings,
        source: PathBuf,
        progress: Option<isize>,
    ) -> Self {
        let mut app = Self {
            layout: ThreadLayout::new(settings.clone()),
            settings,
            source,
            load_error: None,
            camera: Camera::default(),
            camera_target: None,
            viewport: Rect::NOTHING,
            fit_pending: false,
            hovered_ring: None,
            pending_progress: None,
            playing: false,
            speed: 1.0,
            playback_accum: 0.0,
            last_playback_time: Instant::now(),
            timeline_dragging: false,
            focus_bucket: false,
            search: String::new(),
            highlight_matches: 0,
        };
        app.reload(progress);
        app
    }

    /// Re-read the comment file and rebuild the layout.
    ///
    /// `progress` of `None` reveals everything.
    fn reload(&mut self, progress: Option<isize>) {
        let comments = match load_comments(&self.source) {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!(path = %self.source.display(), error = %e, "failed to load comments");
                self.load_error = Some(e.to_string());
                return;
            }
        };

        self.load_error = None;
        self.playing = false;
        let events = self.layout.construct_layout(comments);
        self.apply_events(events);
        self.refresh_highlight();

        let last = self.layout.geometry().circles.len() as isize - 1;
        // Revealed on the next frame, after the canvas has seen the new rings
        self.pending_progress = Some(progress.unwrap_or(last));
    }

    /// Rebuild with the edited settings, keeping the current reveal position
    fn apply_settings(&mut self) {
        let progress = self.layout.progress();
        self.settings = self.settings.clone().sanitized();
        self.layout = ThreadLayout::new(self.settings.clone());
        if self.viewport.is_positive() {
            self.layout.set_viewport(self.viewport);
        }
        self.reload(Some(progress));
    }

    fn apply_events(&mut self, events: Vec<LayoutEvent>) {
        for event in events {
            match event {
                LayoutEvent::Rebuilt { .. } => {
                    self.hovered_ring = None;
                    self.camera_target = None;
                    self.fit_pending = true;
                }
                LayoutEvent::Zoom(camera) => self.camera_target = Some(camera),
                LayoutEvent::SelectionChanged { .. } => self.refresh_focus(),
                LayoutEvent::CircleHidden(_) | LayoutEvent::RingChanged(_) => {
                    let hidden = self
                        .hovered_ring
                        .map_or(false, |r| !self.layout.geometry().rings[r].is_displayed);
                    if hidden {
                        self.hovered_ring = None;
                    }
                }
                LayoutEvent::CircleShown(_) | LayoutEvent::CircleOverlay(_) => {}
            }
        }
    }

    fn set_progress(&mut self, index: isize) {
        let events = self.layout.set_progress(index);
        self.apply_events(events);
    }

    fn select(&mut self, ring_id: Option<String>) {
        if let Some(events) = self.layout.select(ring_id.as_deref()) {
            self.apply_events(events);
        }
    }

    /// Focus every circle of the selected ring's bucket, or nothing
    fn refresh_focus(&mut self) {
        let ids: Vec<String> = if self.focus_bucket {
            self.layout
                .selected()
                .and_then(|ring| self.layout.members_of_bucket(&ring.bucket_root_id))
                .map(|members| members.iter().map(|c| c.id.clone()).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let (_, events) = self.layout.set_focused(ids);
        tracing::trace!(changed = events.len(), "focus refreshed");
    }

    fn refresh_highlight(&mut self) {
        let ids = matching_comment_ids(&self.layout.geometry().comments, &self.search);
        let (matched, _) = self.layout.set_highlighted(ids);
        self.highlight_matches = matched;
    }

    fn advance_playback(&mut self, ctx: &egui::Context) {
        if !self.playing || self.timeline_dragging {
            return;
        }
        let now = Instant::now();
        let delta = now.duration_since(self.last_playback_time).as_secs_f32();
        self.last_playback_time = now;

        self.playback_accum += delta * self.speed * PLAYBACK_RATE;
        let steps = self.playback_accum.floor();
        if steps >= 1.0 {
            self.playback_accum -= steps;
            self.set_progress(self.layout.progress() + steps as isize);
        }

        let last = self.layout.geometry().circles.len() as isize - 1;
        if self.layout.progress() >= last {
            self.playing = false;
        } else {
            ctx.request_repaint();
        }
    }

    fn animate_camera(&mut self, ctx: &egui::Context) {
        let Some(target) = self.camera_target else {
            return;
        };
        self.camera = self.camera.lerp(&target, CAMERA_EASE);
        let settled = (self.camera.scale - target.scale).abs() < 1e-3 * target.scale
            && (self.camera.translate - target.translate).length() < 0.5;
        if settled {
            self.camera = target;
            self.camera_target = None;
        } else {
            ctx.request_repaint();
        }
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Thread");
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ui.colored_label(theme::text::MUTED, name);

        if let Some(ref err) = self.load_error {
            ui.colored_label(theme::state::ERROR, format!("Error: {}", err));
        }

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.button("⟳ Reload").clicked() {
                self.reload(Some(self.layout.progress()));
            }
            if ui.button("⤢ Fit").clicked() {
                self.camera_target = Some(self.layout.zoom_to_fit());
            }
        });

        ui.add_space(10.0);

        egui::CollapsingHeader::new("Overview")
            .default_open(true)
            .show(ui, |ui| {
                let geometry = self.layout.geometry();
                let displayed = geometry.circles.iter().filter(|c| c.is_displayed).count();
                ui.label(format!("Comments: {}", geometry.circles.len()));
                ui.label(format!("Revealed: {}", displayed));
                ui.label(format!("Rings: {}", geometry.rings.len()));
                ui.label(format!("Threads: {}", geometry.buckets.len()));
                if !geometry.orphans.is_empty() {
                    ui.colored_label(
                        theme::state::WARNING,
                        format!("Re-rooted replies: {}", geometry.orphans.len()),
                    );
                }
            });

        egui::CollapsingHeader::new("Selection")
            .default_open(true)
            .show(ui, |ui| self.render_selection(ui));

        egui::CollapsingHeader::new("Search")
            .default_open(true)
            .show(ui, |ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.search).hint_text("text or author"),
                );
                if response.changed() {
                    self.refresh_highlight();
                }
                if !self.search.trim().is_empty() {
                    ui.label(format!("{} matches", self.highlight_matches));
                }
            });

        egui::CollapsingHeader::new("Layout")
            .default_open(false)
            .show(ui, |ui| {
                let settings = &mut self.settings;
                ui.add(egui::Slider::new(&mut settings.charge, 0.0..=30.0).text("Charge"));
                ui.add(
                    egui::Slider::new(&mut settings.collision_strength, 0.0..=1.0)
                        .text("Collision"),
                );
                ui.add(
                    egui::Slider::new(&mut settings.immediate_shrink, 0.1..=1.0)
                        .text("Parent overlap"),
                );
                ui.add(
                    egui::Slider::new(&mut settings.bucket_margin, 0.0..=60.0)
                        .text("Thread margin"),
                );
                ui.add(
                    egui::Slider::new(&mut settings.main_iterations, 0..=1000).text("Ticks"),
                );
                ui.add(
                    egui::Slider::new(&mut settings.max_radius, settings.min_radius..=80.0)
                        .text("Max radius"),
                );

                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        self.apply_settings();
                    }
                    if ui.button("Save").clicked() {
                        match self.settings.save() {
                            Ok(path) => tracing::info!(path = %path.display(), "saved settings"),
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to save settings");
                                self.load_error = Some(e.to_string());
                            }
                        }
                    }
                });
            });
    }

    fn render_selection(&mut self, ui: &mut egui::Ui) {
        let Some(ring) = self.layout.selected() else {
            ui.colored_label(theme::text::MUTED, "Click a ring to select it");
            return;
        };
        let ring_id = ring.id.clone();
        let bucket_id = ring.bucket_root_id.clone();
        let pivot = self.layout.comment(&self.layout.geometry().circles[ring.pivot]);
        ui.label(format!("Started by {}", pivot.author));
        ui.label(format!(
            "Ring likes: {}",
            self.layout.ring_like_count(&ring_id).unwrap_or(0)
        ));
        ui.label(format!(
            "Thread likes: {}",
            self.layout.bucket_like_count(&bucket_id).unwrap_or(0)
        ));

        ui.add_space(4.0);
        for circle in self.layout.members_of_ring(&ring_id).unwrap_or_default() {
            let comment = self.layout.comment(circle);
            let color = if circle.is_displayed {
                circle.color
            } else {
                theme::text::DISABLED
            };
            ui.horizontal(|ui| {
                ui.colored_label(color, "●");
                ui.label(format!(
                    "{} ({}): {}",
                    comment.author,
                    comment.like_count,
                    truncate(&comment.text, 40)
                ));
            });
        }

        ui.add_space(4.0);
        if ui
            .checkbox(&mut self.focus_bucket, "Focus this thread")
            .changed()
        {
            self.refresh_focus();
        }
        if ui.button("Clear selection").clicked() {
            self.select(None);
        }
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if rect != self.viewport {
            self.viewport = rect;
            self.layout.set_viewport(rect);
        }
        if self.fit_pending {
            self.fit_pending = false;
            self.camera = self.layout.zoom_to_fit();
        }

        // Gather all input deltas first (allows simultaneous pan+zoom on trackpad)
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
        let zoom_delta = ui.input(|i| i.zoom_delta());

        if response.dragged_by(egui::PointerButton::Primary) {
            self.camera.translate += response.drag_delta();
            self.camera_target = None;
        }
        if scroll_delta != Vec2::ZERO && response.hovered() {
            self.camera.translate += scroll_delta;
            self.camera_target = None;
        }
        // Cursor-anchored zoom
        if let Some(cursor) = response.hover_pos() {
            if zoom_delta != 1.0 {
                let settings = self.layout.settings();
                let anchor = self.camera.to_world(cursor);
                self.camera.scale = (self.camera.scale * zoom_delta)
                    .clamp(settings.min_zoom, settings.max_zoom);
                self.camera.translate = cursor.to_vec2() - anchor.to_vec2() * self.camera.scale;
                self.camera_target = None;
            }
        }

        let camera = self.camera;
        self.hovered_ring = response
            .hover_pos()
            .and_then(|p| self.layout.ring_at(camera.to_world(p)))
            .map(|r| r.index);

        let geometry = self.layout.geometry();
        let focus_active = geometry.circles.iter().any(|c| c.is_focused);

        // Larger rings first so nested peripherals stay on top
        let mut rings: Vec<_> = geometry.rings.iter().filter(|r| r.is_displayed).collect();
        rings.sort_by(|a, b| b.radius.total_cmp(&a.radius));

        for ring in rings {
            let center = camera.to_screen(ring.pos);
            let extent = ring.radius * camera.scale;
            if !rect.expand(extent).contains(center) {
                continue;
            }
            painter.circle_filled(center, extent, theme::bg::RING);

            for &m in &ring.members {
                let circle = &geometry.circles[m];
                if !circle.is_displayed {
                    continue;
                }
                let mut color = circle.color;
                let mut width = theme::stroke_width::NORMAL;
                if circle.is_highlighted {
                    color = theme::brighten(color);
                    width = theme::stroke_width::HIGHLIGHT;
                } else if focus_active && !circle.is_focused {
                    color = color.gamma_multiply(theme::DIMMED);
                }
                painter.circle_stroke(
                    center,
                    circle.radius * camera.scale,
                    theme::stroke(color, width),
                );
            }

            if ring.is_selected {
                let bounds = Rect::from_center_size(center, Vec2::splat(2.0 * extent)).expand(4.0);
                painter.rect_stroke(
                    bounds,
                    2.0,
                    theme::stroke(theme::state::SELECTED, theme::stroke_width::SELECTED),
                );
            } else if self.hovered_ring == Some(ring.index) {
                painter.circle_stroke(
                    center,
                    extent + 2.0,
                    theme::stroke(theme::state::HOVER, theme::stroke_width::HOVER),
                );
            }
        }

        // Tooltip for the hovered ring's pivot
        if let (Some(r), Some(cursor)) = (self.hovered_ring, response.hover_pos()) {
            let ring = &geometry.rings[r];
            let pivot = &geometry.comments[ring.pivot];
            let tooltip_text = format!(
                "{} · {} likes\n{}\n\n{} replies in ring",
                pivot.author,
                pivot.like_count,
                truncate(&pivot.text, 80),
                ring.members.len() - 1,
            );
            let galley =
                painter.layout_no_wrap(tooltip_text, egui::FontId::default(), Color32::WHITE);
            let tooltip_pos = cursor + Vec2::new(16.0, 0.0);
            let tooltip_rect =
                Rect::from_min_size(tooltip_pos, galley.size() + Vec2::splat(16.0));
            painter.rect_filled(tooltip_rect, 4.0, theme::bg::TOOLTIP);
            painter.galley(tooltip_pos + Vec2::splat(8.0), galley, Color32::WHITE);
        }

        let message = if let Some(ref err) = self.load_error {
            Some(err.as_str())
        } else if geometry.is_empty() {
            Some("No comments")
        } else {
            None
        };
        if let Some(message) = message {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                message,
                egui::FontId::proportional(20.0),
                theme::text::MUTED,
            );
        }

        if response.clicked() {
            let ring_id = self
                .hovered_ring
                .map(|r| self.layout.geometry().rings[r].id.clone());
            self.select(ring_id);
        }
    }

    fn render_timeline(&mut self, ui: &mut egui::Ui) {
        let comments = &self.layout.geometry().comments;
        let (Some(first), Some(last)) = (comments.first(), comments.last()) else {
            ui.label("No comments to reveal");
            return;
        };

        // Cache values we need before any closures
        let first_time = first.published_at;
        let last_time = last.published_at;
        let fractions: Vec<f32> = comments
            .iter()
            .map(|c| fraction_at_time(first_time, last_time, c.published_at))
            .collect();
        let total = comments.len();
        let last_index = total as isize - 1;
        let progress = self.layout.progress();
        let current_time = usize::try_from(progress)
            .ok()
            .map(|p| comments[p].published_at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "nothing yet".to_string());

        ui.horizontal(|ui| {
            if self.playing {
                if ui.button("⏸").clicked() {
                    self.playing = false;
                }
            } else if ui.button("▶").clicked() {
                if progress >= last_index {
                    self.set_progress(-1);
                }
                self.playing = true;
                self.playback_accum = 0.0;
                self.last_playback_time = Instant::now();
            }

            if ui.button("⏮").clicked() {
                self.set_progress(-1);
            }
            if ui.button("⏭").clicked() {
                self.set_progress(last_index);
            }

            ui.separator();

            ui.label("Speed:");
            for speed in [0.5, 1.0, 2.0, 4.0, 8.0] {
                let label = format!("{}x", speed);
                if ui
                    .selectable_label((self.speed - speed).abs() < 0.01, label)
                    .clicked()
                {
                    self.speed = speed;
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{} / {} comments, {}", progress + 1, total, current_time));
            });
        });

        ui.add_space(4.0);

        let (response, painter) = ui.allocate_painter(
            Vec2::new(ui.available_width(), 32.0),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, theme::bg::TIMELINE_TRACK);

        for (index, &fraction) in fractions.iter().enumerate() {
            let x = rect.left() + fraction * rect.width();
            let color = if (index as isize) <= progress {
                theme::timeline::NOTCH_REVEALED
            } else {
                theme::timeline::NOTCH
            };
            painter.line_segment(
                [Pos2::new(x, rect.top() + 5.0), Pos2::new(x, rect.bottom() - 5.0)],
                Stroke::new(1.0, color),
            );
        }

        let head = usize::try_from(progress)
            .ok()
            .map_or(0.0, |p| fractions[p]);
        let head_x = rect.left() + head * rect.width();
        painter.rect_filled(
            Rect::from_center_size(
                Pos2::new(head_x, rect.center().y),
                Vec2::new(6.0, rect.height() - 4.0),
            ),
            2.0,
            theme::timeline::PLAYHEAD,
        );

        if response.dragged() || response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let fraction = ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0);
                let time = time_at_fraction(first_time, last_time, fraction);
                let index = self.layout.index_at_time(time);
                self.set_progress(index);
            }
        }
        self.timeline_dragging = response.dragged();
    }
}

impl eframe::App for RingsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(progress) = self.pending_progress.take() {
            self.set_progress(progress);
        }
        self.advance_playback(ctx);
        self.animate_camera(ctx);

        ctx.set_visuals(egui::Visuals::dark());

        egui::SidePanel::left("sidebar")
            .min_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_sidebar(ui);
                });
            });

        egui::TopBottomPanel::bottom("timeline")
            .min_height(70.0)
            .frame(
                egui::Frame::none()
                    .fill(theme::bg::PANEL)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0)),
            )
            .show(ctx, |ui| {
                self.render_timeline(ui);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme::bg::CANVAS))
            .show(ctx, |ui| {
                self.render_canvas(ui);
            });
    }
}

/// Ids of comments whose text or author contains `query`, ignoring case
fn matching_comment_ids(comments: &[Comment], query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    comments
        .iter()
        .filter(|c| {
            c.text.to_lowercase().contains(&query) || c.author.to_lowercase().contains(&query)
        })
        .map(|c| c.id.clone())
        .collect()
}

/// Position of `time` on the track between `first` and `last`, in [0, 1]
fn fraction_at_time(first: DateTime<Utc>, last: DateTime<Utc>, time: DateTime<Utc>) -> f32 {
    let span = (last - first).num_milliseconds();
    if span <= 0 {
        return 1.0;
    }
    let offset = (time - first).num_milliseconds();
    (offset as f64 / span as f64).clamp(0.0, 1.0) as f32
}

fn time_at_fraction(first: DateTime<Utc>, last: DateTime<Utc>, fraction: f32) -> DateTime<Utc> {
    let span = (last - first).num_milliseconds().max(0);
    let offset = (span as f64 * fraction.clamp(0.0, 1.0) as f64).round() as i64;
    first + chrono::Duration::milliseconds(offset)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
