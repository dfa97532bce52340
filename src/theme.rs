//! Color palette and stroke widths for the ring viewer.
//!
//! Circle colors come from comment authors; everything else the canvas
//! and panels draw is sourced from here.

use egui::Color32;

/// Multiplier applied to circles outside the current focus
pub const DIMMED: f32 = 0.25;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Canvas background - darkest layer
    pub const CANVAS: Color32 = Color32::from_rgb(14, 17, 23);

    /// Panel backgrounds - slightly lighter than the canvas
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);

    /// Translucent disc behind a ring's strokes
    pub const RING: Color32 = Color32::from_rgba_premultiplied(18, 20, 26, 150);

    pub const TOOLTIP: Color32 = Color32::from_rgba_premultiplied(18, 18, 27, 230);

    /// Timeline track background
    pub const TIMELINE_TRACK: Color32 = Color32::from_rgb(30, 33, 40);
}

/// Accent colors
pub mod accent {
    use super::*;

    pub const ORANGE: Color32 = Color32::from_rgb(255, 149, 0);

    pub const CYAN: Color32 = Color32::from_rgb(6, 182, 212);

    pub const RED: Color32 = Color32::from_rgb(239, 68, 68);

    /// Selection outline
    pub const YELLOW: Color32 = Color32::from_rgb(255, 220, 80);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    /// Muted text - low contrast for less important info
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);

    /// Members not yet revealed
    pub const DISABLED: Color32 = Color32::from_rgb(80, 85, 95);
}

/// State colors for interactive elements
pub mod state {
    use super::*;

    pub const HOVER: Color32 = Color32::WHITE;

    pub const SELECTED: Color32 = super::accent::YELLOW;

    pub const ERROR: Color32 = super::accent::RED;

    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
}

/// Reveal timeline colors
pub mod timeline {
    use super::*;

    /// Comment not yet revealed
    pub const NOTCH: Color32 = Color32::from_rgb(60, 65, 75);

    pub const NOTCH_REVEALED: Color32 = super::accent::ORANGE;

    pub const PLAYHEAD: Color32 = super::accent::CYAN;
}

/// Helper to create a stroke with consistent styling
pub fn stroke(color: Color32, width: f32) -> egui::Stroke {
    egui::Stroke::new(width, color)
}

/// Circle and ring stroke widths
pub mod stroke_width {
    pub const NORMAL: f32 = 1.5;

    pub const HOVER: f32 = 2.0;

    pub const SELECTED: f32 = 2.0;

    /// Circles matching the search
    pub const HIGHLIGHT: f32 = 3.5;
}

/// Push a color halfway toward white
pub fn brighten(color: Color32) -> Color32 {
    Color32::from_rgb(
        lerp_u8(color.r(), 255, 0.5),
        lerp_u8(color.g(), 255, 0.5),
        lerp_u8(color.b(), 255, 0.5),
    )
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let result = a as f32 + (b as f32 - a as f32) * t;
    result.clamp(0.0, 255.0) as u8
}
