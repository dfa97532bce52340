//! Persistent layout settings.
//!
//! Every field has a serde default so older or partial settings files still
//! load. Physics constants are heuristics tuned for visual separation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// All tunable layout and simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    // Geometry
    /// Radius assigned to the least-liked comment
    pub min_radius: f32,
    /// Radius assigned to the most-liked comment
    pub max_radius: f32,

    // Canvas
    pub canvas_width: f32,
    pub canvas_height: f32,

    // Simulation
    /// Barnes-Hut acceptance threshold (theta squared)
    pub theta2: f32,
    /// Many-body charge per unit of ring radius
    pub charge: f32,
    /// Softening distance for the many-body force
    pub distance_min: f32,
    /// Pull toward the canvas center
    pub center_strength: f32,
    /// Fraction of velocity removed per tick
    pub velocity_decay: f32,
    /// Simulation temperature, held constant for the whole pass
    pub alpha: f32,
    pub link_iterations: usize,
    pub main_iterations: usize,

    // Collision
    pub collision_strength: f32,
    pub collision_iterations: usize,
    /// Radius multiplier for directly linked rings, below 1 so peripherals nest
    pub immediate_shrink: f32,
    /// Extra radius between rings of different buckets
    pub bucket_margin: f32,

    // Camera
    /// Fraction of the canvas a zoomed-to ring should fill
    pub zoom_fill: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Seed for the jitter used on coincident positions
    pub seed: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            min_radius: 4.0,
            max_radius: 28.0,

            canvas_width: 1200.0,
            canvas_height: 800.0,

            theta2: 0.81,
            charge: 6.0,
            distance_min: 1.0,
            center_strength: 0.02,
            velocity_decay: 0.4,
            alpha: 1.0,
            link_iterations: 80,
            main_iterations: 240,

            collision_strength: 0.7,
            collision_iterations: 1,
            immediate_shrink: 0.85,
            bucket_margin: 12.0,

            zoom_fill: 0.8,
            min_zoom: 0.05,
            max_zoom: 8.0,

            seed: 0x5eed,
        }
    }
}

impl LayoutSettings {
    /// Default location of the settings file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("comment-rings");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// A missing or unparsable file is not an error: defaults are returned and
    /// the problem is logged.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => {
                    tracing::warn!("could not determine config directory, using default settings");
                    return Self::default();
                }
            },
        };

        match Self::read(&path) {
            Ok(settings) => {
                tracing::info!(?path, "loaded settings");
                settings.sanitized()
            }
            Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().ok_or(Error::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
        tracing::info!(?path, "saved settings");
        Ok(())
    }

    /// Clamp values that would stall or blow up the simulation
    pub fn sanitized(mut self) -> Self {
        self.min_radius = self.min_radius.max(0.5);
        self.max_radius = self.max_radius.max(self.min_radius);
        self.theta2 = self.theta2.max(0.0);
        self.distance_min = self.distance_min.max(0.01);
        self.velocity_decay = self.velocity_decay.clamp(0.0, 1.0);
        self.immediate_shrink = self.immediate_shrink.clamp(0.1, 1.0);
        self.bucket_margin = self.bucket_margin.max(0.0);
        self.zoom_fill = self.zoom_fill.clamp(0.05, 1.0);
        self.min_zoom = self.min_zoom.max(0.001);
        self.max_zoom = self.max_zoom.max(self.min_zoom);
        self.canvas_width = self.canvas_width.max(1.0);
        self.canvas_height = self.canvas_height.max(1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let settings: LayoutSettings =
            serde_json::from_str(r#"{ "min_radius": 2.0, "seed": 7 }"#).unwrap();
        assert_eq!(settings.min_radius, 2.0);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.max_radius, LayoutSettings::default().max_radius);
    }

    #[test]
    fn sanitize_orders_radius_range() {
        let settings = LayoutSettings {
            min_radius: 10.0,
            max_radius: 3.0,
            ..Default::default()
        }
        .sanitized();
        assert!(settings.max_radius >= settings.min_radius);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("comment-rings-missing-settings.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(LayoutSettings::load(Some(&path)), LayoutSettings::default());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("comment-rings-settings-{}", std::process::id()))
            .join("settings.json");
        let settings = LayoutSettings {
            charge: 9.5,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(LayoutSettings::load(Some(&path)).charge, 9.5);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
