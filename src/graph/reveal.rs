//! Timeline reveal and overlay flags.
//!
//! `progress` is the index of the last revealed comment (-1 = nothing shown).
//! Moving it only touches the circles between the old and new values. The
//! displayed members of a ring always form a prefix of its chain: showing a
//! member pulls in any hidden predecessors, hiding one drops any displayed
//! successors first.

use std::collections::{BTreeSet, HashSet};

use super::layout::Camera;
use super::types::Geometry;

/// Change notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    Rebuilt {
        circles: usize,
        rings: usize,
        buckets: usize,
    },
    CircleShown(usize),
    CircleHidden(usize),
    /// Focus or highlight flag of a circle changed
    CircleOverlay(usize),
    /// Displayed or focused flag of a ring changed
    RingChanged(usize),
    SelectionChanged {
        previous: Option<usize>,
        current: Option<usize>,
    },
    Zoom(Camera),
}

/// Chronological reveal cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealState {
    progress: isize,
}

impl Default for RevealState {
    fn default() -> Self {
        Self { progress: -1 }
    }
}

impl RevealState {
    pub fn progress(&self) -> isize {
        self.progress
    }

    /// Move the cursor, touching only the delta range
    pub fn set_progress(&mut self, geometry: &mut Geometry, target: isize) -> Vec<LayoutEvent> {
        let last = geometry.circles.len() as isize - 1;
        let target = target.clamp(-1, last);
        let mut events = Vec::new();
        if target == self.progress {
            return events;
        }

        let mut touched = BTreeSet::new();
        if target > self.progress {
            for index in (self.progress + 1)..=target {
                show_circle(geometry, index as usize, &mut touched, &mut events);
            }
        } else {
            for index in ((target + 1)..=self.progress).rev() {
                hide_circle(geometry, index as usize, &mut touched, &mut events);
            }
        }

        tracing::trace!(from = self.progress, to = target, "progress moved");
        self.progress = target;
        refresh_rings(geometry, touched, &mut events);
        events
    }
}

fn show_circle(
    geometry: &mut Geometry,
    index: usize,
    touched: &mut BTreeSet<usize>,
    events: &mut Vec<LayoutEvent>,
) {
    // Hidden predecessors up the chain, nearest first
    let mut pending = Vec::new();
    let mut cursor = Some(index);
    while let Some(c) = cursor {
        let circle = &geometry.circles[c];
        if circle.is_displayed {
            break;
        }
        pending.push(c);
        cursor = circle.inner_parent;
    }
    if pending.len() > 1 {
        tracing::debug!(index, repaired = pending.len() - 1, "revealing chain predecessors");
    }

    for c in pending.into_iter().rev() {
        let circle = &mut geometry.circles[c];
        circle.is_displayed = true;
        touched.insert(circle.ring);
        events.push(LayoutEvent::CircleShown(c));
    }
}

fn hide_circle(
    geometry: &mut Geometry,
    index: usize,
    touched: &mut BTreeSet<usize>,
    events: &mut Vec<LayoutEvent>,
) {
    let ring = geometry.circles[index].ring;
    let members = &geometry.rings[ring].members;
    let Some(position) = members.iter().position(|&m| m == index) else {
        return;
    };
    let chain: Vec<usize> = members[position..].to_vec();

    for c in chain.into_iter().rev() {
        let circle = &mut geometry.circles[c];
        if circle.is_displayed {
            circle.is_displayed = false;
            touched.insert(ring);
            events.push(LayoutEvent::CircleHidden(c));
        }
    }
}

/// Recompute derived ring flags for `touched` rings
fn refresh_rings(
    geometry: &mut Geometry,
    touched: BTreeSet<usize>,
    events: &mut Vec<LayoutEvent>,
) {
    for r in touched {
        let ring = &geometry.rings[r];
        let displayed = geometry.circles[ring.pivot].is_displayed;
        let focused = ring.members.iter().any(|&m| geometry.circles[m].is_focused);

        let ring = &mut geometry.rings[r];
        if ring.is_displayed != displayed || ring.is_focused != focused {
            ring.is_displayed = displayed;
            ring.is_focused = focused;
            events.push(LayoutEvent::RingChanged(r));
        }
    }
}

fn id_set<I, S>(ids: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|s| s.as_ref().to_owned()).collect()
}

fn matched(geometry: &Geometry, ids: &HashSet<String>) -> usize {
    ids.iter()
        .filter(|id| geometry.circle_ids.contains_key(id.as_str()))
        .count()
}

/// Mark exactly the circles in `ids` as focused.
///
/// Returns how many ids resolved to a circle; unknown ids are ignored.
pub fn set_focused<I, S>(geometry: &mut Geometry, ids: I) -> (usize, Vec<LayoutEvent>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids = id_set(ids);
    let mut events = Vec::new();
    let mut touched = BTreeSet::new();

    for circle in &mut geometry.circles {
        let focused = ids.contains(&circle.id);
        if circle.is_focused != focused {
            circle.is_focused = focused;
            touched.insert(circle.ring);
            events.push(LayoutEvent::CircleOverlay(circle.index));
        }
    }

    refresh_rings(geometry, touched, &mut events);
    (matched(geometry, &ids), events)
}

/// Mark exactly the circles in `ids` as highlighted.
///
/// A ring whose first highlighted non-pivot member hangs directly off the
/// pivot also gets its pivot highlighted, tying the match to its parent.
pub fn set_highlighted<I, S>(geometry: &mut Geometry, ids: I) -> (usize, Vec<LayoutEvent>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids = id_set(ids);
    let mut wanted: Vec<bool> = geometry
        .circles
        .iter()
        .map(|c| ids.contains(&c.id))
        .collect();

    for ring in &geometry.rings {
        let first = ring.members.iter().skip(1).find(|&&m| wanted[m]);
        if let Some(&first) = first {
            if geometry.circles[first].inner_parent == Some(ring.pivot) {
                wanted[ring.pivot] = true;
            }
        }
    }

    let mut events = Vec::new();
    for (circle, highlighted) in geometry.circles.iter_mut().zip(wanted) {
        if circle.is_highlighted != highlighted {
            circle.is_highlighted = highlighted;
            events.push(LayoutEvent::CircleOverlay(circle.index));
        }
    }
    (matched(geometry, &ids), events)
}

/// Move the selected flag from `previous` to `current`
pub fn move_selection(geometry: &mut Geometry, previous: Option<usize>, current: Option<usize>) {
    if let Some(ring) = previous.and_then(|r| geometry.rings.get_mut(r)) {
        ring.is_selected = false;
    }
    if let Some(ring) = current.and_then(|r| geometry.rings.get_mut(r)) {
        ring.is_selected = true;
    }
}
