// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner editor: drag handles to refine a detected page outline.

use scanwerk_core::{Point, Quad};
use tracing::debug;

/// Default hit radius for a handle, in image pixels.
pub const DEFAULT_HIT_RADIUS: f32 = 20.0;

/// Interactive state for refining four corners.
///
/// The editor trusts corner indices, not geometry: dragging a handle never
/// reorders the quad, so a self-intersecting outline is a legal result.
/// [`confirm`](Self::confirm) and [`cancel`](Self::cancel) consume the
/// editor, so no edits can follow either.
#[derive(Debug, Clone)]
pub struct CornerEditor {
    quad: Quad,
    image_width: f32,
    image_height: f32,
    dragging: Option<usize>,
}

impl CornerEditor {
    pub fn new(initial: Quad, image_width: u32, image_height: u32) -> Self {
        Self {
            quad: initial,
            image_width: image_width as f32,
            image_height: image_height as f32,
            dragging: None,
        }
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// The corner nearest `point` that lies strictly within `radius`.
    /// Equal distances go to the lower index.
    pub fn hit_test(&self, point: Point, radius: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, corner) in self.quad.corners().iter().enumerate() {
            let d = corner.distance(&point);
            if d < radius && best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((index, d));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Start dragging corner `index`. Out-of-range indices are ignored.
    pub fn begin_drag(&mut self, index: usize) -> bool {
        if index < 4 {
            self.dragging = Some(index);
            true
        } else {
            false
        }
    }

    /// Hit-test `point` with the default radius and start dragging what it
    /// lands on.
    pub fn press(&mut self, point: Point) -> Option<usize> {
        let index = self.hit_test(point, DEFAULT_HIT_RADIUS)?;
        self.begin_drag(index);
        Some(index)
    }

    /// Move the dragged corner to `point`, clamped to the image. Returns
    /// whether anything moved.
    pub fn update_drag(&mut self, point: Point) -> bool {
        let Some(index) = self.dragging else {
            return false;
        };
        if !point.is_finite() {
            return false;
        }
        let clamped = point.clamped(self.image_width, self.image_height);
        self.quad.set_corner(index, clamped);
        debug!(index, x = clamped.x, y = clamped.y, "corner moved");
        true
    }

    /// Stop dragging. Safe to call with no drag active.
    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Finish with the edited outline.
    pub fn confirm(self) -> Quad {
        self.quad
    }

    /// Abandon the edit.
    pub fn cancel(self) {
        debug!("corner edit cancelled");
    }

    /// Draw list for the current state.
    pub fn render(&self) -> Vec<DrawCommand> {
        render(&self.quad, self.dragging)
    }
}

/// Visual state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Idle,
    Active,
}

/// One drawing instruction for the corner overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Closed outline through the corners in stored order.
    Outline { points: [Point; 4] },
    /// A marker on one corner.
    Handle {
        index: usize,
        center: Point,
        state: HandleState,
    },
}

/// The outline, then one handle per corner; the dragged handle is active.
pub fn render(quad: &Quad, dragging: Option<usize>) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(5);
    commands.push(DrawCommand::Outline {
        points: *quad.corners(),
    });
    for (index, center) in quad.corners().iter().enumerate() {
        let state = if dragging == Some(index) {
            HandleState::Active
        } else {
            HandleState::Idle
        };
        commands.push(DrawCommand::Handle {
            index,
            center: *center,
            state,
        });
    }
    commands
}
