// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: colour filters, rotation, brightness/contrast, thresholding,
// and signature overlay for review pages.

pub mod adjust;
pub mod overlay;
pub mod threshold;

pub use adjust::{AdjustedPage, AdjustmentPipeline};
pub use overlay::SignaturePlacement;
