//! PNG snapshots of the fuel graph
//!
//! The node grid is drawn with row 0 at the bottom of the image, each node as a
//! square block of `pixel_scale` pixels.

use super::SnapshotWriter;
use crate::core_types::FireState;
use crate::error::Result;
use crate::grid::ForestGraph;
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Colours for empty, not burnt, burning and burnt, indexed by [`FireState::code`]
pub const PALETTE: [[u8; 3]; 4] = [[255, 255, 255], [0, 153, 0], [255, 128, 0], [204, 0, 0]];

#[derive(Debug, Clone, Copy)]
pub struct PngSnapshotWriter {
    pixel_scale: u32,
}

impl PngSnapshotWriter {
    pub fn new(pixel_scale: u32) -> Self {
        Self {
            pixel_scale: pixel_scale.max(1),
        }
    }

    /// Render the graph to an image
    pub fn render(&self, graph: &ForestGraph) -> RgbImage {
        let side = graph.grid_size() as u32;
        let scale = self.pixel_scale;
        let mut img = RgbImage::from_pixel(side * scale, side * scale, Rgb(PALETTE[0]));

        let mut skipped = 0;
        for (id, node) in graph.nodes() {
            let (row, col) = graph.id_to_grid(id);
            if row >= side as usize || col >= side as usize {
                skipped += 1;
                continue;
            }
            if node.state == FireState::Empty {
                continue;
            }
            let color = Rgb(PALETTE[usize::from(node.state.code())]);
            let x0 = col as u32 * scale;
            let y0 = (side - 1 - row as u32) * scale;
            for y in y0..y0 + scale {
                for x in x0..x0 + scale {
                    img.put_pixel(x, y, color);
                }
            }
        }
        if skipped > 0 {
            warn!("{} nodes fall outside the {}x{} snapshot grid; skipped", skipped, side, side);
        }
        img
    }
}

impl Default for PngSnapshotWriter {
    fn default() -> Self {
        Self::new(8)
    }
}

impl SnapshotWriter<ForestGraph> for PngSnapshotWriter {
    fn file_name(&self, step: u32) -> String {
        format!("timestep_{step:04}.png")
    }

    fn write(&self, graph: &ForestGraph, step: u32, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name(step));
        self.render(graph).save_with_format(&path, ImageFormat::Png)?;
        Ok(path)
    }
}
