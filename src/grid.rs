//! Indexed-image to cell-grid assembly (spec §4.E), ported from
//! `original_source/src/generator.cpp`'s `makeCCImage`: truncates the
//! quantized image to a multiple of 2 wide and 3 tall, regroups pixels
//! into 2x3 blocks, and dispatches each block through
//! [`crate::cell::encode_cell`] via the work queue.

use crate::cell::encode_cell;
use crate::color::Rgb;
use crate::error::Result;
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

/// The character and color planes produced from one quantized frame,
/// in cell (not pixel) coordinates.
pub struct CellGrid {
    pub width: usize,
    pub height: usize,
    pub characters: Vec<u8>,
    pub colors: Vec<u8>,
}

pub fn build_cell_grid(indexed: &Mat<u8>, palette: &[Rgb], queue: &WorkQueue) -> Result<CellGrid> {
    let src_width = indexed.width() - indexed.width() % 2;
    let src_height = indexed.height() - indexed.height() % 3;
    let cell_width = src_width / 2;
    let cell_height = src_height / 3;
    let cell_count = cell_width * cell_height;

    let mut blocks = vec![[0u8; 6]; cell_count];
    for cy in 0..cell_height {
        for cx in 0..cell_width {
            let mut block = [0u8; 6];
            for (row, slot) in block.chunks_mut(2).enumerate() {
                let y = cy * 3 + row;
                slot[0] = *indexed.at(cx * 2, y)?;
                slot[1] = *indexed.at(cx * 2 + 1, y)?;
            }
            blocks[cy * cell_width + cx] = block;
        }
    }

    let palette = palette.to_vec();
    let characters = std::sync::Arc::new(std::sync::Mutex::new(vec![0u8; cell_count]));
    let colors = std::sync::Arc::new(std::sync::Mutex::new(vec![0u8; cell_count]));

    let chunk_size = (cell_count / parallelism()).max(1);
    let mut offset = 0usize;
    while offset < cell_count {
        let n = chunk_size.min(cell_count - offset);
        let blocks_chunk = blocks[offset..offset + n].to_vec();
        let palette = palette.clone();
        let characters = std::sync::Arc::clone(&characters);
        let colors = std::sync::Arc::clone(&colors);
        let start = offset;
        queue.push(move || {
            let mut local_chars = vec![0u8; blocks_chunk.len()];
            let mut local_colors = vec![0u8; blocks_chunk.len()];
            for (i, block) in blocks_chunk.iter().enumerate() {
                if let Ok((c, cc)) = encode_cell(*block, &palette) {
                    local_chars[i] = c;
                    local_colors[i] = cc;
                }
            }
            characters.lock().unwrap()[start..start + n].copy_from_slice(&local_chars);
            colors.lock().unwrap()[start..start + n].copy_from_slice(&local_colors);
        });
        offset += n;
    }
    queue.wait();

    let characters = std::sync::Arc::try_unwrap(characters)
        .expect("all queued closures have completed by now")
        .into_inner()
        .unwrap();
    let colors = std::sync::Arc::try_unwrap(colors)
        .expect("all queued closures have completed by now")
        .into_inner()
        .unwrap();

    Ok(CellGrid { width: cell_width, height: cell_height, characters, colors })
}

fn parallelism() -> usize {
    std::thread::available_parallelism().map(|p| p.get()).unwrap_or(8)
}
