//! Layout conversion between space-major and time-major buffers.

use rayon::prelude::*;

/// Columns handled together so source reads stay within one cache line run.
const TILE: usize = 64;

/// Transpose a row-major `rows x cols` buffer into a row-major `cols x rows` buffer.
///
/// Work is split into column tiles processed in parallel; each tile owns a
/// disjoint stretch of the output so no synchronisation is needed.
pub fn transpose(src: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    debug_assert_eq!(src.len(), rows * cols);
    let mut out = vec![0f32; src.len()];
    if rows == 0 || cols == 0 {
        return out;
    }

    out.par_chunks_mut(rows * TILE)
        .enumerate()
        .for_each(|(tile, block)| {
            let c0 = tile * TILE;
            let width = block.len() / rows;
            for r in 0..rows {
                let row = &src[r * cols + c0..r * cols + c0 + width];
                for (dc, value) in row.iter().enumerate() {
                    block[dc * rows + r] = *value;
                }
            }
        });

    out
}
