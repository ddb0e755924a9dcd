//! Lightmap post-processing: face-restricted blur and texel bleed reduction.

use crate::{color::Color, page::LightmapPage, partition::Partition, progress::ProgressData};

/// Box-blurs every face patch with a `(2 * radius + 1)` square window. Only
/// covered texels of the same face contribute to the average, so colors never
/// bleed across unrelated patches. The pass reads the pre-blur snapshot
/// colors, which makes it idempotent: re-running it with the same radius
/// yields the same output. A zero radius leaves the patches untouched.
pub(crate) fn blur_faces(partition: &mut Partition, radius: usize, progress: &ProgressData) {
    if radius == 0 {
        return;
    }
    let radius = radius as isize;

    for face in partition.faces.iter_mut() {
        let width = face.patch_width() as isize;
        let height = face.patch_height() as isize;

        for y in 0..height {
            for x in 0..width {
                if !face.texels[(y * width + x) as usize].covered {
                    continue;
                }

                let mut sum = [0u32; 3];
                let mut count = 0u32;
                for dy in -radius..=radius {
                    let ny = y + dy;
                    if ny < 0 || ny >= height {
                        continue;
                    }
                    for dx in -radius..=radius {
                        let nx = x + dx;
                        if nx < 0 || nx >= width {
                            continue;
                        }
                        let neighbor = &face.texels[(ny * width + nx) as usize];
                        if neighbor.covered {
                            sum[0] += neighbor.orig_color.r as u32;
                            sum[1] += neighbor.orig_color.g as u32;
                            sum[2] += neighbor.orig_color.b as u32;
                            count += 1;
                        }
                    }
                }

                // The texel itself is covered, so count is at least one.
                face.texels[(y * width + x) as usize].color = Color::opaque(
                    (sum[0] / count) as u8,
                    (sum[1] / count) as u8,
                    (sum[2] / count) as u8,
                );
            }
        }

        progress.advance_progress(1);
    }
}

/// Fills uncovered page texels bordering covered ones with the average of
/// their covered 8-neighbors. This keeps bilinear texture filtering at patch
/// borders from sampling the void (or a neighboring patch) at render time.
/// Coverage marks are left untouched, so a second run reads the same inputs
/// and reproduces the same output.
pub(crate) fn reduce_bleeding(page: &mut LightmapPage) {
    let size = page.size;
    let mut filled = Vec::with_capacity(size * size / 8);

    for y in 0..size {
        for x in 0..size {
            if page.covered[y * size + x] {
                continue;
            }

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for ny in y.saturating_sub(1)..(y + 2).min(size) {
                for nx in x.saturating_sub(1)..(x + 2).min(size) {
                    if page.covered[ny * size + nx] {
                        let color = page.texels[ny * size + nx];
                        sum[0] += color.r as u32;
                        sum[1] += color.g as u32;
                        sum[2] += color.b as u32;
                        count += 1;
                    }
                }
            }

            if count > 0 {
                filled.push((
                    y * size + x,
                    Color::opaque(
                        (sum[0] / count) as u8,
                        (sum[1] / count) as u8,
                        (sum[2] / count) as u8,
                    ),
                ));
            }
        }
    }

    for (index, color) in filled {
        page.texels[index] = color;
    }
}
