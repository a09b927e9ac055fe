use cm_core::{FOREGROUND, Image, ImageView};
use serde::{Deserialize, Serialize};

// P2..P9: clockwise from north.
const DX: [isize; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
const DY: [isize; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinningConfig {
    /// Upper bound on full passes; `None` runs to convergence.
    pub max_passes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thinned {
    pub mask: Image<u8>,
    /// Passes that removed at least one pixel.
    pub passes: usize,
}

/// Guo-Hall parallel thinning.
///
/// Each pass runs two sub-iterations; within a sub-iteration every deletion
/// is decided against the grid as it was when the sub-iteration started.
/// A pixel is deleted only when it joins exactly one foreground run of its
/// 8-neighborhood (`C == 1`), is not an endpoint (`2 <= N <= 3`), and passes
/// the sub-iteration's directional test. Components stay connected, 2x2
/// blocks and 2-pixel-thick diagonals keep a connected core, and 1-pixel
/// strands are left intact. Outside the image counts as background.
pub fn thin_guo_hall(src: &ImageView<'_, u8>, cfg: &ThinningConfig) -> Thinned {
    let (w, h) = (src.width(), src.height());
    let mut grid: Vec<u8> = src.data().iter().map(|&v| u8::from(v != 0)).collect();

    let mut passes = 0usize;
    let mut marked = Vec::new();
    loop {
        if cfg.max_passes.is_some_and(|m| passes >= m) {
            break;
        }

        let mut changed = false;
        for odd in [false, true] {
            marked.clear();
            for p in 0..grid.len() {
                if grid[p] != 0 && removable(&neighbors(&grid, p, w, h), odd) {
                    marked.push(p);
                }
            }

            for &p in &marked {
                grid[p] = 0;
            }
            changed |= !marked.is_empty();
        }

        if !changed {
            break;
        }
        passes += 1;
    }

    let data = grid
        .into_iter()
        .map(|v| if v != 0 { FOREGROUND } else { 0 })
        .collect();
    let mask = Image::from_vec(w, h, data).expect("thinned grid keeps source dimensions");

    Thinned { mask, passes }
}

#[inline]
fn neighbors(grid: &[u8], p: usize, w: usize, h: usize) -> [bool; 8] {
    let x = (p % w) as isize;
    let y = (p / w) as isize;

    let mut out = [false; 8];
    for k in 0..8 {
        let nx = x + DX[k];
        let ny = y + DY[k];
        if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
            continue;
        }
        out[k] = grid[ny as usize * w + nx as usize] != 0;
    }
    out
}

fn removable(n: &[bool; 8], odd: bool) -> bool {
    let [p2, p3, p4, p5, p6, p7, p8, p9] = *n;

    let c = u8::from(!p2 && (p3 || p4))
        + u8::from(!p4 && (p5 || p6))
        + u8::from(!p6 && (p7 || p8))
        + u8::from(!p8 && (p9 || p2));
    if c != 1 {
        return false;
    }

    let n1 = u8::from(p9 || p2) + u8::from(p3 || p4) + u8::from(p5 || p6) + u8::from(p7 || p8);
    let n2 = u8::from(p2 || p3) + u8::from(p4 || p5) + u8::from(p6 || p7) + u8::from(p8 || p9);
    if !(2..=3).contains(&n1.min(n2)) {
        return false;
    }

    let m = if odd {
        (p2 || p3 || !p5) && p4
    } else {
        (p6 || p7 || !p9) && p8
    };
    !m
}
