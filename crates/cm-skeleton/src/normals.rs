use cm_core::Vec2f;

use crate::topology::{DIRS_C8, neighbor_index};

/// Reusable buffers for the per-point neighborhood walk.
#[derive(Debug, Default)]
pub(crate) struct NormalScratch {
    frontier: Vec<(usize, usize)>,
    visited: Vec<usize>,
}

/// Unit normal at skeleton pixel `p`, or [`Vec2f::ZERO`] when the local
/// direction is undetermined.
///
/// Gathers skeleton pixels reachable from `p` within `radius` 8-connected
/// steps and fits their principal axis. The sign is canonical: `n.y > 0`,
/// or `n.x > 0` for horizontal normals.
pub(crate) fn estimate_normal(
    occupancy: &[u8],
    width: usize,
    height: usize,
    p: usize,
    radius: usize,
    min_neighbors: usize,
    scratch: &mut NormalScratch,
) -> Vec2f {
    collect_neighborhood(occupancy, width, height, p, radius, scratch);

    let others = scratch.visited.len() - 1;
    if others == 0 || others < min_neighbors {
        return Vec2f::ZERO;
    }

    let count = scratch.visited.len() as f32;
    let (mut mx, mut my) = (0.0f32, 0.0f32);
    for &q in &scratch.visited {
        mx += (q % width) as f32;
        my += (q / width) as f32;
    }
    mx /= count;
    my /= count;

    let (mut cxx, mut cyy, mut cxy) = (0.0f32, 0.0f32, 0.0f32);
    for &q in &scratch.visited {
        let dx = (q % width) as f32 - mx;
        let dy = (q / width) as f32 - my;
        cxx += dx * dx;
        cyy += dy * dy;
        cxy += dx * dy;
    }
    if cxx + cyy <= f32::EPSILON {
        return Vec2f::ZERO;
    }

    let theta = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
    let tangent = Vec2f::new(theta.cos(), theta.sin());
    canonical_sign(tangent.perp().normalize())
}

fn collect_neighborhood(
    occupancy: &[u8],
    width: usize,
    height: usize,
    p: usize,
    radius: usize,
    scratch: &mut NormalScratch,
) {
    scratch.frontier.clear();
    scratch.visited.clear();
    scratch.visited.push(p);
    scratch.frontier.push((p, 0));

    let mut head = 0;
    while head < scratch.frontier.len() {
        let (q, depth) = scratch.frontier[head];
        head += 1;
        if depth >= radius {
            continue;
        }

        for &dir in &DIRS_C8 {
            let Some(nb) = neighbor_index(q, dir, width, height) else {
                continue;
            };
            if occupancy[nb] == 0 || scratch.visited.contains(&nb) {
                continue;
            }
            scratch.visited.push(nb);
            scratch.frontier.push((nb, depth + 1));
        }
    }
}

fn canonical_sign(n: Vec2f) -> Vec2f {
    const EPS: f32 = 1e-6;
    if n.y < -EPS || (n.y.abs() <= EPS && n.x < 0.0) {
        -n
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use cm_core::Vec2f;

    use super::{NormalScratch, estimate_normal};

    fn grid(w: usize, h: usize, pixels: &[(usize, usize)]) -> Vec<u8> {
        let mut g = vec![0u8; w * h];
        for &(x, y) in pixels {
            g[y * w + x] = 255;
        }
        g
    }

    fn assert_close(a: Vec2f, b: Vec2f) {
        assert!(
            (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn straight_lines() {
        let mut scratch = NormalScratch::default();

        let horiz: Vec<_> = (0..11).map(|x| (x, 5)).collect();
        let g = grid(11, 11, &horiz);
        let n = estimate_normal(&g, 11, 11, 5 * 11 + 5, 5, 2, &mut scratch);
        assert_close(n, Vec2f::new(0.0, 1.0));

        let vert: Vec<_> = (0..11).map(|y| (5, y)).collect();
        let g = grid(11, 11, &vert);
        let n = estimate_normal(&g, 11, 11, 5 * 11 + 5, 5, 2, &mut scratch);
        assert_close(n, Vec2f::new(1.0, 0.0));
    }

    #[test]
    fn diagonal_line() {
        let mut scratch = NormalScratch::default();
        let diag: Vec<_> = (0..11).map(|i| (i, i)).collect();
        let g = grid(11, 11, &diag);

        let n = estimate_normal(&g, 11, 11, 5 * 11 + 5, 3, 2, &mut scratch);
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert_close(n, Vec2f::new(-s, s));
    }

    #[test]
    fn walk_stays_on_the_path() {
        let mut scratch = NormalScratch::default();

        // A parallel strand two rows below is within the window but not
        // reachable along the skeleton, so it must not tilt the fit.
        let mut pixels: Vec<_> = (0..15).map(|x| (x, 5)).collect();
        pixels.extend((0..4).map(|i| (9 + i, 7 + i)));
        let g = grid(15, 15, &pixels);

        let n = estimate_normal(&g, 15, 15, 5 * 15 + 4, 3, 2, &mut scratch);
        assert_close(n, Vec2f::new(0.0, 1.0));
    }

    #[test]
    fn too_few_neighbors_is_degenerate() {
        let mut scratch = NormalScratch::default();

        let g = grid(5, 5, &[(2, 2)]);
        assert_eq!(
            estimate_normal(&g, 5, 5, 12, 5, 2, &mut scratch),
            Vec2f::ZERO
        );

        let g = grid(5, 5, &[(2, 2), (3, 2)]);
        assert_eq!(
            estimate_normal(&g, 5, 5, 12, 5, 2, &mut scratch),
            Vec2f::ZERO
        );
        let n = estimate_normal(&g, 5, 5, 12, 5, 1, &mut scratch);
        assert_close(n, Vec2f::new(0.0, 1.0));
    }
}
