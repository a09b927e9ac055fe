use cm_core::Vec2f;

use crate::skeleton::{Skeleton, SkeletonPoint};

// Direction index: 0=E, 1=NE, 2=N, 3=NW, 4=W, 5=SW, 6=S, 7=SE.
const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
pub(crate) const DIRS_C8: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
// Each undirected link is visited once from its earlier pixel in scan order.
const DIRS_FORWARD: [u8; 4] = [0, 5, 6, 7];

impl Skeleton {
    /// Number of skeleton neighbors of `idx`. A diagonal neighbor that is
    /// also reachable through a shared 4-neighbor is not counted, so
    /// staircase steps do not look like junctions.
    pub fn degree(&self, idx: (usize, usize)) -> usize {
        let (w, h) = (self.width(), self.height());
        if idx.0 >= w || idx.1 >= h {
            return 0;
        }
        linked_dirs(self.mask.data(), idx.1 * w + idx.0, w, h).count()
    }

    pub fn endpoint_count(&self) -> usize {
        self.points
            .iter()
            .filter(|pt| self.degree(pt.idx) == 1)
            .count()
    }

    pub fn junction_count(&self) -> usize {
        self.points
            .iter()
            .filter(|pt| self.degree(pt.idx) >= 3)
            .count()
    }

    /// Free ends of the centerline with the unit direction pointing away
    /// from the rest of the skeleton. Endpoints without a normal are skipped.
    pub fn endpoint_directions(&self) -> Vec<(SkeletonPoint, Vec2f)> {
        let (w, h) = (self.width(), self.height());
        let occupancy = self.mask.data();

        let mut out = Vec::new();
        for pt in self.iter_with_normals() {
            let p = pt.idx.1 * w + pt.idx.0;
            let mut linked = linked_dirs(occupancy, p, w, h);
            let (Some(dir), None) = (linked.next(), linked.next()) else {
                continue;
            };

            let inward = Vec2f::new(DX[dir as usize] as f32, DY[dir as usize] as f32);
            let tangent = pt.n.perp();
            let outward = if tangent.dot(inward) > 0.0 { -tangent } else { tangent };
            out.push((*pt, outward));
        }
        out
    }

    /// Length of the centerline in pixels: axis-aligned links count 1,
    /// diagonal links count sqrt(2) unless an axis-aligned detour through a
    /// shared 4-neighbor already connects the two pixels.
    pub fn path_length(&self) -> f32 {
        let (w, h) = (self.width(), self.height());
        let occupancy = self.mask.data();

        let mut len = 0.0f32;
        for pt in &self.points {
            let p = pt.idx.1 * w + pt.idx.0;
            for &dir in &DIRS_FORWARD {
                let Some(nb) = neighbor_index(p, dir, w, h) else {
                    continue;
                };
                if occupancy[nb] == 0 {
                    continue;
                }
                if !is_diagonal_dir(dir) {
                    len += 1.0;
                } else if !has_axis_detour(p, dir, occupancy, w, h) {
                    len += std::f32::consts::SQRT_2;
                }
            }
        }
        len
    }
}

/// Directions from `p` to skeleton neighbors, with diagonal links dropped
/// when an axis-aligned detour exists.
fn linked_dirs(
    occupancy: &[u8],
    p: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = u8> + '_ {
    DIRS_C8.into_iter().filter(move |&dir| {
        neighbor_index(p, dir, width, height).is_some_and(|nb| occupancy[nb] != 0)
            && !(is_diagonal_dir(dir) && has_axis_detour(p, dir, occupancy, width, height))
    })
}

#[inline]
pub(crate) fn neighbor_index(p: usize, dir: u8, width: usize, height: usize) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }

    let x = (p % width) as isize + DX[dir as usize];
    let y = (p / width) as isize + DY[dir as usize];
    index_if_in_bounds(x, y, width, height)
}

#[inline]
fn is_diagonal_dir(dir: u8) -> bool {
    DX[dir as usize] != 0 && DY[dir as usize] != 0
}

#[inline]
fn has_axis_detour(p: usize, dir: u8, occupancy: &[u8], width: usize, height: usize) -> bool {
    let x = (p % width) as isize;
    let y = (p / width) as isize;
    let dx = DX[dir as usize];
    let dy = DY[dir as usize];

    let side_a = index_if_in_bounds(x + dx, y, width, height);
    let side_b = index_if_in_bounds(x, y + dy, width, height);
    side_a.is_some_and(|i| occupancy[i] != 0) || side_b.is_some_and(|i| occupancy[i] != 0)
}

#[inline]
fn index_if_in_bounds(x: isize, y: isize, width: usize, height: usize) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }

    let (xu, yu) = (x as usize, y as usize);
    if xu >= width || yu >= height {
        return None;
    }

    Some(yu * width + xu)
}
