use hashbrown::HashSet;
use rayon::prelude::*;

use crate::{BlockPos, ChunkCoord, WorldHeight};

/// Inclusive rectangle of block columns on the XZ plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnRect {
    pub x0: i32,
    pub z0: i32,
    pub x1: i32,
    pub z1: i32,
}

impl ColumnRect {
    #[inline]
    pub const fn new(x0: i32, z0: i32, x1: i32, z1: i32) -> Self {
        Self { x0, z0, x1, z1 }
    }

    #[inline]
    pub fn around(cx: i32, cz: i32, r: i32) -> Self {
        Self::new(cx - r, cz - r, cx + r, cz + r)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.z0 > self.z1
    }

    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.x0 && x <= self.x1 && z >= self.z0 && z <= self.z1
    }

    pub fn area(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.x1 - self.x0 + 1) as usize) * ((self.z1 - self.z0 + 1) as usize)
    }

    pub fn intersect(&self, other: &ColumnRect) -> ColumnRect {
        ColumnRect::new(
            self.x0.max(other.x0),
            self.z0.max(other.z0),
            self.x1.min(other.x1),
            self.z1.min(other.z1),
        )
    }
}

#[inline]
fn on_ring(dx: i32, dz: i32, radius: i32) -> bool {
    (dx as f64).hypot(dz as f64).round() as i64 == i64::from(radius)
}

/// Inclusive y span of a ring wall, clipped to the world.
#[inline]
fn ring_span(center_y: i32, height_half: i32, height: WorldHeight) -> Option<(i32, i32)> {
    if height_half < 0 {
        return None;
    }
    let lo = height.min_y.max(center_y.saturating_sub(height_half));
    let hi = (height.max_y - 1).min(center_y.saturating_add(height_half));
    (lo <= hi).then_some((lo, hi))
}

fn ring_over(
    center: BlockPos,
    radius: i32,
    height_half: i32,
    height: WorldHeight,
    rect: ColumnRect,
) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    if radius < 0 {
        return out;
    }
    let Some((lo, hi)) = ring_span(center.y, height_half, height) else {
        return out;
    };
    let rect = rect.intersect(&ColumnRect::around(center.x, center.z, radius));
    if rect.is_empty() {
        return out;
    }
    for x in rect.x0..=rect.x1 {
        for z in rect.z0..=rect.z1 {
            if on_ring(x - center.x, z - center.z, radius) {
                out.extend((lo..=hi).map(|y| BlockPos::new(x, y, z)));
            }
        }
    }
    out
}

/// One-block-thick ring of columns at `round(hypot(dx, dz)) == radius`
/// around `center`, spanning `center.y ± height_half` clipped to the world.
pub fn ring(
    center: BlockPos,
    radius: i32,
    height_half: i32,
    height: WorldHeight,
) -> HashSet<BlockPos> {
    ring_over(
        center,
        radius,
        height_half,
        height,
        ColumnRect::around(center.x, center.z, radius.max(0)),
    )
}

/// [`ring`] restricted to the columns of a single chunk.
pub fn ring_in_chunk(
    center: BlockPos,
    radius: i32,
    height_half: i32,
    height: WorldHeight,
    chunk: ChunkCoord,
) -> HashSet<BlockPos> {
    ring_over(center, radius, height_half, height, chunk.columns())
}

#[inline]
fn enclosure_column<F>(
    x: i32,
    z: i32,
    center: BlockPos,
    radius: i32,
    height: WorldHeight,
    occluding: &F,
    out: &mut Vec<BlockPos>,
) where
    F: Fn(BlockPos) -> bool,
{
    let dx = i64::from(x - center.x);
    let dz = i64::from(z - center.z);
    let d2 = dx * dx + dz * dz;
    let r = i64::from(radius);
    if d2 > r * r {
        return;
    }
    let cap_y = height.max_y - 1;
    out.push(BlockPos::new(x, cap_y, z));
    if d2 > (r - 1) * (r - 1) {
        for y in (height.min_y + 1)..cap_y {
            let pos = BlockPos::new(x, y, z);
            if !occluding(pos) {
                out.push(pos);
            }
        }
    }
}

/// Filled cap on the top layer of the world plus a one-block cylindrical
/// wall from `min_y + 1` up to the cap. Wall blocks where `occluding`
/// reports an opaque real block are left out.
pub fn enclosure<F>(
    center: BlockPos,
    radius: i32,
    height: WorldHeight,
    occluding: F,
) -> HashSet<BlockPos>
where
    F: Fn(BlockPos) -> bool + Sync,
{
    if radius < 0 || height.max_y <= height.min_y {
        return HashSet::new();
    }
    let rect = ColumnRect::around(center.x, center.z, radius);
    let cols: Vec<BlockPos> = (rect.x0..=rect.x1)
        .into_par_iter()
        .flat_map_iter(|x| {
            let mut row = Vec::new();
            for z in rect.z0..=rect.z1 {
                enclosure_column(x, z, center, radius, height, &occluding, &mut row);
            }
            row
        })
        .collect();
    cols.into_iter().collect()
}

/// [`enclosure`] restricted to the columns of a single chunk.
pub fn enclosure_in_chunk<F>(
    center: BlockPos,
    radius: i32,
    height: WorldHeight,
    chunk: ChunkCoord,
    occluding: F,
) -> HashSet<BlockPos>
where
    F: Fn(BlockPos) -> bool,
{
    if radius < 0 || height.max_y <= height.min_y {
        return HashSet::new();
    }
    let rect = chunk
        .columns()
        .intersect(&ColumnRect::around(center.x, center.z, radius));
    if rect.is_empty() {
        return HashSet::new();
    }
    let mut row = Vec::new();
    for x in rect.x0..=rect.x1 {
        for z in rect.z0..=rect.z1 {
            enclosure_column(x, z, center, radius, height, &occluding, &mut row);
        }
    }
    row.into_iter().collect()
}
