//! Blueprints for simple debug shapes, used to exercise fake-block sending
//! without touching the border state.

use hashbrown::HashSet;

use crate::BlockPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Platform { size: i32 },
    Cube { size: i32 },
    Sphere { radius: i32 },
    Cylinder { radius: i32, height: i32 },
    Dome { radius: i32 },
}

impl Shape {
    pub fn blueprint(self, center: BlockPos) -> HashSet<BlockPos> {
        match self {
            Shape::Platform { size } => platform(center, size),
            Shape::Cube { size } => hollow_cube(center, size),
            Shape::Sphere { radius } => sphere_shell(center, radius),
            Shape::Cylinder { radius, height } => cylinder(center, radius, height),
            Shape::Dome { radius } => dome(center, radius),
        }
    }
}

#[inline]
fn in_shell(d2: i32, radius: i32) -> bool {
    d2 > (radius - 1) * (radius - 1) && d2 <= radius * radius
}

/// Square `(2*size+1)²` slab at the center's y.
pub fn platform(center: BlockPos, size: i32) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    for x in -size..=size {
        for z in -size..=size {
            out.insert(center.offset(x, 0, z));
        }
    }
    out
}

/// Faces of the cube with half-extent `size`.
pub fn hollow_cube(center: BlockPos, size: i32) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    for x in -size..=size {
        for y in -size..=size {
            for z in -size..=size {
                if x.abs() == size || y.abs() == size || z.abs() == size {
                    out.insert(center.offset(x, y, z));
                }
            }
        }
    }
    out
}

pub fn sphere_shell(center: BlockPos, radius: i32) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                if in_shell(x * x + y * y + z * z, radius) {
                    out.insert(center.offset(x, y, z));
                }
            }
        }
    }
    out
}

/// Upper half of [`sphere_shell`], including the equator.
pub fn dome(center: BlockPos, radius: i32) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    for x in -radius..=radius {
        for y in 0..=radius {
            for z in -radius..=radius {
                if in_shell(x * x + y * y + z * z, radius) {
                    out.insert(center.offset(x, y, z));
                }
            }
        }
    }
    out
}

/// Capped tube of `height` layers starting at the center's y.
pub fn cylinder(center: BlockPos, radius: i32, height: i32) -> HashSet<BlockPos> {
    let mut out = HashSet::new();
    for y in 0..height {
        let cap = y == 0 || y == height - 1;
        for x in -radius..=radius {
            for z in -radius..=radius {
                let d2 = x * x + z * z;
                let keep = if cap { d2 <= radius * radius } else { in_shell(d2, radius) };
                if keep {
                    out.insert(center.offset(x, y, z));
                }
            }
        }
    }
    out
}
