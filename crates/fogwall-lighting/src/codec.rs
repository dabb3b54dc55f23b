//! Nibble-packed light sections.
//!
//! A 16x16x16 section holds 4096 light levels (0-15), two per byte, in a
//! 2048-byte array ordered Y, then Z, then X. Even indices use the low
//! nibble, odd indices the high nibble. This is the layout the client
//! expects on the wire, so it must not change.

/// Bytes in one packed light section.
pub const LIGHT_SECTION_BYTES: usize = 2048;

/// Levels per section.
pub const LIGHT_SECTION_VOLUME: usize = 4096;

pub const MAX_LIGHT: u8 = 15;

/// Section payload that reads as level 0 everywhere.
pub static ALL_DARK_SECTION: [u8; LIGHT_SECTION_BYTES] = [0; LIGHT_SECTION_BYTES];

#[inline]
pub fn all_dark_section() -> &'static [u8; LIGHT_SECTION_BYTES] {
    &ALL_DARK_SECTION
}

#[inline]
pub const fn light_index(x: usize, y: usize, z: usize) -> usize {
    y * 256 + z * 16 + x
}

/// Inverse of [`light_index`]: `(x, y, z)`.
#[inline]
pub const fn coords_from_index(index: usize) -> (usize, usize, usize) {
    let y = index / 256;
    let rem = index % 256;
    (rem % 16, y, rem / 16)
}

/// Level at `(x, y, z)`; 0 if the buffer is too short to hold it.
#[inline]
pub fn get_light(buf: &[u8], x: usize, y: usize, z: usize) -> u8 {
    let index = light_index(x, y, z);
    match buf.get(index / 2) {
        Some(&b) if index % 2 == 1 => (b >> 4) & 0x0F,
        Some(&b) => b & 0x0F,
        None => 0,
    }
}

/// Writes `level` (clamped to 15) into the nibble for `(x, y, z)`, leaving
/// the neighbouring nibble untouched. Out-of-range writes are ignored.
#[inline]
pub fn set_light(buf: &mut [u8], x: usize, y: usize, z: usize, level: u8) {
    let index = light_index(x, y, z);
    let level = level.min(MAX_LIGHT);
    let Some(b) = buf.get_mut(index / 2) else {
        return;
    };
    if index % 2 == 1 {
        *b = (*b & 0x0F) | (level << 4);
    } else {
        *b = (*b & 0xF0) | level;
    }
}

/// Owned packed section.
#[derive(Clone, PartialEq, Eq)]
pub struct LightSection {
    data: Box<[u8; LIGHT_SECTION_BYTES]>,
}

impl LightSection {
    pub fn dark() -> Self {
        Self {
            data: Box::new([0; LIGHT_SECTION_BYTES]),
        }
    }

    pub fn filled(level: u8) -> Self {
        let level = level.min(MAX_LIGHT);
        Self {
            data: Box::new([level | (level << 4); LIGHT_SECTION_BYTES]),
        }
    }

    /// Wraps raw packet bytes; `None` unless exactly one section long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let data: [u8; LIGHT_SECTION_BYTES] = bytes.try_into().ok()?;
        Some(Self {
            data: Box::new(data),
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        get_light(&self.data[..], x, y, z)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, level: u8) {
        set_light(&mut self.data[..], x, y, z, level);
    }

    /// Consuming form of [`LightSection::set`].
    #[inline]
    pub fn with(mut self, x: usize, y: usize, z: usize, level: u8) -> Self {
        self.set(x, y, z, level);
        self
    }

    pub fn fill(&mut self, level: u8) {
        let level = level.min(MAX_LIGHT);
        self.data.fill(level | (level << 4));
    }

    pub fn is_dark(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; LIGHT_SECTION_BYTES] {
        &self.data
    }
}

impl Default for LightSection {
    fn default() -> Self {
        Self::dark()
    }
}

impl std::fmt::Debug for LightSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.data.iter().filter(|b| **b != 0).count();
        f.debug_struct("LightSection")
            .field("non_zero_bytes", &lit)
            .finish()
    }
}
