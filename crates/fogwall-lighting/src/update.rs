//! Light-update packet body: section masks plus packed arrays.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::{Result, Write};

use fogwall_geom::{ChunkCoord, SectionIndex};

use crate::codec::{ALL_DARK_SECTION, LIGHT_SECTION_BYTES, get_light};
use crate::varint::write_varint;

/// One packed section as carried in a packet. Dark payloads borrow the
/// shared zero buffer instead of allocating.
pub type LightArray = Cow<'static, [u8; LIGHT_SECTION_BYTES]>;

#[inline]
pub fn dark_array() -> LightArray {
    Cow::Borrowed(&ALL_DARK_SECTION)
}

/// Growable bitset stored as 64-bit words, the protocol's mask encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightMask {
    words: Vec<u64>,
}

impl LightMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, bit: usize) {
        let word = bit / 64;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (bit % 64);
    }

    pub fn get(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .is_some_and(|w| w & (1u64 << (bit % 64)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, w)| {
            (0..64).filter_map(move |b| (w & (1u64 << b) != 0).then_some(i * 64 + b))
        })
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn write_to(&self, w: &mut impl Write) -> Result<()> {
        write_varint(w, self.words.len() as i32)?;
        for word in &self.words {
            w.write_all(&(*word as i64).to_be_bytes())?;
        }
        Ok(())
    }
}

/// Light payload shared by the light-update and chunk-data packets.
///
/// Mask bit `i` covers light section `i`, which is world section `i - 1`:
/// light data carries one extra section below the world and one above.
/// Arrays appear in ascending bit order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightData {
    pub sky_mask: LightMask,
    pub block_mask: LightMask,
    pub empty_sky_mask: LightMask,
    pub empty_block_mask: LightMask,
    pub sky_arrays: Vec<LightArray>,
    pub block_arrays: Vec<LightArray>,
}

#[inline]
pub fn mask_bit(section: SectionIndex) -> usize {
    section as usize + 1
}

impl LightData {
    /// All-dark payload for `sections`.
    pub fn dark(sections: &BTreeSet<SectionIndex>, include_sky: bool, include_block: bool) -> Self {
        let mut data = LightData::default();
        for &section in sections {
            let bit = mask_bit(section);
            if include_sky {
                data.sky_mask.set(bit);
                data.sky_arrays.push(dark_array());
            }
            if include_block {
                data.block_mask.set(bit);
                data.block_arrays.push(dark_array());
            }
        }
        data
    }

    /// Sky level at a block inside the `n`-th sky array.
    pub fn sky_level(&self, n: usize, x: usize, y: usize, z: usize) -> Option<u8> {
        self.sky_arrays.get(n).map(|a| get_light(&a[..], x, y, z))
    }

    /// Zeroes every sky array in place. Returns whether any array was
    /// present, i.e. whether the packet must be re-encoded.
    pub fn darken_sky(&mut self) -> bool {
        for array in &mut self.sky_arrays {
            array.to_mut().fill(0);
        }
        !self.sky_arrays.is_empty()
    }

    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        self.sky_mask.write_to(w)?;
        self.block_mask.write_to(w)?;
        self.empty_sky_mask.write_to(w)?;
        self.empty_block_mask.write_to(w)?;
        write_arrays(w, &self.sky_arrays)?;
        write_arrays(w, &self.block_arrays)
    }
}

fn write_arrays(w: &mut impl Write, arrays: &[LightArray]) -> Result<()> {
    write_varint(w, arrays.len() as i32)?;
    for array in arrays {
        write_varint(w, LIGHT_SECTION_BYTES as i32)?;
        w.write_all(&array[..])?;
    }
    Ok(())
}

/// Standalone light-update packet for one chunk column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightUpdate {
    pub chunk: ChunkCoord,
    pub data: LightData,
}

impl LightUpdate {
    pub fn dark(
        chunk: ChunkCoord,
        sections: &BTreeSet<SectionIndex>,
        include_sky: bool,
        include_block: bool,
    ) -> Self {
        Self {
            chunk,
            data: LightData::dark(sections, include_sky, include_block),
        }
    }

    /// Packet body; the chunk position is written as two VarInts.
    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        write_varint(w, self.chunk.cx)?;
        write_varint(w, self.chunk.cz)?;
        self.data.write_to(w)
    }

    pub fn encoded_len(&self) -> usize {
        let mut counter = ByteCounter(0);
        // Writing to a counter cannot fail.
        let _ = self.write_to(&mut counter);
        counter.0
    }
}

struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
