use std::io::{Result, Write};

/// Protocol VarInt: little-endian base-128, sign bits kept via `as u32`.
pub fn write_varint(w: &mut impl Write, value: i32) -> Result<()> {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            w.write_all(&[v as u8])?;
            return Ok(());
        }
        w.write_all(&[((v & 0x7F) | 0x80) as u8])?;
        v >>= 7;
    }
}
