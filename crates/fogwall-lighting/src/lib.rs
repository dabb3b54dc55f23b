//! Packed light sections and the dark-light payloads sent to clients.
#![forbid(unsafe_code)]

pub mod codec;
mod sections;
mod update;
mod varint;

pub use codec::{
    ALL_DARK_SECTION, LIGHT_SECTION_BYTES, LightSection, all_dark_section, coords_from_index,
    get_light, light_index, set_light,
};
pub use sections::{SectionMap, chunk_sections, full_height_sections};
pub use update::{LightArray, LightData, LightMask, LightUpdate, dark_array, mask_bit};
pub use varint::write_varint;

/// Outgoing light data is about to be encoded: zero its sky light so the
/// server's own light engine cannot brighten the client's view. Returns
/// whether the packet needs re-encoding.
pub fn on_light_packet_outgoing(data: &mut LightData) -> bool {
    data.darken_sky()
}
