use fogwall_lighting::{LIGHT_SECTION_BYTES, LightSection, get_light, set_light};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = usize> {
    0usize..16
}

proptest! {
    // set then get returns the written level
    #[test]
    fn set_get_roundtrip(x in coord(), y in coord(), z in coord(), v in 0u8..=15) {
        let mut buf = [0u8; LIGHT_SECTION_BYTES];
        set_light(&mut buf, x, y, z, v);
        prop_assert_eq!(get_light(&buf, x, y, z), v);
    }

    // writing one cell leaves every other cell untouched, whatever the
    // starting contents
    #[test]
    fn set_is_isolated(
        bytes in prop::collection::vec(any::<u8>(), LIGHT_SECTION_BYTES),
        x in coord(), y in coord(), z in coord(), v in 0u8..=15,
    ) {
        let before = LightSection::from_bytes(&bytes).unwrap();
        let after = before.clone().with(x, y, z, v);
        for yy in 0..16 { for zz in 0..16 { for xx in 0..16 {
            if (xx, yy, zz) == (x, y, z) {
                prop_assert_eq!(after.get(xx, yy, zz), v);
            } else {
                prop_assert_eq!(after.get(xx, yy, zz), before.get(xx, yy, zz));
            }
        }}}
    }

    // levels above 15 clamp
    #[test]
    fn set_clamps(x in coord(), y in coord(), z in coord(), v in 16u8..=255) {
        let mut s = LightSection::dark();
        s.set(x, y, z, v);
        prop_assert_eq!(s.get(x, y, z), 15);
    }
}
