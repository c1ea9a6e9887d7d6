//! Ring geometry: map a logical (angle, radius) onto one strip pixel.
//!
//! The face is 60 angles around by 3 radii deep. Three strips of 60
//! pixels each cover it, one strip per 20-angle arc. Within an arc a strip
//! snakes back and forth across the three radii, so neighbouring pixels on
//! the strip are neighbouring radii on the face. Every (angle, radius)
//! lands on exactly one of the 180 physical pixels.

/// Logical positions around the ring.
pub const ANGLES: i32 = 60;
/// Logical rings, 0 innermost.
pub const RADII: u8 = 3;
/// Pixels on each physical strip.
pub const STRIP_LEN: usize = 60;

/// One of the three physical strips, named for where it sits on the face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strip {
    Top,
    Left,
    Right,
}

impl Strip {
    /// All strips, in commit order.
    pub const ALL: [Strip; 3] = [Strip::Top, Strip::Left, Strip::Right];

    pub fn name(self) -> &'static str {
        match self {
            Strip::Top => "top",
            Strip::Left => "left",
            Strip::Right => "right",
        }
    }

    /// Position of this strip in `Strip::ALL`.
    pub fn slot(self) -> usize {
        match self {
            Strip::Top => 0,
            Strip::Left => 1,
            Strip::Right => 2,
        }
    }
}

/// A pixel on a physical strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalAddress {
    pub strip: Strip,
    pub index: usize,
}

/// Bring any angle into 0..60, negative ones included.
pub fn normalize_angle(angle: i32) -> i32 {
    angle.rem_euclid(ANGLES)
}

/// Which strip owns a normalized angle.
///
/// TOP spans 50..=59 and 0..=9, RIGHT 10..=29, LEFT 30..=49.
pub fn region(angle: i32) -> Strip {
    match normalize_angle(angle) {
        10..=29 => Strip::Right,
        30..=49 => Strip::Left,
        _ => Strip::Top,
    }
}

/// Position along a strip before the strip's own direction is applied.
///
/// Each angle owns three consecutive strip pixels. Every other group of
/// three runs outward instead of inward, which gives the serpentine.
pub fn fold(angle: i32, radius: u8) -> usize {
    let radius = i32::from(radius);
    let shifted = (normalize_angle(angle) + 10) % ANGLES;
    let value = (shifted * 3) % ANGLES;
    let inner = (value + radius) % 6;
    let folded = if inner < 3 {
        value + (2 - radius)
    } else {
        value + radius
    };
    // value is a multiple of 3 below 60 and the offset is 0..=2
    folded as usize
}

/// Resolve a logical coordinate to its physical pixel.
///
/// Total for every angle and for radius 0..=2. LEFT runs in fold order;
/// TOP and RIGHT are wired reversed.
pub fn map(angle: i32, radius: u8) -> PhysicalAddress {
    debug_assert!(radius < RADII, "radius {radius} outside the ring");
    let strip = region(angle);
    let folded = fold(angle, radius);
    let index = match strip {
        Strip::Left => folded,
        Strip::Right | Strip::Top => STRIP_LEN - 1 - folded,
    };
    PhysicalAddress { strip, index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case(0, 0)]
    #[case(59, 59)]
    #[case(60, 0)]
    #[case(-1, 59)]
    #[case(-2, 58)]
    #[case(-61, 59)]
    #[case(125, 5)]
    fn normalize_wraps_both_directions(#[case] angle: i32, #[case] expected: i32) {
        assert_eq!(normalize_angle(angle), expected);
    }

    #[rstest]
    #[case(0, Strip::Top)]
    #[case(9, Strip::Top)]
    #[case(10, Strip::Right)]
    #[case(29, Strip::Right)]
    #[case(30, Strip::Left)]
    #[case(49, Strip::Left)]
    #[case(50, Strip::Top)]
    #[case(59, Strip::Top)]
    #[case(-1, Strip::Top)]
    fn region_boundaries(#[case] angle: i32, #[case] expected: Strip) {
        assert_eq!(region(angle), expected);
    }

    #[test]
    fn each_region_is_twenty_wide() {
        for strip in Strip::ALL {
            let count = (0..ANGLES).filter(|&a| region(a) == strip).count();
            assert_eq!(count, 20, "{strip:?}");
        }
    }

    #[rstest]
    #[case(0, 0, Strip::Top, 27)]
    #[case(10, 0, Strip::Right, 57)]
    #[case(30, 0, Strip::Left, 2)]
    #[case(10, 2, Strip::Right, 59)]
    #[case(11, 0, Strip::Right, 56)]
    fn maps_known_coordinates(
        #[case] angle: i32,
        #[case] radius: u8,
        #[case] strip: Strip,
        #[case] index: usize,
    ) {
        assert_eq!(map(angle, radius), PhysicalAddress { strip, index });
    }

    #[test]
    fn map_is_a_bijection_onto_all_physical_pixels() {
        let mut seen = HashSet::new();
        for angle in 0..ANGLES {
            for radius in 0..RADII {
                let addr = map(angle, radius);
                assert!(addr.index < STRIP_LEN);
                assert!(seen.insert(addr), "collision at ({angle}, {radius})");
            }
        }
        assert_eq!(seen.len(), STRIP_LEN * Strip::ALL.len());
    }

    #[test]
    fn negative_angles_match_their_positive_equivalent() {
        for radius in 0..RADII {
            assert_eq!(map(-1, radius), map(59, radius));
            assert_eq!(map(-3, radius), map(57, radius));
        }
    }

    #[test]
    fn radius_neighbours_are_strip_neighbours() {
        for angle in 0..ANGLES {
            let a = map(angle, 0);
            let b = map(angle, 1);
            let c = map(angle, 2);
            assert_eq!(a.strip, c.strip);
            assert_eq!(a.index.abs_diff(b.index), 1);
            assert_eq!(b.index.abs_diff(c.index), 1);
        }
    }
}
