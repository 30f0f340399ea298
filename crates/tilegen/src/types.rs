//! Tile identity and coordinate primitives shared by every generation stage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The concrete contents of one grid cell.
///
/// `InternalA` and `InternalB` are scratch values used by generators mid-run;
/// they never survive a finished generator.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TileType {
    #[default]
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    InternalA,
    InternalB,
}

impl TileType {
    pub const ALL: [TileType; 10] = [
        TileType::A,
        TileType::B,
        TileType::C,
        TileType::D,
        TileType::E,
        TileType::F,
        TileType::G,
        TileType::H,
        TileType::InternalA,
        TileType::InternalB,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            TileType::A => 0x0002,
            TileType::B => 0x0004,
            TileType::C => 0x0008,
            TileType::D => 0x0010,
            TileType::E => 0x0020,
            TileType::F => 0x0040,
            TileType::G => 0x0080,
            TileType::H => 0x0100,
            TileType::InternalA => 0x0200,
            TileType::InternalB => 0x0400,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            TileType::A => '#',
            TileType::B => '.',
            TileType::C => '~',
            TileType::D => ',',
            TileType::E => '^',
            TileType::F => '%',
            TileType::G => '*',
            TileType::H => '&',
            TileType::InternalA => '1',
            TileType::InternalB => '0',
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            TileType::A => 0,
            TileType::B => 1,
            TileType::C => 2,
            TileType::D => 3,
            TileType::E => 4,
            TileType::F => 5,
            TileType::G => 6,
            TileType::H => 7,
            TileType::InternalA => 8,
            TileType::InternalB => 9,
        }
    }
}

/// A set of tile types used for matching, never for storage.
///
/// A value matches when its bit is a subset of the mask:
/// `(value | mask) == mask`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<TileType>", into = "Vec<TileType>")]
pub struct TileTypeSet(u32);

impl TileTypeSet {
    pub const ALL: TileTypeSet = {
        let mut bits = 0;
        let mut index = 0;
        while index < TileType::ALL.len() {
            bits |= TileType::ALL[index].bit();
            index += 1;
        }
        TileTypeSet(bits)
    };
    pub const NONE: TileTypeSet = TileTypeSet(0);

    pub fn of(types: &[TileType]) -> Self {
        types.iter().fold(Self::NONE, |set, &tile| set.with(tile))
    }

    pub const fn with(self, tile: TileType) -> Self {
        Self(self.0 | tile.bit())
    }

    pub const fn without(self, tile: TileType) -> Self {
        Self(self.0 & !tile.bit())
    }

    pub const fn contains(self, tile: TileType) -> bool {
        (tile.bit() | self.0) == self.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for TileTypeSet {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<TileType> for TileTypeSet {
    fn from(tile: TileType) -> Self {
        Self::NONE.with(tile)
    }
}

impl From<Vec<TileType>> for TileTypeSet {
    fn from(types: Vec<TileType>) -> Self {
        Self::of(&types)
    }
}

impl From<TileTypeSet> for Vec<TileType> {
    fn from(set: TileTypeSet) -> Self {
        TileType::ALL.into_iter().filter(|&tile| set.contains(tile)).collect()
    }
}

impl fmt::Debug for TileTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("TileTypeSet(ALL)");
        }
        let members: Vec<TileType> = (*self).into();
        f.debug_tuple("TileTypeSet").field(&members).finish()
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_matching_uses_subset_semantics() {
        let set = TileTypeSet::of(&[TileType::A, TileType::C, TileType::E]);
        assert!(set.contains(TileType::A));
        assert!(set.contains(TileType::E));
        assert!(!set.contains(TileType::B));
        assert!(TileTypeSet::ALL.contains(TileType::InternalB));
        assert!(!TileTypeSet::NONE.contains(TileType::A));
    }

    #[test]
    fn test_full_set_survives_serialization() {
        let text = serde_json::to_string(&TileTypeSet::ALL).expect("Failed to serialize set");
        let back: TileTypeSet = serde_json::from_str(&text).expect("Failed to parse set");
        assert_eq!(back, TileTypeSet::ALL);
        assert_eq!(format!("{back:?}"), "TileTypeSet(ALL)");
        assert_eq!(TileTypeSet::ALL, TileTypeSet::of(&TileType::ALL));
    }

    #[test]
    fn every_tile_type_has_a_distinct_bit() {
        let mut seen = 0_u32;
        for tile in TileType::ALL {
            assert_eq!(seen & tile.bit(), 0, "{tile:?} reuses a bit");
            seen |= tile.bit();
        }
    }

    #[test]
    fn set_round_trips_through_member_list() {
        let set = TileTypeSet::of(&[TileType::B, TileType::H]);
        let members: Vec<TileType> = set.into();
        assert_eq!(members, vec![TileType::B, TileType::H]);
        assert_eq!(TileTypeSet::from(members), set);
        assert!(!set.without(TileType::B).contains(TileType::B));
    }
}
