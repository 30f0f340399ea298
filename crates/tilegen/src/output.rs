//! Finished-generator results and the metadata merged across nested runs.

use std::fmt;

use serde::Serialize;

use crate::grid::Grid;
use crate::level::LevelGenInput;
use crate::math::IntegerRect;
use crate::types::Coordinate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapInfoKind {
    Rooms,
    Corridors,
    Caves,
}

impl MapInfoKind {
    pub const ALL: [MapInfoKind; 3] =
        [MapInfoKind::Rooms, MapInfoKind::Corridors, MapInfoKind::Caves];

    pub fn key(self) -> &'static str {
        match self {
            MapInfoKind::Rooms => "rooms",
            MapInfoKind::Corridors => "corridors",
            MapInfoKind::Caves => "caves",
        }
    }
}

impl fmt::Display for MapInfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Feature metadata keyed by kind. Merging concatenates same-kind lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MapInfo {
    pub rooms: Vec<IntegerRect>,
    pub corridors: Vec<Vec<Coordinate>>,
    pub caves: Vec<Vec<Coordinate>>,
}

impl MapInfo {
    pub fn rooms(rooms: Vec<IntegerRect>) -> Self {
        Self { rooms, ..Self::default() }
    }

    pub fn corridors(corridors: Vec<Vec<Coordinate>>) -> Self {
        Self { corridors, ..Self::default() }
    }

    pub fn caves(caves: Vec<Vec<Coordinate>>) -> Self {
        Self { caves, ..Self::default() }
    }

    pub fn len(&self, kind: MapInfoKind) -> usize {
        match kind {
            MapInfoKind::Rooms => self.rooms.len(),
            MapInfoKind::Corridors => self.corridors.len(),
            MapInfoKind::Caves => self.caves.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        MapInfoKind::ALL.into_iter().all(|kind| self.len(kind) == 0)
    }

    pub fn merge(&mut self, other: MapInfo) {
        self.rooms.extend(other.rooms);
        self.corridors.extend(other.corridors);
        self.caves.extend(other.caves);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationOutput {
    pub grid: Grid,
    pub open_tiles: Vec<Coordinate>,
    pub map_info: MapInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<LevelGenInput>,
}

impl GenerationOutput {
    pub fn new(grid: Grid, open_tiles: Vec<Coordinate>) -> Self {
        Self { grid, open_tiles, map_info: MapInfo::default(), input: None }
    }

    pub fn add_map_info(&mut self, info: MapInfo) {
        self.map_info.merge(info);
    }

    /// Folds another output's metadata into this one; grid and open tiles
    /// stay as they are.
    pub fn append_output(&mut self, other: GenerationOutput) {
        self.map_info.merge(other.map_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appending_concatenates_same_named_lists() {
        let mut output = GenerationOutput::new(Grid::new(4, 4), Vec::new());
        output.add_map_info(MapInfo::rooms(vec![IntegerRect::new(0, 0, 2, 2)]));

        let mut nested = GenerationOutput::new(Grid::new(4, 4), vec![Coordinate::new(1, 1)]);
        nested.add_map_info(MapInfo::rooms(vec![IntegerRect::new(2, 2, 2, 2)]));
        nested.add_map_info(MapInfo::caves(vec![vec![Coordinate::new(3, 3)]]));
        output.append_output(nested);

        assert_eq!(output.map_info.len(MapInfoKind::Rooms), 2);
        assert_eq!(output.map_info.len(MapInfoKind::Caves), 1);
        assert_eq!(output.map_info.len(MapInfoKind::Corridors), 0);
        assert!(output.open_tiles.is_empty());
    }

    #[test]
    fn map_info_serializes_with_kind_keys() {
        let info = MapInfo::corridors(vec![vec![Coordinate::new(1, 2)]]);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["corridors"][0][0]["x"], 1);
        assert!(json["rooms"].as_array().is_some_and(|rooms| rooms.is_empty()));
        assert_eq!(MapInfoKind::Caves.to_string(), "caves");
    }
}
