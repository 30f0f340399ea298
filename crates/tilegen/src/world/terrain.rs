//! Detail synthesis for one macro-tile: border blending against lower-ranked
//! neighbors, beaches, per-terrain Perlin heights and feature placement.

use super::info::WorldInfo;
use super::tile::{Feature, FeatureKind, Terrain, TerrainDetail, TileTrait, WorldTile};
use crate::random::{NoiseSource, RandomSource, mix_seed_stream};
use crate::types::Coordinate;

/// Edges of a macro-tile, in the order borders are blended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    West,
    East,
    South,
    North,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::West, Side::East, Side::South, Side::North];

    /// Offset to the macro-tile across this edge.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Side::West => (-1, 0),
            Side::East => (1, 0),
            Side::South => (0, -1),
            Side::North => (0, 1),
        }
    }

    fn is_vertical_edge(self) -> bool {
        matches!(self, Side::West | Side::East)
    }

    fn is_adjacent_to(self, other: Side) -> bool {
        self.is_vertical_edge() != other.is_vertical_edge()
    }

    /// Sub-grid cell `depth` cells in from this edge at position `along` it.
    fn cell(self, size: i32, along: i32, depth: i32) -> (i32, i32) {
        match self {
            Side::West => (depth, along),
            Side::East => (size - 1 - depth, along),
            Side::South => (along, depth),
            Side::North => (along, size - 1 - depth),
        }
    }

    /// How far `(x, y)` sits from this edge.
    fn distance(self, size: i32, x: i32, y: i32) -> i32 {
        match self {
            Side::West => x,
            Side::East => size - 1 - x,
            Side::South => y,
            Side::North => size - 1 - y,
        }
    }
}

/// What terrain synthesis needs to know about the macro-tile across one edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub side: Side,
    pub terrain: Terrain,
    pub traits: Vec<TileTrait>,
}

impl Neighbor {
    pub fn new(side: Side, tile: &WorldTile) -> Self {
        Self { side, terrain: tile.terrain, traits: tile.traits().to_vec() }
    }
}

/// Builds the full detail grid for `tile`. The result depends only on the
/// tile, its neighbors, `info` and `seed`.
pub fn initialize_terrain(
    tile: &WorldTile,
    neighbors: &[Neighbor],
    info: &WorldInfo,
    seed: u64,
) -> TerrainDetail {
    let mut random = RandomSource::new(seed);
    let noise = NoiseSource::new(mix_seed_stream(seed, 1) as u32);
    let mut detail = TerrainDetail::filled(info.sub_grid_size, tile.terrain);

    blend_borders(&mut detail, tile.terrain, neighbors, info, &mut random, &noise);
    place_beaches(&mut detail);
    fill_heights(&mut detail, info, &mut random);
    place_features(&mut detail, tile, neighbors, info, &mut random, &noise);
    detail
}

fn blend_borders(
    detail: &mut TerrainDetail,
    own: Terrain,
    neighbors: &[Neighbor],
    info: &WorldInfo,
    random: &mut RandomSource,
    noise: &NoiseSource,
) {
    let size = detail.size();
    let bordering: Vec<(Side, Terrain)> = Side::ALL
        .into_iter()
        .filter_map(|side| {
            let neighbor = neighbors.iter().find(|neighbor| neighbor.side == side)?;
            (neighbor.terrain < own).then_some((side, neighbor.terrain))
        })
        .collect();

    // Corners shared by two bordering edges with different terrain: when
    // kept, the edge blended first owns the overlap.
    let mut kept_corners = Vec::new();
    for (index, &(first, first_terrain)) in bordering.iter().enumerate() {
        for &(second, second_terrain) in &bordering[index + 1..] {
            if first.is_adjacent_to(second)
                && first_terrain != second_terrain
                && random.chance(info.keep_corner_chance)
            {
                kept_corners.push((first, second));
            }
        }
    }

    let mut owner: Vec<Option<Side>> = vec![None; (size.max(0) as usize).pow(2)];
    let half_range = info.border_range / 2;
    for (side, terrain) in bordering {
        let band = info.border_percentage * size as f32
            + random.range_inclusive(-half_range, half_range) as f32;
        let offset = f64::from(random.range_f32(0.0, 1000.0));
        for along in 0..size {
            let position = f64::from(along) * f64::from(info.border_frequency);
            let sample = noise.sample01(position, offset);
            let wobble = (sample - 0.5) * info.border_range as f32;
            let depth = (band + wobble).round().clamp(0.0, size as f32) as i32;
            for inward in 0..depth {
                let (x, y) = side.cell(size, along, inward);
                let index = (y * size + x) as usize;
                if let Some(previous) = owner[index]
                    && kept_corners.contains(&(previous, side))
                {
                    continue;
                }
                detail.set_terrain(x, y, terrain);
                owner[index] = Some(side);
            }
        }
    }
}

/// Water cells with a plains cell among their four neighbors become beach.
fn place_beaches(detail: &mut TerrainDetail) {
    let size = detail.size();
    let mut beaches = Vec::new();
    for y in 0..size {
        for x in 0..size {
            if detail.terrain_at(x, y) != Some(Terrain::Water) {
                continue;
            }
            let touches_plains = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .into_iter()
                .any(|(dx, dy)| detail.terrain_at(x + dx, y + dy) == Some(Terrain::Plains));
            if touches_plains {
                beaches.push((x, y));
            }
        }
    }
    for (x, y) in beaches {
        detail.set_terrain(x, y, Terrain::Beach);
    }
}

/// One Perlin pass per terrain present, each with its own random offset,
/// axis flip and frequency jitter, written only to cells of that terrain.
fn fill_heights(detail: &mut TerrainDetail, info: &WorldInfo, random: &mut RandomSource) {
    let size = detail.size();
    for terrain in detail.terrains_present() {
        let Some(profile) = info.profile(terrain) else {
            for y in 0..size {
                for x in 0..size {
                    if detail.terrain_at(x, y) == Some(terrain) {
                        detail.set_height(x, y, info.sea_level);
                    }
                }
            }
            continue;
        };

        let noise = NoiseSource::new((random.next_u64() >> 32) as u32);
        let offset_x = f64::from(random.range_f32(0.0, 1000.0));
        let offset_y = f64::from(random.range_f32(0.0, 1000.0));
        let flip = random.coin();
        let jitter = random.range_f32(-info.frequency_range, info.frequency_range);
        let frequency = f64::from(profile.perlin_frequency * (1.0 + jitter));
        let low = profile.height_range.x;
        let high = profile.height_range.y.max(low);

        for y in 0..size {
            for x in 0..size {
                if detail.terrain_at(x, y) != Some(terrain) {
                    continue;
                }
                let (u, v) = if flip { (y, x) } else { (x, y) };
                let sample = noise.sample01(
                    offset_x + f64::from(u) * frequency,
                    offset_y + f64::from(v) * frequency,
                );
                let value = sample.powi(profile.perlin_power.max(1));
                let height = low + (value * (high - low) as f32).round() as i32;
                detail.set_height(x, y, height.clamp(low, high));
            }
        }
    }
}

fn place_features(
    detail: &mut TerrainDetail,
    tile: &WorldTile,
    neighbors: &[Neighbor],
    info: &WorldInfo,
    random: &mut RandomSource,
    noise: &NoiseSource,
) {
    let size = detail.size();
    let frequency = f64::from(info.feature_frequency);
    for y in 0..size {
        for x in 0..size {
            let Some(terrain) = detail.terrain_at(x, y) else {
                continue;
            };
            if matches!(terrain, Terrain::Water | Terrain::Beach) {
                continue;
            }
            let density = noise.sample01(f64::from(x) * frequency, f64::from(y) * frequency);
            let at = Coordinate::new(x, y);
            let kind = if tile.has_trait(TileTrait::Forest)
                && random.chance(
                    info.tree_chance
                        * density
                        * falloff(neighbors, TileTrait::Forest, info, size, at),
                )
            {
                Some(FeatureKind::Tree)
            } else if tile.has_trait(TileTrait::MineralVein)
                && random.chance(
                    info.ore_chance
                        * density
                        * falloff(neighbors, TileTrait::MineralVein, info, size, at),
                )
            {
                Some(FeatureKind::Ore)
            } else if terrain >= Terrain::Hills && random.chance(info.rock_chance) {
                Some(FeatureKind::Rock)
            } else {
                None
            };
            if let Some(kind) = kind {
                detail.push_feature(Feature { kind, at });
            }
        }
    }
}

/// Chance multiplier for a trait feature at `at`: fades toward any edge whose
/// neighbor lacks the trait, full strength elsewhere.
fn falloff(
    neighbors: &[Neighbor],
    tile_trait: TileTrait,
    info: &WorldInfo,
    size: i32,
    at: Coordinate,
) -> f32 {
    if info.feature_falloff <= 0 {
        return 1.0;
    }
    neighbors
        .iter()
        .filter(|neighbor| !neighbor.traits.contains(&tile_trait))
        .map(|neighbor| {
            let distance = neighbor.side.distance(size, at.x, at.y);
            (distance as f32 / info.feature_falloff as f32).min(1.0)
        })
        .fold(1.0, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surrounded_by(terrain: Terrain) -> Vec<Neighbor> {
        Side::ALL
            .into_iter()
            .map(|side| Neighbor { side, terrain, traits: Vec::new() })
            .collect()
    }

    fn with_side(mut neighbors: Vec<Neighbor>, side: Side, terrain: Terrain) -> Vec<Neighbor> {
        for neighbor in &mut neighbors {
            if neighbor.side == side {
                neighbor.terrain = terrain;
            }
        }
        neighbors
    }

    #[test]
    fn higher_ranked_neighbors_leave_the_tile_alone() {
        let info = WorldInfo::default();
        let tile = WorldTile::new(Terrain::Water);
        let detail = initialize_terrain(&tile, &surrounded_by(Terrain::Mountains), &info, 5);
        assert_eq!(detail.terrains_present(), vec![Terrain::Water]);
        assert!(detail.features().is_empty());
    }

    #[test]
    fn lower_neighbor_reaches_in_along_its_edge_only() {
        let info = WorldInfo::default();
        let tile = WorldTile::new(Terrain::Mountains);
        let neighbors = with_side(surrounded_by(Terrain::Mountains), Side::North, Terrain::Desert);
        let detail = initialize_terrain(&tile, &neighbors, &info, 17);
        let size = detail.size();
        for x in 0..size {
            assert_eq!(detail.terrain_at(x, size - 1), Some(Terrain::Desert));
            assert_eq!(detail.terrain_at(x, 0), Some(Terrain::Mountains));
        }
    }

    #[test]
    fn keep_corner_decides_who_owns_the_overlap() {
        let tile = WorldTile::new(Terrain::Mountains);
        let neighbors = with_side(
            with_side(surrounded_by(Terrain::Mountains), Side::West, Terrain::Water),
            Side::South,
            Terrain::Plains,
        );

        let keep = WorldInfo { keep_corner_chance: 1.0, ..WorldInfo::default() };
        let detail = initialize_terrain(&tile, &neighbors, &keep, 3);
        assert_eq!(detail.terrain_at(0, 0), Some(Terrain::Water));

        let yield_corner = WorldInfo { keep_corner_chance: 0.0, ..WorldInfo::default() };
        let detail = initialize_terrain(&tile, &neighbors, &yield_corner, 3);
        assert_eq!(detail.terrain_at(0, 0), Some(Terrain::Plains));
    }

    #[test]
    fn heights_stay_inside_each_profile() {
        let info = WorldInfo::default();
        let tile = WorldTile::new(Terrain::Hills);
        let neighbors = with_side(surrounded_by(Terrain::Hills), Side::East, Terrain::Water);
        let detail = initialize_terrain(&tile, &neighbors, &info, 44);
        for y in 0..detail.size() {
            for x in 0..detail.size() {
                let terrain = detail.terrain_at(x, y).unwrap();
                let height = detail.height_at(x, y).unwrap();
                match info.profile(terrain) {
                    Some(profile) => {
                        assert!((profile.height_range.x..=profile.height_range.y).contains(&height))
                    }
                    None => assert_eq!(height, info.sea_level),
                }
            }
        }
    }

    #[test]
    fn trees_need_the_forest_trait_and_fade_at_bare_edges() {
        let info = WorldInfo { tree_chance: 1.0, rock_chance: 0.0, ..WorldInfo::default() };
        let bare = WorldTile::new(Terrain::Plains);
        let neighbors = surrounded_by(Terrain::Plains);
        let detail = initialize_terrain(&bare, &neighbors, &info, 8);
        assert!(detail.features().is_empty());

        let mut forest = WorldTile::new(Terrain::Plains);
        forest.add_trait(TileTrait::Forest);
        let detail = initialize_terrain(&forest, &neighbors, &info, 8);
        assert!(detail.features().iter().all(|feature| feature.kind == FeatureKind::Tree));
        let size = detail.size();
        for feature in detail.features() {
            let Coordinate { x, y } = feature.at;
            assert!(x > 0 && y > 0 && x < size - 1 && y < size - 1);
        }
    }

    #[test]
    fn same_seed_same_detail() {
        let info = WorldInfo::default();
        let tile = WorldTile::new(Terrain::Desert);
        let neighbors = with_side(surrounded_by(Terrain::Desert), Side::South, Terrain::Plains);
        assert_eq!(
            initialize_terrain(&tile, &neighbors, &info, 99),
            initialize_terrain(&tile, &neighbors, &info, 99)
        );
    }
}
