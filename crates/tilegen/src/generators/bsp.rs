//! Binary space partition dungeon: split the bounds into leaves, carve one room
//! per chosen leaf, then join sibling subtrees with straight or L-shaped corridors.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::{GenContext, GeneratorCore, LevelGenerator, accepts, budget};
use crate::error::GenError;
use crate::grid::{Grid, GridSubset};
use crate::math::{IntegerRect, IntegerVector};
use crate::output::{GenerationOutput, MapInfo};
use crate::random::RandomSource;
use crate::types::{Coordinate, TileType, TileTypeSet};

new_key_type! {
    pub struct NodeId;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspParams {
    pub valid_base_tiles: TileTypeSet,
    pub fill_tile_type: TileType,
    /// Painted over corridor cells a leaf had already carved.
    pub debug_second_fill_tile_type: TileType,
    pub room_min_size: i32,
    pub room_max_size: i32,
    pub min_leaf_size: i32,
    pub min_node_wh_ratio: f32,
    pub room_to_leaf_ratio: f32,
    pub enable_corridors: bool,
    pub extra_corridors_per_room: f32,
    pub visualize_splitting: bool,
}

impl Default for BspParams {
    fn default() -> Self {
        Self {
            valid_base_tiles: TileTypeSet::ALL,
            fill_tile_type: TileType::B,
            debug_second_fill_tile_type: TileType::B,
            room_min_size: 4,
            room_max_size: 6,
            min_leaf_size: 8,
            min_node_wh_ratio: 0.25,
            room_to_leaf_ratio: 1.0,
            enable_corridors: true,
            extra_corridors_per_room: 0.0,
            visualize_splitting: false,
        }
    }
}

impl BspParams {
    pub fn apply_param(&mut self, name: &str, value: f32) -> bool {
        let rounded = value.round() as i32;
        match name {
            "room_min_size" => self.room_min_size = rounded,
            "room_max_size" => self.room_max_size = rounded,
            "min_leaf_size" => self.min_leaf_size = rounded,
            "min_node_wh_ratio" => self.min_node_wh_ratio = value,
            "room_to_leaf_ratio" => self.room_to_leaf_ratio = value,
            "enable_corridors" => self.enable_corridors = rounded > 0,
            "extra_corridors_per_room" => self.extra_corridors_per_room = value,
            _ => return false,
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BspPhase {
    Division,
    PostDivisionVisualization,
    RoomCreation,
    PostRoomCreationVisualization,
    RoomConnectionSetup,
    RoomConnection,
    ExtraRoomConnection,
}

/// A node of the partition tree. Only leaves ever hold carved cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BspNode {
    pub bounds: IntegerRect,
    pub children: Option<[NodeId; 2]>,
    pub carved_area: Vec<Coordinate>,
}

impl BspNode {
    fn new(bounds: IntegerRect) -> Self {
        Self { bounds, children: None, carved_area: Vec::new() }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct BspGenerator {
    core: GeneratorCore<BspPhase>,
    params: BspParams,
    nodes: SlotMap<NodeId, BspNode>,
    root: Option<NodeId>,
    queue: VecDeque<NodeId>,
    node_list: Vec<NodeId>,
    leaves: Vec<NodeId>,
    original: Option<GridSubset>,
    input: Option<GridSubset>,
    rooms: Vec<IntegerRect>,
    corridors: Vec<Vec<Coordinate>>,
    rooms_to_make: usize,
    extra_corridors_to_make: usize,
    extra_corridors_made: usize,
}

impl Default for BspGenerator {
    fn default() -> Self {
        Self::new(BspParams::default())
    }
}

impl BspGenerator {
    pub fn new(params: BspParams) -> Self {
        Self {
            core: GeneratorCore::new("BSP Generator"),
            params,
            nodes: SlotMap::with_key(),
            root: None,
            queue: VecDeque::new(),
            node_list: Vec::new(),
            leaves: Vec::new(),
            original: None,
            input: None,
            rooms: Vec::new(),
            corridors: Vec::new(),
            rooms_to_make: 0,
            extra_corridors_to_make: 0,
            extra_corridors_made: 0,
        }
    }

    pub fn apply_params(&mut self, params: BspParams) {
        self.params = params;
    }

    pub fn params(&self) -> &BspParams {
        &self.params
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &BspNode> + '_ {
        self.leaves.iter().filter_map(|&id| self.nodes.get(id))
    }

    pub fn rooms(&self) -> &[IntegerRect] {
        &self.rooms
    }

    pub fn corridors(&self) -> &[Vec<Coordinate>] {
        &self.corridors
    }

    fn division_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) -> Result<(), GenError> {
        for _ in 0..budget(frames) {
            let Some(id) = self.queue.pop_front() else {
                let target = (self.params.room_to_leaf_ratio * self.leaves.len() as f32).round();
                self.rooms_to_make = (target as usize).max(1);
                self.core.schedule.next_phase();
                break;
            };
            match self.split_node(id, ctx.random) {
                Some(children) => {
                    self.queue.extend(children);
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.children = Some(children);
                    }
                }
                None => self.leaves.push(id),
            }
        }
        if self.params.visualize_splitting {
            self.visualize(ctx.map, true)?;
        }
        Ok(())
    }

    fn split_node(&mut self, id: NodeId, random: &mut RandomSource) -> Option<[NodeId; 2]> {
        let bounds = self.nodes.get(id)?.bounds;
        let leaf_size = self.params.min_leaf_size.max(1);
        let (width, height) = (bounds.width(), bounds.height());
        let too_thin = width <= leaf_size * 2;
        let too_short = height <= leaf_size * 2;
        if too_thin && too_short {
            return None;
        }

        let ratio = self.params.min_node_wh_ratio;
        let vertical = if too_short || (width > height && (height as f32 / width as f32) < ratio) {
            true
        } else if too_thin || (height > width && (width as f32 / height as f32) < ratio) {
            false
        } else {
            random.coin()
        };

        let (min, max) = (bounds.min(), bounds.max());
        let (first, second) = if vertical {
            let divider = random.range_exclusive(min.x + leaf_size, max.x - leaf_size);
            (
                IntegerRect::new(min.x, min.y, divider - min.x, height),
                IntegerRect::new(divider, min.y, max.x - divider, height),
            )
        } else {
            let divider = random.range_exclusive(min.y + leaf_size, max.y - leaf_size);
            (
                IntegerRect::new(min.x, min.y, width, divider - min.y),
                IntegerRect::new(min.x, divider, width, max.y - divider),
            )
        };
        Some([self.nodes.insert(BspNode::new(first)), self.nodes.insert(BspNode::new(second))])
    }

    fn room_creation_phase(
        &mut self,
        ctx: &mut GenContext<'_>,
        frames: u32,
    ) -> Result<(), GenError> {
        for _ in 0..budget(frames) {
            let made = self.rooms.len();
            if made >= self.rooms_to_make || made >= self.leaves.len() {
                self.core.schedule.next_phase();
                break;
            }
            let pick = ctx.random.range_exclusive(made as i32, self.leaves.len() as i32) as usize;
            self.leaves.swap(made, pick);
            self.create_room_in_leaf(ctx, self.leaves[made]);
        }
        if self.params.visualize_splitting {
            self.visualize(ctx.map, true)?;
        }
        Ok(())
    }

    fn create_room_in_leaf(&mut self, ctx: &mut GenContext<'_>, leaf_id: NodeId) {
        let Some(leaf_bounds) = self.nodes.get(leaf_id).map(|leaf| leaf.bounds) else {
            return;
        };
        let (min_size, max_size) = (self.params.room_min_size, self.params.room_max_size);
        let width = ctx.random.range_inclusive(min_size, max_size).min(leaf_bounds.width());
        let height = ctx.random.range_inclusive(min_size, max_size).min(leaf_bounds.height());
        let min = leaf_bounds.min();
        let x = ctx.random.range_inclusive(min.x, min.x + leaf_bounds.width() - width);
        let y = ctx.random.range_inclusive(min.y, min.y + leaf_bounds.height() - height);
        let room = IntegerRect::new(x, y, width, height);

        let mut cells = ctx.map.coordinates_in_rect(room, false);
        cells.retain(|&cell| self.paint(ctx.map, cell, self.params.fill_tile_type));
        if let Some(leaf) = self.nodes.get_mut(leaf_id) {
            leaf.carved_area.extend(cells);
        }
        self.rooms.push(room);
    }

    fn post_visualization_phase(
        &mut self,
        map: &mut Grid,
        include_outlines: bool,
    ) -> Result<(), GenError> {
        self.core.schedule.next_phase();
        self.visualize(map, include_outlines)
    }

    /// Restores the pre-generation region, then paints carved cells and,
    /// optionally, the split lines of every internal node.
    fn visualize(&self, map: &mut Grid, include_outlines: bool) -> Result<(), GenError> {
        if let Some(original) = &self.original {
            let origin = original.origin();
            map.apply_grid_subset(origin.x, origin.y, original)?;
        }
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut pending = VecDeque::from([root]);
        while let Some(id) = pending.pop_front() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for &cell in &node.carved_area {
                self.paint(map, cell, self.params.fill_tile_type);
            }
            let Some(children) = node.children else {
                continue;
            };
            pending.extend(children);
            if !include_outlines {
                continue;
            }
            let Some(first) = self.nodes.get(children[0]).map(|child| child.bounds) else {
                continue;
            };
            let line: Vec<(i32, i32)> = if first.width() == node.bounds.width() {
                (first.min().x..first.max().x).map(|x| (x, first.max().y)).collect()
            } else {
                (first.min().y..first.max().y).map(|y| (first.max().x, y)).collect()
            };
            for (x, y) in line {
                if map.in_bounds(x, y) {
                    map.put(x, y, self.params.fill_tile_type);
                }
            }
        }
        Ok(())
    }

    fn room_connection_setup_phase(&mut self) {
        self.node_list.clear();
        if let Some(root) = self.root {
            let mut pending = VecDeque::from([root]);
            while let Some(id) = pending.pop_front() {
                if let Some(children) = self.nodes.get(id).and_then(|node| node.children) {
                    pending.extend(children);
                    self.node_list.extend(children);
                }
            }
        }
        self.core.schedule.next_phase();
    }

    fn room_connection_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) {
        for _ in 0..budget(frames) {
            if self.node_list.len() <= 1 {
                let per_room = self.params.extra_corridors_per_room;
                let target = (self.rooms.len() as f32 * per_room).round();
                self.extra_corridors_to_make = target.max(0.0) as usize;
                ctx.random.shuffle(&mut self.leaves);
                self.core.schedule.next_phase();
                break;
            }
            let (Some(last), Some(second_last)) = (self.node_list.pop(), self.node_list.pop())
            else {
                break;
            };
            if ctx.random.coin() {
                self.join_nodes(ctx, last, second_last, true);
            } else {
                self.join_nodes(ctx, second_last, last, true);
            }
        }
    }

    fn extra_room_connection_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) {
        for _ in 0..budget(frames) {
            let made = self.extra_corridors_made;
            if made >= self.extra_corridors_to_make || made * 2 + 1 >= self.leaves.len() {
                self.core.schedule.next_phase();
                break;
            }
            let (first, second) = (self.leaves[made * 2], self.leaves[made * 2 + 1]);
            self.join_nodes(ctx, first, second, false);
            self.extra_corridors_made += 1;
        }
    }

    fn total_carved_area(&self, id: NodeId, out: &mut Vec<Coordinate>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        out.extend_from_slice(&node.carved_area);
        if let Some([first, second]) = node.children {
            self.total_carved_area(first, out);
            self.total_carved_area(second, out);
        }
    }

    /// Connects the carved areas under two nodes, preferring a pair of cells
    /// that share a row (or column) so the corridor runs straight.
    fn join_nodes(
        &mut self,
        ctx: &mut GenContext<'_>,
        first: NodeId,
        second: NodeId,
        check_path: bool,
    ) {
        let (Some(first_bounds), Some(second_bounds)) =
            (self.nodes.get(first).map(|n| n.bounds), self.nodes.get(second).map(|n| n.bounds))
        else {
            return;
        };
        let mut area1 = Vec::new();
        let mut area2 = Vec::new();
        self.total_carved_area(first, &mut area1);
        self.total_carved_area(second, &mut area2);
        if area1.is_empty() || area2.is_empty() {
            return;
        }
        if check_path && ctx.map.can_path_between_coordinates(area1[0], area2[0], false) {
            return;
        }

        ctx.random.shuffle(&mut area1);
        ctx.random.shuffle(&mut area2);

        // Doubled centers keep odd sizes exact.
        let center1 = first_bounds.min() * 2 + first_bounds.size();
        let center2 = second_bounds.min() * 2 + second_bounds.size();
        let left_to_right = center1.x < center2.x;
        let top_to_bottom = center1.y < center2.y;

        let pair = if (center1.x - center2.x).abs() > (center1.y - center2.y).abs() {
            shared_axis_pair(&area1, &area2, second_bounds, Axis::Row, left_to_right)
        } else {
            shared_axis_pair(&area1, &area2, second_bounds, Axis::Column, top_to_bottom)
        };
        let pair = pair
            .or_else(|| closest_approach_pair(&area1, &area2, left_to_right, top_to_bottom));

        match pair {
            Some((from, to)) => self.trace_path(ctx.map, from, to),
            None => debug!("{}: no coordinates found to join two nodes", self.core.name),
        }
    }

    /// Horizontal run along `to.y` between the two columns, then a vertical
    /// run along `from.x`.
    fn trace_path(&mut self, map: &mut Grid, from: Coordinate, to: Coordinate) {
        let mut corridor = Vec::new();
        let mut modifier = 1;
        if from.x != to.x {
            let (low, high) = (from.x.min(to.x), from.x.max(to.x));
            for x in (low + modifier)..high {
                self.fill_corridor_tile(map, x, to.y, &mut corridor);
            }
            modifier = 0;
        }
        if from.y != to.y {
            let (low, high) = (from.y.min(to.y), from.y.max(to.y));
            for y in (low + modifier)..(high + 1 - modifier) {
                self.fill_corridor_tile(map, from.x, y, &mut corridor);
            }
        }
        self.corridors.push(corridor);
    }

    fn fill_corridor_tile(
        &mut self,
        map: &mut Grid,
        x: i32,
        y: i32,
        corridor: &mut Vec<Coordinate>,
    ) {
        let Some(coord) = map.construct_valid_coordinate(x, y, false) else {
            return;
        };
        let point = IntegerVector::from(coord);
        let owner = self.leaves.iter().copied().find(|&id| {
            self.nodes.get(id).is_some_and(|leaf| leaf.bounds.probes(point))
        });
        let already_carved = owner
            .and_then(|id| self.nodes.get(id))
            .is_some_and(|leaf| leaf.carved_area.contains(&coord));
        if already_carved {
            self.paint(map, coord, self.params.debug_second_fill_tile_type);
            return;
        }
        if !self.paint(map, coord, self.params.fill_tile_type) {
            return;
        }
        if let Some(leaf) = owner.and_then(|id| self.nodes.get_mut(id)) {
            leaf.carved_area.push(coord);
        }
        corridor.push(coord);
    }

    /// Paints `coord` when the input mask accepts it; true when painted.
    fn paint(&self, map: &mut Grid, coord: Coordinate, tile: TileType) -> bool {
        let allowed = self
            .input
            .as_ref()
            .is_some_and(|input| accepts(input, self.params.valid_base_tiles, coord));
        if allowed {
            map.put(coord.x, coord.y, tile);
        }
        allowed
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Row,
    Column,
}

fn along(axis: Axis, coord: Coordinate) -> i32 {
    match axis {
        Axis::Row => coord.x,
        Axis::Column => coord.y,
    }
}

fn across(axis: Axis, coord: Coordinate) -> i32 {
    match axis {
        Axis::Row => coord.y,
        Axis::Column => coord.x,
    }
}

/// First pair of cells sharing a row (or column) inside the second node's
/// span, each pushed as far as possible toward the other node.
fn shared_axis_pair(
    area1: &[Coordinate],
    area2: &[Coordinate],
    second_bounds: IntegerRect,
    axis: Axis,
    forward: bool,
) -> Option<(Coordinate, Coordinate)> {
    let (span_min, span_max) = match axis {
        Axis::Row => (second_bounds.min().y, second_bounds.max().y),
        Axis::Column => (second_bounds.min().x, second_bounds.max().x),
    };
    let further = |candidate: Coordinate, best: Coordinate, toward: bool| {
        across(axis, candidate) == across(axis, best)
            && if toward {
                along(axis, candidate) > along(axis, best)
            } else {
                along(axis, candidate) < along(axis, best)
            }
    };

    let mut best1: Option<Coordinate> = None;
    let mut best2: Option<Coordinate> = None;
    for &coord1 in area1 {
        if let Some(current) = best1 {
            if further(coord1, current, forward) {
                best1 = Some(coord1);
            }
            continue;
        }
        let line = across(axis, coord1);
        if line < span_min || line >= span_max {
            continue;
        }
        for &coord2 in area2 {
            match best2 {
                Some(current) => {
                    if further(coord2, current, !forward) {
                        best2 = Some(coord2);
                    }
                }
                None if across(axis, coord2) == line => {
                    best1 = Some(coord1);
                    best2 = Some(coord2);
                }
                None => {}
            }
        }
    }
    best1.zip(best2)
}

/// Fallback when no straight connection exists: the first cell's row pushed
/// toward the second node, and the second cell's column pushed toward the first.
fn closest_approach_pair(
    area1: &[Coordinate],
    area2: &[Coordinate],
    left_to_right: bool,
    top_to_bottom: bool,
) -> Option<(Coordinate, Coordinate)> {
    let mut best1: Option<Coordinate> = None;
    for &coord in area1 {
        let replace = match best1 {
            None => true,
            Some(best) => {
                coord.y == best.y && if left_to_right { coord.x > best.x } else { coord.x < best.x }
            }
        };
        if replace {
            best1 = Some(coord);
        }
    }
    let mut best2: Option<Coordinate> = None;
    for &coord in area2 {
        let replace = match best2 {
            None => true,
            Some(best) => {
                coord.x == best.x && if top_to_bottom { coord.y < best.y } else { coord.y > best.y }
            }
        };
        if replace {
            best2 = Some(coord);
        }
    }
    best1.zip(best2)
}

impl LevelGenerator for BspGenerator {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn bounds(&self) -> IntegerRect {
        self.core.bounds
    }

    fn setup(&mut self, map: &Grid, bounds: IntegerRect) {
        self.core.reset(map, bounds);
        self.nodes.clear();
        let root = self.nodes.insert(BspNode::new(self.core.bounds));
        self.root = Some(root);
        self.queue = VecDeque::from([root]);
        self.node_list.clear();
        self.leaves.clear();
        self.original = Some(map.copy_of_grid_rect(self.core.bounds));
        self.input = None;
        self.rooms.clear();
        self.corridors.clear();
        self.rooms_to_make = 0;
        self.extra_corridors_to_make = 0;
        self.extra_corridors_made = 0;

        let schedule = &mut self.core.schedule;
        schedule.push(BspPhase::Division);
        if self.params.visualize_splitting {
            schedule.push(BspPhase::PostDivisionVisualization);
        }
        schedule.push(BspPhase::RoomCreation);
        if self.params.visualize_splitting {
            schedule.push(BspPhase::PostRoomCreationVisualization);
        }
        if self.params.enable_corridors {
            schedule.push(BspPhase::RoomConnectionSetup);
            schedule.push(BspPhase::RoomConnection);
        }
        if self.params.extra_corridors_per_room > 0.0 {
            if self.params.enable_corridors {
                schedule.push(BspPhase::ExtraRoomConnection);
            } else {
                warn!(
                    "{}: {} extra corridors per room ignored because corridors are disabled",
                    self.core.name, self.params.extra_corridors_per_room
                );
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.core.schedule.is_finished()
    }

    fn run_generation_frames(
        &mut self,
        ctx: &mut GenContext<'_>,
        frames: u32,
    ) -> Result<(), GenError> {
        let phase = self.core.begin_frame()?;
        if self.input.is_none() {
            self.input = Some(ctx.input_snapshot(self.core.bounds));
        }
        match phase {
            BspPhase::Division => self.division_phase(ctx, frames)?,
            BspPhase::PostDivisionVisualization => self.post_visualization_phase(ctx.map, true)?,
            BspPhase::RoomCreation => self.room_creation_phase(ctx, frames)?,
            BspPhase::PostRoomCreationVisualization => {
                self.post_visualization_phase(ctx.map, false)?
            }
            BspPhase::RoomConnectionSetup => self.room_connection_setup_phase(),
            BspPhase::RoomConnection => self.room_connection_phase(ctx, frames),
            BspPhase::ExtraRoomConnection => self.extra_room_connection_phase(ctx, frames),
        }
        Ok(())
    }

    fn output(&self, map: &Grid) -> GenerationOutput {
        let mut output = self.core.base_output(map);
        output.add_map_info(MapInfo::rooms(self.rooms.clone()));
        output.add_map_info(MapInfo::corridors(self.corridors.clone()));
        output
    }
}
