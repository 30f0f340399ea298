use anyhow::{Result, ensure};
use clap::Parser;
use log::info;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tilegen::{IntegerRect, IntegerVector, LevelGenInput, LevelGenKind, TileType, WorldGenSpecs};
use tilegen_tools::{DEFAULT_WORLD_SPECS, LevelConfig, init_logging, run_level, run_world};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 20)]
    runs: u32,
    /// Skip the world pass, which is much slower than the level pass
    #[arg(long)]
    levels_only: bool,
}

fn pick<T: Copy>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    slice[rng.next_u64() as usize % slice.len()]
}

fn budget(rng: &mut ChaCha8Rng) -> u32 {
    1 + (rng.next_u64() % 64) as u32
}

fn soak_level(rng: &mut ChaCha8Rng, seed: u64) -> Result<()> {
    let kind = pick(rng, &[LevelGenKind::Ca, LevelGenKind::Bsp, LevelGenKind::Room]);
    let width = 24 + (rng.next_u64() % 48) as i32;
    let height = 24 + (rng.next_u64() % 48) as i32;
    let mut config = LevelConfig {
        input: LevelGenInput {
            kind,
            map_sizes: vec![IntegerVector::new(width, height)],
            ..LevelGenInput::default()
        },
        ..LevelConfig::default()
    };
    config.settings.border = (rng.next_u64() % 3) as i32;

    let sliced = run_level(&config, seed, budget(rng))?;
    let whole = run_level(&config, seed, u32::MAX)?;
    ensure!(
        sliced.grid.fingerprint() == whole.grid.fingerprint(),
        "{kind:?} seed {seed}: budget changed the level"
    );
    ensure!(sliced.map_info == whole.map_info, "{kind:?} seed {seed}: budget changed map info");

    for tile in &sliced.open_tiles {
        ensure!(
            sliced.grid.get(*tile) == Some(TileType::B),
            "{kind:?} seed {seed}: open tile {tile:?} is not open"
        );
    }
    let rooms = &sliced.map_info.rooms;
    for (index, room) in rooms.iter().enumerate() {
        ensure!(
            sliced.grid.bounds().intersection(room) == *room,
            "{kind:?} seed {seed}: room {room:?} leaves the map"
        );
        if kind == LevelGenKind::Room {
            for other in &rooms[index + 1..] {
                ensure!(!room.overlaps(other), "seed {seed}: rooms {room:?} and {other:?} overlap");
            }
        }
    }
    if kind == LevelGenKind::Ca {
        ensure!(sliced.map_info.caves.len() <= 1, "seed {seed}: more than one cave survived");
    }
    Ok(())
}

fn soak_world(rng: &mut ChaCha8Rng, seed: u64) -> Result<()> {
    let specs = WorldGenSpecs::from_toml_str(DEFAULT_WORLD_SPECS)?;
    let (sliced, mut map) = run_world(specs.clone(), seed, budget(rng))?;
    let (whole, _) = run_world(specs, seed, u32::MAX)?;
    for (index, (a, b)) in sliced.layers().iter().zip(whole.layers()).enumerate() {
        ensure!(
            a.fingerprint() == b.fingerprint(),
            "world seed {seed}: budget changed layer {index}"
        );
    }

    let x = (rng.next_u64() % map.width() as u64) as i32;
    let y = (rng.next_u64() % map.height() as u64) as i32;
    let view = IntegerRect::new(x, y, 2, 2);
    map.initialize_around(view);
    for dy in -1..3 {
        for dx in -1..3 {
            let (wx, wy) = ((x + dx).rem_euclid(map.width()), (y + dy).rem_euclid(map.height()));
            let initialized = map.tile(wx, wy).is_some_and(|tile| tile.is_initialized());
            ensure!(initialized, "world seed {seed}: tile ({wx}, {wy}) near the view is blank");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    info!("Starting soak on seed {} for {} runs", args.seed, args.runs);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    for run in 0..args.runs {
        let seed = rng.next_u64();
        soak_level(&mut rng, seed)?;
        if !args.levels_only {
            soak_world(&mut rng, seed)?;
        }
        info!("run {run} (seed {seed}) passed");
    }

    info!("Soak completed successfully.");
    Ok(())
}
