use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tilegen::{LevelGenKind, WorldGenSpecs};
use tilegen_tools::{
    DEFAULT_WORLD_SPECS, LevelConfig, OutputFormat, init_logging, load_level_config,
    load_world_specs, render_level, render_tile_detail, render_world, run_level, run_world,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a single level
    Level {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// TOML file with `[input]` and `[settings]` tables
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overrides the generator kind from the config
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, default_value_t = 64)]
        steps: u32,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
        format: OutputFormat,
    },
    /// Generate a layered world and classify it into macro-tiles
    World {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// World specs TOML; the bundled specs are used when omitted
        #[arg(long)]
        specs: Option<PathBuf>,
        #[arg(long, default_value_t = 256)]
        steps: u32,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
        format: OutputFormat,
        /// Also render the terrain detail of the macro-tile at X Y
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        detail: Option<Vec<i32>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Ca,
    Bsp,
    Room,
}

impl From<KindArg> for LevelGenKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Ca => LevelGenKind::Ca,
            KindArg::Bsp => LevelGenKind::Bsp,
            KindArg::Room => LevelGenKind::Room,
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Level { seed, config, kind, steps, format } => {
            let mut config = match config {
                Some(path) => load_level_config(&path)?,
                None => LevelConfig::default(),
            };
            if let Some(kind) = kind {
                config.input.kind = kind.into();
            }
            let output = run_level(&config, seed, steps)?;
            print!("{}", render_level(&output, format)?);
        }
        Command::World { seed, specs, steps, format, detail } => {
            let specs = match specs {
                Some(path) => load_world_specs(&path)?,
                None => WorldGenSpecs::from_toml_str(DEFAULT_WORLD_SPECS)?,
            };
            let (world, mut map) = run_world(specs, seed, steps)?;
            print!("{}", render_world(&world, &map, format)?);
            if let Some(detail) = detail {
                let &[x, y] = detail.as_slice() else {
                    bail!("--detail takes exactly two coordinates");
                };
                print!("{}", render_tile_detail(&mut map, x, y)?);
            }
        }
    }

    Ok(())
}
