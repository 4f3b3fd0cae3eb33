use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tellus::{Config, RecordingSink, Terrain, Vec3, World};

#[derive(Parser, Debug)]
#[command(name = "tellus", version, about = "Headless driver for the tellus terrain core")]
struct Cli {
    /// Path to the TOML config
    #[arg(long, global = true, default_value = "tellus.toml")]
    config: PathBuf,
    /// Save file, overriding [save].path
    #[arg(long, global = true)]
    save: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the observer in a straight line, streaming chunks, then save
    Walk {
        #[arg(long, default_value_t = 120)]
        ticks: u32,
        #[arg(long, default_value_t = 0.25, allow_hyphen_values = true)]
        step_x: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        step_z: f32,
    },
    /// Print noise and surface height of one column
    Height {
        #[arg(long, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, allow_hyphen_values = true)]
        z: i32,
    },
    /// Print what a save file holds
    Inspect,
}

const TICK_DT: f32 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(path) = cli.save {
        config.save.path = path;
    }

    match cli.command {
        Command::Walk {
            ticks,
            step_x,
            step_z,
        } => walk(config, ticks, Vec3::new(step_x, 0.0, step_z)),
        Command::Height { x, z } => {
            let terrain = Terrain::new(config.world.chunk_size, config.terrain.clone());
            let noise = terrain.sampler().noise().sample(f64::from(x), f64::from(z));
            println!(
                "column ({x}, {z}): noise={noise:.6} height={}",
                terrain.height_at(x, z)
            );
            Ok(())
        }
        Command::Inspect => inspect(&config),
    }
}

fn walk(config: Config, ticks: u32, step: Vec3) -> Result<(), Box<dyn Error>> {
    let mut world = World::new(config)?;
    let mut sink = RecordingSink::new();
    if let Err(e) = world.load_save(&mut sink) {
        log::warn!("continuing without save: {e}");
    }
    let mut loaded = 0usize;
    let mut unloaded = 0usize;
    let mut discarded = 0usize;
    for _ in 0..ticks {
        world.observer_mut().position += step;
        let r = world.tick(TICK_DT, &mut sink);
        loaded += r.streaming.loaded;
        unloaded += r.streaming.unloaded;
        discarded += r.streaming.discarded;
    }
    let r = world.finish_streaming(&mut sink);
    loaded += r.loaded;
    discarded += r.discarded;

    let p = world.observer().position;
    println!(
        "after {} ticks at ({:.2}, {:.2}, {:.2}): resident chunks={} blocks={} live in sink={}",
        world.tick_count(),
        p.x,
        p.y,
        p.z,
        world.chunks().resident_count(),
        world.chunks().block_count(),
        sink.len()
    );
    println!("loaded={loaded} unloaded={unloaded} discarded={discarded}");
    world.save()?;
    println!("saved to {}", world.save_path().display());
    Ok(())
}

fn inspect(config: &Config) -> Result<(), Box<dyn Error>> {
    let path = &config.save.path;
    match tellus_io::load(path, config.world.chunk_size)? {
        None => println!("no save at {}", path.display()),
        Some(l) => {
            let o = &l.observer;
            let stats = l.edits.stats();
            println!("save {}", path.display());
            println!(
                "observer: position=({:.2}, {:.2}, {:.2}) rotation=({:.1}, {:.1}, {:.1})",
                o.position.x, o.position.y, o.position.z, o.rotation.x, o.rotation.y, o.rotation.z
            );
            println!(
                "          selected={} health={} hunger={}",
                o.selected_block().display_name(),
                o.health,
                o.hunger
            );
            println!(
                "edits: {} placed, {} removed across {} chunks",
                stats.placed, stats.removed, stats.chunk_entries
            );
        }
    }
    Ok(())
}
