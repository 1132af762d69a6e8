//! CLI utility for building the navmeshes of a scene

mod scene;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use log::info;
use navigator::{make_navigator, Listener, Navigator, NavigatorStats, StatsMap, WaitCondition};
use navigator_common::AgentBounds;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scene::Scene;

/// Builds navmeshes for the agents of a JSON scene
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every navmesh of a scene and print a summary
    Build {
        /// Scene description (JSON)
        #[clap(long, value_parser)]
        scene: PathBuf,

        /// Directory holding the tile cache
        #[clap(long, value_parser)]
        user_data: Option<PathBuf>,

        /// Player position (x,y,z), overrides the scene
        #[clap(long, value_parser = parse_vector)]
        player: Option<Vec3>,

        /// Number of worker threads, overrides the scene settings
        #[clap(long)]
        threads: Option<usize>,

        /// Only wait for tiles near the player
        #[clap(long)]
        near_player: bool,

        /// Write the summary as JSON to this file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// List the input geometry of every occupied tile
    Tiles {
        /// Scene description (JSON)
        #[clap(long, value_parser)]
        scene: PathBuf,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 3 {
        return Err(format!("Vector must have 3 components, got {}", parts.len()));
    }

    let x = parts[0].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let z = parts[2].trim().parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec3::new(x, y, z))
}

/// Logs build progress in steps of ten percent
#[derive(Debug, Default)]
struct ProgressLog {
    range: usize,
    done: usize,
    reported: usize,
}

impl Listener for ProgressLog {
    fn set_progress_range(&mut self, range: usize) {
        self.range = range;
        info!("Waiting for {} navmesh jobs", range);
    }

    fn increase_progress(&mut self, increment: usize) {
        self.done += increment;
        let percent = self.done * 100 / self.range.max(1);
        if percent >= self.reported + 10 || self.done == self.range {
            info!("{}% ({}/{})", percent, self.done, self.range);
            self.reported = percent;
        }
    }
}

#[derive(Debug, Serialize)]
struct MeshSummary {
    agent: AgentBounds,
    generation: u64,
    tiles: usize,
    polygons: usize,
    walkable_cells: usize,
    connections: usize,
}

#[derive(Debug, Serialize)]
struct BuildSummary {
    worldspace: String,
    rejected: usize,
    meshes: Vec<MeshSummary>,
    stats: NavigatorStats,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Build {
            scene,
            user_data,
            player,
            threads,
            near_player,
            output,
        } => build(&scene, user_data.as_deref(), player, threads, near_player, output.as_deref()),
        Commands::Tiles { scene } => list_tiles(&scene),
    }
}

/// Build the navmeshes of a scene
fn build(
    scene_path: &Path,
    user_data: Option<&Path>,
    player: Option<Vec3>,
    threads: Option<usize>,
    near_player: bool,
    output: Option<&Path>,
) -> Result<()> {
    let scene = Scene::load(scene_path)?;
    let mut settings = scene.settings.clone();
    if let Some(threads) = threads {
        settings = settings.with_async_threads(threads);
    }

    let mut navigator = make_navigator(settings, user_data).context("Failed to create navigator")?;
    let rejected = scene.apply(navigator.as_mut())?;
    info!(
        "Loaded scene {} with {} agents, {} rejected entries",
        scene_path.display(),
        scene.agents.len(),
        rejected
    );

    let player = player.unwrap_or(scene.player);
    navigator.update_bounds(player);
    navigator.update(player);

    let condition = if near_player {
        WaitCondition::RequiredTilesPresent
    } else {
        WaitCondition::AllJobsDone
    };
    let mut progress = ProgressLog::default();
    navigator.wait(&mut progress, condition);

    let summary = summarize(navigator.as_ref(), &scene.worldspace, rejected);
    for mesh in &summary.meshes {
        println!(
            "Agent {:?}: {} tiles, {} polygons, {} walkable cells, {} connections (generation {})",
            mesh.agent, mesh.tiles, mesh.polygons, mesh.walkable_cells, mesh.connections, mesh.generation
        );
    }

    let mut stats = StatsMap::new();
    navigator.report_stats(0, &mut stats);
    if let Some(frame) = stats.frame(0) {
        for (name, value) in frame {
            println!("{}: {}", name, value);
        }
    }

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(output, json).with_context(|| format!("Failed to write summary to {}", output.display()))?;
        println!("Saved summary to {}", output.display());
    }

    Ok(())
}

fn summarize(navigator: &dyn Navigator, worldspace: &str, rejected: usize) -> BuildSummary {
    let meshes = navigator
        .get_nav_meshes()
        .into_iter()
        .map(|(agent, mesh)| {
            let snapshot = mesh.load();
            let payloads = || snapshot.tiles.values().map(|tile| &tile.payload);
            MeshSummary {
                agent,
                generation: snapshot.generation,
                tiles: snapshot.len(),
                polygons: snapshot.polygon_count(),
                walkable_cells: payloads().map(|payload| payload.walkable_cells).sum(),
                connections: payloads().map(|payload| payload.connections.len()).sum(),
            }
        })
        .collect();

    BuildSummary {
        worldspace: worldspace.to_string(),
        rejected,
        meshes,
        stats: navigator.stats(),
    }
}

/// Print the input geometry of every occupied tile
fn list_tiles(scene_path: &Path) -> Result<()> {
    let scene = Scene::load(scene_path)?;
    let mut navigator = make_navigator(scene.settings.clone(), None).context("Failed to create navigator")?;
    scene.apply(navigator.as_mut())?;

    let tiles = navigator.recast_mesh_tiles();
    println!("{} occupied tiles", tiles.len());
    for (position, geometry) in &tiles {
        println!(
            "Tile {}: {} triangles, {} water surfaces, {} connections",
            position,
            geometry.triangles.len(),
            geometry.water.len(),
            geometry.connections.len()
        );
    }
    Ok(())
}
