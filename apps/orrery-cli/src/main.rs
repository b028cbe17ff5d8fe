use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use orrery_assets::{AssetDefinition, AssetRegistry, MaterialSpec};
use orrery_common::EntityId;
use orrery_kernel::{Engine, EngineConfig};
use orrery_prefab::PrefabDefinition;
use orrery_script::ScriptLibrary;
use orrery_tools::Inspector;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orrery", about = "Host for the orrery entity/component runtime")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and built-in capabilities
    Info,
    /// Run the demo scene for a number of ticks
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10")]
        ticks: u64,
        /// Seconds per tick
        #[arg(long, default_value = "0.016")]
        dt: f64,
        /// Number of trees to spawn
        #[arg(long, default_value = "3")]
        trees: usize,
        /// Engine config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Extra asset manifest (JSON) loaded before the scene
        #[arg(long)]
        assets: Option<PathBuf>,
    },
    /// Load an asset manifest and report its definitions
    Validate {
        /// Path to a JSON asset manifest
        manifest: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("orrery v{}", env!("CARGO_PKG_VERSION"));
            let library = ScriptLibrary::with_builtins();
            println!("script kinds: {}", library.kinds().collect::<Vec<_>>().join(", "));
            println!(
                "material schema: v{}",
                orrery_assets::MATERIAL_SCHEMA_VERSION
            );
            let config = EngineConfig::default();
            println!(
                "defaults: recycling={} max_delta={}s",
                config.entity_recycling, config.max_delta_seconds
            );
        }
        Commands::Run {
            ticks,
            dt,
            trees,
            config,
            assets,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let mut engine = Engine::new(config);
            build_scene(&mut engine)?;
            if let Some(path) = assets {
                let count = engine
                    .assets_mut()
                    .load_file(&path)
                    .with_context(|| format!("loading assets {}", path.display()))?;
                println!("Loaded {count} extra assets from {}", path.display());
            }

            let spawned = (0..trees)
                .map(|i| {
                    let params = json!({ "transform": { "position": [i as f32 * 4.0, 0.0, 0.0] } });
                    engine.spawn_prefab("game.tree", Some(&params))
                })
                .collect::<Result<Vec<EntityId>, _>>()?;
            println!("Spawned {} trees", spawned.len());

            let mut failures = 0;
            for _ in 0..ticks {
                let report = engine.step(dt);
                failures += report.errors.len();
            }

            println!("{}", Inspector::summary(&engine));
            for id in Inspector::list_entities(engine.world()) {
                if let Some(info) = Inspector::inspect_entity(&engine, id) {
                    println!("{info}");
                }
            }
            if failures > 0 {
                println!("{failures} script failures");
            }
            for err in engine.shutdown() {
                tracing::warn!(error = %err, "shutdown error");
            }
        }
        Commands::Validate { manifest } => {
            let mut registry = AssetRegistry::new();
            let count = registry
                .load_file(&manifest)
                .with_context(|| format!("validating {}", manifest.display()))?;
            println!("{}: {count} definitions OK", manifest.display());
            for asset in registry.iter() {
                match asset {
                    AssetDefinition::Material(m) => println!(
                        "  material {} `{}` color={} roughness={:.2} metalness={:.2}",
                        m.id, m.name, m.color, m.roughness, m.metalness
                    ),
                    AssetDefinition::Texture(t) => {
                        println!("  texture {} `{}` path={}", t.id, t.name, t.path)
                    }
                }
            }
            let dangling = registry.dangling_texture_refs();
            for (material, texture) in &dangling {
                println!("  warning: material {material} references unknown texture {texture}");
            }
        }
    }

    Ok(())
}

/// Demo content: a forest-ground material and a tree prefab whose canopy
/// spins slowly.
fn build_scene(engine: &mut Engine) -> anyhow::Result<()> {
    let mut ground = MaterialSpec::new("forestground", "Forest Ground");
    ground.color = Some("#3d2817".into());
    ground.roughness = Some(0.95);
    engine.assets_mut().define_material(ground)?;

    let mut leaves = MaterialSpec::new("leaves", "Leaves");
    leaves.color = Some("#2f6b2a".into());
    engine.assets_mut().define_material(leaves)?;

    let tree: PrefabDefinition = serde_json::from_value(json!({
        "id": "game.tree",
        "name": "Tree",
        "root": {
            "name": "Tree",
            "components": {
                "transform": { "position": [0.0, 0.0, 0.0] },
                "material": "forestground"
            },
            "children": [{
                "name": "Canopy",
                "components": {
                    "transform": { "position": [0.0, 3.0, 0.0] },
                    "material": "leaves",
                    "script": { "kind": "rotator", "params": { "speed": [0.0, 30.0, 0.0] } }
                }
            }]
        }
    }))?;
    engine.prefabs_mut().register_definition(tree)?;
    Ok(())
}
