use std::collections::BTreeMap;
use std::path::PathBuf;

use collision::IndexedSubfeature;
use foundation::math::Vec2;
use serde::Serialize;
use symbols::{PlacementDecision, PlacementPass, PlacementStats, Scene, sort_by_priority};
use tracing::info;

pub fn usage() -> String {
    [
        "usage:",
        "  placer place <scene.json> [--debug] [--pretty]",
        "  placer check <scene.json>",
    ]
    .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceArgs {
    pub scene: PathBuf,
    /// Forces `collision_debug` on, whatever the scene config says.
    pub debug: bool,
    pub pretty: bool,
}

pub fn parse_place_args(args: &[String]) -> Result<PlaceArgs, String> {
    // placer place <scene.json> [--debug] [--pretty]
    let mut scene: Option<PathBuf> = None;
    let mut debug = false;
    let mut pretty = false;

    for arg in args {
        match arg.as_str() {
            "--debug" => debug = true,
            "--pretty" => pretty = true,
            s if s.starts_with('-') => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            s => {
                if scene.is_some() {
                    return Err(format!("unexpected extra path: {s}"));
                }
                scene = Some(PathBuf::from(s));
            }
        }
    }

    let scene = scene.ok_or_else(usage)?;
    Ok(PlaceArgs {
        scene,
        debug,
        pretty,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementReport {
    pub decisions: Vec<PlacementDecision>,
    pub stats: PlacementStats,
    pub queries: Vec<QueryReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    /// Index into the scene's `queries`.
    pub query: usize,
    pub hits: Vec<QueryHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub bucket_instance_id: u32,
    pub feature_indices: Vec<usize>,
}

/// Runs one placement pass over `scene` and answers its queries.
///
/// Symbols are placed highest priority first; equal priorities keep file
/// order, so decisions follow that placement order.
pub fn run_scene(scene: &Scene, force_debug: bool) -> PlacementReport {
    let mut config = scene.config.clone();
    config.collision_debug |= force_debug;

    let mut candidates = scene.candidates.clone();
    sort_by_priority(&mut candidates);

    let mut pass = PlacementPass::new(scene.transform, scene.map_mode, config);
    let decisions = pass.run(&candidates);
    let queries = scene
        .queries
        .iter()
        .enumerate()
        .map(|(i, polygon)| QueryReport {
            query: i,
            hits: query_hits(&pass, polygon),
        })
        .collect();

    PlacementReport {
        decisions,
        stats: pass.stats(),
        queries,
    }
}

fn query_hits(pass: &PlacementPass, polygon: &[Vec2]) -> Vec<QueryHit> {
    let found: BTreeMap<u32, Vec<IndexedSubfeature>> = pass.query(polygon);
    found
        .into_iter()
        .map(|(bucket_instance_id, features)| QueryHit {
            bucket_instance_id,
            feature_indices: features.iter().map(|f| f.feature_index).collect(),
        })
        .collect()
}

pub fn render_report(report: &PlacementReport, pretty: bool) -> Result<String, String> {
    let out = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    out.map_err(|e| format!("json: {e}"))
}

pub fn cmd_place(args: &[String]) -> Result<String, String> {
    let args = parse_place_args(args)?;
    let scene = Scene::load(&args.scene).map_err(|e| e.to_string())?;
    info!(
        path = %args.scene.display(),
        symbols = scene.candidates.len(),
        queries = scene.queries.len(),
        "scene loaded"
    );
    let report = run_scene(&scene, args.debug);
    render_report(&report, args.pretty)
}

pub fn cmd_check(args: &[String]) -> Result<String, String> {
    // placer check <scene.json>
    let [path] = args else {
        return Err(usage());
    };
    let scene = Scene::load(&PathBuf::from(path)).map_err(|e| e.to_string())?;
    Ok(format!(
        "ok: {} symbols, {} queries",
        scene.candidates.len(),
        scene.queries.len()
    ))
}
