use std::collections::BTreeMap;

use collision::{
    CollisionFeature, CollisionGroupFilter, CollisionIndex, CollisionShape, IndexedSubfeature,
    MapMode, PlacedSymbol, PlacementParams, TransformState,
};
use foundation::math::{Vec2, stable_total_cmp_f64};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlacementConfig;
use crate::stats::PlacementStats;

/// One label offered to a placement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCandidate {
    pub feature: CollisionFeature,
    pub symbol: PlacedSymbol,
    pub params: PlacementParams,
    /// Place into the ignored grid: queryable, never blocking.
    pub ignore_placement: bool,
    pub bucket_instance_id: u32,
    pub collision_group_id: u16,
    /// Higher goes first under [`sort_by_priority`].
    pub priority: f64,
}

impl SymbolCandidate {
    pub fn new(feature: CollisionFeature, symbol: PlacedSymbol, params: PlacementParams) -> Self {
        Self {
            feature,
            symbol,
            params,
            ignore_placement: false,
            bucket_instance_id: 0,
            collision_group_id: 0,
            priority: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDecision {
    pub bucket_instance_id: u32,
    pub feature_index: usize,
    pub placed: bool,
    pub offscreen: bool,
    /// Shapes committed to a grid; zero when rejected.
    pub shapes: usize,
}

/// Drives one frame of placement over a fresh [`CollisionIndex`].
///
/// Ordering contract: candidates are placed in the order given. Each accepted
/// candidate is inserted before the next one is tested, so earlier candidates
/// win every overlap. Use [`sort_by_priority`] first when input order is not
/// already the desired priority order.
#[derive(Debug, Clone)]
pub struct PlacementPass {
    index: CollisionIndex,
    config: PlacementConfig,
    stats: PlacementStats,
    scratch: Vec<Option<CollisionShape>>,
}

impl PlacementPass {
    pub fn new(transform: TransformState, mode: MapMode, config: PlacementConfig) -> Self {
        Self {
            index: CollisionIndex::new(transform, mode),
            config,
            stats: PlacementStats::default(),
            scratch: Vec::new(),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn stats(&self) -> PlacementStats {
        self.stats
    }

    pub fn index(&self) -> &CollisionIndex {
        &self.index
    }

    /// Tests one candidate and commits it if it fits.
    pub fn place(&mut self, candidate: &SymbolCandidate) -> PlacementDecision {
        self.stats.candidates += 1;
        let params = self.effective_params(candidate);

        self.scratch.clear();
        let outcome = self.index.place_feature(
            &candidate.feature,
            &candidate.symbol,
            &params,
            &mut self.scratch,
        );
        let used = self.scratch.iter().flatten().count();
        if candidate.feature.along_line {
            self.stats.circles_tested += used as u64;
        }

        let mut decision = PlacementDecision {
            bucket_instance_id: candidate.bucket_instance_id,
            feature_index: candidate.feature.indexed_feature.feature_index,
            placed: outcome.fits,
            offscreen: outcome.offscreen,
            shapes: 0,
        };
        if !outcome.fits {
            self.stats.rejected += 1;
            return decision;
        }

        self.index.insert_feature(
            &candidate.feature,
            &self.scratch,
            candidate.ignore_placement,
            candidate.bucket_instance_id,
            candidate.collision_group_id,
        );
        decision.shapes = used;

        self.stats.placed += 1;
        if outcome.offscreen {
            self.stats.offscreen += 1;
        }
        if candidate.ignore_placement {
            self.stats.ignored += 1;
        }
        decision
    }

    /// Places `candidates` in order, up to `max_symbols`.
    pub fn run(&mut self, candidates: &[SymbolCandidate]) -> Vec<PlacementDecision> {
        let limit = self.config.max_symbols;
        let mut out = Vec::with_capacity(candidates.len().min(limit));
        for candidate in candidates.iter().take(limit) {
            out.push(self.place(candidate));
        }
        self.stats.skipped += candidates.len().saturating_sub(limit) as u64;

        debug!(
            candidates = self.stats.candidates,
            placed = self.stats.placed,
            rejected = self.stats.rejected,
            skipped = self.stats.skipped,
            "placement pass finished"
        );
        out
    }

    /// Screen-space hit test against everything placed so far.
    pub fn query(&self, polygon: &[Vec2]) -> BTreeMap<u32, Vec<IndexedSubfeature>> {
        self.index.query_rendered_symbols(polygon)
    }

    fn effective_params(&self, candidate: &SymbolCandidate) -> PlacementParams {
        let mut params = candidate.params.clone();
        params.collision_debug |= self.config.collision_debug;
        if !self.config.cross_source_collisions {
            params.collision_group = CollisionGroupFilter::Only(candidate.collision_group_id);
        }
        params
    }
}

/// Stable sort, highest priority first. Ties keep input order; NaN sorts last.
pub fn sort_by_priority(candidates: &mut [SymbolCandidate]) {
    candidates.sort_by(|a, b| stable_total_cmp_f64(priority_key(b.priority), priority_key(a.priority)));
}

fn priority_key(priority: f64) -> f64 {
    if priority.is_nan() {
        f64::NEG_INFINITY
    } else {
        priority
    }
}
