//! Loadout fitness: the scalar the search maximizes.
//!
//! A loadout scores:
//! - `1.5` per unit of armor slot capacity, filled or not
//! - `0.5 × target` for every ability exactly on target
//! - minus `1` per level over target (or over the hard cap), `5` per level short
//! - `+5` for each aid shared by exactly two pieces, `+12` for a full five-piece aid
//!
//! A non-empty target with nothing matched at all scores [`INFEASIBLE_SCORE`].
//!
//! Evaluations are memoized in a [`FitnessCache`] owned by a single search
//! call. The key holds the ordered armor ids, the accessory id and a
//! fingerprint of the target; the decoration pool, caps and set table are
//! assumed fixed for the cache's lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{ArmorSet, Decoration, EquipmentPiece, PieceId};
use crate::decoration::{allocate_decorations, SlotAssignment};
use crate::profile::{ability_score, AbilityCaps, AbilityLevels, TargetProfile};
use crate::set_bonus::{set_bonus_levels, SetBonusTable};

/// Score for a loadout that matches none of a non-empty target.
pub const INFEASIBLE_SCORE: f64 = -1e9;
/// Reward per unit of slot size.
pub const SLOT_CAPACITY_WEIGHT: f64 = 1.5;
pub const AID_PAIR_BONUS: f64 = 5.0;
pub const AID_FULL_SET_BONUS: f64 = 12.0;

/// Read-only inputs shared by every evaluation in one search.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub target: &'a TargetProfile,
    pub caps: &'a AbilityCaps,
    pub set_bonuses: &'a SetBonusTable,
    /// Empty disables decoration allocation.
    pub decorations: &'a [&'a Decoration],
    target_key: u64,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        target: &'a TargetProfile,
        caps: &'a AbilityCaps,
        set_bonuses: &'a SetBonusTable,
        decorations: &'a [&'a Decoration],
    ) -> Self {
        Self {
            target,
            caps,
            set_bonuses,
            decorations,
            target_key: target.fingerprint(),
        }
    }
}

/// Components of a score, kept for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub capacity: f64,
    pub bonus: f64,
    pub penalty: f64,
    pub aid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitnessResult {
    pub score: f64,
    /// Achieved target-ability levels from every source.
    pub abilities: AbilityLevels,
    /// Decoration choice per armor piece.
    pub decorations: Vec<SlotAssignment>,
    pub breakdown: ScoreBreakdown,
}

impl FitnessResult {
    pub fn is_infeasible(&self) -> bool {
        self.score <= INFEASIBLE_SCORE
    }
}

/// Score one loadout from scratch.
pub fn evaluate(
    ctx: &ScoringContext<'_>,
    armor: &ArmorSet<'_>,
    accessory: Option<&EquipmentPiece>,
) -> FitnessResult {
    let mut base = AbilityLevels::new();
    if let Some(acc) = accessory {
        base.add_targeted(&acc.abilities, ctx.target);
    }
    for piece in armor {
        base.add_targeted(&piece.abilities, ctx.target);
    }
    base.merge(&set_bonus_levels(armor, ctx.set_bonuses, ctx.target));

    let allocation = allocate_decorations(armor, ctx.decorations, &base, ctx.target, ctx.caps);
    let abilities = allocation.abilities;

    let capacity: f64 = armor
        .iter()
        .map(|p| p.slot_capacity() as f64 * SLOT_CAPACITY_WEIGHT)
        .sum();

    if !ctx.target.is_empty() && abilities.is_empty() {
        return FitnessResult {
            score: INFEASIBLE_SCORE,
            abilities,
            decorations: allocation.assignment,
            breakdown: ScoreBreakdown {
                capacity,
                ..Default::default()
            },
        };
    }

    let (bonus, penalty) = ability_score(ctx.target, &abilities, ctx.caps);
    let aid = aid_bonus(armor);

    FitnessResult {
        score: capacity + bonus - penalty + aid,
        abilities,
        decorations: allocation.assignment,
        breakdown: ScoreBreakdown {
            capacity,
            bonus,
            penalty,
            aid,
        },
    }
}

/// Bonus for armor pieces sharing an aid: exactly two → 5, all five → 12.
pub fn aid_bonus(armor: &[&EquipmentPiece]) -> f64 {
    let mut counts: HashMap<u32, u8> = HashMap::new();
    for aid in armor.iter().filter_map(|p| p.aid) {
        *counts.entry(aid).or_insert(0) += 1;
    }
    counts
        .values()
        .map(|&n| match n {
            2 => AID_PAIR_BONUS,
            5 => AID_FULL_SET_BONUS,
            _ => 0.0,
        })
        .sum()
}

/// Structural memoization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvalKey {
    pub armor: [PieceId; 5],
    pub accessory: Option<PieceId>,
    pub target: u64,
}

impl EvalKey {
    pub fn new(armor: &ArmorSet<'_>, accessory: Option<&EquipmentPiece>, target: u64) -> Self {
        Self {
            armor: std::array::from_fn(|i| armor[i].id),
            accessory: accessory.map(|a| a.id),
            target,
        }
    }
}

/// Memoized evaluations for one search call.
#[derive(Debug, Default)]
pub struct FitnessCache {
    entries: HashMap<EvalKey, Arc<FitnessResult>>,
    hits: u64,
    misses: u64,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached evaluation; identical inputs return the same shared result.
    pub fn evaluate(
        &mut self,
        ctx: &ScoringContext<'_>,
        armor: &ArmorSet<'_>,
        accessory: Option<&EquipmentPiece>,
    ) -> Arc<FitnessResult> {
        let key = EvalKey::new(armor, accessory, ctx.target_key);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        self.misses += 1;
        let result = Arc::new(evaluate(ctx, armor, accessory));
        self.entries.insert(key, Arc::clone(&result));
        result
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
