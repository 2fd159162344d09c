//! Target profiles, achieved ability levels, and per-ability scoring.
//!
//! The scoring rule is shared by the fitness evaluator and the decoration
//! allocator so a decoration's marginal value is measured with exactly the
//! formula the final score uses.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::{AbilityGrant, AbilityId, AbilityInfo};

/// Hard maximum assumed for abilities missing from the catalog.
pub const DEFAULT_MAX_LEVEL: u32 = 99;

/// Bonus per level when an ability lands exactly on target.
pub const EXACT_BONUS: f64 = 0.5;
/// Penalty per level above target (or above the hard cap).
pub const EXCEED_PENALTY: f64 = 1.0;
/// Penalty per level short of target.
pub const SHORTFALL_PENALTY: f64 = 5.0;

/// Desired level per ability. Never mutated during a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetProfile {
    levels: BTreeMap<AbilityId, u32>,
}

impl TargetProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (AbilityId, u32)>) -> Self {
        Self {
            levels: pairs.into_iter().collect(),
        }
    }

    pub fn set(&mut self, ability: AbilityId, level: u32) {
        self.levels.insert(ability, level);
    }

    pub fn get(&self, ability: AbilityId) -> Option<u32> {
        self.levels.get(&ability).copied()
    }

    pub fn contains(&self, ability: AbilityId) -> bool {
        self.levels.contains_key(&ability)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AbilityId, u32)> + '_ {
        self.levels.iter().map(|(&a, &l)| (a, l))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Stable hash of the profile, used as part of the evaluation cache key.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.levels.hash(&mut hasher);
        hasher.finish()
    }
}

/// Achieved level per ability for one candidate loadout.
///
/// Only abilities present in the target profile are ever recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityLevels {
    levels: BTreeMap<AbilityId, u32>,
}

impl AbilityLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ability: AbilityId, level: u32) {
        *self.levels.entry(ability).or_insert(0) += level;
    }

    /// Add every grant whose ability is part of the target.
    pub fn add_targeted(&mut self, grants: &[AbilityGrant], target: &TargetProfile) {
        for grant in grants {
            if target.contains(grant.ability) {
                self.add(grant.ability, grant.level);
            }
        }
    }

    pub fn merge(&mut self, other: &AbilityLevels) {
        for (ability, level) in other.iter() {
            self.add(ability, level);
        }
    }

    /// Achieved level, 0 when absent.
    pub fn get(&self, ability: AbilityId) -> u32 {
        self.levels.get(&ability).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AbilityId, u32)> + '_ {
        self.levels.iter().map(|(&a, &l)| (a, l))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

impl FromIterator<(AbilityId, u32)> for AbilityLevels {
    fn from_iter<I: IntoIterator<Item = (AbilityId, u32)>>(iter: I) -> Self {
        let mut levels = AbilityLevels::new();
        for (ability, level) in iter {
            levels.add(ability, level);
        }
        levels
    }
}

/// Hard maximum level per ability.
#[derive(Debug, Clone, Default)]
pub struct AbilityCaps {
    max: HashMap<AbilityId, u32>,
}

impl AbilityCaps {
    pub fn from_infos(infos: &[AbilityInfo]) -> Self {
        Self {
            max: infos.iter().map(|i| (i.id, i.max_level)).collect(),
        }
    }

    /// Catalog maximum, or [`DEFAULT_MAX_LEVEL`] for unknown abilities.
    pub fn max_level(&self, ability: AbilityId) -> u32 {
        self.max.get(&ability).copied().unwrap_or(DEFAULT_MAX_LEVEL)
    }
}

/// Signed contribution of one ability: bonus when exact, negative penalty
/// otherwise.
///
/// Overshooting a hard cap only charges the levels past the cap, and only
/// when the target itself is within the cap. A target above the cap falls
/// through to the plain over-target rule.
pub fn score_ability(target: u32, achieved: u32, max_level: u32) -> f64 {
    if achieved == target {
        target as f64 * EXACT_BONUS
    } else if achieved > max_level && target <= max_level {
        -((achieved - max_level) as f64 * EXCEED_PENALTY)
    } else if achieved > target {
        -((achieved - target) as f64 * EXCEED_PENALTY)
    } else {
        -((target - achieved) as f64 * SHORTFALL_PENALTY)
    }
}

/// Total (bonus, penalty) of `achieved` against every target ability.
pub fn ability_score(
    target: &TargetProfile,
    achieved: &AbilityLevels,
    caps: &AbilityCaps,
) -> (f64, f64) {
    let mut bonus = 0.0;
    let mut penalty = 0.0;
    for (ability, wanted) in target.iter() {
        let have = achieved.get(ability);
        let s = score_ability(wanted, have, caps.max_level(ability));
        if have == wanted {
            bonus += s;
        } else {
            penalty -= s;
        }
    }
    (bonus, penalty)
}
