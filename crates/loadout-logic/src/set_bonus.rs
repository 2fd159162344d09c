//! Multi-piece set bonuses.
//!
//! Armor pieces may belong to a group set and a series set. When enough of
//! the five armor pieces share a set id, the highest tier whose threshold is
//! met grants its abilities. Accessories never count toward a set.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::{AbilityId, EquipmentPiece, SetBonusDefinition, SetBonusTier, SetId, SetKind};
use crate::profile::{AbilityLevels, TargetProfile};

/// Group and series definitions indexed by id.
#[derive(Debug, Clone, Default)]
pub struct SetBonusTable {
    group: HashMap<SetId, SetBonusDefinition>,
    series: HashMap<SetId, SetBonusDefinition>,
}

/// A tier that fired for the current armor.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredBonus {
    pub kind: SetKind,
    pub set: SetId,
    /// Pieces counted toward the set.
    pub pieces: u8,
    pub tier: SetBonusTier,
}

impl TriggeredBonus {
    pub fn abilities(&self) -> impl Iterator<Item = (AbilityId, u32)> + '_ {
        let level = self.tier.effective_level();
        self.tier.abilities.iter().map(move |&a| (a, level))
    }
}

impl SetBonusTable {
    pub fn new(group: &[SetBonusDefinition], series: &[SetBonusDefinition]) -> Self {
        Self {
            group: group.iter().map(|d| (d.id, d.clone())).collect(),
            series: series.iter().map(|d| (d.id, d.clone())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.series.is_empty()
    }

    fn definitions(&self, kind: SetKind) -> &HashMap<SetId, SetBonusDefinition> {
        match kind {
            SetKind::Group => &self.group,
            SetKind::Series => &self.series,
        }
    }
}

/// Highest tier of `def` whose count threshold is met, if any.
pub fn highest_tier(def: &SetBonusDefinition, count: u8) -> Option<&SetBonusTier> {
    def.tiers.iter().rev().find(|t| count >= t.count)
}

/// Resolve every set bonus triggered by the armor pieces.
///
/// Results are ordered group sets first, then series sets, each by id.
pub fn resolve_set_bonuses(
    armor: &[&EquipmentPiece],
    table: &SetBonusTable,
) -> Vec<TriggeredBonus> {
    let mut triggered = Vec::new();
    if table.is_empty() {
        return triggered;
    }

    for kind in [SetKind::Group, SetKind::Series] {
        let mut counts: BTreeMap<SetId, u8> = BTreeMap::new();
        for piece in armor {
            let set = match kind {
                SetKind::Group => piece.group_set,
                SetKind::Series => piece.series_set,
            };
            if let Some(id) = set {
                *counts.entry(id).or_insert(0) += 1;
            }
        }

        let defs = table.definitions(kind);
        for (set, pieces) in counts {
            let Some(def) = defs.get(&set) else {
                continue;
            };
            if let Some(tier) = highest_tier(def, pieces) {
                triggered.push(TriggeredBonus {
                    kind,
                    set,
                    pieces,
                    tier: tier.clone(),
                });
            }
        }
    }
    triggered
}

/// Target abilities granted by all triggered set bonuses.
pub fn set_bonus_levels(
    armor: &[&EquipmentPiece],
    table: &SetBonusTable,
    target: &TargetProfile,
) -> AbilityLevels {
    let mut levels = AbilityLevels::new();
    for bonus in resolve_set_bonuses(armor, table) {
        for (ability, level) in bonus.abilities() {
            if target.contains(ability) {
                levels.add(ability, level);
            }
        }
    }
    levels
}
