//! Greedy decoration allocation.
//!
//! Slots are filled piece by piece, slot by slot. Each slot takes the
//! decoration of exactly matching size with the largest positive marginal
//! score against the running ability totals, or stays empty. Earlier choices
//! feed into later ones, so the result depends on slot order and is not a
//! global optimum.

use crate::catalog::{Decoration, DecorationId, EquipmentPiece};
use crate::profile::{score_ability, AbilityCaps, AbilityLevels, TargetProfile};

/// Per-slot decoration choice for one armor piece; `None` is an empty slot.
pub type SlotAssignment = Vec<Option<DecorationId>>;

/// Outcome of filling every slot of a loadout.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// One entry per armor piece, aligned with that piece's `slots`.
    pub assignment: Vec<SlotAssignment>,
    /// Base levels plus every chosen decoration's target abilities.
    pub abilities: AbilityLevels,
}

/// Change in score from adding `deco` on top of `current`.
pub fn marginal_gain(
    deco: &Decoration,
    current: &AbilityLevels,
    target: &TargetProfile,
    caps: &AbilityCaps,
) -> f64 {
    let mut delta = 0.0;
    for grant in &deco.abilities {
        let Some(wanted) = target.get(grant.ability) else {
            continue;
        };
        let have = current.get(grant.ability);
        let max = caps.max_level(grant.ability);
        delta += score_ability(wanted, have + grant.level, max) - score_ability(wanted, have, max);
    }
    delta
}

/// Fill the slots of `armor` from `pool`.
///
/// `base` is not modified; the returned [`Allocation`] carries a new map.
pub fn allocate_decorations(
    armor: &[&EquipmentPiece],
    pool: &[&Decoration],
    base: &AbilityLevels,
    target: &TargetProfile,
    caps: &AbilityCaps,
) -> Allocation {
    let mut running = base.clone();
    let mut assignment = Vec::with_capacity(armor.len());

    for piece in armor {
        let mut slots = Vec::with_capacity(piece.slots.len());
        for &size in &piece.slots {
            let mut best: Option<(&Decoration, f64)> = None;
            for deco in pool.iter().filter(|d| d.size == size) {
                let gain = marginal_gain(deco, &running, target, caps);
                if gain > 0.0 && best.is_none_or(|(_, g)| gain > g) {
                    best = Some((deco, gain));
                }
            }

            match best {
                Some((deco, _)) => {
                    running.add_targeted(&deco.abilities, target);
                    slots.push(Some(deco.id));
                }
                None => slots.push(None),
            }
        }
        assignment.push(slots);
    }

    Allocation {
        assignment,
        abilities: running,
    }
}
