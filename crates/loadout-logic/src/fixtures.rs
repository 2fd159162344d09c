//! Small catalog builders shared by unit tests.

use crate::catalog::{
    AbilityGrant, AbilityId, ArmorCategory, Decoration, DecorationKind, EquipmentPiece,
    SetBonusDefinition, SetBonusTier,
};

pub fn grants(abilities: &[(AbilityId, u32)]) -> Vec<AbilityGrant> {
    abilities
        .iter()
        .map(|&(ability, level)| AbilityGrant { ability, level })
        .collect()
}

/// Armor piece in the category at `category_index` (0..5), no slots.
pub fn armor_piece(
    id: u32,
    category_index: usize,
    abilities: &[(AbilityId, u32)],
) -> EquipmentPiece {
    EquipmentPiece {
        id,
        name: format!("armor-{}", id),
        category: Some(ArmorCategory::ALL[category_index]),
        rank: 1,
        slots: Vec::new(),
        abilities: grants(abilities),
        aid: None,
        group_set: None,
        series_set: None,
        defense: 10,
        resistances: [0; 5],
    }
}

pub fn accessory(id: u32, abilities: &[(AbilityId, u32)]) -> EquipmentPiece {
    EquipmentPiece {
        id,
        name: format!("accessory-{}", id),
        category: None,
        rank: 1,
        slots: Vec::new(),
        abilities: grants(abilities),
        aid: None,
        group_set: None,
        series_set: None,
        defense: 0,
        resistances: [0; 5],
    }
}

pub fn decoration(id: u32, size: u8, abilities: &[(AbilityId, u32)]) -> Decoration {
    Decoration {
        id,
        name: format!("deco-{}", id),
        size,
        abilities: grants(abilities),
        kind: DecorationKind::Armor,
    }
}

/// Set with a 2-piece tier granting `at_two` and a 4-piece tier granting `at_four`.
pub fn two_four_set(id: u32, at_two: AbilityId, at_four: AbilityId) -> SetBonusDefinition {
    SetBonusDefinition {
        id,
        name: format!("set-{}", id),
        tiers: vec![
            SetBonusTier {
                count: 2,
                abilities: vec![at_two],
                level: None,
            },
            SetBonusTier {
                count: 4,
                abilities: vec![at_four],
                level: None,
            },
        ],
    }
}

/// Five bare armor pieces, ids 1..=5, one per category.
pub fn bare_armor() -> Vec<EquipmentPiece> {
    (0..5).map(|i| armor_piece(i as u32 + 1, i, &[])).collect()
}

pub fn as_set(pieces: &[EquipmentPiece]) -> [&EquipmentPiece; 5] {
    [&pieces[0], &pieces[1], &pieces[2], &pieces[3], &pieces[4]]
}
