//! Static equipment data: armor pieces, accessories, decorations and
//! multi-piece set bonuses.
//!
//! A [`Catalog`] is loaded once (typically from JSON), validated, and then
//! treated as read-only by every search. Optional fields default to empty so
//! a catalog only spells out what a piece actually has.
//!
//! ```
//! use loadout_logic::catalog::{ArmorCategory, Catalog};
//!
//! let catalog = Catalog::from_json(r#"{
//!     "armors": [{"id": 10, "category": "legs", "slots": [2, 1]}]
//! }"#).unwrap();
//! assert_eq!(catalog.armors[0].category, Some(ArmorCategory::Legs));
//! assert_eq!(catalog.armors[0].slot_capacity(), 3);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::profile::AbilityCaps;
use crate::set_bonus::SetBonusTable;

pub type AbilityId = u32;
pub type PieceId = u32;
pub type DecorationId = u32;
pub type SetId = u32;

/// One piece per armor category, in [`ArmorCategory::ALL`] order.
pub type ArmorSet<'a> = [&'a EquipmentPiece; 5];

/// Largest decoration slot size in the game.
pub const MAX_SLOT_SIZE: u8 = 4;

/// The five armor slots. Every loadout holds exactly one piece per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ArmorCategory {
    Head = 1,
    Chest = 2,
    Arms = 3,
    Waist = 4,
    Legs = 5,
}

impl ArmorCategory {
    /// All categories in loadout order.
    pub const ALL: [ArmorCategory; 5] = [
        ArmorCategory::Head,
        ArmorCategory::Chest,
        ArmorCategory::Arms,
        ArmorCategory::Waist,
        ArmorCategory::Legs,
    ];

    /// Zero-based position in a loadout.
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

/// One ability granted at a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityGrant {
    pub ability: AbilityId,
    pub level: u32,
}

/// An armor piece or an accessory.
///
/// Accessories have no `category` and no slots; armor pieces always have a
/// category. [`Catalog::validate`] enforces both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentPiece {
    pub id: PieceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<ArmorCategory>,
    #[serde(default)]
    pub rank: u8,
    /// Decoration slot sizes in slot order.
    #[serde(default)]
    pub slots: Vec<u8>,
    #[serde(default)]
    pub abilities: Vec<AbilityGrant>,
    /// Equipment-origin grouping, scored by the aid bonus.
    #[serde(default)]
    pub aid: Option<u32>,
    #[serde(default)]
    pub group_set: Option<SetId>,
    #[serde(default)]
    pub series_set: Option<SetId>,
    #[serde(default)]
    pub defense: u32,
    /// Fire, water, thunder, ice, dragon. Carried for display only.
    #[serde(default)]
    pub resistances: [i16; 5],
}

impl EquipmentPiece {
    /// Sum of all slot sizes.
    pub fn slot_capacity(&self) -> u32 {
        self.slots.iter().map(|&s| s as u32).sum()
    }

    /// Innate level of an ability on this piece (0 if not granted).
    pub fn level_of(&self, ability: AbilityId) -> u32 {
        self.abilities
            .iter()
            .filter(|g| g.ability == ability)
            .map(|g| g.level)
            .sum()
    }
}

/// Which equipment type a decoration can be slotted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    #[default]
    Armor,
    Weapon,
}

/// A slot modifier. It only fits a slot of exactly `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub id: DecorationId,
    #[serde(default)]
    pub name: String,
    pub size: u8,
    #[serde(default)]
    pub abilities: Vec<AbilityGrant>,
    #[serde(default)]
    pub kind: DecorationKind,
}

/// Group sets and series sets are tallied separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    Group,
    Series,
}

/// Level at which a set-bonus tier grants its abilities when none is given.
/// Means "fully active" rather than a numeric skill level.
pub const SET_BONUS_FULL_LEVEL: u32 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBonusTier {
    /// Number of equipped armor pieces required.
    pub count: u8,
    pub abilities: Vec<AbilityId>,
    #[serde(default)]
    pub level: Option<u32>,
}

impl SetBonusTier {
    pub fn effective_level(&self) -> u32 {
        self.level.unwrap_or(SET_BONUS_FULL_LEVEL)
    }
}

/// A multi-piece set bonus. Tiers are ascending by `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBonusDefinition {
    pub id: SetId,
    #[serde(default)]
    pub name: String,
    pub tiers: Vec<SetBonusTier>,
}

/// Ability metadata needed for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityInfo {
    pub id: AbilityId,
    #[serde(default)]
    pub name: String,
    pub max_level: u32,
}

/// Everything the optimizer reads. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub armors: Vec<EquipmentPiece>,
    #[serde(default)]
    pub accessories: Vec<EquipmentPiece>,
    #[serde(default)]
    pub decorations: Vec<Decoration>,
    #[serde(default)]
    pub group_sets: Vec<SetBonusDefinition>,
    #[serde(default)]
    pub series_sets: Vec<SetBonusDefinition>,
    #[serde(default)]
    pub abilities: Vec<AbilityInfo>,
}

impl Catalog {
    /// Parse and validate a catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the structural rules every search relies on.
    pub fn validate(&self) -> Result<(), CatalogError> {
        unique_ids("armor", self.armors.iter().map(|p| p.id))?;
        unique_ids("accessory", self.accessories.iter().map(|p| p.id))?;
        unique_ids("decoration", self.decorations.iter().map(|d| d.id))?;
        unique_ids("group set", self.group_sets.iter().map(|s| s.id))?;
        unique_ids("series set", self.series_sets.iter().map(|s| s.id))?;
        unique_ids("ability", self.abilities.iter().map(|a| a.id))?;

        for piece in &self.armors {
            if piece.category.is_none() {
                return Err(CatalogError::MissingCategory(piece.id));
            }
            check_slot_sizes("armor", piece.id, &piece.slots)?;
        }
        for piece in &self.accessories {
            if piece.category.is_some() {
                return Err(CatalogError::AccessoryWithCategory(piece.id));
            }
            if !piece.slots.is_empty() {
                return Err(CatalogError::AccessoryWithSlots(piece.id));
            }
        }
        for deco in &self.decorations {
            check_slot_sizes("decoration", deco.id, &[deco.size])?;
        }
        for set in self.group_sets.iter().chain(&self.series_sets) {
            if set.tiers.windows(2).any(|w| w[0].count >= w[1].count) {
                return Err(CatalogError::UnorderedTiers(set.id));
            }
        }
        Ok(())
    }

    /// Hard maximum level per ability.
    pub fn ability_caps(&self) -> AbilityCaps {
        AbilityCaps::from_infos(&self.abilities)
    }

    /// Group and series set definitions indexed by id.
    pub fn set_bonuses(&self) -> SetBonusTable {
        SetBonusTable::new(&self.group_sets, &self.series_sets)
    }
}

fn unique_ids(kind: &'static str, ids: impl Iterator<Item = u32>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

fn check_slot_sizes(kind: &'static str, id: u32, sizes: &[u8]) -> Result<(), CatalogError> {
    match sizes.iter().find(|&&s| s == 0 || s > MAX_SLOT_SIZE) {
        Some(&size) => Err(CatalogError::InvalidSlotSize { kind, id, size }),
        None => Ok(()),
    }
}
