//! Candidate filtering: narrow the catalog to what can matter for a target.
//!
//! Armor is grouped by category and limited by rank. Within a category, a
//! piece with no innate abilities always survives (its slots may still be
//! worth having); a piece with abilities survives only if one of them is a
//! target ability. A category that filtering would empty falls back to its
//! rank-limited pool so the search always has something to pick.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{
    ArmorCategory, ArmorSet, Catalog, Decoration, DecorationKind, EquipmentPiece,
};
use crate::error::{Result, SearchError};
use crate::profile::TargetProfile;

/// Per-search candidate pools, borrowed from a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CandidatePools<'a> {
    /// Indexed by [`ArmorCategory::index`].
    pub armor: [Vec<&'a EquipmentPiece>; 5],
    pub accessories: Vec<&'a EquipmentPiece>,
    pub decorations: Vec<&'a Decoration>,
    /// Categories that use the unfiltered (rank-limited) pool.
    pub fallback: Vec<ArmorCategory>,
}

impl<'a> CandidatePools<'a> {
    pub fn category(&self, cat: ArmorCategory) -> &[&'a EquipmentPiece] {
        &self.armor[cat.index()]
    }

    /// Fails on the first armor category with no candidates.
    pub fn check_categories(&self) -> Result<()> {
        match ArmorCategory::ALL
            .into_iter()
            .find(|&cat| self.category(cat).is_empty())
        {
            Some(cat) => Err(SearchError::EmptyCategory(cat)),
            None => Ok(()),
        }
    }

    /// Same pools with decoration allocation disabled.
    pub fn without_decorations(mut self) -> Self {
        self.decorations.clear();
        self
    }
}

/// Build every candidate pool for `target`.
pub fn filter_candidates<'a>(
    catalog: &'a Catalog,
    target: &TargetProfile,
    rank_ceiling: Option<u8>,
) -> CandidatePools<'a> {
    let mut armor: [Vec<&'a EquipmentPiece>; 5] = Default::default();
    let mut fallback = Vec::new();

    for cat in ArmorCategory::ALL {
        let ranked: Vec<&EquipmentPiece> = catalog
            .armors
            .iter()
            .filter(|p| p.category == Some(cat))
            .filter(|p| rank_ceiling.is_none_or(|max| p.rank <= max))
            .collect();
        let relevant = filter_armor(&ranked, target);

        armor[cat.index()] = if relevant.is_empty() && !ranked.is_empty() {
            log::warn!(
                "No {:?} armor matches the target; falling back to {} unfiltered pieces",
                cat,
                ranked.len()
            );
            fallback.push(cat);
            ranked
        } else {
            relevant
        };
    }

    CandidatePools {
        armor,
        accessories: filter_accessories(&catalog.accessories, target),
        decorations: filter_decorations(&catalog.decorations, target),
        fallback,
    }
}

/// Keep pieces with no innate abilities, or with at least one target ability.
pub fn filter_armor<'a>(
    pieces: &[&'a EquipmentPiece],
    target: &TargetProfile,
) -> Vec<&'a EquipmentPiece> {
    pieces
        .iter()
        .copied()
        .filter(|p| {
            p.abilities.is_empty() || p.abilities.iter().any(|g| target.contains(g.ability))
        })
        .collect()
}

/// Keep accessories granting some target ability above level 1.
pub fn filter_accessories<'a>(
    accessories: &'a [EquipmentPiece],
    target: &TargetProfile,
) -> Vec<&'a EquipmentPiece> {
    accessories
        .iter()
        .filter(|a| {
            a.abilities
                .iter()
                .any(|g| target.contains(g.ability) && g.level > 1)
        })
        .collect()
}

/// Keep armor decorations granting at least one target ability.
pub fn filter_decorations<'a>(
    decorations: &'a [Decoration],
    target: &TargetProfile,
) -> Vec<&'a Decoration> {
    decorations
        .iter()
        .filter(|d| d.kind == DecorationKind::Armor)
        .filter(|d| d.abilities.iter().any(|g| target.contains(g.ability)))
        .collect()
}

/// Uniformly random piece per category.
pub fn random_armor_set<'a, R: Rng + ?Sized>(
    pools: &CandidatePools<'a>,
    rng: &mut R,
) -> Result<ArmorSet<'a>> {
    let mut picks = Vec::with_capacity(5);
    for cat in ArmorCategory::ALL {
        let piece = pools
            .category(cat)
            .choose(rng)
            .ok_or(SearchError::EmptyCategory(cat))?;
        picks.push(*piece);
    }
    Ok([picks[0], picks[1], picks[2], picks[3], picks[4]])
}

/// Fails unless slot `i` of `set` holds a piece of `ArmorCategory::ALL[i]`.
pub fn check_armor_set(set: &ArmorSet<'_>) -> Result<()> {
    match set
        .iter()
        .zip(ArmorCategory::ALL)
        .position(|(piece, cat)| piece.category != Some(cat))
    {
        Some(index) => Err(SearchError::InitialCategoryMismatch {
            index,
            expected: ArmorCategory::ALL[index],
        }),
        None => Ok(()),
    }
}
