//! Simulated annealing over armor pieces for one fixed accessory.
//!
//! Each step swaps the piece in one random category for a random candidate
//! from that category's pool. Improvements are always accepted; worse
//! neighbors are accepted with probability `exp(Δ / T)`, which shrinks as the
//! temperature cools geometrically toward `min_temperature`.
//!
//! The returned loadout is the best one ever evaluated during the run, which
//! is never worse than the starting loadout.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{ArmorSet, EquipmentPiece};
use crate::error::{Result, SearchError};
use crate::filter::{check_armor_set, random_armor_set, CandidatePools};
use crate::fitness::{FitnessCache, FitnessResult, ScoringContext};

/// Cooling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    /// The run stops once the temperature is at or below this.
    pub min_temperature: f64,
    /// Multiplier applied after each temperature level, in (0, 1).
    pub cooling_factor: f64,
    pub iterations_per_temperature: u32,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            min_temperature: 1e-8,
            cooling_factor: 0.95,
            iterations_per_temperature: 100,
        }
    }
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0) {
            return Err(SearchError::InvalidCoolingFactor(self.cooling_factor));
        }
        let (initial, min) = (self.initial_temperature, self.min_temperature);
        if !initial.is_finite() || !min.is_finite() || min <= 0.0 || min >= initial {
            return Err(SearchError::InvalidTemperature { initial, min });
        }
        if self.iterations_per_temperature == 0 {
            return Err(SearchError::ZeroIterations);
        }
        Ok(())
    }

    /// Number of temperature levels a run will visit.
    pub fn temperature_levels(&self) -> u32 {
        let mut t = self.initial_temperature;
        let mut levels = 0;
        while t > self.min_temperature {
            t *= self.cooling_factor;
            levels += 1;
        }
        levels
    }
}

/// Best loadout seen during one annealing run.
#[derive(Debug, Clone)]
pub struct AnnealOutcome<'a> {
    pub armor: ArmorSet<'a>,
    pub accessory: Option<&'a EquipmentPiece>,
    pub fitness: Arc<FitnessResult>,
    /// Score of the starting loadout.
    pub initial_score: f64,
    pub proposals: u64,
    pub accepted: u64,
}

/// Run one annealing pass.
///
/// `initial` defaults to a random piece per category. Fails before any step
/// if the configuration is invalid, a category has no candidates, or
/// `initial` has a piece in the wrong category slot.
pub fn anneal<'a, R: Rng + ?Sized>(
    ctx: &ScoringContext<'_>,
    cache: &mut FitnessCache,
    pools: &CandidatePools<'a>,
    accessory: Option<&'a EquipmentPiece>,
    initial: Option<ArmorSet<'a>>,
    config: &AnnealingConfig,
    rng: &mut R,
) -> Result<AnnealOutcome<'a>> {
    config.validate()?;
    pools.check_categories()?;

    let mut current = match initial {
        Some(set) => {
            check_armor_set(&set)?;
            set
        }
        None => random_armor_set(pools, rng)?,
    };
    log::trace!(
        "Annealing over {} temperature levels x {} iterations",
        config.temperature_levels(),
        config.iterations_per_temperature
    );
    let mut current_fit = cache.evaluate(ctx, &current, accessory);

    let mut best = AnnealOutcome {
        armor: current,
        accessory,
        fitness: Arc::clone(&current_fit),
        initial_score: current_fit.score,
        proposals: 0,
        accepted: 0,
    };

    let mut temperature = config.initial_temperature;
    while temperature > config.min_temperature {
        for _ in 0..config.iterations_per_temperature {
            let slot = rng.gen_range(0..current.len());
            let Some(&piece) = pools.armor[slot].choose(rng) else {
                continue;
            };

            let mut neighbor = current;
            neighbor[slot] = piece;
            let neighbor_fit = cache.evaluate(ctx, &neighbor, accessory);
            best.proposals += 1;

            let delta = neighbor_fit.score - current_fit.score;
            if delta > 0.0 || (delta / temperature).exp() > rng.gen::<f64>() {
                current = neighbor;
                current_fit = Arc::clone(&neighbor_fit);
                best.accepted += 1;
            }

            if neighbor_fit.score > best.fitness.score {
                best.armor = neighbor;
                best.fitness = neighbor_fit;
            }
        }
        log::trace!(
            "T={:.3e} current={:.2} best={:.2}",
            temperature,
            current_fit.score,
            best.fitness.score
        );
        temperature *= config.cooling_factor;
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArmorCategory, Catalog};
    use crate::filter::filter_candidates;
    use crate::fixtures::armor_piece;
    use crate::profile::{AbilityCaps, TargetProfile};
    use crate::set_bonus::SetBonusTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quick() -> AnnealingConfig {
        AnnealingConfig {
            initial_temperature: 10.0,
            min_temperature: 0.01,
            cooling_factor: 0.8,
            iterations_per_temperature: 20,
        }
    }

    /// Each category has a bare piece and one granting ability 1 at level 1.
    fn catalog() -> Catalog {
        let mut armors = Vec::new();
        for cat in 0..5 {
            let base = cat as u32 * 10;
            armors.push(armor_piece(base + 1, cat, &[]));
            armors.push(armor_piece(base + 2, cat, &[(1, 1)]));
        }
        Catalog {
            armors,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        let base = AnnealingConfig::default();
        assert!(base.validate().is_ok());
        let c = AnnealingConfig {
            cooling_factor: 1.0,
            ..base
        };
        assert_eq!(c.validate(), Err(SearchError::InvalidCoolingFactor(1.0)));
        let c = AnnealingConfig {
            min_temperature: 0.0,
            ..base
        };
        assert!(matches!(
            c.validate(),
            Err(SearchError::InvalidTemperature { .. })
        ));
        let c = AnnealingConfig {
            iterations_per_temperature: 0,
            ..base
        };
        assert_eq!(c.validate(), Err(SearchError::ZeroIterations));
    }

    #[test]
    fn test_temperature_levels() {
        let c = AnnealingConfig {
            initial_temperature: 8.0,
            min_temperature: 1.0,
            cooling_factor: 0.5,
            iterations_per_temperature: 1,
        };
        // 8, 4, 2 are above 1
        assert_eq!(c.temperature_levels(), 3);
    }

    #[test]
    fn test_finds_target_and_never_regresses() {
        let catalog = catalog();
        // Only the loadout of five ability pieces reaches 5.
        let target = TargetProfile::from_pairs([(1, 5)]);
        let pools = filter_candidates(&catalog, &target, None);
        let caps = AbilityCaps::default();
        let sets = SetBonusTable::default();
        let ctx = ScoringContext::new(&target, &caps, &sets, &pools.decorations);
        let mut cache = FitnessCache::new();
        let mut rng = StdRng::seed_from_u64(11);

        let outcome = anneal(&ctx, &mut cache, &pools, None, None, &quick(), &mut rng).unwrap();
        assert!(outcome.fitness.score >= outcome.initial_score);
        assert_eq!(outcome.fitness.abilities.get(1), 5);
        assert_eq!(outcome.fitness.score, 2.5);
        for (i, piece) in outcome.armor.iter().enumerate() {
            assert_eq!(piece.category, Some(ArmorCategory::ALL[i]));
        }
        assert!(outcome.proposals > 0);
    }

    #[test]
    fn test_supplied_initial_is_lower_bound() {
        let catalog = catalog();
        let target = TargetProfile::from_pairs([(1, 2)]);
        let pools = filter_candidates(&catalog, &target, None);
        let caps = AbilityCaps::default();
        let sets = SetBonusTable::default();
        let ctx = ScoringContext::new(&target, &caps, &sets, &pools.decorations);
        let mut cache = FitnessCache::new();
        let mut rng = StdRng::seed_from_u64(3);

        let initial = [
            pools.armor[0][1],
            pools.armor[1][1],
            pools.armor[2][0],
            pools.armor[3][0],
            pools.armor[4][0],
        ];
        let initial_score = cache.evaluate(&ctx, &initial, None).score;
        assert_eq!(initial_score, 1.0);

        let outcome = anneal(
            &ctx,
            &mut cache,
            &pools,
            None,
            Some(initial),
            &quick(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(outcome.initial_score, initial_score);
        assert!(outcome.fitness.score >= initial_score);
    }

    #[test]
    fn test_empty_category_aborts() {
        let mut catalog = catalog();
        catalog.armors.retain(|p| p.category != Some(ArmorCategory::Arms));
        let target = TargetProfile::from_pairs([(1, 2)]);
        let pools = filter_candidates(&catalog, &target, None);
        let caps = AbilityCaps::default();
        let sets = SetBonusTable::default();
        let ctx = ScoringContext::new(&target, &caps, &sets, &pools.decorations);
        let mut cache = FitnessCache::new();
        let mut rng = StdRng::seed_from_u64(3);

        let err = anneal(&ctx, &mut cache, &pools, None, None, &quick(), &mut rng).unwrap_err();
        assert_eq!(err, SearchError::EmptyCategory(ArmorCategory::Arms));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_initial_in_wrong_slot_aborts() {
        let catalog = catalog();
        let target = TargetProfile::from_pairs([(1, 2)]);
        let pools = filter_candidates(&catalog, &target, None);
        let caps = AbilityCaps::default();
        let sets = SetBonusTable::default();
        let ctx = ScoringContext::new(&target, &caps, &sets, &pools.decorations);
        let mut cache = FitnessCache::new();
        let mut rng = StdRng::seed_from_u64(3);

        let legs = pools.armor[4][1];
        let initial = [
            pools.armor[0][0],
            pools.armor[1][0],
            pools.armor[2][0],
            legs,
            legs,
        ];
        let err = anneal(
            &ctx,
            &mut cache,
            &pools,
            None,
            Some(initial),
            &quick(),
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SearchError::InitialCategoryMismatch {
                index: 3,
                expected: ArmorCategory::Waist,
            }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let catalog = catalog();
        let target = TargetProfile::from_pairs([(1, 3)]);
        let pools = filter_candidates(&catalog, &target, None);
        let caps = AbilityCaps::default();
        let sets = SetBonusTable::default();
        let ctx = ScoringContext::new(&target, &caps, &sets, &pools.decorations);

        let run = |seed| {
            let mut cache = FitnessCache::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let o = anneal(&ctx, &mut cache, &pools, None, None, &quick(), &mut rng).unwrap();
            (o.armor.map(|p| p.id), o.fitness.score, o.accepted)
        };
        assert_eq!(run(5), run(5));
    }
}
