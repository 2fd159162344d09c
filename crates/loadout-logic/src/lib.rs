//! Equipment loadout optimizer.
//!
//! Given a player's desired ability levels, this crate searches for the
//! combination of five armor pieces, one accessory and per-slot decorations
//! that best approximates them. Functions take plain catalog data and return
//! results; nothing here touches the filesystem, a UI or a clock, so every
//! piece is unit-testable with a seeded RNG.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Armor, accessory, decoration and set-bonus data model, validation, JSON loading |
//! | [`profile`] | Target profile, achieved ability levels, level caps, per-ability scoring |
//! | [`filter`] | Narrow catalog pools to the target, with fallback for emptied categories |
//! | [`set_bonus`] | Group/series set-bonus tier resolution |
//! | [`decoration`] | Greedy per-slot decoration allocation |
//! | [`fitness`] | Full loadout scoring and the per-search memoization cache |
//! | [`annealing`] | Simulated-annealing search over armor for one accessory |
//! | [`search`] | Accessory enumeration, result assembly, repeated runs |
//! | [`error`] | Catalog and search error types |
//!
//! ```
//! use loadout_logic::annealing::AnnealingConfig;
//! use loadout_logic::catalog::Catalog;
//! use loadout_logic::profile::TargetProfile;
//! use loadout_logic::search::{build_loadout, SearchOptions};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let catalog = Catalog::from_json(r#"{
//!     "armors": [
//!         {"id": 1, "category": "head",  "abilities": [{"ability": 7, "level": 1}]},
//!         {"id": 2, "category": "chest", "slots": [1]},
//!         {"id": 3, "category": "arms"},
//!         {"id": 4, "category": "waist"},
//!         {"id": 5, "category": "legs"}
//!     ]
//! }"#).unwrap();
//! let target = TargetProfile::from_pairs([(7, 1)]);
//! let options = SearchOptions {
//!     annealing: AnnealingConfig {
//!         min_temperature: 100.0,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let result = build_loadout(&catalog, &target, &options, &mut rng).unwrap();
//! assert_eq!(result.abilities.get(7), 1);
//! ```

pub mod annealing;
pub mod catalog;
pub mod decoration;
pub mod error;
pub mod filter;
pub mod fitness;
pub mod profile;
pub mod search;
pub mod set_bonus;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::{CatalogError, Result, SearchError};
