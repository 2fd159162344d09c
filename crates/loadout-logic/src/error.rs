//! Error types for catalog loading and search.

use thiserror::Error;

use crate::catalog::{ArmorCategory, PieceId, SetId};

/// Problems found while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("armor piece {0} has no armor category")]
    MissingCategory(PieceId),
    #[error("accessory {0} must not have an armor category")]
    AccessoryWithCategory(PieceId),
    #[error("accessory {0} must not have decoration slots")]
    AccessoryWithSlots(PieceId),
    #[error("{kind} {id} has slot size {size}, expected 1..=4")]
    InvalidSlotSize {
        kind: &'static str,
        id: u32,
        size: u8,
    },
    #[error("set bonus {0} tiers are not strictly ascending by count")]
    UnorderedTiers(SetId),
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },
}

/// Errors that abort a search before any annealing step runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("no armor available for category {0:?}")]
    EmptyCategory(ArmorCategory),
    #[error("cooling factor must be in (0, 1), got {0}")]
    InvalidCoolingFactor(f64),
    #[error(
        "temperatures must be positive and finite with min < initial (initial={initial}, min={min})"
    )]
    InvalidTemperature { initial: f64, min: f64 },
    #[error("iterations per temperature must be at least 1")]
    ZeroIterations,
    #[error("starting armor slot {index} must hold a {expected:?} piece")]
    InitialCategoryMismatch {
        index: usize,
        expected: ArmorCategory,
    },
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
