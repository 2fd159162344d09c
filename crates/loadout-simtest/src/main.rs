//! Loadout Optimizer Headless Harness
//!
//! Validates the catalog, scoring and search against the bundled sample
//! catalog, then optionally solves one target and prints the loadout.
//!
//! Usage:
//!   cargo run -p loadout-simtest
//!   cargo run -p loadout-simtest -- --verbose --seed 7
//!   cargo run -p loadout-simtest -- --target 1:3,2:3 --json

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use loadout_logic::annealing::AnnealingConfig;
use loadout_logic::catalog::{ArmorCategory, ArmorSet, Catalog};
use loadout_logic::filter::filter_candidates;
use loadout_logic::fitness::{evaluate, FitnessCache, ScoringContext, INFEASIBLE_SCORE};
use loadout_logic::profile::{AbilityCaps, TargetProfile};
use loadout_logic::search::{build_loadout, build_loadout_repeated, LoadoutResult, SearchOptions};
use loadout_logic::set_bonus::{resolve_set_bonuses, SetBonusTable};

// ── Sample catalog (same JSON the integration tests use) ───────────────
const CATALOG_JSON: &str = include_str!("../../../data/catalog.json");

#[derive(Debug, Parser)]
#[command(name = "loadout-simtest", about = "Headless loadout optimizer harness")]
struct Args {
    /// Print every check, not just failures
    #[arg(long)]
    verbose: bool,

    /// RNG seed for every search
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Full searches for the repeated-run check
    #[arg(long, default_value_t = 3)]
    runs: u32,

    /// Catalog JSON to load instead of the bundled sample
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Solve this target after validation, as ability:level pairs (e.g. 1:3,2:3)
    #[arg(long)]
    target: Option<String>,

    /// Print the solved loadout as JSON
    #[arg(long)]
    json: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    println!("=== Loadout Optimizer Harness ===\n");

    let catalog = match load_catalog(args.catalog.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("catalog error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog contents
    results.extend(validate_catalog(&catalog));

    // 2. Candidate filtering
    results.extend(validate_filter(&catalog));

    // 3. Scoring rules
    results.extend(validate_scoring());

    // 4. Search behaviour
    results.extend(validate_search(&catalog, &args));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );

    if let Some(raw) = &args.target {
        if let Err(e) = solve(&catalog, raw, &args) {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog, String> {
    let json = match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p.display(), e))?,
        None => CATALOG_JSON.to_string(),
    };
    Catalog::from_json(&json).map_err(|e| e.to_string())
}

fn quick_options(seed_runs: u32) -> SearchOptions {
    SearchOptions {
        annealing: AnnealingConfig {
            initial_temperature: 100.0,
            min_temperature: 0.01,
            cooling_factor: 0.9,
            iterations_per_temperature: 60,
        },
        runs: seed_runs,
        ..Default::default()
    }
}

/// Parse `1:3,2:3` into a target profile.
fn parse_target(raw: &str) -> Result<TargetProfile, String> {
    let mut target = TargetProfile::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (ability, level) = pair
            .split_once(':')
            .ok_or_else(|| format!("expected ability:level, got {:?}", pair))?;
        let ability = ability.trim().parse().map_err(|e| format!("{:?}: {}", pair, e))?;
        let level = level.trim().parse().map_err(|e| format!("{:?}: {}", pair, e))?;
        target.set(ability, level);
    }
    Ok(target)
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Catalog ---");
    let mut results = Vec::new();

    let missing: Vec<ArmorCategory> = ArmorCategory::ALL
        .into_iter()
        .filter(|&cat| !catalog.armors.iter().any(|p| p.category == Some(cat)))
        .collect();
    results.push(check(
        "catalog_every_category",
        missing.is_empty(),
        if missing.is_empty() {
            format!(
                "{} armor pieces across all categories",
                catalog.armors.len()
            )
        } else {
            format!("no armor for {:?}", missing)
        },
    ));

    let caps = catalog.ability_caps();
    let uncapped = catalog
        .abilities
        .iter()
        .filter(|a| caps.max_level(a.id) != a.max_level)
        .count();
    results.push(check(
        "catalog_caps_loaded",
        uncapped == 0,
        format!("{} abilities with caps", catalog.abilities.len()),
    ));

    let sets = catalog.set_bonuses();
    results.push(check(
        "catalog_set_bonuses",
        !sets.is_empty() || (catalog.group_sets.is_empty() && catalog.series_sets.is_empty()),
        format!(
            "{} group sets, {} series sets",
            catalog.group_sets.len(),
            catalog.series_sets.len()
        ),
    ));

    results
}

// ── 2. Filter ───────────────────────────────────────────────────────────

fn validate_filter(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Candidate Filter ---");
    let mut results = Vec::new();

    // Pick the first ability any armor grants.
    let Some(ability) = catalog
        .armors
        .iter()
        .flat_map(|p| p.abilities.iter())
        .map(|g| g.ability)
        .next()
    else {
        results.push(check(
            "filter_has_abilities",
            false,
            "no armor grants any ability",
        ));
        return results;
    };
    let target = TargetProfile::from_pairs([(ability, 2)]);
    let pools = filter_candidates(catalog, &target, None);

    let all_relevant = ArmorCategory::ALL.into_iter().all(|cat| {
        pools.fallback.contains(&cat)
            || pools.category(cat).iter().all(|p| {
                p.abilities.is_empty() || p.abilities.iter().any(|g| target.contains(g.ability))
            })
    });
    results.push(check(
        "filter_armor_relevant",
        all_relevant,
        format!(
            "ability {}: {} fallback categories",
            ability,
            pools.fallback.len()
        ),
    ));

    results.push(check(
        "filter_categories_nonempty",
        pools.check_categories().is_ok(),
        "every category has candidates",
    ));

    let accessories_ok = pools
        .accessories
        .iter()
        .all(|a| a.abilities.iter().any(|g| g.ability == ability && g.level > 1));
    results.push(check(
        "filter_accessories_above_one",
        accessories_ok,
        format!("{} accessories kept", pools.accessories.len()),
    ));

    let decos_ok = pools
        .decorations
        .iter()
        .all(|d| d.abilities.iter().any(|g| g.ability == ability));
    results.push(check(
        "filter_decorations_relevant",
        decos_ok,
        format!("{} decorations kept", pools.decorations.len()),
    ));

    results
}

// ── 3. Scoring ──────────────────────────────────────────────────────────

/// Five slotless pieces granting ability 1 at level 1, with the given aids.
fn uniform_catalog(aids: [u32; 5]) -> Catalog {
    let mut catalog = Catalog::default();
    for (i, (cat, aid)) in ArmorCategory::ALL.into_iter().zip(aids).enumerate() {
        let json = format!(
            r#"{{"id": {}, "category": "{}", "aid": {}, "abilities": [{{"ability": 1, "level": 1}}]}}"#,
            i + 1,
            format!("{:?}", cat).to_lowercase(),
            aid
        );
        match serde_json::from_str(&json) {
            Ok(piece) => catalog.armors.push(piece),
            Err(e) => log::error!("bad synthetic piece: {}", e),
        }
    }
    catalog
}

fn validate_scoring() -> Vec<TestResult> {
    println!("--- Scoring ---");
    let mut results = Vec::new();
    let caps = AbilityCaps::default();
    let sets = SetBonusTable::default();

    let distinct = uniform_catalog([1, 2, 3, 4, 5]);
    if distinct.armors.len() != 5 {
        results.push(check(
            "scoring_fixture",
            false,
            "synthetic catalog incomplete",
        ));
        return results;
    }
    let armor: ArmorSet<'_> = std::array::from_fn(|i| &distinct.armors[i]);

    let target = TargetProfile::from_pairs([(1, 3)]);
    let ctx = ScoringContext::new(&target, &caps, &sets, &[]);
    let score = evaluate(&ctx, &armor, None).score;
    results.push(check(
        "scoring_overshoot",
        score == -2.0,
        format!("5 levels against 3: {}", score),
    ));

    let target = TargetProfile::from_pairs([(1, 5)]);
    let ctx = ScoringContext::new(&target, &caps, &sets, &[]);
    let score = evaluate(&ctx, &armor, None).score;
    results.push(check(
        "scoring_exact",
        score == 2.5,
        format!("5 levels against 5: {}", score),
    ));

    let paired = uniform_catalog([7, 7, 7, 9, 9]);
    let armor: ArmorSet<'_> = std::array::from_fn(|i| &paired.armors[i]);
    let result = evaluate(&ctx, &armor, None);
    results.push(check(
        "scoring_aid_pair",
        result.breakdown.aid == 5.0,
        format!("aid bonus {}", result.breakdown.aid),
    ));

    let same = uniform_catalog([3; 5]);
    let armor: ArmorSet<'_> = std::array::from_fn(|i| &same.armors[i]);
    let result = evaluate(&ctx, &armor, None);
    results.push(check(
        "scoring_aid_full",
        result.breakdown.aid == 12.0,
        format!("aid bonus {}", result.breakdown.aid),
    ));

    let empty = TargetProfile::from_pairs([(42, 1)]);
    let ctx = ScoringContext::new(&empty, &caps, &sets, &[]);
    let score = evaluate(&ctx, &armor, None).score;
    results.push(check(
        "scoring_infeasible_sentinel",
        score == INFEASIBLE_SCORE,
        format!("unreachable target scores {}", score),
    ));

    let mut cache = FitnessCache::new();
    let first = cache.evaluate(&ctx, &armor, None);
    let second = cache.evaluate(&ctx, &armor, None);
    results.push(check(
        "scoring_cache_hit",
        std::sync::Arc::ptr_eq(&first, &second) && cache.hits() == 1,
        format!("{} entries, {} hits", cache.len(), cache.hits()),
    ));

    results
}

// ── 4. Search ───────────────────────────────────────────────────────────

fn validate_search(catalog: &Catalog, args: &Args) -> Vec<TestResult> {
    println!("--- Search ---");
    let mut results = Vec::new();

    // Target the two most common armor abilities.
    let mut counts = std::collections::BTreeMap::new();
    for grant in catalog.armors.iter().flat_map(|p| p.abilities.iter()) {
        *counts.entry(grant.ability).or_insert(0u32) += grant.level;
    }
    let mut ranked: Vec<(u32, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let target = TargetProfile::from_pairs(ranked.iter().take(2).map(|&(a, _)| (a, 3)));
    if target.is_empty() {
        results.push(check("search_target", false, "no ability to target"));
        return results;
    }

    let options = quick_options(1);
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        build_loadout(catalog, &target, &options, &mut rng)
    };

    let result = match run(args.seed) {
        Ok(r) => r,
        Err(e) => {
            results.push(check("search_runs", false, e.to_string()));
            return results;
        }
    };
    results.push(check(
        "search_runs",
        result.fitness > INFEASIBLE_SCORE,
        format!(
            "score {:.2} with {} evaluations",
            result.fitness, result.stats.evaluations
        ),
    ));

    let ordered = result
        .armor
        .iter()
        .zip(ArmorCategory::ALL)
        .all(|(e, cat)| e.piece.category == Some(cat));
    results.push(check(
        "search_category_order",
        ordered && result.armor.len() == 5,
        "one piece per category in order",
    ));

    let slots_ok = result.armor.iter().all(|e| {
        e.decorations.len() == e.piece.slots.len()
            && e.piece
                .slots
                .iter()
                .zip(&e.decorations)
                .all(|(&size, d)| d.as_ref().is_none_or(|d| d.size == size))
    });
    results.push(check(
        "search_decoration_sizes",
        slots_ok,
        "every decoration matches its slot size",
    ));

    results.push(check(
        "search_consistent",
        result_matches_evaluation(catalog, &target, &options, &result),
        "reported totals match a fresh evaluation",
    ));

    let bonuses = {
        let armor: Vec<_> = result.armor.iter().map(|e| &e.piece).collect();
        resolve_set_bonuses(&armor, &catalog.set_bonuses())
    };
    let one_tier = bonuses.iter().all(|b| {
        bonuses
            .iter()
            .filter(|o| o.kind == b.kind && o.set == b.set)
            .count()
            == 1
    });
    results.push(check(
        "search_one_tier_per_set",
        one_tier,
        format!("{} set bonuses active", bonuses.len()),
    ));

    let again = run(args.seed);
    results.push(check(
        "search_deterministic",
        again.as_ref().is_ok_and(|r| *r == result),
        format!("seed {} reproduces the loadout", args.seed),
    ));

    let mut rng = StdRng::seed_from_u64(args.seed);
    let repeated = build_loadout_repeated(catalog, &target, &quick_options(args.runs), &mut rng);
    results.push(check(
        "search_repeated_not_worse",
        repeated.as_ref().is_ok_and(|r| r.fitness >= result.fitness),
        match &repeated {
            Ok(r) => format!("{} runs: {:.2}", args.runs.max(1), r.fitness),
            Err(e) => e.to_string(),
        },
    ));

    results
}

fn result_matches_evaluation(
    catalog: &Catalog,
    target: &TargetProfile,
    options: &SearchOptions,
    result: &LoadoutResult,
) -> bool {
    let pools = filter_candidates(catalog, target, options.rank_ceiling);
    let caps = catalog.ability_caps();
    let sets = catalog.set_bonuses();
    let ctx = ScoringContext::new(target, &caps, &sets, &pools.decorations);
    let armor: ArmorSet<'_> = std::array::from_fn(|i| &result.armor[i].piece);
    let fresh = evaluate(&ctx, &armor, result.accessory.as_ref());
    fresh.score == result.fitness && fresh.abilities == result.abilities
}

// ── Solve ───────────────────────────────────────────────────────────────

fn solve(catalog: &Catalog, raw: &str, args: &Args) -> Result<(), String> {
    let target = parse_target(raw)?;
    let mut options = SearchOptions {
        runs: args.runs,
        ..Default::default()
    };
    options.annealing.iterations_per_temperature = 100;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let result = build_loadout_repeated(catalog, &target, &options, &mut rng)
        .map_err(|e| e.to_string())?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        println!("{}", json);
        return Ok(());
    }

    println!("\n=== Loadout for {} ===", raw);
    for equipped in &result.armor {
        let decos: Vec<String> = equipped
            .decorations
            .iter()
            .map(|d| d.as_ref().map_or("-".to_string(), |d| d.name.clone()))
            .collect();
        println!(
            "  {:<24} slots {:?} [{}]",
            equipped.piece.name,
            equipped.piece.slots,
            decos.join(", ")
        );
    }
    if let Some(acc) = &result.accessory {
        println!("  {:<24} (accessory)", acc.name);
    }
    for (ability, wanted) in target.iter() {
        println!(
            "  ability {:>4}: {}/{}",
            ability,
            result.abilities.get(ability),
            wanted
        );
    }
    println!("  score {:.2}", result.fitness);
    Ok(())
}
