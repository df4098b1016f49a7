use coa_batch::core::allocator::{distribute_within_bounds, Share, DEFAULT_MAX_ROUNDS};
use coa_batch::core::components::{Bounds, Component};
use coa_batch::{CompositionError, CompositionSampler, ComponentSet, SamplerSettings};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn is_two_decimals(value: f64) -> bool {
    let cents = value * 100.0;
    (cents - cents.round()).abs() < 1e-6
}

/// 例一：等權重、寬鬆區間，平均分配
#[test]
fn test_even_split_scenario() {
    let shares = [
        Share::new("a", Bounds::new(1.0, 5.0), 1.0),
        Share::new("b", Bounds::new(1.0, 5.0), 1.0),
    ];
    let result = distribute_within_bounds(6.0, &shares, DEFAULT_MAX_ROUNDS).unwrap();
    assert_eq!(result.get("a"), Some(3.0));
    assert_eq!(result.get("b"), Some(3.0));
}

/// 例二：a 鎖在上限，剩餘全部給 b
#[test]
fn test_locked_component_scenario() {
    let shares = [
        Share::new("a", Bounds::new(1.0, 2.0), 1.0),
        Share::new("b", Bounds::new(1.0, 5.0), 1.0),
    ];
    let result = distribute_within_bounds(6.0, &shares, DEFAULT_MAX_ROUNDS).unwrap();
    assert_eq!(result.get("a"), Some(2.0));
    assert_eq!(result.get("b"), Some(4.0));
}

/// 在可行的水分範圍內，每個結果都要符合區間、兩位小數與總和
#[test]
fn test_compositions_across_feasible_moistures() {
    let sampler = CompositionSampler::new(ComponentSet::default(), SamplerSettings::default())
        .expect("default component set is valid");
    let components = sampler.components().clone();
    let mut rng = StdRng::seed_from_u64(20240601);

    for step in 0..=40 {
        let moisture = 3.5 + 0.25 * step as f64;
        let result = sampler
            .calculate_components_random(moisture, &mut rng)
            .unwrap_or_else(|e| panic!("moisture {moisture}: {e}"));

        let total = moisture + result.total();
        assert!(
            (total - 100.0).abs() <= 0.01 + 1e-9,
            "moisture {moisture}: total {total}"
        );

        assert!(components.free.bounds().contains(result.free.value));
        assert!(is_two_decimals(result.free.value));
        for (component, value) in components.bounded.iter().zip(&result.bounded) {
            assert_eq!(component.name, value.name);
            assert!(
                component.bounds().contains(value.value),
                "moisture {moisture}: {} = {} outside [{}, {}]",
                component.name,
                value.value,
                component.min,
                component.max
            );
            assert!(is_two_decimals(value.value));
        }
    }
}

/// 例四：最小值總和已超過目標，試驗用盡後回報無解
#[test]
fn test_infeasible_bounds_exhaust_trials() {
    let components = ComponentSet {
        free: Component::new("gum", 80.0, 90.0, "GUM_CONTENT"),
        bounded: vec![
            Component::new("fat", 5.0, 6.0, "FAT"),
            Component::new("air", 10.0, 12.0, "AIR"),
        ],
    };
    let sampler = CompositionSampler::new(components, SamplerSettings::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(8);

    let err = sampler
        .calculate_components_random(5.0, &mut rng)
        .unwrap_err();
    assert_eq!(
        err,
        CompositionError::Infeasible {
            moisture: 5.0,
            trials: 2000
        }
    );
}

#[test]
fn test_custom_component_set() {
    let components = ComponentSet {
        free: Component::new("starch", 60.0, 75.0, "STARCH"),
        bounded: vec![
            Component::new("fibre", 15.0, 20.0, "FIBRE"),
            Component::new("sugar", 5.0, 8.0, "SUGAR"),
            Component::new("salt", 1.0, 2.0, "SALT"),
        ],
    };
    let sampler = CompositionSampler::new(components, SamplerSettings::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(77);

    let result = sampler.calculate_components_random(10.0, &mut rng).unwrap();
    assert!((10.0 + result.total() - 100.0).abs() <= 0.01 + 1e-9);
    assert_eq!(result.values_in_report_order().len(), 4);
    assert!(result.get("sugar").is_some());
}
