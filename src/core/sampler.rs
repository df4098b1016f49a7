//! 隨機成分組合搜尋。
//!
//! 每次試驗從自由成分的區間均勻抽樣，其餘受限成分以隨機權重交給
//! [`distribute_within_bounds`] 分配；總和與目標差距在容許誤差內即接受。

use crate::core::allocator::{
    distribute_within_bounds, round2, round_to, AllocationError, Share, DEFAULT_MAX_ROUNDS,
};
use crate::core::components::{ComponentSet, ComponentSetError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// 所有成分（含外部提供的水分）應加總到的值
    pub total_target: f64,
    pub tolerance: f64,
    pub max_trials: usize,
    pub max_rounds: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            total_target: 100.0,
            tolerance: 0.01,
            max_trials: 2000,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("cannot generate a valid composition for moisture {moisture} after {trials} trials")]
    Infeasible { moisture: f64, trials: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionResult {
    pub free: ComponentValue,
    /// 依配置宣告順序
    pub bounded: Vec<ComponentValue>,
    /// 被接受的試驗編號（從 1 起算）
    pub trial: usize,
}

impl CompositionResult {
    pub fn get(&self, name: &str) -> Option<f64> {
        std::iter::once(&self.free)
            .chain(self.bounded.iter())
            .find(|c| c.name == name)
            .map(|c| c.value)
    }

    /// 自由成分與受限成分的總和（不含水分）
    pub fn total(&self) -> f64 {
        self.free.value + self.bounded.iter().map(|c| c.value).sum::<f64>()
    }

    /// 報表欄位順序：自由成分在前，受限成分依宣告順序倒排。
    /// 預設配置下即 (gum, protein, ash, air, fat)。
    pub fn values_in_report_order(&self) -> Vec<f64> {
        std::iter::once(self.free.value)
            .chain(self.bounded.iter().rev().map(|c| c.value))
            .collect()
    }
}

/// 單次試驗的結果
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Accepted(CompositionResult),
    /// 分配成功但總和超出容許誤差
    Drift { total: f64 },
    /// 分配器拒絕輸入
    Invalid(AllocationError),
}

#[derive(Debug, Clone)]
pub struct CompositionSampler {
    components: ComponentSet,
    settings: SamplerSettings,
}

impl CompositionSampler {
    pub fn new(
        components: ComponentSet,
        settings: SamplerSettings,
    ) -> Result<Self, ComponentSetError> {
        components.validate()?;
        Ok(Self {
            components,
            settings,
        })
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// 可能有解的水分範圍（忽略四捨五入與容許誤差）
    pub fn feasible_moisture_range(&self) -> (f64, f64) {
        let (span_min, span_max) = self.components.bounded_span();
        let free = &self.components.free;
        let target = self.settings.total_target;
        (
            round_to(target - free.max - span_max, 4),
            round_to(target - free.min - span_min, 4),
        )
    }

    /// 為給定水分產生一組成分百分比，使水分與所有成分加總為 `total_target`。
    ///
    /// 試驗次數用盡時回傳 [`CompositionError::Infeasible`]。
    pub fn calculate_components_random<R: Rng + ?Sized>(
        &self,
        moisture: f64,
        rng: &mut R,
    ) -> Result<CompositionResult, CompositionError> {
        let remaining = round_to(self.settings.total_target - moisture, 4);

        for trial in 1..=self.settings.max_trials {
            match self.run_trial(moisture, remaining, trial, rng) {
                TrialOutcome::Accepted(result) => {
                    tracing::debug!(
                        "Composition for moisture {} accepted at trial {}",
                        moisture,
                        trial
                    );
                    return Ok(result);
                }
                TrialOutcome::Drift { total } => {
                    tracing::trace!("Trial {} rejected: total {:.4} out of tolerance", trial, total);
                }
                TrialOutcome::Invalid(e) => {
                    tracing::trace!("Trial {} rejected: {}", trial, e);
                }
            }
        }

        let (low, high) = self.feasible_moisture_range();
        tracing::warn!(
            "No valid composition for moisture {} after {} trials (feasible moisture about {}..={})",
            moisture,
            self.settings.max_trials,
            low,
            high
        );
        Err(CompositionError::Infeasible {
            moisture,
            trials: self.settings.max_trials,
        })
    }

    /// 執行一次試驗。`remaining` 為扣除水分後的預算。
    pub fn run_trial<R: Rng + ?Sized>(
        &self,
        moisture: f64,
        remaining: f64,
        trial: usize,
        rng: &mut R,
    ) -> TrialOutcome {
        let free = &self.components.free;
        let free_value = round_to(rng.random_range(free.min..=free.max), 4);
        let left = remaining - free_value;

        // 權重以區間中點為基準加上 [0, 1) 的擾動
        let weights: Vec<f64> = self
            .components
            .bounded
            .iter()
            .map(|c| rng.random::<f64>() + c.bounds().midpoint())
            .collect();

        let shares: Vec<Share<'_>> = self
            .components
            .bounded
            .iter()
            .zip(&weights)
            .map(|(c, w)| Share::new(&c.name, c.bounds(), *w))
            .collect();

        let allocation = match distribute_within_bounds(left, &shares, self.settings.max_rounds) {
            Ok(allocation) => allocation,
            Err(e) => return TrialOutcome::Invalid(e),
        };

        let free_value = round2(free_value);
        let total = moisture + free_value + allocation.total();

        if (total - self.settings.total_target).abs() <= self.settings.tolerance {
            TrialOutcome::Accepted(CompositionResult {
                free: ComponentValue {
                    name: free.name.clone(),
                    value: free_value,
                },
                bounded: allocation
                    .into_values()
                    .into_iter()
                    .map(|(name, value)| ComponentValue { name, value })
                    .collect(),
                trial,
            })
        } else {
            TrialOutcome::Drift { total }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::Component;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_sampler() -> CompositionSampler {
        CompositionSampler::new(ComponentSet::default(), SamplerSettings::default()).unwrap()
    }

    fn assert_two_decimals(value: f64) {
        let cents = value * 100.0;
        assert!((cents - cents.round()).abs() < 1e-6, "{value} has more than two decimals");
    }

    #[test]
    fn test_accepted_composition_sums_to_hundred() {
        let sampler = default_sampler();
        let mut rng = StdRng::seed_from_u64(7);

        for moisture in [3.5, 5.0, 7.25, 10.0] {
            let result = sampler.calculate_components_random(moisture, &mut rng).unwrap();
            let total = moisture + result.total();
            assert!(
                (total - 100.0).abs() <= 0.01 + 1e-9,
                "moisture {moisture}: total {total}"
            );
        }
    }

    #[test]
    fn test_accepted_composition_respects_bounds_and_rounding() {
        let sampler = default_sampler();
        let mut rng = StdRng::seed_from_u64(2024);
        let result = sampler.calculate_components_random(6.1, &mut rng).unwrap();

        let set = sampler.components();
        assert!(set.free.bounds().contains(result.free.value));
        assert_two_decimals(result.free.value);

        assert_eq!(result.bounded.len(), set.bounded.len());
        for (component, value) in set.bounded.iter().zip(&result.bounded) {
            assert_eq!(component.name, value.name);
            assert!(component.bounds().contains(value.value));
            assert_two_decimals(value.value);
        }
    }

    #[test]
    fn test_same_seed_reproduces_composition() {
        let sampler = default_sampler();
        let a = sampler
            .calculate_components_random(4.8, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let b = sampler
            .calculate_components_random(4.8, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_feasible_moisture_range() {
        let (low, high) = default_sampler().feasible_moisture_range();
        assert!((low - 3.30).abs() < 1e-9);
        assert!((high - 13.65).abs() < 1e-9);

        let sampler = default_sampler();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(sampler.calculate_components_random(low + 0.2, &mut rng).is_ok());
        assert!(sampler.calculate_components_random(high - 0.2, &mut rng).is_ok());
    }

    #[test]
    fn test_moisture_too_low_is_infeasible() {
        // 3 + 89.95 + 6.75 < 100
        let sampler = default_sampler();
        let mut rng = StdRng::seed_from_u64(1);
        let err = sampler.calculate_components_random(3.0, &mut rng).unwrap_err();
        assert_eq!(
            err,
            CompositionError::Infeasible {
                moisture: 3.0,
                trials: 2000
            }
        );
    }

    #[test]
    fn test_minimums_exceeding_target_is_infeasible() {
        let components = ComponentSet {
            free: Component::new("base", 60.0, 70.0, "BASE"),
            bounded: vec![
                Component::new("x", 20.0, 25.0, "X"),
                Component::new("y", 20.0, 25.0, "Y"),
            ],
        };
        let settings = SamplerSettings {
            max_trials: 50,
            ..SamplerSettings::default()
        };
        let sampler = CompositionSampler::new(components, settings).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let err = sampler.calculate_components_random(5.0, &mut rng).unwrap_err();
        assert_eq!(
            err,
            CompositionError::Infeasible {
                moisture: 5.0,
                trials: 50
            }
        );
    }

    #[test]
    fn test_invalid_weights_are_rejected_trials() {
        // 負的區間中點會產生負權重
        let components = ComponentSet {
            free: Component::new("base", 90.0, 95.0, "BASE"),
            bounded: vec![Component::new("neg", -2.0, -1.0, "NEG")],
        };
        let sampler = CompositionSampler::new(components, SamplerSettings::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let outcome = sampler.run_trial(5.0, 95.0, 1, &mut rng);
        assert!(matches!(
            outcome,
            TrialOutcome::Invalid(AllocationError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_non_finite_moisture_exhausts_trials() {
        let settings = SamplerSettings {
            max_trials: 10,
            ..SamplerSettings::default()
        };
        let sampler = CompositionSampler::new(ComponentSet::default(), settings).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let err = sampler
            .calculate_components_random(f64::NAN, &mut rng)
            .unwrap_err();
        assert!(matches!(err, CompositionError::Infeasible { trials: 10, .. }));
    }

    #[test]
    fn test_report_order_matches_certificate_layout() {
        let sampler = default_sampler();
        let mut rng = StdRng::seed_from_u64(42);
        let result = sampler.calculate_components_random(8.0, &mut rng).unwrap();

        let ordered = result.values_in_report_order();
        assert_eq!(
            ordered,
            vec![
                result.get("gum").unwrap(),
                result.get("protein").unwrap(),
                result.get("ash").unwrap(),
                result.get("air").unwrap(),
                result.get("fat").unwrap(),
            ]
        );
    }

    #[test]
    fn test_invalid_component_set_is_rejected() {
        let mut components = ComponentSet::default();
        components.free.min = 95.0;
        assert!(CompositionSampler::new(components, SamplerSettings::default()).is_err());
    }
}
