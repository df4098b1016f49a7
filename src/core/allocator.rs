//! 有界加權分配 (water-filling)。
//!
//! 先依權重比例分配目標值，再反覆把超出區間的成分夾回邊界並永久鎖定，
//! 剩餘量只在未鎖定的成分間按權重重新分配。結果四捨五入至小數兩位，
//! 若因捨入留下殘差，依宣告順序對第一個仍落在區間內的成分做至多一次微調。
//!
//! 本模組不含任何隨機性：相同輸入必得相同輸出。

use crate::core::components::Bounds;
use thiserror::Error;

/// 預設最多迭代輪數
pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// 最小可表示差額（小數兩位）
const CENT: f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("nothing to allocate: no components given")]
    NoShares,

    #[error("allocation target must be finite, got {0}")]
    NonFiniteTarget(f64),

    #[error("component '{name}' has non-positive or non-finite weight {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("component '{name}' has invalid bounds [{min}, {max}]")]
    InvalidBounds { name: String, min: f64, max: f64 },
}

/// 單一成分的分配輸入
#[derive(Debug, Clone, Copy)]
pub struct Share<'a> {
    pub name: &'a str,
    pub bounds: Bounds,
    pub weight: f64,
}

impl<'a> Share<'a> {
    pub fn new(name: &'a str, bounds: Bounds, weight: f64) -> Self {
        Self {
            name,
            bounds,
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    values: Vec<(String, f64)>,
    rounds: usize,
    nudged: Option<String>,
}

impl AllocationResult {
    /// 依輸入順序排列的 (名稱, 數值)
    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn total(&self) -> f64 {
        self.values.iter().map(|(_, v)| v).sum()
    }

    /// 實際執行的迭代輪數
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// 接受捨入殘差微調的成分
    pub fn nudged(&self) -> Option<&str> {
        self.nudged.as_deref()
    }

    pub fn into_values(self) -> Vec<(String, f64)> {
        self.values
    }
}

/// 每輪結束時的狀態快照
#[derive(Debug)]
pub struct RoundSnapshot<'s> {
    pub round: usize,
    pub values: &'s [f64],
    pub locked: &'s [bool],
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn distribute_within_bounds(
    target: f64,
    shares: &[Share<'_>],
    max_rounds: usize,
) -> Result<AllocationResult, AllocationError> {
    distribute_with_observer(target, shares, max_rounds, |_| {})
}

/// 與 [`distribute_within_bounds`] 相同，並在每輪結束時回報快照
pub fn distribute_with_observer<F>(
    target: f64,
    shares: &[Share<'_>],
    max_rounds: usize,
    mut observer: F,
) -> Result<AllocationResult, AllocationError>
where
    F: FnMut(RoundSnapshot<'_>),
{
    validate_request(target, shares)?;

    let weight_sum: f64 = shares.iter().map(|s| s.weight).sum();
    let mut values: Vec<f64> = shares
        .iter()
        .map(|s| target * s.weight / weight_sum)
        .collect();
    let mut locked = vec![false; shares.len()];
    let mut rounds = 0;

    for round in 0..max_rounds {
        rounds = round + 1;

        for (i, share) in shares.iter().enumerate() {
            if locked[i] {
                continue;
            }
            if values[i] < share.bounds.min {
                values[i] = share.bounds.min;
                locked[i] = true;
            } else if values[i] > share.bounds.max {
                values[i] = share.bounds.max;
                locked[i] = true;
            }
        }

        if locked.iter().all(|l| *l) {
            observer(RoundSnapshot {
                round,
                values: &values,
                locked: &locked,
            });
            break;
        }

        let remaining = target - values.iter().sum::<f64>();
        let unlocked_weight: f64 = shares
            .iter()
            .zip(&locked)
            .filter(|(_, l)| !**l)
            .map(|(s, _)| s.weight)
            .sum();

        for (i, share) in shares.iter().enumerate() {
            if !locked[i] {
                values[i] += remaining * share.weight / unlocked_weight;
            }
        }

        observer(RoundSnapshot {
            round,
            values: &values,
            locked: &locked,
        });
    }

    for value in values.iter_mut() {
        *value = round2(*value);
    }

    // 至多一次微調，依宣告順序取第一個可容納殘差的成分
    let mut nudged = None;
    let diff = round2(target - values.iter().sum::<f64>());
    if diff.abs() >= CENT {
        for (i, share) in shares.iter().enumerate() {
            let candidate = round2(values[i] + diff);
            if share.bounds.contains(candidate) {
                values[i] = candidate;
                nudged = Some(share.name.to_string());
                break;
            }
        }
    }

    Ok(AllocationResult {
        values: shares
            .iter()
            .map(|s| s.name.to_string())
            .zip(values)
            .collect(),
        rounds,
        nudged,
    })
}

fn validate_request(target: f64, shares: &[Share<'_>]) -> Result<(), AllocationError> {
    if shares.is_empty() {
        return Err(AllocationError::NoShares);
    }
    if !target.is_finite() {
        return Err(AllocationError::NonFiniteTarget(target));
    }
    for share in shares {
        if !(share.weight.is_finite() && share.weight > 0.0) {
            return Err(AllocationError::InvalidWeight {
                name: share.name.to_string(),
                weight: share.weight,
            });
        }
        if !share.bounds.is_valid() {
            return Err(AllocationError::InvalidBounds {
                name: share.name.to_string(),
                min: share.bounds.min,
                max: share.bounds.max,
            });
        }
    }
    Ok(())
}
