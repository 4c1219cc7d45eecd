//! Coin selection for UTXO chains
//!
//! `select` picks inputs for a set of target outputs at a fee rate and decides
//! whether a change output is worth creating. Units are never mutated; the
//! result describes a new transaction shape only.

pub mod dimensions;
pub mod fee;

pub use dimensions::Dimensions;
pub use fee::FeeRate;

use crate::chains::utxo::{ScriptType, MAX_OP_RETURN_DATA};
use crate::config::SelectionPolicy;
use crate::error::{Result, WasmWalletError};
use crate::primitives::amount::u64_str;
use crate::primitives::bytes::hex_bytes;
use dimensions::{op_return_script_len, output_script_len};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Bound on branch-and-bound search steps
const BNB_MAX_TRIES: usize = 100_000;

fn default_script_type() -> ScriptType {
    ScriptType::P2wpkh
}

/// A spendable output as reported by the account-state provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendableUnit {
    /// `txid:vout`
    pub id: String,
    #[serde(with = "u64_str")]
    pub value: u64,
    pub script_type: ScriptType,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl SpendableUnit {
    pub fn outpoint(&self) -> Result<(String, u32)> {
        let (txid, vout) = self
            .id
            .rsplit_once(':')
            .ok_or_else(|| WasmWalletError::Validation(format!("unit id '{}' is not txid:vout", self.id)))?;
        let vout = vout
            .parse()
            .map_err(|_| WasmWalletError::Validation(format!("unit id '{}' has a bad vout", self.id)))?;
        Ok((txid.to_string(), vout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TargetOutput {
    #[serde(rename_all = "camelCase")]
    Payment {
        address: String,
        #[serde(with = "u64_str")]
        value: u64,
        #[serde(default = "default_script_type")]
        script_type: ScriptType,
    },
    /// Receives everything left after fees
    #[serde(rename_all = "camelCase")]
    SendMax {
        address: String,
        #[serde(default = "default_script_type")]
        script_type: ScriptType,
    },
    OpReturn {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
}

impl TargetOutput {
    fn fixed_value(&self) -> u64 {
        match self {
            TargetOutput::Payment { value, .. } => *value,
            TargetOutput::SendMax { .. } | TargetOutput::OpReturn { .. } => 0,
        }
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::from_output_script_len(match self {
            TargetOutput::Payment { script_type, .. } | TargetOutput::SendMax { script_type, .. } => {
                output_script_len(*script_type)
            }
            TargetOutput::OpReturn { data } => op_return_script_len(data.len()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOutput {
    pub target: TargetOutput,
    /// Resolved value; for send-max this is the remainder after fees
    #[serde(with = "u64_str")]
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOutput {
    #[serde(with = "u64_str")]
    pub value: u64,
    pub script_type: ScriptType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionStrategy {
    #[default]
    Default,
    /// Spend exactly the given units; only fee and change are computed
    ForceSelected,
}

/// Invariant: `sum(inputs) == sum(outputs) + fee + change`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub inputs: Vec<SpendableUnit>,
    pub outputs: Vec<SelectedOutput>,
    #[serde(with = "u64_str")]
    pub fee: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_output: Option<ChangeOutput>,
    pub strategy: SelectionStrategy,
    pub vsize: u64,
}

/// Fee and change for one concrete input set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Finalized {
    fee: u64,
    change: Option<u64>,
    send_max_value: Option<u64>,
    vsize: u64,
}

struct Planner<'a> {
    outputs: &'a [TargetOutput],
    fee_rate: FeeRate,
    policy: &'a SelectionPolicy,
    target: u64,
    send_max: bool,
    output_dims: Dimensions,
    change_dims: Dimensions,
}

impl<'a> Planner<'a> {
    fn new(outputs: &'a [TargetOutput], fee_rate: FeeRate, policy: &'a SelectionPolicy) -> Result<Self> {
        if outputs.is_empty() {
            return Err("no target outputs".into());
        }
        let mut target = 0u64;
        let mut send_max_count = 0;
        let mut output_dims = Dimensions::empty();
        for output in outputs {
            match output {
                TargetOutput::Payment { address, value, .. } => {
                    if *value <= policy.dust_threshold {
                        return Err(format!(
                            "output to {} of {} is at or below the dust threshold {}",
                            address, value, policy.dust_threshold
                        )
                        .into());
                    }
                }
                TargetOutput::SendMax { .. } => send_max_count += 1,
                TargetOutput::OpReturn { data } => {
                    if data.len() > MAX_OP_RETURN_DATA {
                        return Err(format!("OP_RETURN data is {} bytes", data.len()).into());
                    }
                }
            }
            target = target
                .checked_add(output.fixed_value())
                .ok_or_else(|| WasmWalletError::overflow("output total exceeds u64"))?;
            output_dims = output_dims.plus(&output.dimensions());
        }
        if send_max_count > 1 {
            return Err("at most one send-max output is allowed".into());
        }
        Ok(Planner {
            outputs,
            fee_rate,
            policy,
            target,
            send_max: send_max_count == 1,
            output_dims,
            change_dims: Dimensions::from_output_script_len(output_script_len(
                policy.change_script_type,
            )),
        })
    }

    fn input_dims(units: &[&SpendableUnit]) -> Result<Dimensions> {
        units.iter().try_fold(Dimensions::empty(), |acc, unit| {
            Ok(acc.plus(&Dimensions::from_input(unit.script_type)?))
        })
    }

    fn total(units: &[&SpendableUnit]) -> Result<u64> {
        units
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.value))
            .ok_or_else(|| WasmWalletError::overflow("input total exceeds u64"))
    }

    /// Fee for `units` paying the fixed outputs and no change
    fn min_fee(&self, units: &[&SpendableUnit]) -> Result<u64> {
        let dims = Self::input_dims(units)?.plus(&self.output_dims);
        self.fee_rate.fee_for_vsize(dims.vsize())
    }

    /// Smallest input total that `finalize` accepts for these units
    fn required(&self, units: &[&SpendableUnit]) -> Result<u64> {
        let extra = if self.send_max {
            self.policy.dust_threshold
        } else {
            0
        };
        Ok(self.target.saturating_add(self.min_fee(units)?).saturating_add(extra))
    }

    /// Decide fee and change for a fixed input set, or `None` if it cannot pay
    fn finalize(&self, units: &[&SpendableUnit]) -> Result<Option<Finalized>> {
        let total = Self::total(units)?;
        let base = Self::input_dims(units)?.plus(&self.output_dims);
        let dust = self.policy.dust_threshold;

        if self.send_max {
            let fee = self.fee_rate.fee_for_vsize(base.vsize())?;
            return Ok(total
                .checked_sub(self.target)
                .and_then(|v| v.checked_sub(fee))
                .filter(|remainder| *remainder >= dust)
                .map(|remainder| Finalized {
                    fee,
                    change: None,
                    send_max_value: Some(remainder),
                    vsize: base.vsize(),
                }));
        }

        let fee = self.fee_rate.fee_for_vsize(base.vsize())?;
        let Some(excess) = total
            .checked_sub(self.target)
            .and_then(|v| v.checked_sub(fee))
        else {
            return Ok(None);
        };

        let with_change = base.plus(&self.change_dims);
        let fee_with_change = self.fee_rate.fee_for_vsize(with_change.vsize())?;
        if let Some(change) = (total - self.target).checked_sub(fee_with_change) {
            if change > dust {
                return Ok(Some(Finalized {
                    fee: fee_with_change,
                    change: Some(change),
                    send_max_value: None,
                    vsize: with_change.vsize(),
                }));
            }
        }
        if excess > 0 {
            tracing::debug!(excess, fee, "folding sub-dust change into fee");
        }
        Ok(Some(Finalized {
            fee: fee + excess,
            change: None,
            send_max_value: None,
            vsize: base.vsize(),
        }))
    }

    fn insufficient(&self, units: &[&SpendableUnit]) -> Result<WasmWalletError> {
        let required = self.required(units)?;
        let available = Self::total(units)?;
        Ok(WasmWalletError::InsufficientFunds {
            required,
            available,
            shortfall: required.saturating_sub(available),
        })
    }

    /// Value minus the fee the input itself adds
    fn effective_value(&self, unit: &SpendableUnit) -> Result<i128> {
        let input_vsize = dimensions::input_weight(unit.script_type)?.div_ceil(4) as u64;
        let cost = self.fee_rate.fee_for_vsize(input_vsize)?;
        Ok(unit.value as i128 - cost as i128)
    }

    /// Changeless subset whose effective value lands in `[target, target + cost_of_change]`
    fn branch_and_bound<'u>(
        &self,
        units: &[&'u SpendableUnit],
    ) -> Result<Option<Vec<&'u SpendableUnit>>> {
        let mut pool: Vec<(&SpendableUnit, i128)> = Vec::with_capacity(units.len());
        for unit in units {
            let eff = self.effective_value(unit)?;
            if eff > 0 {
                pool.push((*unit, eff));
            }
        }
        pool.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| compare_units(a.0, b.0)));

        let base_fee = self.fee_rate.fee_for_vsize(self.output_dims.vsize())? as i128;
        let change_vsize = dimensions::output_weight(output_script_len(self.policy.change_script_type))
            .div_ceil(4) as u64;
        let change_fee = self.fee_rate.fee_for_vsize(change_vsize)? as i128;
        let low = self.target as i128 + base_fee;
        let high = low + change_fee + self.policy.dust_threshold as i128;

        let mut suffix = vec![0i128; pool.len() + 1];
        for i in (0..pool.len()).rev() {
            suffix[i] = suffix[i + 1] + pool[i].1;
        }

        let best = bnb_search(&pool, &suffix, low, high);
        Ok(best.map(|(_, picked)| picked.into_iter().map(|i| pool[i].0).collect()))
    }

    /// Whether `total` pays the fixed outputs and the changeless fee for `inputs`
    fn covers(&self, total: u64, inputs: &Dimensions) -> Result<bool> {
        let fee = self.fee_rate.fee_for_vsize(inputs.plus(&self.output_dims).vsize())?;
        Ok(self.target.checked_add(fee).is_some_and(|needed| total >= needed))
    }

    /// Largest-first until covered, then swap the last pick for the smallest unit that still covers
    fn greedy<'u>(&self, units: &[&'u SpendableUnit]) -> Result<Option<Vec<&'u SpendableUnit>>> {
        let mut sorted: Vec<&SpendableUnit> = units.to_vec();
        sorted.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| compare_units(a, b)));

        // running totals describe the prefix before the pick being tried
        let mut total = 0u64;
        let mut dims = Dimensions::empty();
        let mut last = None;
        for (i, unit) in sorted.iter().enumerate() {
            let next_total = total
                .checked_add(unit.value)
                .ok_or_else(|| WasmWalletError::overflow("input total exceeds u64"))?;
            let next_dims = dims.plus(&Dimensions::from_input(unit.script_type)?);
            if self.covers(next_total, &next_dims)? {
                last = Some(i);
                break;
            }
            total = next_total;
            dims = next_dims;
        }
        let Some(last) = last else {
            return Ok(None);
        };

        // candidates after the prefix are in descending value order; the last
        // feasible one is the smallest that still covers
        let mut pick = last;
        for (i, candidate) in sorted.iter().enumerate().skip(last) {
            let trial_dims = dims.plus(&Dimensions::from_input(candidate.script_type)?);
            let covered = match total.checked_add(candidate.value) {
                Some(trial_total) => self.covers(trial_total, &trial_dims)?,
                None => false,
            };
            if covered {
                pick = i;
            }
        }
        let mut chosen = sorted[..last].to_vec();
        chosen.push(sorted[pick]);
        Ok(Some(chosen))
    }

    fn into_result(
        &self,
        units: Vec<&SpendableUnit>,
        finalized: Finalized,
        strategy: SelectionStrategy,
    ) -> SelectionResult {
        let outputs = self
            .outputs
            .iter()
            .map(|target| SelectedOutput {
                value: match target {
                    TargetOutput::SendMax { .. } => finalized.send_max_value.unwrap_or(0),
                    other => other.fixed_value(),
                },
                target: target.clone(),
            })
            .collect();
        SelectionResult {
            inputs: units.into_iter().cloned().collect(),
            outputs,
            fee: finalized.fee,
            change_output: finalized.change.map(|value| ChangeOutput {
                value,
                script_type: self.policy.change_script_type,
            }),
            strategy,
            vsize: finalized.vsize,
        }
    }
}

/// Depth-first search over include/exclude decisions, iterative so depth is bounded by the heap
fn bnb_search(
    pool: &[(&SpendableUnit, i128)],
    suffix: &[i128],
    low: i128,
    high: i128,
) -> Option<(i128, Vec<usize>)> {
    let mut best: Option<(i128, Vec<usize>)> = None;
    let mut selected: Vec<usize> = Vec::new();
    let mut index = 0usize;
    let mut sum = 0i128;

    for _ in 0..BNB_MAX_TRIES {
        let backtrack = if sum > high {
            true
        } else if sum >= low {
            let better = match &best {
                None => true,
                Some((best_sum, best_set)) => {
                    sum < *best_sum || (sum == *best_sum && selected.len() < best_set.len())
                }
            };
            if better {
                best = Some((sum, selected.clone()));
            }
            true
        } else {
            index >= pool.len() || sum + suffix[index] < low
        };

        if backtrack {
            // drop the most recent inclusion and explore the branch without it
            let Some(last) = selected.pop() else {
                break;
            };
            sum -= pool[last].1;
            index = last + 1;
        } else {
            selected.push(index);
            sum += pool[index].1;
            index += 1;
        }
    }
    best
}

/// Deterministic tie-break: value, then id
fn compare_units(a: &SpendableUnit, b: &SpendableUnit) -> Ordering {
    a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id))
}

/// Select inputs paying `outputs` at `fee_rate`
pub fn select(
    units: &[SpendableUnit],
    outputs: &[TargetOutput],
    fee_rate: FeeRate,
    strategy: SelectionStrategy,
    policy: &SelectionPolicy,
) -> Result<SelectionResult> {
    let planner = Planner::new(outputs, fee_rate, policy)?;

    let result = match strategy {
        SelectionStrategy::ForceSelected => {
            let forced: Vec<&SpendableUnit> = units.iter().collect();
            if forced.is_empty() {
                return Err("forced selection needs at least one unit".into());
            }
            match planner.finalize(&forced)? {
                Some(finalized) => planner.into_result(forced, finalized, strategy),
                None => return Err(planner.insufficient(&forced)?),
            }
        }
        SelectionStrategy::Default => {
            let eligible: Vec<&SpendableUnit> = units
                .iter()
                .filter(|u| u.confirmations >= policy.min_confirmations)
                .filter(|u| policy.spend_dust || u.value > policy.dust_threshold)
                .collect();

            if planner.send_max {
                match planner.finalize(&eligible)? {
                    Some(finalized) if !eligible.is_empty() => {
                        planner.into_result(eligible, finalized, strategy)
                    }
                    _ => return Err(planner.insufficient(&eligible)?),
                }
            } else {
                let mut candidates = Vec::new();
                for subset in [planner.branch_and_bound(&eligible)?, planner.greedy(&eligible)?]
                    .into_iter()
                    .flatten()
                {
                    if let Some(finalized) = planner.finalize(&subset)? {
                        let total = Planner::total(&subset)?;
                        candidates.push((subset, finalized, total));
                    }
                }
                // cheapest, then fewest inputs, then least value locked up
                let best = candidates.into_iter().min_by(|a, b| {
                    a.1.fee
                        .cmp(&b.1.fee)
                        .then(a.0.len().cmp(&b.0.len()))
                        .then(a.2.cmp(&b.2))
                });
                match best {
                    Some((subset, finalized, _)) => {
                        planner.into_result(subset, finalized, strategy)
                    }
                    None => return Err(planner.insufficient(&eligible)?),
                }
            }
        }
    };

    tracing::debug!(
        inputs = result.inputs.len(),
        fee = result.fee,
        change = result.change_output.as_ref().map(|c| c.value),
        "coin selection done"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAYEE: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn unit(index: u32, value: u64) -> SpendableUnit {
        SpendableUnit {
            id: format!("{}:{}", "aa".repeat(32), index),
            value,
            script_type: ScriptType::P2wpkh,
            confirmations: 6,
            public_key: None,
        }
    }

    fn pay(value: u64) -> TargetOutput {
        TargetOutput::Payment {
            address: PAYEE.to_string(),
            value,
            script_type: ScriptType::P2wpkh,
        }
    }

    fn run(values: &[u64], outputs: &[TargetOutput], rate: u64, strategy: SelectionStrategy) -> Result<SelectionResult> {
        let units: Vec<_> = values.iter().enumerate().map(|(i, v)| unit(i as u32, *v)).collect();
        select(&units, outputs, FeeRate::from_sat_per_vb(rate), strategy, &SelectionPolicy::default())
    }

    fn input_values(result: &SelectionResult) -> Vec<u64> {
        result.inputs.iter().map(|u| u.value).collect()
    }

    #[test]
    fn test_sub_dust_change_folds_into_fee() {
        let result = run(&[10_000], &[pay(9_500)], 1, SelectionStrategy::Default).unwrap();
        assert_eq!(result.fee, 500);
        assert!(result.change_output.is_none());
        assert_eq!(result.vsize, 110);
    }

    #[test]
    fn test_change_created_above_dust() {
        let result = run(&[100_000], &[pay(50_000)], 1, SelectionStrategy::Default).unwrap();
        assert_eq!(result.fee, 141);
        assert_eq!(result.change_output.as_ref().unwrap().value, 49_859);
        assert_eq!(result.vsize, 141);
    }

    #[test]
    fn test_forced_shortfall() {
        let err = run(&[5_000, 3_000], &[pay(8_000)], 2, SelectionStrategy::ForceSelected).unwrap_err();
        assert_eq!(
            err,
            WasmWalletError::InsufficientFunds {
                required: 8_356,
                available: 8_000,
                shortfall: 356,
            }
        );
    }

    #[test]
    fn test_forced_fee_counts_every_input() {
        let result = run(&[100_000, 1_000], &[pay(50_000)], 1, SelectionStrategy::ForceSelected).unwrap();
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.fee, 209);
        assert_eq!(result.change_output.unwrap().value, 50_791);
        assert_eq!(result.strategy, SelectionStrategy::ForceSelected);
    }

    #[test]
    fn test_prefers_smallest_sufficient_unit() {
        let result = run(&[30_000, 60_000, 200_000], &[pay(50_000)], 1, SelectionStrategy::Default).unwrap();
        assert_eq!(input_values(&result), vec![60_000]);
        assert_eq!(result.fee, 141);
        assert_eq!(result.change_output.unwrap().value, 9_859);
    }

    #[test]
    fn test_changeless_match() {
        let result = run(&[50_200, 80_000, 200_000], &[pay(50_000)], 1, SelectionStrategy::Default).unwrap();
        assert_eq!(input_values(&result), vec![50_200]);
        assert_eq!(result.fee, 200);
        assert!(result.change_output.is_none());
    }

    #[test]
    fn test_insufficient_reports_shortfall() {
        let err = run(&[1_000, 2_000], &[pay(10_000)], 1, SelectionStrategy::Default).unwrap_err();
        assert_eq!(
            err,
            WasmWalletError::InsufficientFunds {
                required: 10_178,
                available: 3_000,
                shortfall: 7_178,
            }
        );
    }

    #[test]
    fn test_send_max_takes_everything() {
        let send_max = TargetOutput::SendMax {
            address: PAYEE.to_string(),
            script_type: ScriptType::P2wpkh,
        };
        let result = run(&[10_000, 20_000], &[send_max], 1, SelectionStrategy::Default).unwrap();
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.fee, 178);
        assert_eq!(result.outputs[0].value, 29_822);
        assert!(result.change_output.is_none());
    }

    #[test]
    fn test_unconfirmed_and_dust_units_skipped() {
        let mut units = vec![unit(0, 400), unit(1, 100_000)];
        units[1].confirmations = 0;
        let policy = SelectionPolicy {
            min_confirmations: 1,
            ..SelectionPolicy::default()
        };
        let err = select(&units, &[pay(1_000)], FeeRate::from_sat_per_vb(1), SelectionStrategy::Default, &policy)
            .unwrap_err();
        assert!(matches!(err, WasmWalletError::InsufficientFunds { available: 0, .. }));
    }

    #[test]
    fn test_large_wallet() {
        let values = vec![1_000u64; 12_000];
        let target = 8_000_000;
        let result = run(&values, &[pay(target)], 1, SelectionStrategy::Default).unwrap();

        let inputs: u64 = result.inputs.iter().map(|u| u.value).sum();
        let change = result.change_output.as_ref().map_or(0, |c| c.value);
        assert_eq!(inputs, target + result.fee + change);
        assert!(result.inputs.len() < values.len());
    }

    #[test]
    fn test_rejects_bad_outputs() {
        assert!(run(&[10_000], &[], 1, SelectionStrategy::Default).is_err());
        assert!(run(&[10_000], &[pay(546)], 1, SelectionStrategy::Default).is_err());
        let two_max = vec![
            TargetOutput::SendMax { address: PAYEE.into(), script_type: ScriptType::P2wpkh },
            TargetOutput::SendMax { address: PAYEE.into(), script_type: ScriptType::P2wpkh },
        ];
        assert!(run(&[10_000], &two_max, 1, SelectionStrategy::Default).is_err());
    }

    #[test]
    fn test_outpoint() {
        let u = unit(7, 1);
        let (txid, vout) = u.outpoint().unwrap();
        assert_eq!(txid.len(), 64);
        assert_eq!(vout, 7);
        let bad = SpendableUnit { id: "nocolon".into(), ..u };
        assert!(bad.outpoint().is_err());
    }

    #[test]
    fn test_result_serde_shape() {
        let result = run(&[100_000], &[pay(50_000)], 1, SelectionStrategy::Default).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fee"], "141");
        assert_eq!(json["changeOutput"]["value"], "49859");
        assert_eq!(json["outputs"][0]["target"]["type"], "payment");
        assert_eq!(json["strategy"], "default");
    }

    proptest! {
        #[test]
        fn prop_value_is_conserved(
            values in proptest::collection::vec(1_000u64..5_000_000, 1..8),
            amount in 600u64..2_000_000,
            rate in 1u64..50,
        ) {
            if let Ok(result) = run(&values, &[pay(amount)], rate, SelectionStrategy::Default) {
                let inputs: u64 = result.inputs.iter().map(|u| u.value).sum();
                let outputs: u64 = result.outputs.iter().map(|o| o.value).sum();
                let change = result.change_output.as_ref().map_or(0, |c| c.value);
                prop_assert_eq!(inputs, outputs + result.fee + change);
                prop_assert!(change == 0 || change > 546);
                let floor = FeeRate::from_sat_per_vb(rate).fee_for_vsize(result.vsize).unwrap();
                prop_assert!(result.fee >= floor);
            }
        }
    }
}
