//! Gas schedules for the supported network rule-sets.

use crate::instruction::GasPriceTier;

/// All constants the meter charges from. Different rule-sets plug in
/// different values; the formulas stay the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasSchedule {
    /// Base cost per gas price tier, indexed by
    /// [`GasPriceTier::step_index`].
    pub tier_step_gas: [u64; 8],
    pub exp_gas: u64,
    pub exp_byte_gas: u64,
    pub sha3_gas: u64,
    pub sha3_word_gas: u64,
    pub sload_gas: u64,
    pub sstore_set_gas: u64,
    pub sstore_reset_gas: u64,
    pub jumpdest_gas: u64,
    pub log_gas: u64,
    pub log_data_gas: u64,
    pub log_topic_gas: u64,
    pub create_gas: u64,
    pub call_gas: u64,
    pub call_value_transfer_gas: u64,
    pub call_new_account_gas: u64,
    pub copy_gas: u64,
    pub memory_gas: u64,
    pub quad_coeff_div: u64,
}

impl GasSchedule {
    /// The original frontier rule-set.
    pub const fn frontier() -> Self {
        Self {
            tier_step_gas: [0, 2, 3, 5, 8, 10, 20, 0],
            exp_gas: 10,
            exp_byte_gas: 10,
            sha3_gas: 30,
            sha3_word_gas: 6,
            sload_gas: 50,
            sstore_set_gas: 20_000,
            sstore_reset_gas: 5_000,
            jumpdest_gas: 1,
            log_gas: 375,
            log_data_gas: 8,
            log_topic_gas: 375,
            create_gas: 32_000,
            call_gas: 40,
            call_value_transfer_gas: 9_000,
            call_new_account_gas: 25_000,
            copy_gas: 3,
            memory_gas: 3,
            quad_coeff_div: 512,
        }
    }

    /// Homestead kept frontier's cost table.
    pub const fn homestead() -> Self {
        Self::frontier()
    }

    /// The gas repricing rule-set: external account access became far more
    /// expensive.
    pub const fn eip150() -> Self {
        let mut schedule = Self::frontier();
        schedule.tier_step_gas[6] = 700;
        schedule.sload_gas = 200;
        schedule.call_gas = 700;
        schedule
    }

    pub const fn tier_cost(&self, tier: GasPriceTier) -> Option<u64> {
        match tier.step_index() {
            Some(index) => Some(self.tier_step_gas[index]),
            None => None,
        }
    }
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self::frontier()
    }
}
