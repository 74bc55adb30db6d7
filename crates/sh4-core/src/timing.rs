//! Issue-cycle accounting for translated instructions.
//!
//! Each decoded instruction carries a pipeline group and a base issue cost.
//! The core is dual-issue: an instruction that can pair with its predecessor
//! shares the predecessor's issue slot and costs one cycle less. Pairing is
//! possible between different groups, and between two register-transfer
//! instructions, but never with a serializing instruction on either side.
//! Once a pair forms the slot is closed; the next instruction starts a new
//! one.

/// Pipeline execution group of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionGroup {
    /// Register-to-register transfers; pair with anything, including
    /// each other.
    Mt,
    /// Integer and logic operations.
    Ex,
    /// Branches.
    Br,
    /// Loads and stores.
    Ls,
    /// Floating-point arithmetic.
    Fe,
    /// Serializing instructions; never pair on either side.
    Co,
}

impl ExecutionGroup {
    /// Returns `true` when an instruction of this group can share an issue
    /// slot with a predecessor of group `previous`.
    #[must_use]
    pub const fn pairs_with(self, previous: Self) -> bool {
        if matches!(self, Self::Co) || matches!(previous, Self::Co) {
            return false;
        }
        !matches!(
            (self, previous),
            (Self::Ex, Self::Ex)
                | (Self::Br, Self::Br)
                | (Self::Ls, Self::Ls)
                | (Self::Fe, Self::Fe)
        )
    }
}

/// Dual-issue pairing state threaded through one block's translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IssuePipeline {
    last_group: Option<ExecutionGroup>,
}

impl IssuePipeline {
    /// Creates a pipeline with no instruction issued yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_group: None }
    }

    /// Charges one instruction and returns its effective issue cost.
    ///
    /// A paired instruction costs one cycle less than its base issue cost
    /// and closes the slot; an unpaired one opens a new slot.
    pub fn charge(&mut self, group: ExecutionGroup, issue_cycles: u32) -> u32 {
        let paired = match self.last_group {
            Some(previous) => group.pairs_with(previous),
            None => false,
        };

        if paired {
            self.last_group = None;
            issue_cycles.saturating_sub(1)
        } else {
            self.last_group = Some(group);
            issue_cycles
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutionGroup, IssuePipeline};

    #[test]
    fn alternating_groups_share_issue_slots() {
        let mut pipeline = IssuePipeline::new();

        let total: u32 = [
            (ExecutionGroup::Ex, 1),
            (ExecutionGroup::Ls, 1),
            (ExecutionGroup::Ex, 1),
            (ExecutionGroup::Mt, 1),
        ]
        .into_iter()
        .map(|(group, issue)| pipeline.charge(group, issue))
        .sum();

        assert_eq!(total, 2);
    }

    #[test]
    fn same_group_instructions_never_pair_except_transfers() {
        let mut pipeline = IssuePipeline::new();
        assert_eq!(pipeline.charge(ExecutionGroup::Ex, 1), 1);
        assert_eq!(pipeline.charge(ExecutionGroup::Ex, 1), 1);

        let mut transfers = IssuePipeline::new();
        assert_eq!(transfers.charge(ExecutionGroup::Mt, 1), 1);
        assert_eq!(transfers.charge(ExecutionGroup::Mt, 1), 0);
    }

    #[test]
    fn serializing_instructions_block_pairing_on_both_sides() {
        let mut pipeline = IssuePipeline::new();
        assert_eq!(pipeline.charge(ExecutionGroup::Ex, 1), 1);
        assert_eq!(pipeline.charge(ExecutionGroup::Co, 2), 2);
        assert_eq!(pipeline.charge(ExecutionGroup::Ls, 1), 1);

        assert!(!ExecutionGroup::Co.pairs_with(ExecutionGroup::Mt));
        assert!(!ExecutionGroup::Mt.pairs_with(ExecutionGroup::Co));
    }

    #[test]
    fn a_closed_slot_does_not_pair_backwards() {
        let mut pipeline = IssuePipeline::new();
        assert_eq!(pipeline.charge(ExecutionGroup::Ex, 1), 1);
        assert_eq!(pipeline.charge(ExecutionGroup::Br, 1), 0);
        // The branch closed the slot, so this starts a fresh one.
        assert_eq!(pipeline.charge(ExecutionGroup::Ls, 1), 1);
    }

    #[test]
    fn multi_cycle_instructions_keep_their_remaining_cost_when_paired() {
        let mut pipeline = IssuePipeline::new();
        assert_eq!(pipeline.charge(ExecutionGroup::Ex, 1), 1);
        assert_eq!(pipeline.charge(ExecutionGroup::Fe, 3), 2);
    }
}
