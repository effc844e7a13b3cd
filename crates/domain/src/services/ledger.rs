//! Ledger arithmetic: reward-goal crossings and refund absorption.
//!
//! These functions decide what a balance adjustment does to the ledger
//! without touching it. The caller (which holds the row locks) applies the
//! returned plan inside its database transaction.

use uuid::Uuid;

use crate::models::RewardRule;

/// Outcome of checking a positive adjustment against the reward goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTally {
    /// Reward units owed from this adjustment.
    pub crossings: i64,
    /// Whether the per-transaction reward cap limited the crossings.
    pub cap_reached: bool,
    /// Amount to subtract from the balance once the crossings are owed.
    pub balance_deduction: i64,
}

impl RewardTally {
    /// No crossings, nothing to deduct.
    pub fn none() -> Self {
        RewardTally { crossings: 0, cap_reached: false, balance_deduction: 0 }
    }
}

/// Computes how many reward-goal crossings a positive adjustment produced.
///
/// `new_balance` is the balance after the adjustment was added. The balance
/// held at most `reward_goal - 1` beforehand (each earn strips its
/// crossings), so `new_balance / reward_goal` counts exactly the crossings
/// this adjustment caused.
///
/// When the reward cap bites, the crossings are limited to the cap and the
/// balance is instead reduced by the full adjustment: the overshoot is
/// forfeited rather than retained toward the next reward.
pub fn rewards_achieved(new_balance: i64, adjustment: i64, rule: &RewardRule) -> RewardTally {
    if rule.reward_goal <= 0 || new_balance < rule.reward_goal {
        return RewardTally::none();
    }

    let mut crossings = new_balance / rule.reward_goal;
    let mut cap_reached = false;

    if let Some(cap) = rule.reward_cap {
        let cap = i64::from(cap);
        if cap > 0 && (crossings > cap || adjustment > cap * rule.reward_goal) {
            crossings = cap;
            cap_reached = true;
        }
    }

    let balance_deduction = if cap_reached {
        adjustment
    } else {
        crossings * rule.reward_goal
    };

    RewardTally { crossings, cap_reached, balance_deduction }
}

/// A pending reward to be written for one or more goal crossings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRewardPlan {
    pub value: i64,
    pub count: i64,
    pub total_cost_to_user: i64,
}

/// Plans the pending-reward rows for a tally, one row per crossing.
///
/// When the cap bit, the balance deduction exceeds `crossings * goal`; the
/// surplus rides on the last row's `total_cost_to_user` ("slush") so that a
/// later refund can absorb it.
pub fn plan_pending_rewards(tally: &RewardTally, rule: &RewardRule) -> Vec<PendingRewardPlan> {
    let mut plans: Vec<PendingRewardPlan> = (0..tally.crossings)
        .map(|_| PendingRewardPlan {
            value: rule.reward_goal,
            count: 1,
            total_cost_to_user: rule.reward_goal,
        })
        .collect();

    let slush = tally.balance_deduction - tally.crossings * rule.reward_goal;
    if slush > 0 {
        if let Some(last) = plans.last_mut() {
            last.total_cost_to_user += slush;
        }
    }

    plans
}

/// Snapshot of a locked pending reward row, as input to refund absorption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub id: i64,
    pub pending_reward_uuid: Uuid,
    pub value: i64,
    pub count: i64,
    pub total_cost_to_user: i64,
}

impl PendingSnapshot {
    fn total_value(&self) -> i64 {
        self.count * self.value
    }

    fn slush(&self) -> i64 {
        self.total_cost_to_user - self.total_value()
    }
}

/// A mutation to apply to a pending reward row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    /// Reduce the row's total cost to user (slush absorbed a refund).
    SetTotalCost {
        id: i64,
        pending_reward_uuid: Uuid,
        total_cost_to_user: i64,
        original_total_cost_to_user: i64,
    },
    /// Reduce the row's reward count (part of its value absorbed a refund).
    Shrink {
        id: i64,
        pending_reward_uuid: Uuid,
        count: i64,
        total_cost_to_user: i64,
        deleted_count: i64,
    },
    /// Remove the row entirely.
    Delete {
        id: i64,
        pending_reward_uuid: Uuid,
        deleted_count: i64,
    },
}

/// Outcome of absorbing a refund shortfall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome {
    /// Resulting balance. Negative exactly when `amount_not_recouped > 0`,
    /// representing the amount owed back.
    pub balance: i64,
    /// Portion of the shortfall nothing could absorb.
    pub amount_not_recouped: i64,
    pub mutations: Vec<PendingMutation>,
}

/// Absorbs a refund shortfall through the ledger.
///
/// Absorption order, each step reducing the remaining shortfall:
/// 1. a single pending reward whose slush covers all of it;
/// 2. the collective slush of the pending rewards, in the given order
///    (callers pass newest first);
/// 3. the current balance;
/// 4. the pending rewards' value, shrinking counts and deleting exhausted
///    rows;
/// 5. any remainder drives the balance negative and is reported as not
///    recouped.
///
/// `shortfall` must be positive (the magnitude of the negative earn).
pub fn absorb_refund(
    shortfall: i64,
    balance: i64,
    pending: &[PendingSnapshot],
) -> RefundOutcome {
    debug_assert!(shortfall > 0);

    let mut shortfall = shortfall;
    let mut balance = balance;
    let mut mutations = Vec::new();
    let mut rows: Vec<PendingSnapshot> = pending.to_vec();

    // 1: one row's slush covers the whole shortfall.
    if let Some(row) = rows.iter_mut().find(|row| row.slush() >= shortfall) {
        let original = row.total_cost_to_user;
        row.total_cost_to_user -= shortfall;
        mutations.push(PendingMutation::SetTotalCost {
            id: row.id,
            pending_reward_uuid: row.pending_reward_uuid,
            total_cost_to_user: row.total_cost_to_user,
            original_total_cost_to_user: original,
        });
        return RefundOutcome { balance, amount_not_recouped: 0, mutations };
    }

    // 2: drain slush row by row.
    for row in rows.iter_mut() {
        if shortfall == 0 {
            break;
        }
        let slush = row.slush();
        if slush <= 0 {
            continue;
        }
        let original = row.total_cost_to_user;
        if slush >= shortfall {
            row.total_cost_to_user -= shortfall;
            shortfall = 0;
        } else {
            row.total_cost_to_user = row.total_value();
            shortfall -= slush;
        }
        mutations.push(PendingMutation::SetTotalCost {
            id: row.id,
            pending_reward_uuid: row.pending_reward_uuid,
            total_cost_to_user: row.total_cost_to_user,
            original_total_cost_to_user: original,
        });
    }

    if shortfall == 0 {
        return RefundOutcome { balance, amount_not_recouped: 0, mutations };
    }

    // 3: the balance itself.
    if balance >= shortfall {
        balance -= shortfall;
        return RefundOutcome { balance, amount_not_recouped: 0, mutations };
    }
    shortfall -= balance.max(0);
    balance = balance.min(0);

    // 4: pending reward value.
    for row in rows.iter() {
        if shortfall == 0 {
            break;
        }
        let total_value = row.total_value();
        if total_value > shortfall {
            let remainder = total_value - shortfall;
            shortfall = 0;
            balance += remainder % row.value;
            let new_count = remainder / row.value;
            if new_count >= 1 {
                mutations.push(PendingMutation::Shrink {
                    id: row.id,
                    pending_reward_uuid: row.pending_reward_uuid,
                    count: new_count,
                    total_cost_to_user: new_count * row.value,
                    deleted_count: row.count - new_count,
                });
            } else {
                mutations.push(PendingMutation::Delete {
                    id: row.id,
                    pending_reward_uuid: row.pending_reward_uuid,
                    deleted_count: row.count,
                });
            }
        } else {
            shortfall -= total_value;
            mutations.push(PendingMutation::Delete {
                id: row.id,
                pending_reward_uuid: row.pending_reward_uuid,
                deleted_count: row.count,
            });
        }
    }

    // 5: whatever is left goes negative and is reported.
    balance -= shortfall;
    RefundOutcome { balance, amount_not_recouped: shortfall, mutations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(goal: i64, cap: Option<i32>) -> RewardRule {
        RewardRule {
            id: 1,
            campaign_id: 1,
            reward_goal: goal,
            allocation_window: 14,
            reward_cap: cap,
            reward_config_id: 1,
        }
    }

    fn snapshot(id: i64, count: i64, value: i64, total_cost: i64) -> PendingSnapshot {
        PendingSnapshot {
            id,
            pending_reward_uuid: Uuid::new_v4(),
            value,
            count,
            total_cost_to_user: total_cost,
        }
    }

    #[test]
    fn test_single_goal_crossing() {
        // 0 + 600 against goal 500: one crossing, balance keeps 100.
        let tally = rewards_achieved(600, 600, &rule(500, None));
        assert_eq!(tally.crossings, 1);
        assert!(!tally.cap_reached);
        assert_eq!(tally.balance_deduction, 500);
        assert_eq!(600 - tally.balance_deduction, 100);
    }

    #[test]
    fn test_double_goal_crossing() {
        // 0 + 1200 against goal 500: two crossings, balance keeps 200.
        let tally = rewards_achieved(1200, 1200, &rule(500, None));
        assert_eq!(tally.crossings, 2);
        assert_eq!(tally.balance_deduction, 1000);
        assert_eq!(1200 - tally.balance_deduction, 200);
    }

    #[test]
    fn test_no_crossing_below_goal() {
        assert_eq!(rewards_achieved(499, 499, &rule(500, None)), RewardTally::none());
    }

    #[test]
    fn test_crossing_counts_only_new_crossings() {
        // Prior balance 400 plus 300 crosses once.
        let tally = rewards_achieved(700, 300, &rule(500, None));
        assert_eq!(tally.crossings, 1);
        assert_eq!(700 - tally.balance_deduction, 200);
    }

    #[test]
    fn test_reward_cap_limits_crossings_and_forfeits_overshoot() {
        // 0 + 1700 against goal 500, cap 2: two crossings, the whole
        // adjustment is deducted so the balance returns to its prior value.
        let tally = rewards_achieved(1700, 1700, &rule(500, Some(2)));
        assert_eq!(tally.crossings, 2);
        assert!(tally.cap_reached);
        assert_eq!(tally.balance_deduction, 1700);
    }

    #[test]
    fn test_reward_cap_on_adjustment_amount() {
        // Prior balance 400, adjustment 1100 (> cap 2 * goal 500) although
        // crossings alone (3) also exceed the cap.
        let tally = rewards_achieved(1500, 1100, &rule(500, Some(2)));
        assert_eq!(tally.crossings, 2);
        assert!(tally.cap_reached);
        assert_eq!(tally.balance_deduction, 1100);
    }

    #[test]
    fn test_reward_cap_not_reached_when_within_cap() {
        let tally = rewards_achieved(600, 600, &rule(500, Some(2)));
        assert_eq!(tally.crossings, 1);
        assert!(!tally.cap_reached);
        assert_eq!(tally.balance_deduction, 500);
    }

    #[test]
    fn test_zero_goal_never_crosses() {
        assert_eq!(rewards_achieved(1000, 1000, &rule(0, None)), RewardTally::none());
    }

    #[test]
    fn test_plan_one_row_per_crossing() {
        let tally = rewards_achieved(1200, 1200, &rule(500, None));
        let plans = plan_pending_rewards(&tally, &rule(500, None));
        assert_eq!(plans.len(), 2);
        for plan in &plans {
            assert_eq!(plan.value, 500);
            assert_eq!(plan.count, 1);
            assert_eq!(plan.total_cost_to_user, 500);
        }
    }

    #[test]
    fn test_plan_carries_cap_slush_on_last_row() {
        let tally = rewards_achieved(1700, 1700, &rule(500, Some(2)));
        let plans = plan_pending_rewards(&tally, &rule(500, Some(2)));
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].total_cost_to_user, 500);
        // 1700 deducted - 2 * 500 owed = 700 slush on the last row
        assert_eq!(plans[1].total_cost_to_user, 1200);
        let total: i64 = plans.iter().map(|p| p.total_cost_to_user).sum();
        assert_eq!(total, tally.balance_deduction);
    }

    #[test]
    fn test_refund_absorbed_by_balance() {
        let outcome = absorb_refund(150, 400, &[]);
        assert_eq!(outcome.balance, 250);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert!(outcome.mutations.is_empty());
    }

    #[test]
    fn test_refund_shortfall_goes_negative() {
        // Balance 50, refund 200, nothing else to absorb it.
        let outcome = absorb_refund(200, 50, &[]);
        assert_eq!(outcome.balance, -150);
        assert_eq!(outcome.amount_not_recouped, 150);
    }

    #[test]
    fn test_refund_absorbed_by_single_slush() {
        let rows = vec![snapshot(1, 1, 500, 700)]; // slush 200
        let outcome = absorb_refund(150, 100, &rows);
        assert_eq!(outcome.balance, 100);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert_eq!(
            outcome.mutations,
            vec![PendingMutation::SetTotalCost {
                id: 1,
                pending_reward_uuid: rows[0].pending_reward_uuid,
                total_cost_to_user: 550,
                original_total_cost_to_user: 700,
            }]
        );
    }

    #[test]
    fn test_refund_prefers_single_covering_slush_over_first_row() {
        // First row's slush is too small; the second covers it alone.
        let rows = vec![snapshot(1, 1, 500, 550), snapshot(2, 1, 500, 800)];
        let outcome = absorb_refund(200, 0, &rows);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert_eq!(outcome.mutations.len(), 1);
        match &outcome.mutations[0] {
            PendingMutation::SetTotalCost { id, total_cost_to_user, .. } => {
                assert_eq!(*id, 2);
                assert_eq!(*total_cost_to_user, 600);
            }
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn test_refund_drains_collective_slush() {
        // Two rows with 100 slush each absorb a 150 refund together.
        let rows = vec![snapshot(1, 1, 500, 600), snapshot(2, 1, 500, 600)];
        let outcome = absorb_refund(150, 0, &rows);
        assert_eq!(outcome.balance, 0);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert_eq!(outcome.mutations.len(), 2);
        match (&outcome.mutations[0], &outcome.mutations[1]) {
            (
                PendingMutation::SetTotalCost { total_cost_to_user: first, .. },
                PendingMutation::SetTotalCost { total_cost_to_user: second, .. },
            ) => {
                assert_eq!(*first, 500); // fully drained
                assert_eq!(*second, 550); // absorbed the remaining 50
            }
            other => panic!("unexpected mutations {other:?}"),
        }
    }

    #[test]
    fn test_refund_consumes_pending_reward_value() {
        // No slush, balance 100, one pending reward worth 2 x 500.
        // Refund 700: balance absorbs 100, value absorbs 600 leaving a
        // remainder of 400 which is below one reward unit, so the row is
        // deleted and the remainder returns to the balance.
        let rows = vec![snapshot(1, 2, 500, 1000)];
        let outcome = absorb_refund(700, 100, &rows);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert_eq!(outcome.balance, 400);
        assert_eq!(
            outcome.mutations,
            vec![PendingMutation::Delete {
                id: 1,
                pending_reward_uuid: rows[0].pending_reward_uuid,
                deleted_count: 2,
            }]
        );
    }

    #[test]
    fn test_refund_shrinks_pending_reward() {
        // Refund 600 against balance 100 and a 3 x 500 pending reward:
        // balance absorbs 100, value absorbs 500 leaving 1000 = 2 units.
        let rows = vec![snapshot(1, 3, 500, 1500)];
        let outcome = absorb_refund(600, 100, &rows);
        assert_eq!(outcome.amount_not_recouped, 0);
        assert_eq!(outcome.balance, 0);
        assert_eq!(
            outcome.mutations,
            vec![PendingMutation::Shrink {
                id: 1,
                pending_reward_uuid: rows[0].pending_reward_uuid,
                count: 2,
                total_cost_to_user: 1000,
                deleted_count: 1,
            }]
        );
    }

    #[test]
    fn test_refund_exhausts_everything_and_reports_remainder() {
        // Balance 50 and one 1 x 500 pending reward against a 700 refund:
        // 50 + 500 absorbed, 150 not recouped, balance ends at -150.
        let rows = vec![snapshot(1, 1, 500, 500)];
        let outcome = absorb_refund(700, 50, &rows);
        assert_eq!(outcome.amount_not_recouped, 150);
        assert_eq!(outcome.balance, -150);
        assert_eq!(
            outcome.mutations,
            vec![PendingMutation::Delete {
                id: 1,
                pending_reward_uuid: rows[0].pending_reward_uuid,
                deleted_count: 1,
            }]
        );
    }

    #[test]
    fn test_refund_slush_then_value_ladder() {
        // Slush 100 drains first, balance 100 next, then the row's value.
        let rows = vec![snapshot(1, 1, 500, 600)];
        let outcome = absorb_refund(400, 100, &rows);
        assert_eq!(outcome.amount_not_recouped, 0);
        // 400 = 100 slush + 100 balance + 200 of the reward's value;
        // remainder 300 < 500 deletes the row and returns to balance.
        assert_eq!(outcome.balance, 300);
        assert_eq!(outcome.mutations.len(), 2);
        assert!(matches!(outcome.mutations[0], PendingMutation::SetTotalCost { .. }));
        assert!(matches!(outcome.mutations[1], PendingMutation::Delete { .. }));
    }
}
