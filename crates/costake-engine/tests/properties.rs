//! Randomised checks of the reward accounting
//!
//! Random sequences of deposits, stake changes, withdrawals and ratio
//! changes must never make more claimable than was deposited, must keep
//! every stored score consistent, and must survive a genesis round trip.

use costake_core::{Coins, Dec, U256};
use costake_engine::testutil::{acc, val, TestChain, DENOM};
use costake_engine::{MsgUpdateParams, Params, Querier};
use proptest::prelude::*;

const COSTAKERS: u8 = 4;

#[derive(Clone, Debug)]
enum Op {
    Deposit(u128),
    Modify { who: u8, sats: i128, baby: i128 },
    Withdraw(u8),
    Seal,
    SetRatio(u128),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u128..1_000_000).prop_map(Op::Deposit),
        (0..COSTAKERS, -5_000i128..20_000, -200_000i128..1_000_000)
            .prop_map(|(who, sats, baby)| Op::Modify { who, sats, baby }),
        (0..COSTAKERS).prop_map(Op::Withdraw),
        Just(Op::Seal),
        (1u128..200).prop_map(Op::SetRatio),
    ]
}

fn coins(amount: u128) -> Coins {
    Coins::one(DENOM, amount).unwrap()
}

fn costaker(who: u8) -> costake_core::AccAddress {
    acc(who + 1)
}

/// Apply `op`; a rejected op must leave the store untouched
fn apply(chain: &mut TestChain, op: &Op) -> u128 {
    let before = chain.store.dump();
    let result = match op {
        Op::Deposit(amount) => {
            chain.fund_costaking_module(coins(*amount));
            chain.exec(|k, ctx| k.add_rewards_for_costakers(ctx, &coins(*amount)))
        }
        Op::Modify { who, sats, baby } => chain.exec(|k, ctx| {
            k.costaker_modified_active_amounts(ctx, &costaker(*who), *sats, *baby)
        }),
        Op::Withdraw(who) => chain.exec(|k, ctx| k.costaker_withdraw_rewards(ctx, &costaker(*who))),
        Op::Seal => chain.exec(|k, ctx| k.increment_rewards_period(ctx).map(|_| ())),
        Op::SetRatio(ratio) => {
            let msg = MsgUpdateParams {
                authority: chain.keeper.authority().to_hex(),
                params: Params::new(Dec::zero(), Dec::zero(), *ratio),
            };
            chain.exec(|k, ctx| k.update_params(ctx, msg).map(|_| ()))
        }
    };

    if result.is_err() {
        assert_eq!(chain.store.dump(), before, "rejected {:?} changed state", op);
    }
    match (op, result) {
        (Op::Deposit(amount), Ok(())) => *amount,
        _ => 0,
    }
}

fn who_of(op: &Op) -> Option<u8> {
    match op {
        Op::Modify { who, .. } | Op::Withdraw(who) => Some(*who),
        _ => None,
    }
}

fn score_of(chain: &TestChain, who: u8) -> u128 {
    chain
        .keeper
        .get_costaker_rewards(&chain.ctx(), &costaker(who))
        .unwrap()
        .map(|t| t.total_score)
        .unwrap_or(0)
}

fn current_period(chain: &TestChain) -> u64 {
    chain.keeper.get_current_rewards(&chain.ctx()).unwrap().period
}

fn pending_total(chain: &TestChain) -> U256 {
    let querier = Querier::new(&chain.keeper, &chain.store);
    (0..COSTAKERS).fold(U256::ZERO, |total, who| {
        let pending = querier
            .pending_costaker_rewards(&costaker(who).to_hex())
            .unwrap();
        total + pending.amount_of(DENOM)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_never_pays_more_than_deposited(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 50));
        let mut deposited = U256::ZERO;

        for op in &ops {
            let score_before = who_of(op).map(|who| score_of(&chain, who));
            let period_before = current_period(&chain);
            let paid_before = chain.incentive.total();

            deposited += U256::new(apply(&mut chain, op));

            if let (Some(who), Some(before)) = (who_of(op), score_before) {
                let after = score_of(&chain, who);
                let tracker = chain.keeper.get_costaker_rewards(&chain.ctx(), &costaker(who)).unwrap();
                if after != before || (matches!(op, Op::Withdraw(_)) && tracker.is_some()) {
                    let start = tracker.unwrap().start_period_cumulative_reward;
                    prop_assert_eq!(start, current_period(&chain) - 1);
                } else if matches!(op, Op::Modify { .. }) {
                    prop_assert_eq!(current_period(&chain), period_before);
                    prop_assert_eq!(chain.incentive.total(), paid_before);
                }
            }

            let held = chain.bank.module_balance("costaking").amount_of(DENOM);
            let paid = chain.incentive.total().amount_of(DENOM);
            prop_assert_eq!(held + paid, deposited);
            prop_assert_eq!(chain.bank.module_balance("incentive").amount_of(DENOM), paid);
            prop_assert!(pending_total(&chain) <= held);
            prop_assert!(chain.keeper.assert_invariants(&chain.ctx()).is_ok());
        }
    }

    #[test]
    fn prop_genesis_round_trip(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 50));
        for op in &ops {
            apply(&mut chain, op);
        }

        let exported = chain.keeper.export_genesis(&chain.ctx()).unwrap();
        prop_assert!(exported.validate().is_ok());
        let json = exported.to_json().unwrap();
        let imported = costake_engine::GenesisState::from_json(&json).unwrap();
        prop_assert_eq!(&imported, &exported);

        let restored = TestChain::with_genesis(&imported);
        prop_assert_eq!(restored.store.dump(), chain.store.dump());
        prop_assert_eq!(restored.keeper.export_genesis(&restored.ctx()).unwrap(), exported);
    }

    #[test]
    fn prop_post_slash_stake_never_credited(
        base in 100u128..10_000,
        slash_pct in 1u128..50,
        added in 1u128..5_000,
    ) {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 1));
        chain.add_validator(val(1), 0);
        chain.delegate(acc(1), val(1), base).unwrap();
        chain.end_epoch(1);

        let active_baby = |chain: &TestChain| {
            chain
                .keeper
                .get_costaker_rewards(&chain.ctx(), &acc(1))
                .unwrap()
                .map(|t| t.active_baby)
                .unwrap_or(0)
        };
        prop_assert_eq!(active_baby(&chain), base);

        chain.slash(val(1), Dec::from_ratio(slash_pct, 100).unwrap()).unwrap();
        chain.delegate(acc(1), val(1), added).unwrap();
        prop_assert_eq!(active_baby(&chain), base);
        chain.next_block().unwrap();

        let base_shares = Dec::from_int(base);
        let gained = chain
            .staking
            .delegation_shares(&acc(1), &val(1))
            .checked_sub(base_shares)
            .unwrap();
        chain.undelegate(acc(1), val(1), gained).unwrap();
        prop_assert_eq!(active_baby(&chain), base);
        prop_assert!(chain.keeper.assert_invariants(&chain.ctx()).is_ok());
    }
}
