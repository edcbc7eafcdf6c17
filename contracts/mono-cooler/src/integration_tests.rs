//! End-to-end market scenarios: borrowing at the LTV boundary, interest over
//! time, minimum debt, batch liquidation and forced undelegation.

use super::*;
use cooler_common::constants::{precision::WAD, time::SECONDS_PER_YEAR};
use cooler_common::events::EventType;
use cooler_common::memory::{MemoryGovernanceToken, MemoryTreasury};

const ALICE: Address = [1u8; 32];
const BOB: Address = [2u8; 32];
const KEEPER: Address = [9u8; 32];
const DELEGATE: Address = [7u8; 32];

type TestCooler = MonoCooler<MemoryTreasury, MemoryGovernanceToken>;

fn cooler_with(interest_rate_bps: u64, min_debt_required: u128) -> TestCooler {
    let config = CoolerConfig {
        interest_rate_bps,
        ltv: LoanToValueConfig::new(7 * WAD / 10, 8 * WAD / 10).unwrap(),
        min_debt_required,
        ..Default::default()
    };
    let mut token = MemoryGovernanceToken::new();
    token.mint_governance_token(&ALICE, 100_000 * WAD).unwrap();
    token.mint_governance_token(&BOB, 100_000 * WAD).unwrap();
    MonoCooler::new(config, MemoryTreasury::new(10_000_000 * WAD), token, 0).unwrap()
}

// ============ Boundary ============

#[test]
fn test_origination_boundary_is_strict() {
    let mut cooler = cooler_with(0, WAD);
    cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 0).unwrap();

    cooler.borrow(&ALICE, 69 * WAD, &ALICE, &ALICE, 0).unwrap();

    // 70 / 100 sits exactly on the 0.70 ceiling, which is not above it
    cooler.borrow(&ALICE, WAD, &ALICE, &ALICE, 0).unwrap();
    assert_eq!(cooler.account_position(&ALICE, 0).unwrap().current_ltv, 7 * WAD / 10);

    // One more unit crosses it
    let before = cooler.state().clone();
    let events_before = cooler.events().len();
    let result = cooler.borrow(&ALICE, 1, &ALICE, &ALICE, 0);
    assert!(matches!(result, Err(CoolerError::ExceededMaxOriginationLtv { .. })));
    assert_eq!(cooler.state(), &before);
    assert_eq!(cooler.events().len(), events_before);
    assert_eq!(cooler.treasury().balance_of(&ALICE), 70 * WAD);
}

// ============ Interest ============

#[test]
fn test_one_year_of_continuous_interest() {
    let mut cooler = cooler_with(500, WAD);
    cooler.add_collateral(&ALICE, 10_000 * WAD, &ALICE, &[], 0).unwrap();
    cooler.borrow(&ALICE, 1_000 * WAD, &ALICE, &ALICE, 0).unwrap();

    let position = cooler.account_position(&ALICE, SECONDS_PER_YEAR).unwrap();
    // 1000 * e^0.05 = 1051.27
    assert!(position.current_debt > 1_051 * WAD);
    assert!(position.current_debt < 1_052 * WAD);

    // Views do not persist the refresh
    assert_eq!(cooler.state().global.last_updated_at, 0);
    assert_eq!(cooler.total_debt(SECONDS_PER_YEAR).unwrap(), position.current_debt);
}

#[test]
fn test_rate_change_is_not_retroactive() {
    let mut cooler = cooler_with(500, WAD);
    cooler.add_collateral(&ALICE, 10_000 * WAD, &ALICE, &[], 0).unwrap();
    cooler.borrow(&ALICE, 1_000 * WAD, &ALICE, &ALICE, 0).unwrap();

    let half_year = SECONDS_PER_YEAR / 2;
    let accrued = cooler.account_position(&ALICE, half_year).unwrap().current_debt;

    cooler.set_interest_rate_bps(0, half_year).unwrap();
    assert_eq!(cooler.state().global.last_updated_at, half_year);

    let later = cooler.account_position(&ALICE, half_year + SECONDS_PER_YEAR).unwrap().current_debt;
    assert_eq!(later, accrued);
    assert!(accrued > 1_000 * WAD);
}

#[test]
fn test_accumulator_never_decreases_across_actions() {
    let mut cooler = cooler_with(1_000, WAD);
    cooler.add_collateral(&ALICE, 10_000 * WAD, &ALICE, &[], 0).unwrap();

    let mut previous = cooler.interest_accumulator_ray(0).unwrap();
    for step in 1..=12u64 {
        let now = step * SECONDS_PER_YEAR / 12;
        cooler.borrow(&ALICE, 10 * WAD, &ALICE, &ALICE, now).unwrap();
        let current = cooler.state().global.interest_accumulator_ray;
        assert!(current >= previous);
        previous = current;

        // Same-timestamp refresh adds nothing
        cooler.borrow(&ALICE, 10 * WAD, &ALICE, &ALICE, now).unwrap();
        assert_eq!(cooler.state().global.interest_accumulator_ray, current);
    }
}

#[test]
fn test_aggregate_debt_tracks_accounts_within_dust() {
    let mut cooler = cooler_with(1_000, WAD);
    cooler.add_collateral(&ALICE, 1_000 * WAD, &ALICE, &[], 0).unwrap();
    cooler.add_collateral(&BOB, 1_000 * WAD, &BOB, &[], 0).unwrap();
    cooler.borrow(&ALICE, 333 * WAD + 7, &ALICE, &ALICE, 0).unwrap();
    cooler.borrow(&BOB, 123 * WAD + 11, &BOB, &BOB, 0).unwrap();

    let now = SECONDS_PER_YEAR / 3;
    let total = cooler.total_debt(now).unwrap();
    let sum = cooler.account_position(&ALICE, now).unwrap().current_debt
        + cooler.account_position(&BOB, now).unwrap().current_debt;

    assert!(sum >= total);
    assert!(sum - total <= 2);
}

// ============ Minimum Debt ============

#[test]
fn test_partial_repay_respects_min_debt() {
    let mut cooler = cooler_with(0, 50 * WAD);
    cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 0).unwrap();
    cooler.borrow(&ALICE, 60 * WAD, &ALICE, &ALICE, 0).unwrap();

    let result = cooler.repay(&ALICE, 20 * WAD, &ALICE, 1);
    assert_eq!(result, Err(CoolerError::MinDebtNotMet { debt: 40 * WAD, minimum: 50 * WAD }));

    let repaid = cooler.repay(&ALICE, 60 * WAD, &ALICE, 1).unwrap();
    assert_eq!(repaid, 60 * WAD);
    assert_eq!(cooler.account_state(&ALICE).debt_checkpoint, 0);
    assert_eq!(cooler.account_position(&ALICE, 1).unwrap().current_debt, 0);
    assert_eq!(cooler.repay(&ALICE, WAD, &ALICE, 2), Err(CoolerError::NoDebt { account: ALICE }));
}

#[test]
fn test_full_repay_after_interest_zeroes_debt() {
    let mut cooler = cooler_with(500, WAD);
    cooler.add_collateral(&ALICE, 10_000 * WAD, &ALICE, &[], 0).unwrap();
    cooler.borrow(&ALICE, 1_000 * WAD, &ALICE, &ALICE, 0).unwrap();
    cooler.treasury_mut().mint_to(&ALICE, 100 * WAD).unwrap();

    let owed = cooler.account_position(&ALICE, SECONDS_PER_YEAR).unwrap().current_debt;
    let repaid = cooler.repay(&ALICE, u128::MAX, &ALICE, SECONDS_PER_YEAR).unwrap();
    assert_eq!(repaid, owed);
    assert_eq!(cooler.account_state(&ALICE).debt_checkpoint, 0);

    // Aggregate is floored at zero even though account debt rounded up
    assert_eq!(cooler.total_debt(SECONDS_PER_YEAR).unwrap(), 0);
}

#[test]
fn test_add_collateral_and_repay_never_fail_origination() {
    let mut cooler = cooler_with(1_000, WAD);
    cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 0).unwrap();
    cooler.borrow(&ALICE, u128::MAX, &ALICE, &ALICE, 0).unwrap();

    // Interest pushes the account above the origination ceiling
    let now = SECONDS_PER_YEAR / 2;
    assert!(cooler.compute_liquidity(&[ALICE], now).unwrap()[0].exceeded_max_origination_ltv);

    cooler.add_collateral(&ALICE, WAD, &ALICE, &[], now).unwrap();
    cooler.repay(&ALICE, WAD, &ALICE, now).unwrap();
}

// ============ Liquidation ============

fn unhealthy_alice_healthy_bob() -> (TestCooler, u64) {
    let mut cooler = cooler_with(1_000, WAD);
    cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 0).unwrap();
    cooler.add_collateral(&BOB, 100 * WAD, &BOB, &[], 0).unwrap();
    cooler.borrow(&ALICE, 70 * WAD, &ALICE, &ALICE, 0).unwrap();
    cooler.borrow(&BOB, 10 * WAD, &BOB, &BOB, 0).unwrap();

    // Two years at 10%: 70 grows past 80, 10 stays far below
    (cooler, 2 * SECONDS_PER_YEAR)
}

#[test]
fn test_batch_liquidate_skips_healthy() {
    let (mut cooler, now) = unhealthy_alice_healthy_bob();
    let bob_before = cooler.account_state(&BOB);
    let alice_debt = cooler.account_position(&ALICE, now).unwrap().current_debt;
    assert!(alice_debt > 80 * WAD);

    let result = cooler.batch_liquidate(&KEEPER, &[ALICE, BOB], now).unwrap();

    assert_eq!(result.liquidated, vec![ALICE]);
    assert_eq!(result.total_collateral_claimed, 100 * WAD);
    assert_eq!(result.total_debt_wiped, alice_debt);

    assert_eq!(cooler.account_state(&ALICE), AccountState::default());
    assert_eq!(cooler.account_state(&BOB), bob_before);
    assert_eq!(cooler.total_collateral(), 100 * WAD);
    assert_eq!(cooler.collateral_token().burned, 100 * WAD);
    assert_eq!(cooler.collateral_token().custody, 100 * WAD);

    let bob_debt = cooler.account_position(&BOB, now).unwrap().current_debt;
    let total = cooler.total_debt(now).unwrap();
    assert!(total <= bob_debt && bob_debt - total <= 2);
    assert_eq!(cooler.events().filter_by_type(EventType::Liquidated).len(), 1);
}

#[test]
fn test_second_liquidation_is_noop() {
    let (mut cooler, now) = unhealthy_alice_healthy_bob();
    cooler.batch_liquidate(&KEEPER, &[ALICE], now).unwrap();

    let again = cooler.batch_liquidate(&KEEPER, &[ALICE, ALICE], now).unwrap();
    assert_eq!(again, LiquidationResult::default());
    assert_eq!(cooler.collateral_token().burned, 100 * WAD);
}

#[test]
fn test_batch_liquidate_rolls_back_when_burn_fails() {
    let (mut cooler, now) = unhealthy_alice_healthy_bob();
    cooler.collateral_token_mut().custody = 0;
    let before = cooler.state().clone();
    let events_before = cooler.events().len();

    let result = cooler.batch_liquidate(&KEEPER, &[ALICE, BOB], now);

    assert_eq!(result, Err(CoolerError::InsufficientBalance { available: 0, requested: 100 * WAD }));
    assert_eq!(cooler.state(), &before);
    assert_eq!(cooler.account_state(&ALICE).collateral, 100 * WAD);
    assert_eq!(cooler.total_collateral(), 200 * WAD);
    assert_eq!(cooler.collateral_token().burned, 0);
    assert_eq!(cooler.events().len(), events_before);
    assert!(cooler.events().filter_by_type(EventType::Liquidated).is_empty());
}

#[test]
fn test_liquidation_rescinds_delegations() {
    let mut cooler = cooler_with(1_000, WAD);
    cooler
        .add_collateral(
            &ALICE,
            100 * WAD,
            &ALICE,
            &[DelegationRequest::delegate(DELEGATE, 60 * WAD).unwrap()],
            0,
        )
        .unwrap();
    cooler.borrow(&ALICE, 70 * WAD, &ALICE, &ALICE, 0).unwrap();
    assert_eq!(cooler.delegations().escrow_balance(&DELEGATE), 60 * WAD);

    let result = cooler.batch_liquidate(&KEEPER, &[ALICE], 2 * SECONDS_PER_YEAR).unwrap();
    assert_eq!(result.total_collateral_claimed, 100 * WAD);
    assert_eq!(cooler.delegations().escrow_balance(&DELEGATE), 0);
    assert_eq!(cooler.delegations().total_delegated(&ALICE), 0);
}

#[test]
fn test_apply_unhealthy_delegations() {
    let mut cooler = cooler_with(1_000, WAD);
    cooler
        .add_collateral(
            &ALICE,
            100 * WAD,
            &ALICE,
            &[DelegationRequest::delegate(DELEGATE, 100 * WAD).unwrap()],
            0,
        )
        .unwrap();
    cooler.borrow(&ALICE, 70 * WAD, &ALICE, &ALICE, 0).unwrap();

    let requests = [DelegationRequest::undelegate_all(DELEGATE)];

    // Healthy: keepers cannot touch it
    let result = cooler.apply_unhealthy_delegations(&KEEPER, &ALICE, &requests, 1);
    assert!(matches!(result, Err(CoolerError::CannotLiquidate { .. })));

    // Keepers may never add delegations
    let adding = [DelegationRequest::delegate(DELEGATE, 1).unwrap()];
    let result = cooler.apply_unhealthy_delegations(&KEEPER, &ALICE, &adding, 2 * SECONDS_PER_YEAR);
    assert!(matches!(result, Err(CoolerError::InvalidParam { .. })));

    let result = cooler
        .apply_unhealthy_delegations(&KEEPER, &ALICE, &requests, 2 * SECONDS_PER_YEAR)
        .unwrap();
    assert_eq!(result.total_undelegated, 100 * WAD);
    assert_eq!(cooler.delegations().undelegated_balance(&ALICE), 100 * WAD);
}

#[test]
fn test_delegation_on_behalf_requires_authorization() {
    let mut cooler = cooler_with(0, WAD);
    cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 0).unwrap();
    let requests = [DelegationRequest::delegate(DELEGATE, 10 * WAD).unwrap()];

    let result = cooler.apply_delegations(&BOB, &ALICE, &requests, 1);
    assert!(matches!(result, Err(CoolerError::Unauthorized { .. })));

    cooler.set_authorization(&ALICE, &BOB, 10, 1).unwrap();
    cooler.apply_delegations(&BOB, &ALICE, &requests, 1).unwrap();
    assert_eq!(cooler.delegations().total_delegated(&ALICE), 10 * WAD);

    // Revoked
    cooler.set_authorization(&ALICE, &BOB, 0, 2).unwrap();
    assert!(cooler.apply_delegations(&BOB, &ALICE, &requests, 2).is_err());
}
