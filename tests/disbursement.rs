//! End-to-end top-up batches through the treasury and the chain state.

use gas_treasury::core::{Address, ChainState, LedgerReader, MemoryLedger};
use gas_treasury::treasury::{
    RecipientOutcome, SkipReason, TopUpRequest, TopUpSettings, Treasury, TreasuryError,
};

const CONTROLLER: Address = Address::from_bytes([1; 20]);
const FUNDER: Address = Address::from_bytes([0xF0; 20]);
const R1: Address = Address::from_bytes([0x11; 20]);
const R2: Address = Address::from_bytes([0x22; 20]);
const R3: Address = Address::from_bytes([0x33; 20]);

/// Treasury holding `balance`, plus a ledger where each `(address, amount)`
/// is pre-funded
fn funded(balance: u128, accounts: &[(Address, u128)]) -> (Treasury, MemoryLedger) {
    let mut ledger = MemoryLedger::new();
    ledger.allocate(&FUNDER, balance.max(1)).unwrap();
    for (address, amount) in accounts {
        ledger.allocate(address, *amount).unwrap();
    }

    let mut treasury = Treasury::new(CONTROLLER);
    if balance > 0 {
        treasury.deposit(&FUNDER, balance, &mut ledger).unwrap();
    }
    (treasury, ledger)
}

#[test]
fn recipients_below_threshold_are_both_paid() {
    let (mut treasury, mut ledger) = funded(100, &[(R2, 5)]);
    let requests = [
        TopUpRequest::new(R1, 0, 30, 1),
        TopUpRequest::new(R2, ledger.balance_of(&R2), 30, 10),
    ];

    let outcome = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap();

    assert_eq!(outcome.paid(), vec![R1, R2]);
    assert_eq!(outcome.total_sent, 60);
    assert_eq!(treasury.balance(), 40);
    assert_eq!(ledger.balance_of(&R1), 30);
    assert_eq!(ledger.balance_of(&R2), 35);
}

#[test]
fn balance_above_threshold_is_not_paid() {
    // R2 holds 5 against a threshold of 1, so only R1 is eligible.
    let (mut treasury, mut ledger) = funded(100, &[(R2, 5)]);
    let requests = [
        TopUpRequest::new(R1, 0, 30, 1),
        TopUpRequest::new(R2, 5, 30, 1),
    ];

    let outcome = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap();

    assert_eq!(outcome.paid(), vec![R1]);
    assert_eq!(treasury.balance(), 70);
    assert_eq!(ledger.balance_of(&R2), 5);
}

#[test]
fn insufficient_treasury_pays_nobody() {
    let (mut treasury, mut ledger) = funded(40, &[]);
    let requests = [
        TopUpRequest::new(R1, 0, 30, 1),
        TopUpRequest::new(R2, 0, 30, 1),
    ];

    let err = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap_err();

    assert!(matches!(
        err,
        TreasuryError::InsufficientTreasury {
            required: 60,
            available: 40,
            ..
        }
    ));
    assert_eq!(treasury.balance(), 40);
    assert_eq!(ledger.balance_of(&R1), 0);
    assert_eq!(ledger.balance_of(&R2), 0);
}

#[test]
fn recipient_at_or_above_threshold_is_a_no_op() {
    let (mut treasury, mut ledger) = funded(100, &[(R1, 10)]);
    let requests = [TopUpRequest::new(R1, 10, 30, 5)];

    let outcome = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap();

    assert_eq!(outcome.total_sent, 0);
    assert_eq!(outcome.sent_count(), 0);
    assert_eq!(treasury.balance(), 100);
    assert_eq!(ledger.balance_of(&R1), 10);
}

#[test]
fn missing_recipient_is_skipped() {
    let (mut treasury, mut ledger) = funded(100, &[]);
    let requests = [
        TopUpRequest::without_recipient(0, 30, 1),
        TopUpRequest::new(R2, 0, 30, 1),
    ];

    let outcome = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap();

    assert_eq!(
        outcome.outcomes[0],
        RecipientOutcome::Skipped {
            recipient: None,
            reason: SkipReason::InvalidRecipient
        }
    );
    assert_eq!(outcome.paid(), vec![R2]);
    assert_eq!(treasury.balance(), 70);
}

#[test]
fn aggregate_gate_leaves_everything_untouched() {
    for balance in [0u128, 29, 59] {
        let (mut treasury, mut ledger) = funded(balance, &[]);
        let supply_before = ledger.total_supply();
        let requests = [
            TopUpRequest::new(R1, 0, 30, 1),
            TopUpRequest::new(R2, 0, 30, 1),
            TopUpRequest::new(R3, 50, 30, 1),
        ];

        let result = treasury.distribute_if_below(&CONTROLLER, &requests, &mut ledger);

        assert!(matches!(
            result,
            Err(TreasuryError::InsufficientTreasury { required: 60, .. })
        ));
        assert_eq!(treasury.balance(), balance);
        assert_eq!(ledger.total_supply(), supply_before);
    }
}

#[test]
fn invalid_recipient_does_not_change_other_outcomes() {
    let with_zero = [
        TopUpRequest::new(Address::ZERO, 0, 30, 1),
        TopUpRequest::new(R1, 0, 30, 1),
    ];
    let without = [TopUpRequest::new(R1, 0, 30, 1)];

    let (mut a, mut ledger_a) = funded(30, &[]);
    let (mut b, mut ledger_b) = funded(30, &[]);
    let first = a.distribute_if_below(&CONTROLLER, &with_zero, &mut ledger_a).unwrap();
    let second = b.distribute_if_below(&CONTROLLER, &without, &mut ledger_b).unwrap();

    assert_eq!(first.paid(), second.paid());
    assert_eq!(a.balance(), b.balance());
}

#[test]
fn exact_accounting_and_order_independence() {
    let requests = vec![
        TopUpRequest::new(R1, 0, 25, 10),
        TopUpRequest::new(R2, 10, 25, 10),
        TopUpRequest::new(R3, 3, 25, 10),
    ];
    let mut reversed = requests.clone();
    reversed.reverse();

    let (mut forward, mut ledger_f) = funded(60, &[(R2, 10), (R3, 3)]);
    let (mut backward, mut ledger_b) = funded(60, &[(R2, 10), (R3, 3)]);

    let out_f = forward
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger_f)
        .unwrap();
    let out_b = backward
        .distribute_if_below(&CONTROLLER, &reversed, &mut ledger_b)
        .unwrap();

    let mut paid_f = out_f.paid();
    let mut paid_b = out_b.paid();
    paid_f.sort();
    paid_b.sort();
    assert_eq!(paid_f, paid_b);
    assert_eq!(paid_f, vec![R1, R3]);

    assert_eq!(forward.balance(), 60 - 50);
    assert_eq!(backward.balance(), forward.balance());
    assert_eq!(ledger_f.balance_of(&R1), 25);
    assert_eq!(ledger_f.balance_of(&R2), 10);
    assert_eq!(ledger_f.balance_of(&R3), 28);
}

#[test]
fn non_controller_changes_nothing() {
    let (mut treasury, mut ledger) = funded(100, &[]);
    let stranger = Address::from_bytes([9; 20]);
    let requests = [TopUpRequest::new(R1, 0, 30, 1)];

    assert_eq!(
        treasury
            .distribute_if_below(&stranger, &requests, &mut ledger)
            .unwrap_err(),
        TreasuryError::Unauthorized { caller: stranger }
    );
    assert!(matches!(
        treasury.sweep(&stranger, &R1, 10, &mut ledger),
        Err(TreasuryError::Unauthorized { .. })
    ));
    assert!(matches!(
        treasury.add_minter(&stranger, &R1),
        Err(TreasuryError::Unauthorized { .. })
    ));

    assert_eq!(treasury.balance(), 100);
    assert_eq!(ledger.balance_of(&R1), 0);
    assert!(!treasury.roles().is_minter(&R1));
}

#[test]
fn rejecting_recipient_aborts_whole_batch() {
    let (mut treasury, mut ledger) = funded(100, &[]);
    ledger.set_rejecting(&R2, true);
    let requests = [
        TopUpRequest::new(R1, 0, 30, 1),
        TopUpRequest::new(R2, 0, 30, 1),
    ];

    let err = treasury
        .distribute_if_below(&CONTROLLER, &requests, &mut ledger)
        .unwrap_err();

    assert!(matches!(err, TreasuryError::TransferRejected { recipient, .. } if recipient == R2));
    assert_eq!(treasury.balance(), 100);
    assert_eq!(ledger.balance_of(&R1), 0);
}

#[test]
fn chain_state_snapshot_round_trip() {
    let mut state = ChainState::new();
    state.allocate(&CONTROLLER, 1_000).unwrap();
    state.allocate(&R3, 50).unwrap();
    state.deploy(&CONTROLLER, "Gas Badges", "GAS").unwrap();
    state.deposit(None, &CONTROLLER, 100).unwrap();

    let settings = TopUpSettings {
        amount: 30,
        threshold: 20,
    };
    let recipients = [Some(R1), None, Some(R2), Some(R3)];

    let outcome = state
        .top_up(None, &CONTROLLER, &recipients, settings)
        .unwrap();
    assert_eq!(outcome.paid(), vec![R1, R2]);
    assert_eq!(outcome.skipped_count(), 2);
    assert_eq!(outcome.treasury_after, 40);

    // Both are now at 30, above the threshold of 20.
    let again = state
        .top_up(None, &CONTROLLER, &recipients, settings)
        .unwrap();
    assert_eq!(again.total_sent, 0);

    let json = serde_json::to_string(&state).unwrap();
    let restored: ChainState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.balance_of(&R1), 30);
    assert_eq!(restored.balance_of(&R3), 50);
}
