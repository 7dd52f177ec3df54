//! Disbursement policy
//!
//! Pure evaluation of a top-up batch against a balance snapshot. Nothing in
//! here touches the ledger or the treasury; [`evaluate`] only decides what
//! would be sent and whether the treasury can afford it.
//!
//! Rules:
//! - a request is eligible when its recipient is present, non-zero and its
//!   observed balance is strictly below the threshold
//! - `required` is the sum of the eligible amounts; if it exceeds the
//!   treasury balance the whole batch is refused
//! - eligibility is judged on the snapshot only, so the order of requests
//!   never changes which recipients are paid
//! - duplicates are not merged; a recipient listed twice is paid twice

use crate::core::{Address, Transfer};
use crate::treasury::treasury::TreasuryError;
use serde::{Deserialize, Serialize};

/// One entry of a disbursement batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRequest {
    /// `None` or the zero address marks an invalid recipient
    pub recipient: Option<Address>,
    /// Recipient balance as observed by the caller before the batch
    pub current_balance: u128,
    /// Flat amount to send when under threshold
    pub amount: u128,
    pub threshold: u128,
}

impl TopUpRequest {
    pub fn new(recipient: Address, current_balance: u128, amount: u128, threshold: u128) -> Self {
        Self {
            recipient: Some(recipient),
            current_balance,
            amount,
            threshold,
        }
    }

    /// Request with no recipient identity
    pub fn without_recipient(current_balance: u128, amount: u128, threshold: u128) -> Self {
        Self {
            recipient: None,
            current_balance,
            amount,
            threshold,
        }
    }

    /// The recipient, if it is a usable identity
    pub fn valid_recipient(&self) -> Option<Address> {
        self.recipient.filter(|address| !address.is_zero())
    }

    pub fn is_under_threshold(&self) -> bool {
        self.current_balance < self.threshold
    }
}

/// Why a request did not produce a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidRecipient,
    AtOrAboveThreshold,
    ZeroAmount,
}

/// Per-request result, in request order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecipientOutcome {
    Sent {
        recipient: Address,
        amount: u128,
    },
    Skipped {
        recipient: Option<Address>,
        reason: SkipReason,
    },
}

impl RecipientOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, RecipientOutcome::Sent { .. })
    }
}

/// An under-threshold recipient that would need funding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub recipient: Address,
    pub current_balance: u128,
    pub threshold: u128,
    pub amount: u128,
}

impl Shortfall {
    /// How far below the threshold the recipient sits
    pub fn deficit(&self) -> u128 {
        self.threshold.saturating_sub(self.current_balance)
    }
}

/// Result of evaluating a batch that the treasury can afford
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisbursementPlan {
    pub required: u128,
    pub transfers: Vec<Transfer>,
    pub outcomes: Vec<RecipientOutcome>,
}

/// Sum the amounts owed to eligible recipients
fn required_funds(requests: &[TopUpRequest]) -> Result<u128, TreasuryError> {
    requests
        .iter()
        .filter(|r| r.valid_recipient().is_some() && r.is_under_threshold())
        .try_fold(0u128, |acc, r| acc.checked_add(r.amount))
        .ok_or(TreasuryError::AmountOverflow)
}

/// Eligible recipients with a non-zero amount, in request order
pub fn shortfalls(requests: &[TopUpRequest]) -> Vec<Shortfall> {
    requests
        .iter()
        .filter(|r| r.is_under_threshold() && r.amount > 0)
        .filter_map(|r| {
            r.valid_recipient().map(|recipient| Shortfall {
                recipient,
                current_balance: r.current_balance,
                threshold: r.threshold,
                amount: r.amount,
            })
        })
        .collect()
}

/// Decide a batch against `treasury_balance`.
///
/// Fails with [`TreasuryError::InsufficientTreasury`] before producing any
/// transfer when the eligible total exceeds the balance.
pub fn evaluate(
    treasury_balance: u128,
    requests: &[TopUpRequest],
) -> Result<DisbursementPlan, TreasuryError> {
    let required = required_funds(requests)?;
    if required > treasury_balance {
        return Err(TreasuryError::InsufficientTreasury {
            required,
            available: treasury_balance,
            short: shortfalls(requests),
        });
    }

    let mut transfers = Vec::new();
    let mut outcomes = Vec::with_capacity(requests.len());

    for request in requests {
        let outcome = match request.valid_recipient() {
            None => RecipientOutcome::Skipped {
                recipient: request.recipient,
                reason: SkipReason::InvalidRecipient,
            },
            Some(recipient) if !request.is_under_threshold() => RecipientOutcome::Skipped {
                recipient: Some(recipient),
                reason: SkipReason::AtOrAboveThreshold,
            },
            Some(recipient) if request.amount == 0 => RecipientOutcome::Skipped {
                recipient: Some(recipient),
                reason: SkipReason::ZeroAmount,
            },
            Some(recipient) => {
                transfers.push(Transfer {
                    to: recipient,
                    amount: request.amount,
                });
                RecipientOutcome::Sent {
                    recipient,
                    amount: request.amount,
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(DisbursementPlan {
        required,
        transfers,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn paid_set(plan: &DisbursementPlan) -> BTreeSet<Address> {
        plan.transfers.iter().map(|t| t.to).collect()
    }

    #[test]
    fn test_both_under_threshold_are_planned() {
        let requests = vec![
            TopUpRequest::new(addr(1), 0, 30, 1),
            TopUpRequest::new(addr(2), 5, 30, 10),
        ];
        let plan = evaluate(100, &requests).unwrap();

        assert_eq!(plan.required, 60);
        assert_eq!(plan.transfers.len(), 2);
        assert!(plan.outcomes.iter().all(RecipientOutcome::is_sent));
    }

    #[test]
    fn test_aggregate_gate_refuses_whole_batch() {
        let requests = vec![
            TopUpRequest::new(addr(1), 0, 30, 1),
            TopUpRequest::new(addr(2), 0, 30, 1),
        ];
        let err = evaluate(40, &requests).unwrap_err();

        match err {
            TreasuryError::InsufficientTreasury {
                required,
                available,
                short,
            } => {
                assert_eq!(required, 60);
                assert_eq!(available, 40);
                assert_eq!(short.len(), 2);
                assert_eq!(short[0].recipient, addr(1));
                assert_eq!(short[0].deficit(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_at_threshold_is_not_paid() {
        let requests = vec![TopUpRequest::new(addr(1), 5, 30, 5)];
        let plan = evaluate(100, &requests).unwrap();

        assert_eq!(plan.required, 0);
        assert!(plan.transfers.is_empty());
        assert_eq!(
            plan.outcomes[0],
            RecipientOutcome::Skipped {
                recipient: Some(addr(1)),
                reason: SkipReason::AtOrAboveThreshold
            }
        );
    }

    #[test]
    fn test_invalid_recipients_do_not_count() {
        let requests = vec![
            TopUpRequest::without_recipient(0, 30, 1),
            TopUpRequest::new(Address::ZERO, 0, 30, 1),
            TopUpRequest::new(addr(2), 0, 30, 1),
        ];
        // Only addr(2) counts, so 30 fits even though 90 would not.
        let plan = evaluate(50, &requests).unwrap();

        assert_eq!(plan.required, 30);
        assert_eq!(paid_set(&plan), BTreeSet::from([addr(2)]));
        assert_eq!(
            plan.outcomes[0],
            RecipientOutcome::Skipped {
                recipient: None,
                reason: SkipReason::InvalidRecipient
            }
        );
        assert_eq!(
            plan.outcomes[1],
            RecipientOutcome::Skipped {
                recipient: Some(Address::ZERO),
                reason: SkipReason::InvalidRecipient
            }
        );
    }

    #[test]
    fn test_zero_amount_is_skipped() {
        let requests = vec![TopUpRequest::new(addr(1), 0, 0, 10)];
        let plan = evaluate(0, &requests).unwrap();

        assert!(plan.transfers.is_empty());
        assert_eq!(
            plan.outcomes[0],
            RecipientOutcome::Skipped {
                recipient: Some(addr(1)),
                reason: SkipReason::ZeroAmount
            }
        );
    }

    #[test]
    fn test_duplicates_are_paid_twice() {
        let requests = vec![
            TopUpRequest::new(addr(1), 0, 30, 1),
            TopUpRequest::new(addr(1), 0, 30, 1),
        ];
        let plan = evaluate(100, &requests).unwrap();

        assert_eq!(plan.required, 60);
        assert_eq!(plan.transfers.len(), 2);
    }

    #[test]
    fn test_outcome_is_order_independent() {
        let requests = vec![
            TopUpRequest::new(addr(1), 0, 30, 1),
            TopUpRequest::new(addr(2), 10, 30, 5),
            TopUpRequest::without_recipient(0, 30, 1),
            TopUpRequest::new(addr(3), 4, 20, 5),
        ];

        let forward = evaluate(50, &requests).unwrap();
        let mut reversed_requests = requests.clone();
        reversed_requests.reverse();
        let reversed = evaluate(50, &reversed_requests).unwrap();

        assert_eq!(forward.required, reversed.required);
        assert_eq!(paid_set(&forward), paid_set(&reversed));

        // The failing side of the gate is order independent as well.
        assert!(evaluate(49, &requests).is_err());
        assert!(evaluate(49, &reversed_requests).is_err());
    }

    #[test]
    fn test_required_overflow() {
        let requests = vec![
            TopUpRequest::new(addr(1), 0, u128::MAX, 1),
            TopUpRequest::new(addr(2), 0, 1, 1),
        ];
        assert!(matches!(
            evaluate(u128::MAX, &requests),
            Err(TreasuryError::AmountOverflow)
        ));
    }

    #[test]
    fn test_empty_batch() {
        let plan = evaluate(0, &[]).unwrap();
        assert_eq!(plan.required, 0);
        assert!(plan.outcomes.is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RecipientOutcome::Skipped {
            recipient: None,
            reason: SkipReason::InvalidRecipient,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"skipped\""));
        assert!(json.contains("invalid_recipient"));
    }
}
