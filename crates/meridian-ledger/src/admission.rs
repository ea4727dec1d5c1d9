// Copyright 2025 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transaction admission: the pipeline deciding whether a candidate
//! transaction may enter the pending pool.
//!
//! Inputs resolve strictly in index order, one lookup at a time; the order
//! is load-bearing, since the first business-object observation establishes
//! the symbol the rest of the transaction is checked against. A previous
//! transaction missing from the chain index is retried once against the
//! pending pool; nothing else is retried.

use crate::{
    context::{PoolSlice, ValidationContext},
    rules::transaction::{self, settlement, InvalidTransaction},
};
use meridian_kernel::{CertSet, Mer, Symbol, Transaction};
use tracing::{instrument, trace, Level};

pub mod connect;
pub use connect::ConnectError;

/// The mutually-exclusive business category a transaction's inputs commit it
/// to. Derived by classifying every input's previous output, never declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusinessKind {
    /// Base currency only.
    #[default]
    Currency,
    AssetIssue,
    AssetTransfer,
    AssetCert,
    AssetMit,
    DidRegister,
    DidTransfer,
}

/// Running totals across one transaction's input resolution. Owned by a
/// single [`validate`] run and discarded afterwards.
#[derive(Clone, Debug, Default)]
pub struct InputLedger {
    pub value_in: Mer,
    pub asset_amount_in: u64,
    pub certs_in: CertSet,
    /// First business-object symbol observed; every later observation has to
    /// match it (domain certificates excepted).
    pub symbol: Option<Symbol>,
    /// Last classification wins; see [`connect`].
    pub business_kind: BusinessKind,
}

/// A successfully validated transaction together with the indices of inputs
/// whose previous transaction was found only in the pending pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub transaction: Transaction,
    pub unconfirmed: Vec<u32>,
}

/// Standardness policy beyond the structural checks; a relay-policy hook,
/// currently accepting everything.
fn is_standard(_tx: &Transaction) -> bool {
    true
}

/// Decides whether `tx` may enter the pending pool. Delivers exactly one
/// outcome; no partial success, first failure wins.
#[instrument(level = Level::TRACE, skip_all, fields(tx = %tx.hash()))]
pub fn validate<C, P>(context: &C, pool: &P, tx: &Transaction) -> Result<Accepted, InvalidTransaction>
where
    C: ValidationContext,
    P: PoolSlice,
{
    let hash = tx.hash();

    // Checks needing only committed chain state.
    transaction::execute(context, tx)?;

    if tx.is_coinbase() {
        return Err(InvalidTransaction::CoinbaseTransaction);
    }
    if !is_standard(tx) {
        return Err(InvalidTransaction::NotStandard);
    }
    if pool.is_in_pool(&hash) {
        return Err(InvalidTransaction::Duplicate(hash));
    }
    if context.fetch_transaction(&hash).is_some() {
        return Err(InvalidTransaction::Duplicate(hash));
    }
    if pool.is_spent_in_pool(tx) {
        return Err(InvalidTransaction::DoubleSpend);
    }

    let last_height = context.fetch_last_height();
    let mut ledger = InputLedger::default();
    let mut unconfirmed = Vec::new();

    for (index, input) in tx.inputs.iter().enumerate() {
        let index = index as u32;
        let previous_hash = &input.previous_output.hash;

        let (previous_tx, parent_height) = match context.fetch_transaction_index(previous_hash) {
            Some(parent_height) => {
                let previous_tx = context
                    .fetch_transaction(previous_hash)
                    .ok_or(InvalidTransaction::InputNotFound { index })?;
                (previous_tx, parent_height)
            }
            None => {
                // Single fallback: the parent may still be pending. Pooled
                // parents cannot be coinbase, so the sentinel height 0 never
                // meets the maturity path.
                let previous_tx = pool
                    .find(previous_hash)
                    .ok_or(InvalidTransaction::InputNotFound { index })?;
                trace!(index, "previous transaction resolved from the pool");
                unconfirmed.push(index);
                (previous_tx, 0)
            }
        };

        connect::execute(
            context,
            tx,
            index,
            &previous_tx,
            parent_height,
            last_height,
            &mut ledger,
        )
        .map_err(|violation| InvalidTransaction::Inputs { index, violation })?;

        if context.fetch_spend(&input.previous_output).is_some() {
            return Err(InvalidTransaction::DoubleSpend);
        }
    }

    settlement::execute(tx, &ledger)?;

    Ok(Accepted {
        transaction: tx.clone(),
        unconfirmed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::fake::{FakeChain, FakePool},
        rules::transaction::{InvalidSettlement, InvalidStructure},
        tests::*,
    };
    use meridian_kernel::{
        Address, CertKind, CertStatus, Hash32, OutputPoint, Script, COINBASE_MATURITY,
        MIN_TX_FEE,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn confirmed(funding: &Transaction) -> FakeChain {
        FakeChain::default()
            .with_height(200)
            .with_transaction(funding.clone(), 100)
    }

    fn funding_of(value: u64) -> Transaction {
        tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![pay(ALICE, value)],
        )
    }

    #[test]
    fn admits_a_plain_payment() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);

        let accepted = validate(&confirmed(&funding), &FakePool::default(), &payment)
            .expect("a funded payment validates");
        assert_eq!(accepted.transaction, payment);
        assert_eq!(accepted.unconfirmed, Vec::<u32>::new());
    }

    #[test]
    fn fee_exactly_at_the_minimum_passes() {
        let funding = funding_of(20_000);
        let payment = tx(
            vec![spend(funding.hash(), 0)],
            vec![pay(BOB, 20_000 - MIN_TX_FEE)],
        );
        assert!(validate(&confirmed(&funding), &FakePool::default(), &payment).is_ok());
    }

    #[test]
    fn fee_one_below_the_minimum_fails() {
        let funding = funding_of(20_000);
        let payment = tx(
            vec![spend(funding.hash(), 0)],
            vec![pay(BOB, 20_000 - MIN_TX_FEE + 1)],
        );
        assert!(matches!(
            validate(&confirmed(&funding), &FakePool::default(), &payment),
            Err(InvalidTransaction::Settlement(
                InvalidSettlement::FeesOutOfRange { .. }
            ))
        ));
    }

    #[test]
    fn duplicate_on_chain_short_circuits_input_resolution() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);

        // the chain knows the payment itself but NOT its funding: a
        // duplicate wins over input resolution
        let chain = FakeChain::default()
            .with_height(200)
            .with_transaction(payment.clone(), 150);
        assert!(matches!(
            validate(&chain, &FakePool::default(), &payment),
            Err(InvalidTransaction::Duplicate(hash)) if hash == payment.hash()
        ));
    }

    #[test]
    fn duplicate_in_pool() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        let pool = FakePool::default().with_transaction(payment.clone());
        assert!(matches!(
            validate(&confirmed(&funding), &pool, &payment),
            Err(InvalidTransaction::Duplicate(_))
        ));
    }

    #[test]
    fn double_spend_against_the_pool() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        let pool = FakePool::default().with_spent(OutputPoint::new(funding.hash(), 0));
        assert!(matches!(
            validate(&confirmed(&funding), &pool, &payment),
            Err(InvalidTransaction::DoubleSpend)
        ));
    }

    #[test]
    fn double_spend_against_the_chain() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        let chain = confirmed(&funding).with_spend(
            OutputPoint::new(funding.hash(), 0),
            OutputPoint::new(Hash32::from([9; 32]), 0),
        );
        assert!(matches!(
            validate(&chain, &FakePool::default(), &payment),
            Err(InvalidTransaction::DoubleSpend)
        ));
    }

    #[test]
    fn missing_previous_transaction_names_the_input() {
        let funding = funding_of(20_000);
        let orphan = tx(
            vec![
                spend(funding.hash(), 0),
                spend(Hash32::from([77; 32]), 0), // nowhere to be found
            ],
            vec![pay(BOB, 9_000)],
        );
        assert!(matches!(
            validate(&confirmed(&funding), &FakePool::default(), &orphan),
            Err(InvalidTransaction::InputNotFound { index: 1 })
        ));
    }

    #[test]
    fn a_body_without_a_confirmed_height_does_not_resolve() {
        // the store may know a body the chain index has not confirmed; only
        // the pool can vouch for such a parent
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        let chain = FakeChain::default()
            .with_height(200)
            .with_unconfirmed_transaction(funding);
        assert!(matches!(
            validate(&chain, &FakePool::default(), &payment),
            Err(InvalidTransaction::InputNotFound { index: 0 })
        ));
    }

    #[test]
    fn pooled_parents_are_reported_as_unconfirmed_dependencies() {
        let confirmed_funding = funding_of(20_000);
        let pooled_funding = tx(
            vec![spend(Hash32::from([43; 32]), 0)],
            vec![pay(ALICE, 30_000)],
        );
        let payment = tx(
            vec![
                spend(confirmed_funding.hash(), 0),
                spend(pooled_funding.hash(), 0),
            ],
            vec![pay(BOB, 30_000)],
        );

        let chain = confirmed(&confirmed_funding);
        let pool = FakePool::default().with_transaction(pooled_funding);
        let accepted = validate(&chain, &pool, &payment).expect("pool fallback resolves");
        assert_eq!(accepted.unconfirmed, vec![1]);
    }

    #[test]
    fn coinbase_maturity_boundary() {
        let minted = coinbase(ALICE, 50_000);
        let payment = tx(vec![spend(minted.hash(), 0)], vec![pay(BOB, 9_000)]);

        // one short of maturity
        let chain = FakeChain::default()
            .with_height(100 + COINBASE_MATURITY - 1)
            .with_transaction(minted.clone(), 100);
        assert!(matches!(
            validate(&chain, &FakePool::default(), &payment),
            Err(InvalidTransaction::Inputs {
                index: 0,
                violation: ConnectError::CoinbaseImmature { .. }
            })
        ));

        // exactly mature
        let chain = FakeChain::default()
            .with_height(100 + COINBASE_MATURITY)
            .with_transaction(minted, 100);
        assert!(validate(&chain, &FakePool::default(), &payment).is_ok());
    }

    #[test]
    fn coinbase_transactions_are_not_admissible() {
        let minted = coinbase(ALICE, 50_000);
        assert!(matches!(
            validate(
                &FakeChain::default().with_height(100),
                &FakePool::default(),
                &minted
            ),
            Err(InvalidTransaction::CoinbaseTransaction)
        ));
    }

    #[test]
    fn script_verification_failure_names_the_input() {
        let mut funding = funding_of(20_000);
        funding.outputs[0].script = Script::Raw(vec![0xde, 0xad]); // oracle rejects
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        assert!(matches!(
            validate(&confirmed(&funding), &FakePool::default(), &payment),
            Err(InvalidTransaction::Inputs {
                index: 0,
                violation: ConnectError::ScriptVerificationFailed
            })
        ));
    }

    #[test]
    fn disagreeing_asset_symbols_fail_at_the_second_input() {
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![
                transfer_output("GOLD", 500, ALICE),
                transfer_output("SILVER", 500, ALICE),
                pay(ALICE, 30_000),
            ],
        );
        let payment = tx(
            vec![
                spend(funding.hash(), 0),
                spend(funding.hash(), 1),
                spend(funding.hash(), 2),
            ],
            vec![transfer_output("GOLD", 1_000, BOB), pay(BOB, 10_000)],
        );
        assert!(matches!(
            validate(&confirmed(&funding), &FakePool::default(), &payment),
            Err(InvalidTransaction::Inputs {
                index: 1,
                violation: ConnectError::SymbolMismatch { .. }
            })
        ));
    }

    #[test]
    fn agreeing_inputs_validate_in_any_order() {
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![
                transfer_output("GOLD", 300, ALICE),
                transfer_output("GOLD", 200, ALICE),
                pay(ALICE, 30_000),
            ],
        );
        let chain = confirmed(&funding);

        let forward = tx(
            vec![
                spend(funding.hash(), 0),
                spend(funding.hash(), 1),
                spend(funding.hash(), 2),
            ],
            vec![transfer_output("GOLD", 500, BOB), pay(BOB, 10_000)],
        );
        let reversed = tx(
            vec![
                spend(funding.hash(), 2),
                spend(funding.hash(), 1),
                spend(funding.hash(), 0),
            ],
            vec![transfer_output("GOLD", 500, BOB), pay(BOB, 10_000)],
        );

        assert!(validate(&chain, &FakePool::default(), &forward).is_ok());
        assert!(validate(&chain, &FakePool::default(), &reversed).is_ok());
    }

    #[test]
    fn asset_transfer_amounts_must_balance() {
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![transfer_output("GOLD", 500, ALICE), pay(ALICE, 30_000)],
        );
        let shortchanged = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 1)],
            vec![transfer_output("GOLD", 400, BOB), pay(BOB, 10_000)],
        );
        assert!(matches!(
            validate(&confirmed(&funding), &FakePool::default(), &shortchanged),
            Err(InvalidTransaction::Settlement(
                InvalidSettlement::AssetAmountNotEqual {
                    amount_in: 500,
                    amount_out: 400
                }
            ))
        ));
    }

    #[test]
    fn business_kind_follows_the_last_input() {
        // a certificate input followed by an asset input: the asset
        // settlement path governs, the certificate equality is not enforced
        let chain = FakeChain::default()
            .with_height(200)
            .with_did("alice", Address::from(ALICE));
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![
                cert_output("GOLD", "alice", ALICE, CertKind::Issue, CertStatus::Normal),
                transfer_output("GOLD", 500, ALICE),
                pay(ALICE, 30_000),
            ],
        );
        let chain = chain.with_transaction(funding.clone(), 100);
        let payment = tx(
            vec![
                spend(funding.hash(), 0),
                spend(funding.hash(), 1),
                spend(funding.hash(), 2),
            ],
            vec![transfer_output("GOLD", 500, BOB), pay(BOB, 10_000)],
        );
        assert!(validate(&chain, &FakePool::default(), &payment).is_ok());
    }

    #[test]
    fn certificate_transfers_settle_by_set_equality() {
        let chain = FakeChain::default()
            .with_height(200)
            .with_did("alice", Address::from(ALICE));
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![
                cert_output("GOLD", "alice", ALICE, CertKind::Issue, CertStatus::Normal),
                pay(ALICE, 30_000),
            ],
        );
        let chain = chain.with_transaction(funding.clone(), 100);

        let moved = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 1)],
            vec![
                cert_output("GOLD", "alice", BOB, CertKind::Issue, CertStatus::Normal),
                pay(BOB, 10_000),
            ],
        );
        assert!(validate(&chain, &FakePool::default(), &moved).is_ok());

        let dropped = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 1)],
            vec![pay(BOB, 10_000)],
        );
        assert!(matches!(
            validate(&chain, &FakePool::default(), &dropped),
            Err(InvalidTransaction::Settlement(
                InvalidSettlement::AssetCertError
            ))
        ));
    }

    #[test]
    fn token_transfers_move_exactly_one_token() {
        let funding = tx(
            vec![spend(Hash32::from([42; 32]), 0)],
            vec![mit_transfer_output("ticket-001", ALICE), pay(ALICE, 30_000)],
        );
        let chain = confirmed(&funding);

        let moved = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 1)],
            vec![mit_transfer_output("ticket-001", BOB), pay(BOB, 10_000)],
        );
        assert!(validate(&chain, &FakePool::default(), &moved).is_ok());

        let split = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 1)],
            vec![
                mit_transfer_output("ticket-001", BOB),
                mit_transfer_output("ticket-001", ALICE),
                pay(BOB, 10_000),
            ],
        );
        assert!(matches!(
            validate(&chain, &FakePool::default(), &split),
            Err(InvalidTransaction::Settlement(InvalidSettlement::MitError))
        ));
    }

    #[test]
    fn identity_transfer_through_the_pipeline() {
        let register = tx(
            vec![spend(Hash32::from([12; 32]), 0)],
            vec![did_register_output("alice", ALICE)],
        );
        let funding = tx(
            vec![spend(Hash32::from([13; 32]), 0)],
            vec![pay(BOB, 30_000)],
        );
        let chain = FakeChain::default()
            .with_height(200)
            .with_transaction(register.clone(), 100)
            .with_transaction(funding.clone(), 100)
            .with_did("alice", Address::from(ALICE));

        let transfer = tx(
            vec![spend(register.hash(), 0), spend(funding.hash(), 0)],
            vec![did_transfer_output("alice", BOB), pay(BOB, 15_000)],
        );
        assert!(validate(&chain, &FakePool::default(), &transfer).is_ok());
    }

    #[test]
    fn validation_is_idempotent() {
        let funding = funding_of(20_000);
        let payment = tx(vec![spend(funding.hash(), 0)], vec![pay(BOB, 9_000)]);
        let chain = confirmed(&funding);
        let pool = FakePool::default();

        let first = validate(&chain, &pool, &payment).expect("validates");
        let second = validate(&chain, &pool, &payment).expect("still validates");
        assert_eq!(first, second);

        let orphan = tx(
            vec![spend(Hash32::from([77; 32]), 0)],
            vec![pay(BOB, 9_000)],
        );
        assert!(matches!(
            validate(&chain, &pool, &orphan),
            Err(InvalidTransaction::InputNotFound { index: 0 })
        ));
        assert!(matches!(
            validate(&chain, &pool, &orphan),
            Err(InvalidTransaction::InputNotFound { index: 0 })
        ));
    }

    #[test]
    fn structural_failures_surface_before_resolution() {
        let empty = tx(vec![spend(Hash32::from([1; 32]), 0)], vec![]);
        assert!(matches!(
            validate(
                &FakeChain::default().with_height(100),
                &FakePool::default(),
                &empty
            ),
            Err(InvalidTransaction::Structure(
                InvalidStructure::EmptyTransaction
            ))
        ));
    }

    proptest! {
        #[test]
        fn value_is_conserved_or_rejected(output_value in 1u64..40_000) {
            let funding = funding_of(30_000);
            let payment = tx(
                vec![spend(funding.hash(), 0)],
                vec![pay(BOB, output_value)],
            );
            let outcome = validate(&confirmed(&funding), &FakePool::default(), &payment);
            if output_value + MIN_TX_FEE <= 30_000 {
                prop_assert!(outcome.is_ok());
            } else {
                let is_fees_out_of_range = matches!(
                    outcome,
                    Err(InvalidTransaction::Settlement(InvalidSettlement::FeesOutOfRange { .. }))
                );
                prop_assert!(is_fees_out_of_range);
            }
        }
    }
}
