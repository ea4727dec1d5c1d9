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

use crate::{admission::{BusinessKind, InputLedger}, rules::observe_same};
use meridian_kernel::{CertKind, CertSet, CertStatus, Mer, Symbol, Transaction, MAX_MONEY, MIN_TX_FEE};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidSettlement {
    #[error("fees out of range: {value_in} in, {value_out} out")]
    FeesOutOfRange { value_in: Mer, value_out: Mer },

    #[error("asset amount out ({amount_out}) differs from amount in ({amount_in})")]
    AssetAmountNotEqual { amount_in: u64, amount_out: u64 },

    #[error("asset symbol in outputs does not match the inputs")]
    AssetSymbolNotMatch,

    #[error("certificates out of the transaction disagree with its inputs")]
    AssetCertError,

    #[error("token transfer must move exactly one matching token")]
    MitError,

    #[error("identity symbol in outputs does not match the inputs")]
    DidSymbolNotMatch,
}

/// Runs once every input has resolved: the fee tally first, then the
/// input/output agreement check matching the accumulated business kind.
pub fn execute(tx: &Transaction, ledger: &InputLedger) -> Result<(), InvalidSettlement> {
    tally_fees(tx, ledger.value_in)?;

    match ledger.business_kind {
        BusinessKind::AssetIssue | BusinessKind::AssetTransfer => {
            if tx.has_asset_transfer() {
                let amount_in = ledger.asset_amount_in;
                let amount_out = tx.total_asset_transfer_amount();
                if amount_in != amount_out {
                    return Err(InvalidSettlement::AssetAmountNotEqual {
                        amount_in,
                        amount_out,
                    });
                }
                if !check_asset_symbol(tx, &ledger.symbol) {
                    return Err(InvalidSettlement::AssetSymbolNotMatch);
                }
            }
        }
        BusinessKind::AssetCert => {
            if !check_asset_certs(tx, &ledger.certs_in, &ledger.symbol) {
                debug!("certificate settlement failed");
                return Err(InvalidSettlement::AssetCertError);
            }
        }
        BusinessKind::AssetMit => {
            if !check_asset_mit(tx, &ledger.symbol) {
                debug!("token settlement failed");
                return Err(InvalidSettlement::MitError);
            }
        }
        BusinessKind::DidRegister | BusinessKind::DidTransfer => {
            if tx.has_did_transfer() && !check_did_symbol(tx, &ledger.symbol) {
                return Err(InvalidSettlement::DidSymbolNotMatch);
            }
        }
        BusinessKind::Currency => {}
    }

    Ok(())
}

fn tally_fees(tx: &Transaction, value_in: Mer) -> Result<(), InvalidSettlement> {
    let value_out = tx.total_output_value();
    let out_of_range = InvalidSettlement::FeesOutOfRange {
        value_in,
        value_out,
    };

    if value_in < value_out {
        return Err(out_of_range);
    }
    let fee = value_in - value_out;
    if fee < MIN_TX_FEE || fee > MAX_MONEY {
        return Err(out_of_range);
    }
    Ok(())
}

/// Every asset symbol in the outputs must be the one established by the
/// inputs.
fn check_asset_symbol(tx: &Transaction, symbol_in: &Option<Symbol>) -> bool {
    let mut symbol_out: Option<Symbol> = None;
    for output in &tx.outputs {
        if let Some(symbol) = output.asset_symbol() {
            if !observe_same(&mut symbol_out, symbol) {
                return false;
            }
        }
    }
    &symbol_out == symbol_in
}

/// Certificate agreement: no duplicated kinds among the outputs, symbols
/// under the established one (domain inputs compare against the domain
/// component), single-certificate cardinality when a transfer is under way,
/// and set equality between the two sides.
fn check_asset_certs(tx: &Transaction, certs_in: &CertSet, symbol_in: &Option<Symbol>) -> bool {
    let mut is_cert_transfer = false;
    let mut certs_out = CertSet::default();

    for output in &tx.outputs {
        if let Some(cert) = output.cert() {
            if cert.status == CertStatus::Transferred {
                is_cert_transfer = true;
            }
            if !certs_out.insert(cert.kind) {
                return false;
            }

            if certs_in.contains(CertKind::Domain) {
                let covers = cert
                    .symbol
                    .domain()
                    .zip(symbol_in.as_ref())
                    .is_some_and(|(domain, symbol)| domain.matches(symbol));
                if !covers {
                    return false;
                }
            } else if symbol_in.as_ref() != Some(&cert.symbol) {
                return false;
            }
        } else if output.asset_symbol().is_some() {
            // asset outputs may ride along with their certificates
            continue;
        } else if !output.is_currency() && !output.is_message() {
            return false;
        }
    }

    if is_cert_transfer && (certs_in.len() != 1 || certs_out.len() != 1) {
        debug!(
            certs_in = certs_in.len(),
            certs_out = certs_out.len(),
            "transfer cert: cardinality violated"
        );
        return false;
    }

    certs_out.same_as(certs_in)
}

/// Exactly one token transfer output, matching the established symbol, and
/// nothing but currency or messages besides it.
fn check_asset_mit(tx: &Transaction, symbol_in: &Option<Symbol>) -> bool {
    let mut num_transfers = 0usize;
    for output in &tx.outputs {
        if output.is_mit_transfer() {
            num_transfers += 1;
            if num_transfers > 1 {
                return false;
            }
            if output.mit_symbol() != symbol_in.as_ref() {
                return false;
            }
        } else if !output.is_currency() && !output.is_message() {
            return false;
        }
    }
    num_transfers == 1
}

fn check_did_symbol(tx: &Transaction, symbol_in: &Option<Symbol>) -> bool {
    let mut symbol_out: Option<Symbol> = None;
    for output in &tx.outputs {
        if let Some(symbol) = output.did_symbol() {
            if !observe_same(&mut symbol_out, symbol) {
                return false;
            }
        }
    }
    &symbol_out == symbol_in
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use meridian_kernel::Hash32;

    fn ledger(kind: BusinessKind) -> InputLedger {
        InputLedger {
            value_in: 100_000,
            asset_amount_in: 0,
            certs_in: CertSet::default(),
            symbol: None,
            business_kind: kind,
        }
    }

    fn currency_tx(output_value: u64) -> meridian_kernel::Transaction {
        tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![pay(BOB, output_value)],
        )
    }

    #[test]
    fn fee_at_the_minimum_passes() {
        let ledger = ledger(BusinessKind::Currency);
        assert!(execute(&currency_tx(90_000), &ledger).is_ok());
    }

    #[test]
    fn fee_one_below_the_minimum_fails() {
        let ledger = ledger(BusinessKind::Currency);
        assert!(matches!(
            execute(&currency_tx(90_001), &ledger),
            Err(InvalidSettlement::FeesOutOfRange { .. })
        ));
    }

    #[test]
    fn inputs_below_outputs_fail() {
        let ledger = ledger(BusinessKind::Currency);
        assert!(matches!(
            execute(&currency_tx(150_000), &ledger),
            Err(InvalidSettlement::FeesOutOfRange { .. })
        ));
    }

    #[test]
    fn asset_amounts_must_balance() {
        let mut ledger = ledger(BusinessKind::AssetTransfer);
        ledger.asset_amount_in = 500;
        ledger.symbol = Some(Symbol::from("GOLD"));

        let balanced = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![transfer_output("GOLD", 500, BOB), pay(ALICE, 50_000)],
        );
        assert!(execute(&balanced, &ledger).is_ok());

        let short = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![transfer_output("GOLD", 400, BOB), pay(ALICE, 50_000)],
        );
        assert!(matches!(
            execute(&short, &ledger),
            Err(InvalidSettlement::AssetAmountNotEqual {
                amount_in: 500,
                amount_out: 400
            })
        ));
    }

    #[test]
    fn asset_symbols_must_agree_between_sides() {
        let mut ledger = ledger(BusinessKind::AssetTransfer);
        ledger.asset_amount_in = 500;
        ledger.symbol = Some(Symbol::from("GOLD"));

        let renamed = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![transfer_output("SILVER", 500, BOB)],
        );
        assert!(matches!(
            execute(&renamed, &ledger),
            Err(InvalidSettlement::AssetSymbolNotMatch)
        ));
    }

    #[test]
    fn cert_sets_must_be_equal() {
        use meridian_kernel::CertStatus;
        let mut ledger = ledger(BusinessKind::AssetCert);
        ledger.symbol = Some(Symbol::from("GOLD"));
        ledger.certs_in = [CertKind::Issue].into_iter().collect();

        let matching = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![cert_output(
                "GOLD",
                "alice",
                BOB,
                CertKind::Issue,
                CertStatus::Normal,
            )],
        );
        assert!(execute(&matching, &ledger).is_ok());

        let dropped = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![pay(BOB, 10_000)],
        );
        assert!(matches!(
            execute(&dropped, &ledger),
            Err(InvalidSettlement::AssetCertError)
        ));

        let wrong_kind = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![cert_output(
                "GOLD",
                "alice",
                BOB,
                CertKind::Naming,
                CertStatus::Normal,
            )],
        );
        assert!(matches!(
            execute(&wrong_kind, &ledger),
            Err(InvalidSettlement::AssetCertError)
        ));
    }

    #[test]
    fn transferring_a_cert_moves_exactly_one() {
        use meridian_kernel::CertStatus;
        let mut ledger = ledger(BusinessKind::AssetCert);
        ledger.symbol = Some(Symbol::from("GOLD"));
        ledger.certs_in = [CertKind::Issue, CertKind::Naming].into_iter().collect();

        let transfer = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![
                cert_output("GOLD", "bob", BOB, CertKind::Issue, CertStatus::Transferred),
                cert_output("GOLD", "bob", BOB, CertKind::Naming, CertStatus::Normal),
            ],
        );
        assert!(matches!(
            execute(&transfer, &ledger),
            Err(InvalidSettlement::AssetCertError)
        ));
    }

    #[test]
    fn domain_cert_inputs_compare_against_the_domain() {
        use meridian_kernel::CertStatus;
        let mut ledger = ledger(BusinessKind::AssetCert);
        // a domain cert input established the dotted symbol's domain
        ledger.symbol = Some(Symbol::from("PRAGMA"));
        ledger.certs_in = [CertKind::Domain].into_iter().collect();

        let under_domain = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![cert_output(
                "PRAGMA.GOLD",
                "alice",
                BOB,
                CertKind::Domain,
                CertStatus::Normal,
            )],
        );
        assert!(execute(&under_domain, &ledger).is_ok());

        let foreign = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![cert_output(
                "OTHER.GOLD",
                "alice",
                BOB,
                CertKind::Domain,
                CertStatus::Normal,
            )],
        );
        assert!(matches!(
            execute(&foreign, &ledger),
            Err(InvalidSettlement::AssetCertError)
        ));
    }

    #[test]
    fn token_transfer_cardinality() {
        let mut ledger = ledger(BusinessKind::AssetMit);
        ledger.symbol = Some(Symbol::from("ticket-001"));

        let single = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![mit_transfer_output("ticket-001", BOB), pay(ALICE, 10_000)],
        );
        assert!(execute(&single, &ledger).is_ok());

        let double = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![
                mit_transfer_output("ticket-001", BOB),
                mit_transfer_output("ticket-001", ALICE),
            ],
        );
        assert!(matches!(
            execute(&double, &ledger),
            Err(InvalidSettlement::MitError)
        ));

        let none = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![pay(BOB, 10_000)],
        );
        assert!(matches!(
            execute(&none, &ledger),
            Err(InvalidSettlement::MitError)
        ));
    }

    #[test]
    fn identity_transfer_symbol_must_match() {
        let mut ledger = ledger(BusinessKind::DidTransfer);
        ledger.symbol = Some(Symbol::from("alice"));

        let matching = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![did_transfer_output("alice", BOB)],
        );
        assert!(execute(&matching, &ledger).is_ok());

        let renamed = tx(
            vec![spend(Hash32::from([1; 32]), 0)],
            vec![did_transfer_output("mallory", BOB)],
        );
        assert!(matches!(
            execute(&renamed, &ledger),
            Err(InvalidSettlement::DidSymbolNotMatch)
        ));
    }
}
