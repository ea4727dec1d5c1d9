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

use crate::{
    admission::{BusinessKind, InputLedger},
    context::ValidationContext,
    rules::observe_same,
};
use meridian_kernel::{
    is_forbidden_symbol, script_flags, CertKind, Symbol, Transaction, COINBASE_MATURITY, MAX_MONEY,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("previous output index {index} out of bounds")]
    PreviousOutputOutOfBounds { index: u32 },

    #[error("previous output value exceeds the maximum money supply")]
    OutputValueOverflow,

    #[error("symbol {found} differs from the established {expected}")]
    SymbolMismatch { expected: Symbol, found: Symbol },

    #[error("certificate does not sit under the established domain")]
    DomainMismatch,

    #[error("duplicate {0:?} certificate among the inputs")]
    DuplicateCert(CertKind),

    #[error("coinbase output spent {confirmations} confirmations after minting")]
    CoinbaseImmature { confirmations: u64 },

    #[error("symbol {0} is reserved")]
    ForbiddenSymbol(Symbol),

    #[error("consensus script verification failed")]
    ScriptVerificationFailed,

    #[error("accumulated input value exceeds the maximum money supply")]
    ValueInOverflow,
}

/// Connects one input to its resolved previous output: bounds and value
/// range, business classification into the ledger, coinbase maturity,
/// reserved symbols, consensus script verification, and finally the value
/// accumulation.
///
/// Classification is last-writer-wins across inputs: the final input's kind
/// governs the settlement checks.
pub(crate) fn execute<C>(
    context: &C,
    tx: &Transaction,
    input_index: u32,
    previous_tx: &Transaction,
    parent_height: u64,
    last_height: u64,
    ledger: &mut InputLedger,
) -> Result<(), ConnectError>
where
    C: ValidationContext,
{
    let previous_outpoint = &tx.inputs[input_index as usize].previous_output;
    let previous_output = previous_tx
        .outputs
        .get(previous_outpoint.index as usize)
        .ok_or(ConnectError::PreviousOutputOutOfBounds {
            index: previous_outpoint.index,
        })?;

    if previous_output.value > MAX_MONEY {
        debug!("previous output value exceeds the money supply");
        return Err(ConnectError::OutputValueOverflow);
    }

    let mut asset_amount = 0u64;
    let mut incoming_cert: Option<CertKind> = None;

    if previous_output.is_asset() {
        asset_amount = previous_output.asset_amount();

        if let Some(symbol) = previous_output.asset_symbol().filter(|s| !s.is_empty()) {
            if !observe_same(&mut ledger.symbol, symbol) {
                return Err(mismatch(&ledger.symbol, symbol));
            }
        }

        if previous_output.is_asset_issue() || previous_output.is_asset_secondary_issue() {
            ledger.business_kind = BusinessKind::AssetIssue;
        } else if previous_output.is_asset_transfer() {
            ledger.business_kind = BusinessKind::AssetTransfer;
        }
    } else if let Some(cert) = previous_output.cert() {
        ledger.business_kind = BusinessKind::AssetCert;

        if let Some(established) = &ledger.symbol {
            if ledger.certs_in.contains(CertKind::Domain) {
                // with a domain cert on board, later certs are keyed by the
                // domain component of the established symbol
                let covers = established
                    .domain()
                    .is_some_and(|domain| domain.matches(&cert.symbol));
                if !covers {
                    return Err(ConnectError::DomainMismatch);
                }
            } else if established != &cert.symbol {
                return Err(mismatch(&ledger.symbol, &cert.symbol));
            }
        } else {
            ledger.symbol = Some(cert.symbol.clone());
        }

        if ledger.certs_in.contains(cert.kind) {
            return Err(ConnectError::DuplicateCert(cert.kind));
        }
        incoming_cert = Some(cert.kind);
    } else if previous_output.is_mit() {
        ledger.business_kind = BusinessKind::AssetMit;

        if let Some(symbol) = previous_output.mit_symbol() {
            if !observe_same(&mut ledger.symbol, symbol) {
                return Err(mismatch(&ledger.symbol, symbol));
            }
        }
    } else if previous_output.is_did() {
        if let Some(symbol) = previous_output.did_symbol().filter(|s| !s.is_empty()) {
            if !observe_same(&mut ledger.symbol, symbol) {
                return Err(mismatch(&ledger.symbol, symbol));
            }
        }

        if previous_output.is_did_register() {
            ledger.business_kind = BusinessKind::DidRegister;
        } else if previous_output.is_did_transfer() {
            ledger.business_kind = BusinessKind::DidTransfer;
        }
    }

    if previous_tx.is_coinbase() {
        let confirmations = last_height.saturating_sub(parent_height);
        if confirmations < COINBASE_MATURITY {
            return Err(ConnectError::CoinbaseImmature { confirmations });
        }
    }

    if previous_output.is_asset() {
        if let Some(symbol) = previous_output.asset_symbol() {
            if is_forbidden_symbol(symbol) {
                return Err(ConnectError::ForbiddenSymbol(symbol.clone()));
            }
        }
    }

    if !context.verify_script(
        &previous_output.script,
        tx,
        input_index,
        script_flags::ALL_ENABLED,
    ) {
        debug!(input_index, "consensus script verification failed");
        return Err(ConnectError::ScriptVerificationFailed);
    }

    ledger.value_in = ledger
        .value_in
        .checked_add(previous_output.value)
        .filter(|total| *total <= MAX_MONEY)
        .ok_or(ConnectError::ValueInOverflow)?;
    ledger.asset_amount_in = ledger.asset_amount_in.saturating_add(asset_amount);
    if let Some(kind) = incoming_cert {
        ledger.certs_in.insert(kind);
    }

    Ok(())
}

fn mismatch(expected: &Option<Symbol>, found: &Symbol) -> ConnectError {
    ConnectError::SymbolMismatch {
        expected: expected.clone().unwrap_or_default(),
        found: found.clone(),
    }
}
