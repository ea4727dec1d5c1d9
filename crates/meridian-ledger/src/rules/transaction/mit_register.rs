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
    context::{ChainSlice, RegistrySlice},
    rules::observe_same,
};
use meridian_kernel::{Address, Symbol, Transaction};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidMitRegister {
    #[error("token registrations disagree on address")]
    RegisterAddressMismatch,

    #[error("token {0} is already registered")]
    TokenAlreadyExists(Symbol),

    #[error("output kind not allowed in a token registration")]
    IllegalOutput,

    #[error("previous transaction for input #{position} not found")]
    InputNotFound { position: usize },

    #[error("input #{position} pays the fee from a foreign address")]
    FeePayerMismatch { position: usize },
}

/// Applies only when the transaction registers immutable tokens. A batch of
/// registrations shares one address, each token must be new, and every
/// currency input has to come from that same address: the fee payer is the
/// registrant.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidMitRegister>
where
    C: ChainSlice + RegistrySlice,
{
    if !tx.outputs.iter().any(|output| output.is_mit_register()) {
        return Ok(());
    }

    let mut register_address: Option<Address> = None;

    for output in &tx.outputs {
        if output.is_mit_register() {
            let symbol = output.mit_symbol().cloned().unwrap_or_default();
            let address = output.script_address().cloned().unwrap_or_else(|| Address::from(""));
            if !observe_same(&mut register_address, &address) {
                debug!(%symbol, "register token: addresses differ");
                return Err(InvalidMitRegister::RegisterAddressMismatch);
            }
            if context.is_mit_exist(&symbol) {
                debug!(%symbol, "register token: already registered");
                return Err(InvalidMitRegister::TokenAlreadyExists(symbol));
            }
        } else if !output.is_currency() && !output.is_message() {
            return Err(InvalidMitRegister::IllegalOutput);
        }
    }

    for (position, input) in tx.inputs.iter().enumerate() {
        let (previous_tx, _) = context
            .get_transaction(&input.previous_output.hash)
            .ok_or(InvalidMitRegister::InputNotFound { position })?;
        let Some(previous_output) = previous_tx
            .outputs
            .get(input.previous_output.index as usize)
        else {
            return Err(InvalidMitRegister::InputNotFound { position });
        };

        if previous_output.is_currency()
            && previous_output.script_address() != register_address.as_ref()
        {
            debug!(position, "register token: fee paid from a foreign address");
            return Err(InvalidMitRegister::FeePayerMismatch { position });
        }
    }

    Ok(())
}
