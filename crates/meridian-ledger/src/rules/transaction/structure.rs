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

use crate::context::{is_nova_feature_activated, ChainSlice, RegistrySlice};
use meridian_kernel::{
    is_scheduled_lock_height, is_valid_asset_symbol, is_valid_did_symbol, is_valid_mit_symbol,
    transaction_version, Mer, Script, Symbol, Transaction, MAX_MONEY, MAX_TRANSACTION_SIZE,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvalidStructure {
    #[error("transaction version {0} not recognized")]
    VersionUnknown(u32),

    #[error("nova feature set not activated at the current height")]
    NovaFeatureNotActivated,

    #[error("transaction version {0} is only valid under testnet rules")]
    TestnetOnlyVersion(u32),

    #[error("non-standard script in output #{position}")]
    ScriptNotStandard { position: usize },

    #[error("transaction has no inputs or no outputs")]
    EmptyTransaction,

    #[error("serialized size {size} exceeds the {limit} limit")]
    SizeLimits { size: usize, limit: usize },

    #[error("output values overflow the maximum money supply")]
    OutputValueOverflow,

    #[error("invalid asset symbol {0}")]
    AssetSymbolInvalid(Symbol),

    #[error("certificate owner {0} is not a registered identity")]
    CertOwnerNotRegistered(String),

    #[error("invalid identity symbol {0}")]
    DidSymbolInvalid(Symbol),

    #[error("invalid token symbol {0}")]
    MitSymbolInvalid(Symbol),

    #[error("invalid attachment in output #{position}")]
    AttachmentInvalid { position: usize },

    #[error("coinbase script size {size} out of the 2..=100 range")]
    InvalidCoinbaseScriptSize { size: usize },

    #[error("input #{position} references a null previous output")]
    PreviousOutputNull { position: usize },

    #[error("previous transaction for input #{position} not found")]
    InputNotFound { position: usize },

    #[error("input #{position} spends a height-locked output too early")]
    InvalidInputScriptLockHeight { position: usize },

    #[error("output #{position} declares a lock height outside the schedule")]
    InvalidOutputScriptLockHeight { position: usize },

    #[error("attenuation model parameter rejected for output #{position}")]
    AttenuationModelParam { position: usize },
}

/// The checks independent of per-input resolution, in fixed order; the first
/// failure wins.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidStructure>
where
    C: ChainSlice + RegistrySlice,
{
    check_version(context, tx)?;

    if tx.version >= transaction_version::CHECK_OUTPUT_SCRIPT {
        for (position, output) in tx.outputs.iter().enumerate() {
            if !output.script.pattern().is_standard() {
                return Err(InvalidStructure::ScriptNotStandard { position });
            }
        }
    }

    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(InvalidStructure::EmptyTransaction);
    }

    let size = tx.serialized_size();
    if size > MAX_TRANSACTION_SIZE {
        return Err(InvalidStructure::SizeLimits {
            size,
            limit: MAX_TRANSACTION_SIZE,
        });
    }

    // Overflow-safe running sum: every partial sum has to stay below the
    // money cap, not just the final total.
    let mut total_output_value: Mer = 0;
    for output in &tx.outputs {
        if output.value > MAX_MONEY {
            return Err(InvalidStructure::OutputValueOverflow);
        }
        total_output_value = total_output_value
            .checked_add(output.value)
            .filter(|total| *total <= MAX_MONEY)
            .ok_or(InvalidStructure::OutputValueOverflow)?;
    }

    check_output_symbols(context, tx)?;

    if tx.version >= transaction_version::CHECK_NOVA_FEATURE {
        for (position, output) in tx.outputs.iter().enumerate() {
            if !output.attachment.is_valid() {
                return Err(InvalidStructure::AttachmentInvalid { position });
            }
        }
    }

    if tx.is_coinbase() {
        let size = tx.inputs[0].script.serialized_size();
        if !(2..=100).contains(&size) {
            return Err(InvalidStructure::InvalidCoinbaseScriptSize { size });
        }
        return Ok(());
    }

    for (position, input) in tx.inputs.iter().enumerate() {
        if input.previous_output.is_null() {
            return Err(InvalidStructure::PreviousOutputNull { position });
        }
    }

    for (position, input) in tx.inputs.iter().enumerate() {
        if let Script::SignKeyHashWithLockHeight { lock_height, .. } = &input.script {
            let current_height = context.fetch_last_height();
            let (_, parent_height) = context
                .get_transaction(&input.previous_output.hash)
                .ok_or(InvalidStructure::InputNotFound { position })?;
            if *lock_height > current_height.saturating_sub(parent_height) {
                return Err(InvalidStructure::InvalidInputScriptLockHeight { position });
            }
        }
    }

    for (position, output) in tx.outputs.iter().enumerate() {
        if let Script::PayKeyHashWithLockHeight { lock_height, .. } = &output.script {
            if !is_scheduled_lock_height(*lock_height) {
                return Err(InvalidStructure::InvalidOutputScriptLockHeight { position });
            }
        }
    }

    if tx.version >= transaction_version::CHECK_NOVA_FEATURE {
        for (position, output) in tx.outputs.iter().enumerate() {
            if let Some(model) = output.script.attenuation() {
                // The schedule decays the asset riding on this output.
                let supply = output.asset_amount();
                if supply == 0 || !model.check_model_param(supply) {
                    return Err(InvalidStructure::AttenuationModelParam { position });
                }
            }
        }
    }

    Ok(())
}

fn check_version<C>(context: &C, tx: &Transaction) -> Result<(), InvalidStructure>
where
    C: ChainSlice + RegistrySlice,
{
    if tx.version >= transaction_version::MAX {
        return Err(InvalidStructure::VersionUnknown(tx.version));
    }
    if tx.version == transaction_version::CHECK_NOVA_FEATURE && !is_nova_feature_activated(context)
    {
        return Err(InvalidStructure::NovaFeatureNotActivated);
    }
    if tx.version == transaction_version::CHECK_NOVA_TESTNET && !context.use_testnet_rules() {
        return Err(InvalidStructure::TestnetOnlyVersion(tx.version));
    }
    Ok(())
}

fn check_output_symbols<C>(context: &C, tx: &Transaction) -> Result<(), InvalidStructure>
where
    C: RegistrySlice,
{
    for output in &tx.outputs {
        if output.is_asset_issue() {
            let symbol = output.asset_symbol().cloned().unwrap_or_default();
            if !is_valid_asset_symbol(&symbol, tx.version) {
                return Err(InvalidStructure::AssetSymbolInvalid(symbol));
            }
        } else if let Some(cert) = output.cert() {
            if !context.is_did_exist(&cert.owner) {
                return Err(InvalidStructure::CertOwnerNotRegistered(cert.owner.clone()));
            }
        } else if output.is_did_register() {
            let symbol = output.did_symbol().cloned().unwrap_or_default();
            if !is_valid_did_symbol(&symbol, !context.use_testnet_rules()) {
                return Err(InvalidStructure::DidSymbolInvalid(symbol));
            }
        } else if output.is_mit_register() {
            let symbol = output.mit_symbol().cloned().unwrap_or_default();
            if !is_valid_mit_symbol(&symbol) {
                return Err(InvalidStructure::MitSymbolInvalid(symbol));
            }
        }
    }
    Ok(())
}
