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
use meridian_kernel::{
    secondary_issue_owns_enough, transaction_version, Address, CertKind, Symbol, Transaction,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidSecondaryIssue {
    #[error("more than one secondary issue in one transaction")]
    MultipleSecondaryIssueOutputs,

    #[error("reissue threshold closed or out of range")]
    ThresholdInvalid,

    #[error("secondary-issue outputs disagree on symbol or address")]
    DetailMismatch,

    #[error("attenuation model parameter rejected")]
    AttenuationModelParam,

    #[error("more than one certificate output")]
    MultipleCerts,

    #[error("only an issue certificate may accompany a secondary issue")]
    IllegalCert,

    #[error("output kind not allowed in a secondary issue")]
    IllegalOutput,

    #[error("no issue certificate provided")]
    IssueCertMissing,

    #[error("total volume of {0} would overflow")]
    VolumeOverflow(Symbol),

    #[error("reissuer does not hold enough of {0}")]
    ShareNotEnough(Symbol),

    #[error("previous transaction for input #{position} not found")]
    InputNotFound { position: usize },

    #[error("input #{position} spends the asset from a foreign address")]
    AssetInputMismatch { position: usize },

    #[error("input #{position} spends an unrelated certificate")]
    CertInputMismatch { position: usize },
}

/// Applies only when the transaction reissues an asset. The reissuer must
/// place enough of the current supply on the inputs to clear the asset's
/// declared threshold, and every asset or certificate input must belong to
/// the reissued symbol.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidSecondaryIssue>
where
    C: ChainSlice + RegistrySlice,
{
    if !tx.outputs.iter().any(|output| output.is_asset_secondary_issue()) {
        return Ok(());
    }

    let mut num_secondary_issue = 0;
    let mut num_certs = 0;
    let mut threshold = 0u8;
    let mut reissued_volume = 0u64;
    let mut transfer_volume = 0u64;
    let mut has_issue_cert = false;
    let mut asset_symbol: Option<Symbol> = None;
    let mut asset_address: Option<Address> = None;
    let mut cert_owner: Option<String> = None;

    for output in &tx.outputs {
        if output.is_asset_secondary_issue() {
            num_secondary_issue += 1;
            if num_secondary_issue > 1 {
                debug!("secondary issue: more than one reissue output");
                return Err(InvalidSecondaryIssue::MultipleSecondaryIssueOutputs);
            }

            let Some(detail) = output.asset_detail() else {
                return Err(InvalidSecondaryIssue::DetailMismatch);
            };
            if detail.secondary_issue_threshold == 0 || !detail.is_threshold_valid() {
                return Err(InvalidSecondaryIssue::ThresholdInvalid);
            }
            if !observe_same(&mut asset_symbol, &detail.symbol)
                || !observe_same(&mut asset_address, &detail.address)
            {
                return Err(InvalidSecondaryIssue::DetailMismatch);
            }
            if let Some(model) = output.script.attenuation() {
                if !model.check_model_param(detail.maximum_supply) {
                    debug!(symbol = %detail.symbol, "secondary issue: model param invalid");
                    return Err(InvalidSecondaryIssue::AttenuationModelParam);
                }
            }
            threshold = detail.secondary_issue_threshold;
            reissued_volume = detail.maximum_supply;
        } else if output.is_asset_transfer() {
            let symbol = output.asset_symbol().cloned().unwrap_or_default();
            if !observe_same(&mut asset_symbol, &symbol) {
                return Err(InvalidSecondaryIssue::DetailMismatch);
            }
            let address = output.script_address().cloned().unwrap_or_else(|| Address::from(""));
            if !observe_same(&mut asset_address, &address) {
                return Err(InvalidSecondaryIssue::DetailMismatch);
            }
            transfer_volume = transfer_volume.saturating_add(output.asset_amount());
        } else if let Some(cert) = output.cert() {
            num_certs += 1;
            if num_certs > 1 {
                return Err(InvalidSecondaryIssue::MultipleCerts);
            }
            if cert.kind != CertKind::Issue {
                debug!("secondary issue: invalid certificate output");
                return Err(InvalidSecondaryIssue::IllegalCert);
            }
            if !observe_same(&mut asset_symbol, &cert.symbol)
                || !observe_same(&mut cert_owner, &cert.owner)
            {
                return Err(InvalidSecondaryIssue::DetailMismatch);
            }
            has_issue_cert = true;
        } else if !output.is_currency() && !output.is_message() {
            debug!("secondary issue: illegal output kind");
            return Err(InvalidSecondaryIssue::IllegalOutput);
        }
    }

    if tx.version >= transaction_version::CHECK_NOVA_FEATURE && !has_issue_cert {
        return Err(InvalidSecondaryIssue::IssueCertMissing);
    }

    let symbol = asset_symbol.unwrap_or_default();
    let total_volume = context.asset_total_supply(&symbol);
    if total_volume > u64::MAX - reissued_volume {
        return Err(InvalidSecondaryIssue::VolumeOverflow(symbol));
    }

    if !secondary_issue_owns_enough(transfer_volume, total_volume, threshold) {
        debug!(%symbol, transfer_volume, total_volume, "secondary issue: not enough volume");
        return Err(InvalidSecondaryIssue::ShareNotEnough(symbol));
    }

    // Asset and certificate inputs must come from the reissued symbol, and
    // the asset inputs from the established address.
    for (position, input) in tx.inputs.iter().enumerate() {
        let (previous_tx, _) = context
            .get_transaction(&input.previous_output.hash)
            .ok_or(InvalidSecondaryIssue::InputNotFound { position })?;
        let Some(previous_output) = previous_tx
            .outputs
            .get(input.previous_output.index as usize)
        else {
            return Err(InvalidSecondaryIssue::InputNotFound { position });
        };

        if let Some(cert) = previous_output.cert() {
            if cert.symbol != symbol || cert.kind != CertKind::Issue {
                return Err(InvalidSecondaryIssue::CertInputMismatch { position });
            }
        } else if previous_output.is_asset() {
            if previous_output.script_address() != asset_address.as_ref() {
                return Err(InvalidSecondaryIssue::AssetInputMismatch { position });
            }
        }
    }

    Ok(())
}
