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

use crate::{context::RegistrySlice, rules::observe_same};
use meridian_kernel::{
    transaction_version, Address, CertKind, CertSet, Symbol, Transaction,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidAssetIssue {
    #[error("more than one asset issued in one transaction")]
    MultipleIssueOutputs,

    #[error("secondary-issue threshold out of range")]
    ThresholdInvalid,

    #[error("issue details disagree on symbol or address")]
    DetailMismatch,

    #[error("asset {0} already exists")]
    AssetAlreadyExists(Symbol),

    #[error("attenuation model parameter rejected")]
    AttenuationModelParam,

    #[error("more than one {0:?} certificate accompanies the issue")]
    DuplicateCert(CertKind),

    #[error("accompanying certificate does not match the issue")]
    CertMismatch,

    #[error("output kind not allowed in an issue transaction")]
    IllegalOutput,

    #[error("certificates do not satisfy the asset's declared mask")]
    CertMaskNotSatisfied,

    #[error("certificate owner missing for domain {0}")]
    CertOwnerMissing(String),

    #[error("no domain or naming certificate provided")]
    CertNotProvided,
}

/// Applies only when the transaction issues an asset; scans the outputs and
/// cross-checks the accompanying certificates.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidAssetIssue>
where
    C: RegistrySlice,
{
    if !tx.outputs.iter().any(|output| output.is_asset_issue()) {
        return Ok(());
    }

    let mut seen_issue = false;
    let mut num_cert_issue = 0;
    let mut num_cert_domain_or_naming = 0;
    let mut cert_mask: Vec<CertKind> = Vec::new();
    let mut certs = CertSet::default();
    let mut asset_symbol: Option<Symbol> = None;
    let mut asset_address: Option<Address> = None;
    let mut cert_owner: Option<String> = None;

    for output in &tx.outputs {
        if let Some(detail) = output.asset_detail().filter(|_| output.is_asset_issue()) {
            if seen_issue {
                return Err(InvalidAssetIssue::MultipleIssueOutputs);
            }
            seen_issue = true;

            if !detail.is_threshold_valid() {
                return Err(InvalidAssetIssue::ThresholdInvalid);
            }
            if !observe_same(&mut asset_symbol, &detail.symbol) {
                return Err(InvalidAssetIssue::DetailMismatch);
            }
            if !observe_same(&mut asset_address, &detail.address) {
                return Err(InvalidAssetIssue::DetailMismatch);
            }
            if context.is_asset_exist(&detail.symbol) {
                return Err(InvalidAssetIssue::AssetAlreadyExists(detail.symbol.clone()));
            }
            if let Some(model) = output.script.attenuation() {
                if !model.check_model_param(detail.maximum_supply) {
                    debug!(symbol = %detail.symbol, "issue: model param invalid");
                    return Err(InvalidAssetIssue::AttenuationModelParam);
                }
            }
            cert_mask = detail.cert_mask.clone();
        } else if let Some(cert) = output.cert() {
            match cert.kind {
                CertKind::Issue => {
                    num_cert_issue += 1;
                    if num_cert_issue > 1 {
                        return Err(InvalidAssetIssue::DuplicateCert(CertKind::Issue));
                    }
                    if !observe_same(&mut asset_symbol, &cert.symbol) {
                        return Err(InvalidAssetIssue::CertMismatch);
                    }
                    let script_address = output.script_address().cloned().unwrap_or_else(|| Address::from(""));
                    if !observe_same(&mut asset_address, &script_address) {
                        return Err(InvalidAssetIssue::CertMismatch);
                    }
                }
                CertKind::Domain => {
                    num_cert_domain_or_naming += 1;
                    if num_cert_domain_or_naming > 1 {
                        return Err(InvalidAssetIssue::DuplicateCert(CertKind::Domain));
                    }
                    if let Some(symbol) = &asset_symbol {
                        let under_domain = symbol
                            .domain()
                            .is_some_and(|domain| domain.matches(&cert.symbol));
                        if !under_domain {
                            return Err(InvalidAssetIssue::CertMismatch);
                        }
                    }
                    if !observe_same(&mut cert_owner, &cert.owner) {
                        return Err(InvalidAssetIssue::CertMismatch);
                    }
                }
                CertKind::Naming => {
                    num_cert_domain_or_naming += 1;
                    if num_cert_domain_or_naming > 1 {
                        return Err(InvalidAssetIssue::DuplicateCert(CertKind::Naming));
                    }
                    if !observe_same(&mut asset_symbol, &cert.symbol) {
                        return Err(InvalidAssetIssue::CertMismatch);
                    }
                    if !observe_same(&mut cert_owner, &cert.owner) {
                        return Err(InvalidAssetIssue::CertMismatch);
                    }
                }
            }
            certs.insert(cert.kind);
        } else if !output.is_currency() && !output.is_message() {
            debug!("issue: illegal output kind");
            return Err(InvalidAssetIssue::IllegalOutput);
        }
    }

    // Certificate companions are mandatory from the nova version onward.
    if tx.version >= transaction_version::CHECK_NOVA_FEATURE {
        if !certs.contains_all(&cert_mask) {
            return Err(InvalidAssetIssue::CertMaskNotSatisfied);
        }

        if let Some(domain) = asset_symbol.as_ref().and_then(Symbol::domain) {
            match &cert_owner {
                None => {
                    return Err(InvalidAssetIssue::CertOwnerMissing(domain.to_string()));
                }
                Some(owner) if owner.is_empty() => {
                    return Err(InvalidAssetIssue::CertOwnerMissing(domain.to_string()));
                }
                Some(_) => {}
            }
            if num_cert_domain_or_naming < 1 {
                return Err(InvalidAssetIssue::CertNotProvided);
            }
        }
    }

    Ok(())
}
