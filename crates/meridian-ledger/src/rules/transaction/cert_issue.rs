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
use meridian_kernel::{CertKind, Symbol, Transaction};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidCertIssue {
    #[error("more than one certificate issued in one transaction")]
    MultipleIssueOutputs,

    #[error("issued certificates disagree on symbol")]
    SymbolMismatch,

    #[error("certificate {symbol} ({kind:?}) already exists")]
    CertAlreadyExists { symbol: Symbol, kind: CertKind },

    #[error("domain certificate without a naming issue")]
    RedundantDomainCert,

    #[error("more than one domain certificate")]
    MultipleDomainCerts,

    #[error("domain certificate does not cover the issued symbol")]
    DomainMismatch,

    #[error("certificate owner {0} is not a registered identity")]
    OwnerNotRegistered(String),

    #[error("certificate address does not match its owner's identity")]
    OwnerAddressMismatch,

    #[error("output kind not allowed in a certificate issue")]
    IllegalOutput,

    #[error("no domain certificate provided to issue a naming certificate")]
    DomainCertMissing,

    #[error("asset {0} already exists")]
    AssetAlreadyExists(Symbol),
}

/// Applies only when the transaction issues a certificate. A companion
/// domain certificate is allowed solely while issuing a naming certificate,
/// and must be owned by a registered identity at the matching address.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidCertIssue>
where
    C: RegistrySlice,
{
    if !tx.outputs.iter().any(|output| output.is_asset_cert_issue()) {
        return Ok(());
    }

    let mut num_cert_issue = 0;
    let mut num_cert_domain = 0;
    let mut issued_kind: Option<CertKind> = None;
    let mut has_domain_companion = false;
    let mut cert_symbol: Option<Symbol> = None;
    let mut cert_owner: Option<String> = None;

    for output in &tx.outputs {
        if let Some(cert) = output.cert() {
            if output.is_asset_cert_issue() {
                num_cert_issue += 1;
                if num_cert_issue > 1 {
                    return Err(InvalidCertIssue::MultipleIssueOutputs);
                }
                if !observe_same(&mut cert_symbol, &cert.symbol) {
                    debug!(symbol = %cert.symbol, "issue cert: symbol does not match");
                    return Err(InvalidCertIssue::SymbolMismatch);
                }
                if context.is_cert_exist(&cert.symbol, cert.kind) {
                    debug!(symbol = %cert.symbol, "issue cert: already exists");
                    return Err(InvalidCertIssue::CertAlreadyExists {
                        symbol: cert.symbol.clone(),
                        kind: cert.kind,
                    });
                }
                issued_kind = Some(cert.kind);
            } else {
                // Companion certificates: only a domain cert, and only while
                // issuing a naming cert.
                if cert.kind != CertKind::Domain {
                    debug!("issue cert: invalid companion certificate");
                    return Err(InvalidCertIssue::IllegalOutput);
                }
                if issued_kind != Some(CertKind::Naming) {
                    return Err(InvalidCertIssue::RedundantDomainCert);
                }
                num_cert_domain += 1;
                if num_cert_domain > 1 {
                    return Err(InvalidCertIssue::MultipleDomainCerts);
                }
                if let Some(symbol) = &cert_symbol {
                    let covers = symbol
                        .domain()
                        .is_some_and(|domain| domain.matches(&cert.symbol));
                    if !covers {
                        return Err(InvalidCertIssue::DomainMismatch);
                    }
                }
                cert_owner = Some(cert.owner.clone());
                match context.registered_did_address(&cert.owner) {
                    None => {
                        return Err(InvalidCertIssue::OwnerNotRegistered(cert.owner.clone()));
                    }
                    Some(bound) if bound != cert.address => {
                        return Err(InvalidCertIssue::OwnerAddressMismatch);
                    }
                    Some(_) => {}
                }
                has_domain_companion = true;
            }
        } else if !output.is_currency() && !output.is_message() {
            return Err(InvalidCertIssue::IllegalOutput);
        }
    }

    if issued_kind == Some(CertKind::Naming) {
        if !has_domain_companion || cert_owner.as_deref().unwrap_or("").is_empty() {
            return Err(InvalidCertIssue::DomainCertMissing);
        }
        if let Some(symbol) = &cert_symbol {
            if context.is_asset_exist(symbol) {
                return Err(InvalidCertIssue::AssetAlreadyExists(symbol.clone()));
            }
        }
    }

    Ok(())
}
