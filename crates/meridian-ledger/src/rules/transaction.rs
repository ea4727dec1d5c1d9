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

use crate::{admission::connect::ConnectError, context::ValidationContext};
use meridian_kernel::{Hash32, Transaction};
use thiserror::Error;

pub mod structure;
pub use structure::InvalidStructure;

pub mod asset_issue;
pub use asset_issue::InvalidAssetIssue;

pub mod cert_issue;
pub use cert_issue::InvalidCertIssue;

pub mod secondary_issue;
pub use secondary_issue::InvalidSecondaryIssue;

pub mod mit_register;
pub use mit_register::InvalidMitRegister;

pub mod identity;
pub use identity::InvalidIdentity;

pub mod settlement;
pub use settlement::InvalidSettlement;

#[derive(Debug, Error)]
pub enum InvalidTransaction {
    #[error("invalid structure: {0}")]
    Structure(#[from] InvalidStructure),

    #[error("invalid asset issue: {0}")]
    AssetIssue(#[from] InvalidAssetIssue),

    #[error("invalid certificate issue: {0}")]
    CertIssue(#[from] InvalidCertIssue),

    #[error("invalid secondary issue: {0}")]
    SecondaryIssue(#[from] InvalidSecondaryIssue),

    #[error("invalid token registration: {0}")]
    MitRegister(#[from] InvalidMitRegister),

    #[error("invalid identity: {0}")]
    Identity(#[from] InvalidIdentity),

    #[error("coinbase transactions are not admissible to the pool")]
    CoinbaseTransaction,

    #[error("transaction is not standard")]
    NotStandard,

    #[error("transaction {0} already known")]
    Duplicate(Hash32),

    #[error("an input's previous output is already spent")]
    DoubleSpend,

    #[error("previous transaction for input #{index} not found")]
    InputNotFound { index: u32 },

    #[error("input #{index} failed to connect: {violation}")]
    Inputs { index: u32, violation: ConnectError },

    #[error("invalid settlement: {0}")]
    Settlement(#[from] InvalidSettlement),
}

/// The checks that only need committed chain state: structure first, then
/// each business family in turn. First failure wins.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidTransaction>
where
    C: ValidationContext,
{
    structure::execute(context, tx)?;
    asset_issue::execute(context, tx)?;
    cert_issue::execute(context, tx)?;
    secondary_issue::execute(context, tx)?;
    mit_register::execute(context, tx)?;
    identity::execute(context, tx)?;
    Ok(())
}
