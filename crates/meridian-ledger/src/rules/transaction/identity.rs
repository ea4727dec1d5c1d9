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

use crate::context::{ChainSlice, RegistrySlice};
use meridian_kernel::{
    Address, DidDetail, Output, Symbol, Transaction, DID_ATTACH_VERIFY_VERSION,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvalidIdentity {
    #[error("identity output address does not match its locking script")]
    AttachmentAddressMismatch,

    #[error("output does not pay to the address bound to {0}")]
    ToIdentityMismatch(String),

    #[error("no input originates from the address bound to {0}")]
    FromIdentityNotTraceable(String),

    #[error("identity symbol {0} collides with an address")]
    SymbolIsAddress(Symbol),

    #[error("identity {0} already exists")]
    AlreadyExists(Symbol),

    #[error("identity {0} does not exist")]
    NotExist(Symbol),

    #[error("address {0} is already bound to an identity")]
    AddressAlreadyBound(Address),

    #[error("more than one identity operation in one transaction")]
    MultipleIdentityOutputs,

    #[error("inputs do not connect to the identity operation")]
    InputsNotConnected,

    #[error("declared owner does not match the attachment's identity")]
    OwnerIdentityMismatch,
}

/// Identity rules run over every output: the attachment envelope checks
/// apply to all payload kinds, the register/transfer rules to identity
/// outputs, and the ownership agreement to versioned asset and certificate
/// outputs.
pub fn execute<C>(context: &C, tx: &Transaction) -> Result<(), InvalidIdentity>
where
    C: ChainSlice + RegistrySlice,
{
    let mut seen_identity_output = false;

    for output in &tx.outputs {
        check_attachment_address(output)?;
        check_to_identity(context, output)?;
        check_from_identity(context, tx, output)?;

        if output.is_did_register() {
            let Some(detail) = did_detail(output) else {
                continue;
            };
            if context.is_valid_address(detail.symbol.as_str()) {
                return Err(InvalidIdentity::SymbolIsAddress(detail.symbol.clone()));
            }
            if context.is_did_exist(detail.symbol.as_str()) {
                return Err(InvalidIdentity::AlreadyExists(detail.symbol.clone()));
            }
            if context.is_address_registered_did(&detail.address) {
                return Err(InvalidIdentity::AddressAlreadyBound(detail.address.clone()));
            }
            if seen_identity_output {
                return Err(InvalidIdentity::MultipleIdentityOutputs);
            }
            seen_identity_output = true;

            if !connect_did_input(context, tx, detail, false) {
                return Err(InvalidIdentity::InputsNotConnected);
            }
        } else if output.is_did_transfer() {
            let Some(detail) = did_detail(output) else {
                continue;
            };
            if !context.is_did_exist(detail.symbol.as_str()) {
                return Err(InvalidIdentity::NotExist(detail.symbol.clone()));
            }
            if context.is_address_registered_did(&detail.address) {
                return Err(InvalidIdentity::AddressAlreadyBound(detail.address.clone()));
            }
            if seen_identity_output {
                return Err(InvalidIdentity::MultipleIdentityOutputs);
            }
            seen_identity_output = true;

            if !connect_did_input(context, tx, detail, true) {
                return Err(InvalidIdentity::InputsNotConnected);
            }
        } else if output.is_asset_issue() || output.is_asset_secondary_issue() {
            if output.attachment.version == DID_ATTACH_VERIFY_VERSION {
                let issuer = output.asset_detail().map(|detail| detail.issuer.as_str());
                if issuer != output.attachment.to_did.as_deref() {
                    debug!("asset issuer does not match the attachment identity");
                    return Err(InvalidIdentity::OwnerIdentityMismatch);
                }
            }
        } else if let Some(cert) = output.cert() {
            if output.attachment.version == DID_ATTACH_VERIFY_VERSION
                && Some(cert.owner.as_str()) != output.attachment.to_did.as_deref()
            {
                debug!("certificate owner does not match the attachment identity");
                return Err(InvalidIdentity::OwnerIdentityMismatch);
            }
        }
    }

    Ok(())
}

fn did_detail(output: &Output) -> Option<&DidDetail> {
    match &output.attachment.payload {
        meridian_kernel::AttachmentPayload::DidRegister(detail)
        | meridian_kernel::AttachmentPayload::DidTransfer(detail) => Some(detail),
        meridian_kernel::AttachmentPayload::None
        | meridian_kernel::AttachmentPayload::Message(_)
        | meridian_kernel::AttachmentPayload::AssetIssue(_)
        | meridian_kernel::AttachmentPayload::AssetSecondaryIssue(_)
        | meridian_kernel::AttachmentPayload::AssetTransfer(_)
        | meridian_kernel::AttachmentPayload::AssetCert(_)
        | meridian_kernel::AttachmentPayload::MitRegister(_)
        | meridian_kernel::AttachmentPayload::MitTransfer(_) => None,
    }
}

/// Identity outputs must lock funds at the very address they declare.
fn check_attachment_address(output: &Output) -> Result<(), InvalidIdentity> {
    if let Some(detail) = did_detail(output) {
        if output.script_address() != Some(&detail.address) {
            return Err(InvalidIdentity::AttachmentAddressMismatch);
        }
    }
    Ok(())
}

/// Strong check: a versioned attachment naming a receiving identity must pay
/// to that identity's bound address. Identity outputs themselves must name
/// the identity they carry.
fn check_to_identity<C>(context: &C, output: &Output) -> Result<(), InvalidIdentity>
where
    C: RegistrySlice,
{
    if output.attachment.version != DID_ATTACH_VERIFY_VERSION {
        return Ok(());
    }
    let Some(to_did) = output.attachment.to_did.as_deref() else {
        return Ok(());
    };

    if let Some(detail) = did_detail(output) {
        if detail.symbol.as_str() != to_did {
            return Err(InvalidIdentity::ToIdentityMismatch(to_did.to_owned()));
        }
        return Ok(());
    }

    match context.registered_did_address(to_did) {
        Some(bound) if Some(&bound) == output.script_address() => Ok(()),
        _ => Err(InvalidIdentity::ToIdentityMismatch(to_did.to_owned())),
    }
}

/// Weak check: a declared sending identity must be traceable to an address
/// spent by one of the inputs.
fn check_from_identity<C>(
    context: &C,
    tx: &Transaction,
    output: &Output,
) -> Result<(), InvalidIdentity>
where
    C: ChainSlice + RegistrySlice,
{
    let Some(from_did) = output.attachment.from_did.as_deref() else {
        return Ok(());
    };

    for input in &tx.inputs {
        let Some((previous_tx, _)) = context.get_transaction(&input.previous_output.hash) else {
            return Err(InvalidIdentity::FromIdentityNotTraceable(
                from_did.to_owned(),
            ));
        };
        let previous_output = previous_tx
            .outputs
            .get(input.previous_output.index as usize);
        let address = previous_output.and_then(Output::script_address);
        if let Some(address) = address {
            if context.did_from_address(address).as_deref() == Some(from_did) {
                return Ok(());
            }
        }
    }

    Err(InvalidIdentity::FromIdentityNotTraceable(
        from_did.to_owned(),
    ))
}

/// Input connection for identity operations: registering requires funds from
/// the declared address; transferring requires exactly two inputs, one
/// spending the identity's previous output and one spending currency at the
/// declared address.
fn connect_did_input<C>(context: &C, tx: &Transaction, detail: &DidDetail, transfer: bool) -> bool
where
    C: ChainSlice,
{
    if transfer && tx.inputs.len() != 2 {
        return false;
    }

    let mut found_identity = false;
    let mut found_address = false;

    for input in &tx.inputs {
        let Some((previous_tx, _)) = context.get_transaction(&input.previous_output.hash) else {
            return false;
        };
        let Some(previous_output) = previous_tx
            .outputs
            .get(input.previous_output.index as usize)
        else {
            return false;
        };

        if previous_output.is_did() {
            if transfer && previous_output.did_symbol() == Some(&detail.symbol) {
                found_identity = true;
            }
        } else if previous_output.is_currency()
            && previous_output.script_address() == Some(&detail.address)
        {
            found_address = true;
        }
    }

    if transfer {
        found_identity && found_address
    } else {
        found_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::fake::FakeChain, tests::*};
    use meridian_kernel::Hash32;

    fn funding(address: &str) -> meridian_kernel::Transaction {
        tx(
            vec![spend(Hash32::from([11; 32]), 0)],
            vec![pay(address, 100_000)],
        )
    }

    fn chain_with(funding_tx: &meridian_kernel::Transaction) -> FakeChain {
        FakeChain::default()
            .with_height(100)
            .with_transaction(funding_tx.clone(), 50)
    }

    #[test]
    fn accepts_a_register_funded_from_its_own_address() {
        let funding = funding(ALICE);
        let register = tx(
            vec![spend(funding.hash(), 0)],
            vec![did_register_output("alice", ALICE), pay(ALICE, 50_000)],
        );
        assert!(execute(&chain_with(&funding), &register).is_ok());
    }

    #[test]
    fn register_requires_funds_from_the_declared_address() {
        let funding = funding(BOB);
        let register = tx(
            vec![spend(funding.hash(), 0)],
            vec![did_register_output("alice", ALICE)],
        );
        assert!(matches!(
            execute(&chain_with(&funding), &register),
            Err(InvalidIdentity::InputsNotConnected)
        ));
    }

    #[test]
    fn register_rejects_symbols_that_are_addresses() {
        let funding = funding(ALICE);
        let register = tx(
            vec![spend(funding.hash(), 0)],
            vec![did_register_output("alice", ALICE)],
        );
        let chain = chain_with(&funding).with_valid_address("alice");
        assert!(matches!(
            execute(&chain, &register),
            Err(InvalidIdentity::SymbolIsAddress(_))
        ));
    }

    #[test]
    fn register_rejects_existing_identities_and_bound_addresses() {
        let funding = funding(ALICE);
        let register = tx(
            vec![spend(funding.hash(), 0)],
            vec![did_register_output("alice", ALICE)],
        );

        let taken = chain_with(&funding).with_did("alice", Address::from(BOB));
        assert!(matches!(
            execute(&taken, &register),
            Err(InvalidIdentity::AlreadyExists(_))
        ));

        let bound = chain_with(&funding).with_did("carol", Address::from(ALICE));
        assert!(matches!(
            execute(&bound, &register),
            Err(InvalidIdentity::AddressAlreadyBound(_))
        ));
    }

    #[test]
    fn identity_output_must_lock_at_the_declared_address() {
        let funding = funding(ALICE);
        let mut register = tx(
            vec![spend(funding.hash(), 0)],
            vec![did_register_output("alice", ALICE)],
        );
        register.outputs[0].script = meridian_kernel::Script::PayKeyHash {
            address: Address::from(BOB),
        };
        assert!(matches!(
            execute(&chain_with(&funding), &register),
            Err(InvalidIdentity::AttachmentAddressMismatch)
        ));
    }

    #[test]
    fn transfer_requires_exactly_two_connected_inputs() {
        // alice's identity sits on a previous register output
        let register = tx(
            vec![spend(Hash32::from([12; 32]), 0)],
            vec![did_register_output("alice", ALICE)],
        );
        let funding = funding(BOB);
        let chain = FakeChain::default()
            .with_height(100)
            .with_transaction(register.clone(), 40)
            .with_transaction(funding.clone(), 50)
            .with_did("alice", Address::from(ALICE));

        // moving the identity to bob's address with both required inputs
        let transfer = tx(
            vec![spend(register.hash(), 0), spend(funding.hash(), 0)],
            vec![did_transfer_output("alice", BOB)],
        );
        assert!(execute(&chain, &transfer).is_ok());

        // a single input cannot connect a transfer
        let underfunded = tx(
            vec![spend(register.hash(), 0)],
            vec![did_transfer_output("alice", BOB)],
        );
        assert!(matches!(
            execute(&chain, &underfunded),
            Err(InvalidIdentity::InputsNotConnected)
        ));
    }

    #[test]
    fn transfer_requires_the_identity_to_exist() {
        let funding = funding(BOB);
        let transfer = tx(
            vec![spend(funding.hash(), 0), spend(funding.hash(), 0)],
            vec![did_transfer_output("alice", BOB)],
        );
        assert!(matches!(
            execute(&chain_with(&funding), &transfer),
            Err(InvalidIdentity::NotExist(_))
        ));
    }

    #[test]
    fn versioned_issue_must_name_its_issuer() {
        let funding = funding(ALICE);
        // both identities resolve to the issuing address, so only the
        // issuer/identity agreement can fail
        let chain = chain_with(&funding)
            .with_did("alice", Address::from(ALICE))
            .with_did("mallory", Address::from(ALICE));

        let mut issue = tx(
            vec![spend(funding.hash(), 0)],
            vec![issue_output("GOLD", "alice", ALICE, 1_000)],
        );
        issue.outputs[0].attachment.version = DID_ATTACH_VERIFY_VERSION;
        issue.outputs[0].attachment.to_did = Some("mallory".to_owned());
        assert!(matches!(
            execute(&chain, &issue),
            Err(InvalidIdentity::OwnerIdentityMismatch)
        ));

        issue.outputs[0].attachment.to_did = Some("alice".to_owned());
        assert!(execute(&chain, &issue).is_ok());
    }

    #[test]
    fn versioned_payment_must_pay_the_named_identity() {
        let funding = funding(ALICE);
        let mut payment = tx(
            vec![spend(funding.hash(), 0)],
            vec![pay(BOB, 50_000)],
        );
        payment.outputs[0].attachment.version = DID_ATTACH_VERIFY_VERSION;
        payment.outputs[0].attachment.to_did = Some("bob".to_owned());

        assert!(matches!(
            execute(&chain_with(&funding), &payment),
            Err(InvalidIdentity::ToIdentityMismatch(_))
        ));

        let chain = chain_with(&funding).with_did("bob", Address::from(BOB));
        assert!(execute(&chain, &payment).is_ok());
    }

    #[test]
    fn from_identity_must_trace_to_an_input() {
        let funding = funding(ALICE);
        let mut payment = tx(
            vec![spend(funding.hash(), 0)],
            vec![pay(BOB, 50_000)],
        );
        payment.outputs[0].attachment.version = DID_ATTACH_VERIFY_VERSION;
        payment.outputs[0].attachment.from_did = Some("alice".to_owned());
        payment.outputs[0].attachment.to_did = Some("bob".to_owned());

        let chain = chain_with(&funding)
            .with_did("bob", Address::from(BOB))
            .with_did("alice", Address::from(ALICE));
        assert!(execute(&chain, &payment).is_ok());

        // alice's identity bound elsewhere: the spent input no longer traces
        let chain = chain_with(&funding)
            .with_did("bob", Address::from(BOB))
            .with_did("alice", Address::from("MElsewhere"));
        assert!(matches!(
            execute(&chain, &payment),
            Err(InvalidIdentity::FromIdentityNotTraceable(_))
        ));
    }
}
