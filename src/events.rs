// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event descriptors and the signature registry used to resolve them.
//!
//! A raw 32-byte event signature on its own cannot be decoded or matched to a
//! contract event; validation requires the structured shape behind it. The
//! registry is an explicitly constructed, immutable lookup table injected into
//! the validator at construction time. A caller-supplied override map, when
//! present, replaces the registry for the lookup entirely.

use std::collections::HashMap;

use ethers::abi::{long_signature, ParamType};
use ethers::types::H256;
use once_cell::sync::Lazy;

use crate::error::{ValidationError, ValidationResult};

/// One parameter of an event's declared shape.
#[derive(Debug, Clone, PartialEq)]
pub struct EventParam {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
}

impl EventParam {
    pub fn new(name: impl Into<String>, kind: ParamType, indexed: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed,
        }
    }
}

/// Structured description of an event's name and typed fields, keyed in the
/// registry by its computed signature hash.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDescriptor {
    pub name: String,
    pub params: Vec<EventParam>,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<EventParam>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// The 32-byte topic0 hash identifying this event's shape.
    pub fn signature(&self) -> H256 {
        let kinds: Vec<ParamType> = self.params.iter().map(|p| p.kind.clone()).collect();
        long_signature(&self.name, &kinds)
    }

    pub fn indexed_params(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| p.indexed)
    }
}

fn param(name: &str, kind: ParamType, indexed: bool) -> EventParam {
    EventParam::new(name, kind, indexed)
}

// Standard-interface events most action steps reference. Keyed by computed
// signature so the table cannot drift from the declared shapes.
static WELL_KNOWN_EVENTS: Lazy<HashMap<H256, EventDescriptor>> = Lazy::new(|| {
    let descriptors = vec![
        // ERC-20 and ERC-721 share this signature; indexing follows the 721
        // shape so the third topic stays addressable by criteria
        EventDescriptor::new(
            "Transfer",
            vec![
                param("from", ParamType::Address, true),
                param("to", ParamType::Address, true),
                param("tokenId", ParamType::Uint(256), true),
            ],
        ),
        EventDescriptor::new(
            "Approval",
            vec![
                param("owner", ParamType::Address, true),
                param("spender", ParamType::Address, true),
                param("value", ParamType::Uint(256), true),
            ],
        ),
        EventDescriptor::new(
            "ApprovalForAll",
            vec![
                param("owner", ParamType::Address, true),
                param("operator", ParamType::Address, true),
                param("approved", ParamType::Bool, false),
            ],
        ),
        // ERC-1155
        EventDescriptor::new(
            "TransferSingle",
            vec![
                param("operator", ParamType::Address, true),
                param("from", ParamType::Address, true),
                param("to", ParamType::Address, true),
                param("id", ParamType::Uint(256), false),
                param("value", ParamType::Uint(256), false),
            ],
        ),
        EventDescriptor::new(
            "TransferBatch",
            vec![
                param("operator", ParamType::Address, true),
                param("from", ParamType::Address, true),
                param("to", ParamType::Address, true),
                param("ids", ParamType::Array(Box::new(ParamType::Uint(256))), false),
                param(
                    "values",
                    ParamType::Array(Box::new(ParamType::Uint(256))),
                    false,
                ),
            ],
        ),
        // Wrapped native token
        EventDescriptor::new(
            "Deposit",
            vec![
                param("dst", ParamType::Address, true),
                param("wad", ParamType::Uint(256), false),
            ],
        ),
        EventDescriptor::new(
            "Withdrawal",
            vec![
                param("src", ParamType::Address, true),
                param("wad", ParamType::Uint(256), false),
            ],
        ),
        EventDescriptor::new(
            "OwnershipTransferred",
            vec![
                param("previousOwner", ParamType::Address, true),
                param("newOwner", ParamType::Address, true),
            ],
        ),
    ];
    descriptors
        .into_iter()
        .map(|descriptor| (descriptor.signature(), descriptor))
        .collect()
});

/// Immutable signature -> descriptor lookup table.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: HashMap<H256, EventDescriptor>,
}

impl EventRegistry {
    /// An empty registry; every lookup without an override fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in well-known signature table.
    pub fn well_known() -> Self {
        Self {
            events: WELL_KNOWN_EVENTS.clone(),
        }
    }

    /// Register a descriptor under its computed signature.
    pub fn with_event(mut self, descriptor: EventDescriptor) -> Self {
        self.events.insert(descriptor.signature(), descriptor);
        self
    }

    pub fn get(&self, signature: &H256) -> Option<&EventDescriptor> {
        self.events.get(signature)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Resolve a signature to its descriptor.
    ///
    /// When a `known_events` override is supplied it is the only source
    /// consulted, so an override descriptor wins even for signatures the
    /// registry also defines. A miss in whichever source applies is a hard
    /// stop: without a descriptor the log cannot be interpreted.
    pub fn resolve(
        &self,
        signature: H256,
        known_events: Option<&HashMap<H256, EventDescriptor>>,
    ) -> ValidationResult<EventDescriptor> {
        let found = match known_events {
            Some(known) => known.get(&signature),
            None => self.events.get(&signature),
        };
        found
            .cloned()
            .ok_or(ValidationError::UnknownEvent(signature))
    }
}
