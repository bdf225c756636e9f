// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Mapping from (line, component) to node identifiers on the line equipment.
//!
//! Node keys are stable strings. The numeric namespace index they live in is
//! assigned by the server at runtime and has to be resolved again for every
//! session, so the two are only combined into a [`ResolvedAddress`] inside a
//! session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;
use crate::line::{Component, Line};

const LAST_UPDATED_KEY: &str = "last_updated";

/// Namespace-independent identifier of one value on the line equipment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Key of the active-lot register for `component` on `line`.
    pub fn active_lot(line: Line, component: Component) -> Self {
        Self(format!(
            "Lijn{}_{}_nr_actieve_partij",
            line.number(),
            component.as_str()
        ))
    }

    /// Validate raw UI input and build the active-lot key.
    pub fn parse(line: u8, component: &str) -> Result<Self, AddressError> {
        let line = Line::try_from(line)?;
        let component = component.parse::<Component>()?;
        Ok(Self::active_lot(line, component))
    }

    /// Read-only diagnostic timestamp maintained by the equipment.
    pub fn last_updated() -> Self {
        Self(LAST_UPDATED_KEY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node key qualified with the namespace index of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    pub namespace_index: u16,
    pub key: NodeKey,
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};s={}", self.namespace_index, self.key)
    }
}

/// Key for a typed (line, component) pair.
pub fn key_for(line: Line, component: Component) -> NodeKey {
    NodeKey::active_lot(line, component)
}

/// Combine a key with a namespace index resolved in the current session.
pub fn address_for(key: &NodeKey, namespace_index: u16) -> ResolvedAddress {
    ResolvedAddress {
        namespace_index,
        key: key.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_lot_keys() {
        assert_eq!(
            key_for(Line::One, Component::Pc).as_str(),
            "Lijn1_PC_nr_actieve_partij"
        );
        assert_eq!(
            key_for(Line::Two, Component::Os).as_str(),
            "Lijn2_OS_nr_actieve_partij"
        );
    }

    #[test]
    fn test_parse_validates_input() {
        assert_eq!(
            NodeKey::parse(2, "pc").unwrap().as_str(),
            "Lijn2_PC_nr_actieve_partij"
        );
        assert_eq!(
            NodeKey::parse(3, "PC").unwrap_err(),
            AddressError::InvalidLine("3".to_string())
        );
        assert_eq!(
            NodeKey::parse(1, "XX").unwrap_err(),
            AddressError::InvalidComponent("XX".to_string())
        );
    }

    #[test]
    fn test_address_display() {
        let key = key_for(Line::One, Component::Pc);
        let addr = address_for(&key, 3);
        assert_eq!(addr.to_string(), "ns=3;s=Lijn1_PC_nr_actieve_partij");
        assert_eq!(addr.key, key);
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut keys: Vec<NodeKey> = Line::ALL
            .iter()
            .flat_map(|line| Component::ALL.iter().map(move |c| key_for(*line, *c)))
            .collect();
        keys.push(NodeKey::last_updated());
        let count = keys.len();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys.dedup();
        assert_eq!(keys.len(), count);
    }
}
