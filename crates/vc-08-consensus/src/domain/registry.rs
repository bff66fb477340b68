//! # Validator Registry
//!
//! The validator set is fixed at process start. Members are kept in public
//! key order; that order drives round-robin proposer selection, so every
//! node derives the same proposer for a given `(height, view)`.

use super::error::RegistryError;
use super::mode::AgreementMode;
use shared_types::{short_hash, ValidatorId};
use std::collections::BTreeMap;

/// Network location of a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub id: ValidatorId,
    pub host: String,
    pub port: u16,
}

impl ValidatorInfo {
    pub fn new(id: ValidatorId, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }

    /// `host:port` for dialing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Immutable validator set plus the local identity.
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    self_id: ValidatorId,
    members: BTreeMap<ValidatorId, ValidatorInfo>,
    order: Vec<ValidatorId>,
    mode: AgreementMode,
    quorum_size: usize,
}

impl ValidatorRegistry {
    /// Build the registry. An empty or duplicated member list is fatal.
    ///
    /// `self_id` need not be a member; such a node follows the chain
    /// without proposing or voting.
    pub fn new(
        self_id: ValidatorId,
        validators: Vec<ValidatorInfo>,
        mode: AgreementMode,
    ) -> Result<Self, RegistryError> {
        if validators.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut members = BTreeMap::new();
        for info in validators {
            let id = info.id;
            if members.insert(id, info).is_some() {
                return Err(RegistryError::Duplicate(short_hash(&id)));
            }
        }
        let order: Vec<ValidatorId> = members.keys().copied().collect();
        let quorum_size = mode.quorum_size(order.len());

        Ok(Self {
            self_id,
            members,
            order,
            mode,
            quorum_size,
        })
    }

    pub fn self_id(&self) -> &ValidatorId {
        &self.self_id
    }

    /// Whether the local node is a voting member.
    pub fn is_validator(&self) -> bool {
        self.members.contains_key(&self.self_id)
    }

    pub fn is_member(&self, id: &ValidatorId) -> bool {
        self.members.contains_key(id)
    }

    pub fn get(&self, id: &ValidatorId) -> Option<&ValidatorInfo> {
        self.members.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn mode(&self) -> AgreementMode {
        self.mode
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }

    /// Members other than self.
    pub fn peers(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.members
            .values()
            .filter(move |info| info.id != self.self_id)
    }

    /// Round-robin proposer for `(height, view)`.
    pub fn proposer_for(&self, height: u64, view: u64) -> &ValidatorId {
        let n = self.order.len() as u64;
        let index = (height.wrapping_add(view) % n) as usize;
        &self.order[index]
    }

    /// Smallest view above `view` whose proposer satisfies `eligible`,
    /// searching one full rotation.
    pub fn next_view_where(
        &self,
        height: u64,
        view: u64,
        eligible: impl Fn(&ValidatorId) -> bool,
    ) -> Option<u64> {
        (1..=self.order.len() as u64)
            .map(|step| view + step)
            .find(|candidate| eligible(self.proposer_for(height, *candidate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u8) -> ValidatorInfo {
        ValidatorInfo::new([id; 32], "127.0.0.1", 7000 + u16::from(id))
    }

    fn registry(self_id: u8, ids: &[u8]) -> ValidatorRegistry {
        ValidatorRegistry::new(
            [self_id; 32],
            ids.iter().map(|id| info(*id)).collect(),
            AgreementMode::ThreePhase,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_set_is_fatal() {
        let result = ValidatorRegistry::new([1; 32], vec![], AgreementMode::ThreePhase);
        assert!(matches!(result, Err(RegistryError::Empty)));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let result =
            ValidatorRegistry::new([1; 32], vec![info(1), info(1)], AgreementMode::SingleRound);
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
    }

    #[test]
    fn test_quorum_and_membership() {
        let reg = registry(2, &[4, 2, 3, 1]);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.quorum_size(), 3);
        assert!(reg.is_validator());
        assert!(reg.is_member(&[4; 32]));
        assert!(!reg.is_member(&[9; 32]));
        assert_eq!(reg.peers().count(), 3);
        assert!(reg.peers().all(|p| p.id != [2; 32]));
    }

    #[test]
    fn test_follower_is_not_validator() {
        let reg = registry(9, &[1, 2, 3, 4]);
        assert!(!reg.is_validator());
        assert_eq!(reg.peers().count(), 4);
    }

    #[test]
    fn test_proposer_rotates_in_key_order() {
        let reg = registry(1, &[3, 1, 2, 4]);
        assert_eq!(reg.proposer_for(0, 0), &[1; 32]);
        assert_eq!(reg.proposer_for(1, 0), &[2; 32]);
        assert_eq!(reg.proposer_for(1, 1), &[3; 32]);
        assert_eq!(reg.proposer_for(5, 0), &[2; 32]);
    }

    #[test]
    fn test_next_view_skips_ineligible() {
        let reg = registry(1, &[1, 2, 3, 4]);
        // Height 1: view 0 -> [2], view 1 -> [3], view 2 -> [4].
        let next = reg.next_view_where(1, 0, |id| id != &[3; 32]);
        assert_eq!(next, Some(2));
        assert_eq!(reg.next_view_where(1, 0, |_| false), None);
    }

    #[test]
    fn test_address() {
        assert_eq!(info(1).address(), "127.0.0.1:7001");
    }
}
