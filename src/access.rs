//! Contract access control.
//!
//! One capability check decides what a caller may do with a contract:
//! - the owner (matched by user id) may read, edit and sign;
//! - a collaborator (matched by email string) may read and sign;
//! - anyone else gets nothing, and handlers report the contract as missing.

use crate::models::{Contract, User};

/// The authenticated caller, resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

impl Identity {
    pub fn owns(&self, contract: &Contract) -> bool {
        contract.owner_id == self.id
    }

    /// Collaborator grants are keyed by email; the email need not belong to a registered user.
    pub fn collaborates_on(&self, contract: &Contract) -> bool {
        contract.collaborators.iter().any(|email| *email == self.email)
    }

    /// Listing and sign-lookup predicate: owner or collaborator.
    pub fn can_see(&self, contract: &Contract) -> bool {
        Permissions::for_contract(self, contract).read
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub sign: bool,
}

impl Permissions {
    pub const NONE: Self = Self {
        read: false,
        write: false,
        sign: false,
    };

    pub fn for_contract(identity: &Identity, contract: &Contract) -> Self {
        if identity.owns(contract) {
            Self {
                read: true,
                write: true,
                sign: true,
            }
        } else if identity.collaborates_on(contract) {
            Self {
                read: true,
                write: false,
                sign: true,
            }
        } else {
            Self::NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewContract;

    fn identity(id: &str, email: &str) -> Identity {
        Identity {
            id: id.to_string(),
            email: email.to_string(),
            name: id.to_string(),
        }
    }

    fn contract_owned_by(owner: &str, collaborators: &[&str]) -> Contract {
        Contract::new(
            owner,
            NewContract {
                collaborators: collaborators.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_owner_has_every_permission() {
        let alice = identity("alice", "alice@x.com");
        let contract = contract_owned_by("alice", &[]);
        let perms = Permissions::for_contract(&alice, &contract);
        assert!(perms.read && perms.write && perms.sign);
    }

    #[test]
    fn test_collaborator_can_read_and_sign_but_not_write() {
        let bob = identity("bob", "bob@x.com");
        let contract = contract_owned_by("alice", &["bob@x.com"]);
        let perms = Permissions::for_contract(&bob, &contract);
        assert_eq!(
            perms,
            Permissions {
                read: true,
                write: false,
                sign: true
            }
        );
        assert!(bob.can_see(&contract));
    }

    #[test]
    fn test_stranger_has_no_access() {
        let eve = identity("eve", "eve@x.com");
        let contract = contract_owned_by("alice", &["bob@x.com"]);
        assert_eq!(Permissions::for_contract(&eve, &contract), Permissions::NONE);
        assert!(!eve.can_see(&contract));
    }

    #[test]
    fn test_collaborator_match_is_exact_email_equality() {
        let bob = identity("bob", "Bob@x.com");
        let contract = contract_owned_by("alice", &["bob@x.com"]);
        assert!(!bob.can_see(&contract));
    }

    #[test]
    fn test_write_implies_sign_implies_read() {
        let contract = contract_owned_by("alice", &["bob@x.com"]);
        for who in [
            identity("alice", "alice@x.com"),
            identity("bob", "bob@x.com"),
            identity("eve", "eve@x.com"),
        ] {
            let perms = Permissions::for_contract(&who, &contract);
            assert!(!perms.write || perms.sign);
            assert_eq!(perms.sign, perms.read);
        }
    }
}
