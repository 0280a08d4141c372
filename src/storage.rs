use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use thiserror::Error;
use tracing::warn;

use crate::models::{Clause, Contract, Template, User};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),
    #[error("document encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("User already exists")]
    EmailTaken,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Document store over Sled. Every record is a JSON document keyed by its id.
///
/// Cloning is cheap; all clones share the same underlying database.
#[derive(Clone)]
pub struct Storage {
    db: Db,
    users: Tree,
    // email -> user id; the unique index behind registration
    user_emails: Tree,
    templates: Tree,
    contracts: Tree,
    clauses: Tree,
}

impl Storage {
    /// Open or create the Sled database at the given path
    pub fn open(path: &str) -> StorageResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop (tests and throwaway runs)
    pub fn temporary() -> StorageResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            user_emails: db.open_tree("user_emails")?,
            templates: db.open_tree("templates")?,
            contracts: db.open_tree("contracts")?,
            clauses: db.open_tree("clauses")?,
            db,
        })
    }

    pub async fn flush(&self) -> StorageResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    // --- Users ---

    /// Insert a new user and claim its email in one transaction over both trees.
    /// Fails with [`StorageError::EmailTaken`] if the email is already registered;
    /// on any failure neither tree is changed.
    pub fn create_user(&self, user: &User) -> StorageResult<()> {
        let json_bytes = serde_json::to_vec(user)?;
        (&self.user_emails, &self.users)
            .transaction(|(emails, users)| {
                if emails.get(user.email.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StorageError::EmailTaken));
                }
                emails.insert(user.email.as_bytes(), user.id.as_bytes())?;
                users.insert(user.id.as_bytes(), &json_bytes[..])?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StorageError::Sled(e),
            })
    }

    pub fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        get(&self.users, id)
    }

    pub fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        match self.user_emails.get(email.as_bytes())? {
            Some(id) => get(&self.users, &String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    // --- Templates ---

    pub fn insert_template(&self, template: &Template) -> StorageResult<()> {
        put(&self.templates, &template.id, template)
    }

    /// Oldest first.
    pub fn templates_owned_by(&self, owner_id: &str) -> StorageResult<Vec<Template>> {
        let mut templates = scan(&self.templates, |t: &Template| t.owner_id == owner_id)?;
        templates.sort_by_key(|t| t.created_at);
        Ok(templates)
    }

    // --- Contracts ---

    pub fn insert_contract(&self, contract: &Contract) -> StorageResult<()> {
        put(&self.contracts, &contract.id, contract)
    }

    pub fn get_contract(&self, id: &str) -> StorageResult<Option<Contract>> {
        get(&self.contracts, id)
    }

    /// Contracts accepted by `predicate`, oldest first. Keys are random ids, so
    /// tree order says nothing about creation order.
    pub fn contracts_matching<F>(&self, predicate: F) -> StorageResult<Vec<Contract>>
    where
        F: Fn(&Contract) -> bool,
    {
        let mut contracts = scan(&self.contracts, predicate)?;
        contracts.sort_by_key(|c| c.created_at);
        Ok(contracts)
    }

    /// Atomically read-modify-write a contract.
    ///
    /// `apply` sees the current document and returns the replacement, or `None`
    /// to abort (no write, `Ok(None)` returned). The write is a compare-and-swap
    /// against the bytes that were read; if another writer got there first the
    /// whole step reruns on the fresh document, so concurrent signers never lose
    /// each other's signatures.
    pub fn modify_contract<F>(&self, id: &str, mut apply: F) -> StorageResult<Option<Contract>>
    where
        F: FnMut(Contract) -> Option<Contract>,
    {
        loop {
            let Some(current) = self.contracts.get(id.as_bytes())? else {
                return Ok(None);
            };
            let contract: Contract = serde_json::from_slice(&current)?;
            let Some(next) = apply(contract) else {
                return Ok(None);
            };
            let bytes = serde_json::to_vec(&next)?;
            match self
                .contracts
                .compare_and_swap(id.as_bytes(), Some(&current), Some(bytes))?
            {
                Ok(()) => return Ok(Some(next)),
                Err(_) => warn!(contract_id = id, "contract changed concurrently, retrying"),
            }
        }
    }

    // --- Clauses ---

    pub fn insert_clause(&self, clause: &Clause) -> StorageResult<()> {
        put(&self.clauses, &clause.id, clause)
    }

    pub fn clauses(&self) -> StorageResult<Vec<Clause>> {
        scan(&self.clauses, |_: &Clause| true)
    }

    pub fn public_clauses(&self) -> StorageResult<Vec<Clause>> {
        scan(&self.clauses, |c: &Clause| c.is_public)
    }
}

fn put<T: Serialize>(tree: &Tree, id: &str, value: &T) -> StorageResult<()> {
    let json_bytes = serde_json::to_vec(value)?;
    tree.insert(id.as_bytes(), json_bytes)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, id: &str) -> StorageResult<Option<T>> {
    match tree.get(id.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn scan<T, F>(tree: &Tree, keep: F) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let mut docs = vec![];
    for item in tree.iter() {
        let (_, value) = item?;
        let doc: T = serde_json::from_slice(&value)?;
        if keep(&doc) {
            docs.push(doc);
        }
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractStatus, NewContract, NewTemplate};
    use chrono::Utc;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new("Test".to_string(), email.to_string(), "hash".to_string())
    }

    #[test]
    fn test_create_and_lookup_user() {
        let storage = Storage::temporary().expect("Failed to open storage");
        let alice = user("alice@x.com");
        storage.create_user(&alice).expect("Insert failed");

        let by_id = storage.get_user(&alice.id).unwrap().expect("user by id");
        assert_eq!(by_id.email, "alice@x.com");
        let by_email = storage.get_user_by_email("alice@x.com").unwrap().expect("user by email");
        assert_eq!(by_email.id, alice.id);
        assert!(storage.get_user_by_email("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let storage = Storage::temporary().unwrap();
        storage.create_user(&user("alice@x.com")).unwrap();
        let second = user("alice@x.com");
        let err = storage.create_user(&second).unwrap_err();
        assert!(matches!(err, StorageError::EmailTaken));
        assert_eq!(err.to_string(), "User already exists");
        // The losing record must not have been written
        assert!(storage.get_user(&second.id).unwrap().is_none());
    }

    #[test]
    fn test_rejected_create_leaves_both_trees_untouched() {
        let storage = Storage::temporary().unwrap();
        let first = user("alice@x.com");
        storage.create_user(&first).unwrap();
        assert_eq!(storage.users.len(), 1);
        assert_eq!(storage.user_emails.len(), 1);

        let second = user("alice@x.com");
        assert!(storage.create_user(&second).is_err());

        assert_eq!(storage.users.len(), 1);
        assert_eq!(storage.user_emails.len(), 1);
        let owner = storage.user_emails.get("alice@x.com").unwrap().unwrap();
        assert_eq!(&owner[..], first.id.as_bytes());
        let by_email = storage.get_user_by_email("alice@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, first.id);
    }

    #[test]
    fn test_listings_come_back_in_creation_order() {
        let storage = Storage::temporary().unwrap();
        let base = Utc::now();
        for i in 0..8 {
            let mut contract = Contract::new(
                "alice",
                NewContract {
                    title: format!("c{i}"),
                    ..Default::default()
                },
            );
            contract.created_at = base + chrono::Duration::seconds(i);
            storage.insert_contract(&contract).unwrap();

            let mut template = Template::new(
                "alice",
                NewTemplate {
                    name: format!("t{i}"),
                    ..Default::default()
                },
            );
            template.created_at = base + chrono::Duration::seconds(i);
            storage.insert_template(&template).unwrap();
        }

        let titles: Vec<_> = storage
            .contracts_matching(|_| true)
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, (0..8).map(|i| format!("c{i}")).collect::<Vec<_>>());

        let names: Vec<_> = storage
            .templates_owned_by("alice")
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, (0..8).map(|i| format!("t{i}")).collect::<Vec<_>>());
    }

    #[test]
    fn test_templates_are_listed_per_owner() {
        let storage = Storage::temporary().unwrap();
        for owner in ["alice", "alice", "bob"] {
            let template = Template::new(owner, NewTemplate::default());
            storage.insert_template(&template).unwrap();
        }
        assert_eq!(storage.templates_owned_by("alice").unwrap().len(), 2);
        assert_eq!(storage.templates_owned_by("bob").unwrap().len(), 1);
        assert!(storage.templates_owned_by("carol").unwrap().is_empty());
    }

    #[test]
    fn test_only_public_clauses_are_listed() {
        let storage = Storage::temporary().unwrap();
        storage.insert_clause(&Clause::new("Public", "text", "general", true)).unwrap();
        storage.insert_clause(&Clause::new("Private", "text", "general", false)).unwrap();
        let clauses = storage.public_clauses().unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(storage.clauses().unwrap().len(), 2);
        assert!(clauses.iter().all(|c| c.is_public));
    }

    #[test]
    fn test_modify_contract_aborts_without_writing() {
        let storage = Storage::temporary().unwrap();
        let contract = Contract::new("alice", NewContract::default());
        storage.insert_contract(&contract).unwrap();

        assert!(storage.modify_contract(&contract.id, |_| None).unwrap().is_none());
        assert!(storage.modify_contract("missing", Some).unwrap().is_none());
        let stored = storage.get_contract(&contract.id).unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Draft);
    }

    #[tokio::test]
    async fn test_concurrent_signers_do_not_lose_signatures() {
        let storage = Arc::new(Storage::temporary().unwrap());
        let contract = Contract::new("alice", NewContract::default());
        storage.insert_contract(&contract).unwrap();

        let signers: Vec<_> = (0..16)
            .map(|i| {
                let storage = storage.clone();
                let id = contract.id.clone();
                tokio::task::spawn_blocking(move || {
                    storage.modify_contract(&id, |mut c| {
                        c.append_signature(format!("signer{i}"), "sig".to_string(), Utc::now());
                        Some(c)
                    })
                })
            })
            .collect();
        for result in futures::future::join_all(signers).await {
            assert!(result.unwrap().unwrap().is_some());
        }

        let stored = storage.get_contract(&contract.id).unwrap().unwrap();
        assert_eq!(stored.signatures.len(), 16);
        assert_eq!(stored.status, ContractStatus::Signed);
    }
}
