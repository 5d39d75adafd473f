use std::collections::BTreeMap;
use std::path::PathBuf;

use pwhash::bcrypt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub(crate) enum AccountError {
    #[error("account already exists")]
    AlreadyExists,
    #[error("account does not exist")]
    NotFound,
    #[error("username must not be empty")]
    UsernameInvalid,
    #[error("failed to hash password: {0}")]
    Hash(#[from] pwhash::error::Error),
    #[error("failed to access account file: {0}")]
    Io(#[from] std::io::Error),
    #[error("account file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct Requirements {
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct AccountsFile {
    #[serde(default)]
    pub users: BTreeMap<String, Requirements>,
}

/// Accounts live in a single YAML document consumed by the external
/// authentication server. The document is reloaded and rewritten wholesale on
/// every mutation. Writers within this process are serialized by `write_lock`;
/// there is no cross-process locking, so a single operator process is assumed.
pub(crate) struct AccountStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AccountStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<AccountsFile, AccountError> {
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_yaml::from_slice(&raw)?)
    }

    pub async fn usernames(&self) -> Result<Vec<String>, AccountError> {
        Ok(self.load().await?.users.into_keys().collect())
    }

    pub async fn add(&self, username: &str, password: &str) -> Result<(), AccountError> {
        if username.is_empty() {
            return Err(AccountError::UsernameInvalid);
        }

        let _guard = self.write_lock.lock().await;

        let mut accounts = self.load().await?;
        if accounts.users.contains_key(username) {
            return Err(AccountError::AlreadyExists);
        }

        let password = bcrypt::hash(password)?;
        accounts
            .users
            .insert(username.to_string(), Requirements { password });

        self.save(&accounts).await?;

        info!("Added account {username}");

        Ok(())
    }

    pub async fn delete(&self, username: &str) -> Result<(), AccountError> {
        if username.is_empty() {
            return Err(AccountError::UsernameInvalid);
        }

        let _guard = self.write_lock.lock().await;

        let mut accounts = self.load().await?;
        if accounts.users.remove(username).is_none() {
            return Err(AccountError::NotFound);
        }

        self.save(&accounts).await?;

        info!("Removed account {username}");

        Ok(())
    }

    // Rewrites go to a temp file in the same directory followed by a rename,
    // so a crash mid-write cannot truncate the live document.
    async fn save(&self, accounts: &AccountsFile) -> Result<(), AccountError> {
        let rendered = serde_yaml::to_string(accounts)?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, rendered.as_bytes()).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let suffix = Uuid::new_v4().as_hyphenated().to_string();
        self.path.with_file_name(format!(".accounts-{suffix}.tmp"))
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;
    use test_log::test;

    use super::*;

    fn store_with(contents: &str) -> (TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.yml");
        std::fs::write(&path, contents).unwrap();

        (dir, AccountStore::new(path))
    }

    #[test(tokio::test)]
    async fn add_round_trip() {
        let (_dir, store) = store_with("users: {}\n");

        store.add("alice", "hunter2").await.unwrap();

        let accounts = store.load().await.unwrap();
        assert_eq!(accounts.users.len(), 1);

        let hash = &accounts.users["alice"].password;
        assert!(!hash.is_empty());
        assert_ne!(hash, "hunter2");
        assert!(bcrypt::verify("hunter2", hash));
    }

    #[test(tokio::test)]
    async fn duplicate_add_keeps_the_stored_record() {
        let (_dir, store) = store_with("users: {}\n");

        store.add("alice", "hunter2").await.unwrap();
        let before = store.load().await.unwrap().users["alice"].password.clone();

        let err = store.add("alice", "different").await.unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists));

        let after = store.load().await.unwrap().users["alice"].password.clone();
        assert_eq!(before, after);
    }

    #[test(tokio::test)]
    async fn delete_removes_exactly_one_entry() {
        let (_dir, store) = store_with("users: {}\n");

        store.add("alice", "hunter2").await.unwrap();
        store.add("bob", "swordfish").await.unwrap();

        store.delete("alice").await.unwrap();

        let accounts = store.load().await.unwrap();
        assert_eq!(accounts.users.into_keys().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[test(tokio::test)]
    async fn delete_of_missing_account_fails() {
        let (_dir, store) = store_with("users: {}\n");

        let err = store.delete("nobody").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[test(tokio::test)]
    async fn empty_usernames_are_rejected() {
        let (_dir, store) = store_with("users: {}\n");

        assert!(matches!(
            store.add("", "hunter2").await.unwrap_err(),
            AccountError::UsernameInvalid
        ));
        assert!(matches!(
            store.delete("").await.unwrap_err(),
            AccountError::UsernameInvalid
        ));
    }

    #[test(tokio::test)]
    async fn reads_an_existing_auth_server_document() {
        let (_dir, store) = store_with(concat!(
            "users:\n",
            "  \"admin\":\n",
            "    password: \"$2y$05$B.Ll3uIhJpJRazTLmg73bOLS0BFMO3VQhBCGCCGZGjq0IcGs8dYAi\"\n",
        ));

        let usernames = store.usernames().await.unwrap();
        assert_eq!(usernames, vec!["admin"]);
    }

    #[test(tokio::test)]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("absent.yml"));

        assert!(matches!(
            store.load().await.unwrap_err(),
            AccountError::Io(_)
        ));
    }
}
