//! Remembered passwords in the OS keychain.
//!
//! The session cookie lives only as long as the process, so later runs log
//! in again with the stored password.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "trustgate";

pub struct CredentialStore;

impl CredentialStore {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, username).context("Keychain is not available")
    }

    /// Remember `password` for `username` (`login --remember`).
    pub fn store(username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .with_context(|| format!("Could not remember the password for {}", username))
    }

    /// The remembered password, used to resume a session in a new run.
    pub fn get_password(username: &str) -> Result<String> {
        Self::entry(username)?
            .get_password()
            .with_context(|| format!("No remembered password for {}", username))
    }

    /// Forget the password (`logout --forget`); nothing stored is fine.
    pub fn delete(username: &str) -> Result<()> {
        match Self::entry(username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Could not forget the password for {}", username)),
        }
    }
}
