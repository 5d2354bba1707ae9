//! Admin authentication and the election summary report
//!
//! The admins file (`email,password,name`) is re-read on every login attempt
//! so edits apply without a restart. Passwords are reduced to Blake3 digests
//! as soon as a row is parsed and the plaintext is zeroized; comparison is
//! constant-time. A password cell of the form `blake3:<64 hex chars>` is taken
//! as a precomputed digest. Rows that cannot be parsed are skipped with a
//! warning; the remaining admins can still log in.

use crate::types::{ElectionSummary, PreviousElection, Tally, UpcomingElection};
use crate::{Error, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use zeroize::Zeroize;

const DIGEST_PREFIX: &str = "blake3:";

/// Outcome of an admin login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminLogin {
    Authenticated { name: String },
    InvalidCredentials,
    /// The admins file does not exist
    DirectoryMissing,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdminRow {
    email: String,
    password: String,
    name: String,
}

/// An administrator with a hashed password
#[derive(Clone)]
pub struct AdminAccount {
    pub email: String,
    pub name: String,
    password_digest: [u8; 32],
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AdminAccount {
    fn from_row(mut row: AdminRow) -> Result<Self> {
        let digest = match row.password.strip_prefix(DIGEST_PREFIX) {
            Some(hex_digest) => {
                let mut decoded = [0u8; 32];
                if hex::decode_to_slice(hex_digest.trim(), &mut decoded).is_err() {
                    row.password.zeroize();
                    return Err(Error::validation("password digest"));
                }
                decoded
            }
            None => password_digest(&row.password),
        };
        row.password.zeroize();

        Ok(Self {
            email: row.email,
            name: row.name,
            password_digest: digest,
        })
    }

    fn verify(&self, email: &str, password: &str) -> bool {
        let email_ok = self.email == email;
        let password_ok: bool = self
            .password_digest
            .ct_eq(&password_digest(password))
            .into();
        email_ok & password_ok
    }
}

/// Blake3 digest of a password
pub fn password_digest(password: &str) -> [u8; 32] {
    blake3::hash(password.as_bytes()).into()
}

/// `blake3:<hex>` form accepted in the password column
pub fn encode_password_digest(password: &str) -> String {
    format!("{DIGEST_PREFIX}{}", hex::encode(password_digest(password)))
}

/// Parsed admins file
#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    accounts: Vec<AdminAccount>,
}

impl AdminDirectory {
    /// Parse an admins CSV source
    ///
    /// Fails only when the header cannot be read.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        rows.headers()?;

        let mut accounts = Vec::new();
        for (index, row) in rows.deserialize::<AdminRow>().enumerate() {
            // Header is line 1
            let line = index + 2;
            match row.map_err(Error::from).and_then(AdminAccount::from_row) {
                Ok(account) => accounts.push(account),
                Err(Error::Validation { .. }) => {
                    warn!("Skipping admins row {}: malformed password digest", line);
                }
                Err(_) => warn!("Skipping unreadable admins row {}", line),
            }
        }

        Ok(Self { accounts })
    }

    /// Check a credential pair against every account
    ///
    /// All rows are compared so the time taken does not depend on which row
    /// matched.
    pub fn verify(&self, email: &str, password: &str) -> Option<&AdminAccount> {
        let mut matched = None;
        for account in &self.accounts {
            if account.verify(email, password) && matched.is_none() {
                matched = Some(account);
            }
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Authenticate against the admins file at `path`
///
/// Email and password are trimmed; the email is compared exactly.
pub async fn authenticate(path: &Path, email: &str, password: &str) -> Result<AdminLogin> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("❌ Admins file not found at {}", path.display());
            return Ok(AdminLogin::DirectoryMissing);
        }
        Err(e) => return Err(e.into()),
    };

    let directory = AdminDirectory::from_reader(contents.as_slice())?;
    let email = email.trim();

    match directory.verify(email, password.trim()) {
        Some(account) => {
            info!("🔐 Admin login succeeded for {}", account.email);
            Ok(AdminLogin::Authenticated {
                name: account.name.clone(),
            })
        }
        None => {
            warn!("🔐 Admin login rejected");
            Ok(AdminLogin::InvalidCredentials)
        }
    }
}

/// Admin panel summary around the given live tally
pub fn election_summary(live: Tally) -> ElectionSummary {
    ElectionSummary {
        previous: vec![
            PreviousElection {
                year: 2018,
                winner: "TRS/BRS".to_string(),
            },
            PreviousElection {
                year: 2014,
                winner: "TRS/BRS".to_string(),
            },
        ],
        upcoming: vec![UpcomingElection {
            year: 2028,
            kind: "Assembly Elections".to_string(),
            date: None,
        }],
        live,
    }
}
