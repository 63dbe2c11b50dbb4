//! SSH debug relay connections (tmate)

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

const FINGERPRINT_PREFIX: &str = "SHA256:";

/// One reachable SSH debug relay
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSshDebugConnection", into = "RawSshDebugConnection")]
pub struct SshDebugConnection {
    host: IpAddr,
    port: u16,
    rsa_fingerprint: String,
    ed25519_fingerprint: String,
}

/// Unvalidated wire form of [`SshDebugConnection`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSshDebugConnection {
    pub host: IpAddr,
    pub port: u32,
    pub rsa_fingerprint: String,
    pub ed25519_fingerprint: String,
}

impl SshDebugConnection {
    pub fn new(
        host: IpAddr,
        port: u32,
        rsa_fingerprint: impl Into<String>,
        ed25519_fingerprint: impl Into<String>,
    ) -> Result<Self> {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                ConfigError::InvalidSshDebug(format!("port must be within 1-65535, got {}", port))
            })?;

        let rsa_fingerprint = check_fingerprint("rsa_fingerprint", rsa_fingerprint.into())?;
        let ed25519_fingerprint =
            check_fingerprint("ed25519_fingerprint", ed25519_fingerprint.into())?;

        Ok(Self {
            host,
            port,
            rsa_fingerprint,
            ed25519_fingerprint,
        })
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn rsa_fingerprint(&self) -> &str {
        &self.rsa_fingerprint
    }

    pub fn ed25519_fingerprint(&self) -> &str {
        &self.ed25519_fingerprint
    }
}

// Fingerprints stay out of logs.
impl fmt::Debug for SshDebugConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshDebugConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl TryFrom<RawSshDebugConnection> for SshDebugConnection {
    type Error = ConfigError;

    fn try_from(raw: RawSshDebugConnection) -> Result<Self> {
        Self::new(
            raw.host,
            raw.port,
            raw.rsa_fingerprint,
            raw.ed25519_fingerprint,
        )
    }
}

impl From<SshDebugConnection> for RawSshDebugConnection {
    fn from(conn: SshDebugConnection) -> Self {
        Self {
            host: conn.host,
            port: u32::from(conn.port),
            rsa_fingerprint: conn.rsa_fingerprint,
            ed25519_fingerprint: conn.ed25519_fingerprint,
        }
    }
}

fn check_fingerprint(field: &str, value: String) -> Result<String> {
    if value.starts_with(FINGERPRINT_PREFIX) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidSshDebug(format!(
            "{} must start with {}",
            field, FINGERPRINT_PREFIX
        )))
    }
}
