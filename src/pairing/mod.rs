//! Gateway Pairing
//!
//! A deCONZ gateway only hands out an API key while it is unlocked, which the
//! operator does by pressing the link button (or "Authenticate app" in Phoscon).
//! Until then every pairing request is answered with HTTP 403.
//!
//! # State Machine
//!
//! ```text
//!  NoCredential ──(key on disk)──────────────────────────────► done
//!       │
//!       ▼
//!  AwaitingUnlock ──403──► sleep(retry_delay) ──┐
//!       ▲                                       │
//!       └───────────────────────────────────────┘
//!       │
//!       ├──200──► Paired ──(persist key)──► done
//!       └──other status / timeout──► error
//! ```
//!
//! Network and sleeping are injected through [`PairingApi`] and [`Sleeper`] so the
//! retry path can be exercised without a gateway or real delays.

pub mod key_store;

pub use key_store::{FileKeyStore, KeyStore};

use crate::deconz::types::{Gateway, PairingReply};
use crate::error::{ExporterError, Result};
use secrecy::SecretString;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// API key granted by a gateway
#[derive(Debug, Clone)]
pub struct Credential {
    gateway_id: String,
    api_key: SecretString,
}

impl Credential {
    pub fn new(gateway_id: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            api_key,
        }
    }

    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}

/// Transport for pairing requests
pub trait PairingApi {
    /// POST `{"devicetype": device_type}` to the gateway's `/api` endpoint
    fn request_key(
        &self,
        gateway: &Gateway,
        device_type: &str,
    ) -> impl Future<Output = Result<PairingReply>> + Send;
}

/// Delay between pairing attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Retry behaviour while the gateway is locked
#[derive(Debug, Clone)]
pub struct PairingPolicy {
    /// Sent as `devicetype`; shows up as the app name in Phoscon
    pub device_type: String,
    pub retry_delay: Duration,
    /// `None` retries until the operator unlocks the gateway
    pub timeout: Option<Duration>,
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self {
            device_type: "deconz_exporter".to_string(),
            retry_delay: Duration::from_secs(10),
            timeout: None,
        }
    }
}

#[derive(Debug)]
enum PairingState {
    NoCredential,
    AwaitingUnlock { waited: Duration },
    Paired(SecretString),
}

/// Obtains credentials for gateways, one gateway at a time
pub struct PairingAgent<'a, A, K, S> {
    api: &'a A,
    store: &'a K,
    sleeper: S,
    policy: PairingPolicy,
}

impl<'a, A, K, S> PairingAgent<'a, A, K, S>
where
    A: PairingApi,
    K: KeyStore,
    S: Sleeper,
{
    pub fn new(api: &'a A, store: &'a K, sleeper: S, policy: PairingPolicy) -> Self {
        Self {
            api,
            store,
            sleeper,
            policy,
        }
    }

    /// Return the stored credential for `gateway`, pairing first if there is none
    ///
    /// Blocks (asynchronously) until the operator unlocks the gateway, unless a
    /// timeout is configured.
    ///
    /// # Errors
    ///
    /// - [`ExporterError::Pairing`] if the gateway answers anything but 200 or 403,
    ///   or a 200 without a key
    /// - [`ExporterError::PairingTimeout`] once the configured timeout is exceeded
    /// - transport and key storage errors
    pub async fn ensure_credential(&self, gateway: &Gateway) -> Result<Credential> {
        let mut state = PairingState::NoCredential;

        loop {
            state = match state {
                PairingState::NoCredential => match self.store.load(&gateway.id)? {
                    Some(api_key) => {
                        info!("Using stored API key for gateway {}", gateway);
                        return Ok(Credential::new(gateway.id.clone(), api_key));
                    }
                    None => {
                        info!("No API key for gateway {}, starting pairing", gateway);
                        PairingState::AwaitingUnlock {
                            waited: Duration::ZERO,
                        }
                    }
                },
                PairingState::AwaitingUnlock { waited } => {
                    let reply = self
                        .api
                        .request_key(gateway, &self.policy.device_type)
                        .await?;
                    self.next_state(gateway, reply, waited).await?
                }
                PairingState::Paired(api_key) => {
                    self.store.store(&gateway.id, &api_key)?;
                    info!("Paired with gateway {}", gateway);
                    return Ok(Credential::new(gateway.id.clone(), api_key));
                }
            };
        }
    }

    async fn next_state(
        &self,
        gateway: &Gateway,
        reply: PairingReply,
        waited: Duration,
    ) -> Result<PairingState> {
        match reply.status {
            200 => match reply.username() {
                Some(username) => Ok(PairingState::Paired(SecretString::from(
                    username.to_string(),
                ))),
                None => Err(ExporterError::Pairing {
                    gateway: gateway.id.clone(),
                    status: reply.status,
                    description: "response did not contain an API key".to_string(),
                }),
            },
            403 => {
                let description = reply.error_description().unwrap_or("gateway is locked");
                warn!(
                    "{}: {} (unlock the gateway to continue pairing)",
                    gateway.id, description
                );

                let delay = self.policy.retry_delay;
                if let Some(timeout) = self.policy.timeout {
                    if waited + delay > timeout {
                        return Err(ExporterError::PairingTimeout {
                            gateway: gateway.id.clone(),
                            waited_seconds: waited.as_secs(),
                        });
                    }
                }

                self.sleeper.sleep(delay).await;
                Ok(PairingState::AwaitingUnlock {
                    waited: waited + delay,
                })
            }
            status => Err(ExporterError::Pairing {
                gateway: gateway.id.clone(),
                status,
                description: reply
                    .error_description()
                    .unwrap_or("unexpected response")
                    .to_string(),
            }),
        }
    }
}
