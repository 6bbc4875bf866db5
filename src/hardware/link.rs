// HTTP link to the remote lock controller with simulated fallback

use crate::core::errors::AccessError;
use crate::core::models::{ActuationResult, ActuationStatus, Compartment, LinkDetail, LinkStatus};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Network address of the lock controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAddress {
    pub host: String,
    pub port: u16,
}

impl LinkAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or a full `http://host:port` URL.
    /// A missing port means 80.
    pub fn parse(raw: &str) -> Result<Self, AccessError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AccessError::InvalidInput("controller address is required".to_string()));
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };

        let url = url::Url::parse(&candidate).map_err(|e| {
            AccessError::InvalidInput(format!("Invalid controller address '{}': {}", raw, e))
        })?;

        let host = url
            .host_str()
            .ok_or_else(|| AccessError::InvalidInput(format!("Controller address '{}' has no host", raw)))?;

        Ok(Self::new(host, url.port_or_known_default().unwrap_or(80)))
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Timing for controller calls and simulated answers
#[derive(Debug, Clone)]
pub struct LinkSettings {
    /// Hard bound on every controller request
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub simulated_unlock_delay: Duration,
    pub simulated_lock_delay: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(5000),
            connect_timeout: Duration::from_millis(2000),
            simulated_unlock_delay: Duration::from_millis(1000),
            simulated_lock_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Unlock,
    Lock,
}

impl Command {
    fn as_str(&self) -> &'static str {
        match self {
            Command::Unlock => "unlock",
            Command::Lock => "lock",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Command::Unlock => "Door unlocked successfully",
            Command::Lock => "Door locked successfully",
        }
    }
}

#[derive(Debug)]
struct LinkState {
    address: LinkAddress,
    connected: bool,
}

/// Single remote lock controller.
///
/// Owns the connectivity flag. The flag is only written by the outcomes of
/// `probe`, `unlock`, `lock` and `status`, and by `reconfigure`. While
/// disconnected every actuation is answered locally as `simulated`.
pub struct HardwareLinkController {
    http_client: Client,
    settings: LinkSettings,
    state: RwLock<LinkState>,
}

impl HardwareLinkController {
    /// Create a controller for `address` and probe it once
    pub async fn connect(address: LinkAddress, settings: LinkSettings) -> Result<Self, AccessError> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| AccessError::ConfigurationError(format!(
                "Failed to create HTTP client: {}", e
            )))?;

        let controller = Self {
            http_client,
            settings,
            state: RwLock::new(LinkState {
                address,
                connected: false,
            }),
        };
        controller.probe().await;
        Ok(controller)
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    pub async fn address(&self) -> LinkAddress {
        self.state.read().await.address.clone()
    }

    /// Health check against the controller. Never fails; returns the new flag.
    pub async fn probe(&self) -> bool {
        let address = self.address().await;
        let url = format!("{}/health", address.base_url());

        let connected = match self.http_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(status = %response.status(), url = %url, "Health check returned error status");
                false
            }
            Err(e) => {
                debug!(error = %e, url = %url, "Health check failed");
                false
            }
        };

        self.set_connected(&address, connected).await;

        if connected {
            info!(address = %address, "Lock controller connected");
        } else {
            warn!(address = %address, "Lock controller not reachable, using simulation mode");
        }
        connected
    }

    pub async fn unlock(&self, compartment: Compartment) -> Result<ActuationResult, AccessError> {
        self.actuate(Command::Unlock, compartment).await
    }

    pub async fn lock(&self, compartment: Compartment) -> Result<ActuationResult, AccessError> {
        self.actuate(Command::Lock, compartment).await
    }

    /// Current controller status. Never fails; a failed status call
    /// downgrades the link and is reported as an `Error` descriptor.
    pub async fn status(&self) -> LinkStatus {
        let (address, connected) = {
            let state = self.state.read().await;
            (state.address.clone(), state.connected)
        };

        if !connected {
            return LinkStatus {
                connected: false,
                address: address.base_url(),
                detail: LinkDetail::Disconnected { simulation: true },
                checked_at: Utc::now(),
            };
        }

        let url = format!("{}/status", address.base_url());
        let outcome = match self.http_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| format!("Invalid status response: {}", e)),
            Ok(response) => Err(format!("Controller returned HTTP {}", response.status())),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(controller_status) => LinkStatus {
                connected: true,
                address: address.base_url(),
                detail: LinkDetail::Connected { controller_status },
                checked_at: Utc::now(),
            },
            Err(message) => {
                warn!(error = %message, address = %address, "Lock controller status check failed");
                self.set_connected(&address, false).await;
                LinkStatus {
                    connected: false,
                    address: address.base_url(),
                    detail: LinkDetail::Error { message },
                    checked_at: Utc::now(),
                }
            }
        }
    }

    /// Point the controller at a new address and probe it
    pub async fn reconfigure(&self, address: LinkAddress) -> bool {
        {
            let mut state = self.state.write().await;
            info!(from = %state.address, to = %address, "Lock controller address updated");
            state.address = address;
            state.connected = false;
        }
        self.probe().await
    }

    async fn set_connected(&self, observed: &LinkAddress, connected: bool) {
        let mut state = self.state.write().await;
        // A reconfigure may have raced this observation
        if state.address == *observed {
            state.connected = connected;
        }
    }

    async fn actuate(
        &self,
        command: Command,
        compartment: Compartment,
    ) -> Result<ActuationResult, AccessError> {
        let (address, connected) = {
            let state = self.state.read().await;
            (state.address.clone(), state.connected)
        };

        info!(
            command = command.as_str(),
            row = compartment.row,
            column = compartment.column,
            "Actuating compartment"
        );

        if !connected {
            return Ok(self.simulate(command, compartment).await);
        }

        let payload = serde_json::json!({
            "command": command.as_str(),
            "row": compartment.row,
            "column": compartment.column,
            "shelf": compartment.shelf,
            "timestamp": Utc::now().to_rfc3339(),
        });
        let url = format!("{}/{}", address.base_url(), command.as_str());
        let start = Instant::now();

        let response = match self.http_client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                error!(error = %e, url = %url, "Lock controller connection failed");
                self.set_connected(&address, false).await;
                return Err(AccessError::HardwareUnreachable(format!(
                    "{} of {} failed: {}", command.as_str(), compartment, e
                )));
            }
            Err(e) => {
                error!(error = %e, url = %url, "Lock controller request failed");
                return Err(AccessError::HardwareRejected(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(text) => serde_json::from_str::<serde_json::Value>(&text)
                .unwrap_or(serde_json::Value::String(text)),
            Err(e) if e.is_timeout() => {
                error!(error = %e, url = %url, "Lock controller timed out mid-response");
                self.set_connected(&address, false).await;
                return Err(AccessError::HardwareUnreachable(e.to_string()));
            }
            Err(e) => return Err(AccessError::HardwareRejected(e.to_string())),
        };

        let controller_message = body
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string());

        if !status.is_success() {
            let reason = controller_message.unwrap_or_else(|| format!("HTTP {}", status));
            error!(
                status = %status,
                url = %url,
                reason = %reason,
                "Lock controller rejected command"
            );
            return Err(AccessError::HardwareRejected(reason));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            command = command.as_str(),
            duration_ms,
            "Lock controller command completed"
        );

        Ok(ActuationResult {
            status: ActuationStatus::Success,
            message: controller_message.unwrap_or_else(|| command.default_message().to_string()),
            compartment,
            timestamp: Utc::now(),
            duration_ms,
            controller_response: Some(body),
        })
    }

    async fn simulate(&self, command: Command, compartment: Compartment) -> ActuationResult {
        let delay = match command {
            Command::Unlock => self.settings.simulated_unlock_delay,
            Command::Lock => self.settings.simulated_lock_delay,
        };
        debug!(command = command.as_str(), "Lock controller disconnected, simulating");
        tokio::time::sleep(delay).await;

        ActuationResult {
            status: ActuationStatus::Simulated,
            message: format!("Simulated {} for {}", command.as_str(), compartment),
            compartment,
            timestamp: Utc::now(),
            duration_ms: delay.as_millis() as u64,
            controller_response: None,
        }
    }
}
