//! Desktop notification channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ChannelKind, NotificationChannel};
use crate::notification::LiveNotification;
use crate::{Error, Result};

/// Permission to show desktop notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    /// Not asked yet.
    #[default]
    Default,
    Denied,
}

/// Platform integration that actually shows notifications.
#[async_trait]
pub trait DesktopBackend: Send + Sync {
    /// Ask the user (or the platform) for permission.
    async fn request_permission(&self) -> PermissionState;

    async fn show(&self, title: &str, body: &str, icon: Option<&str>) -> Result<()>;
}

/// Desktop channel with a permission state machine.
///
/// `Default` triggers exactly one permission request, on first delivery.
/// `Denied` drops notifications silently.
pub struct DesktopChannel {
    backend: Arc<dyn DesktopBackend>,
    permission: Mutex<PermissionState>,
}

impl DesktopChannel {
    pub fn new(backend: Arc<dyn DesktopBackend>) -> Self {
        Self::with_permission(backend, PermissionState::Default)
    }

    pub fn with_permission(backend: Arc<dyn DesktopBackend>, permission: PermissionState) -> Self {
        Self {
            backend,
            permission: Mutex::new(permission),
        }
    }

    pub async fn permission(&self) -> PermissionState {
        *self.permission.lock().await
    }

    /// Resolve the current permission, requesting it if never asked.
    async fn ensure_permission(&self) -> PermissionState {
        let mut permission = self.permission.lock().await;
        if *permission == PermissionState::Default {
            let granted = self.backend.request_permission().await;
            // A backend that still answers Default is treated as a refusal so
            // we never ask twice.
            *permission = match granted {
                PermissionState::Granted => PermissionState::Granted,
                _ => PermissionState::Denied,
            };
            info!("desktop notification permission: {:?}", *permission);
        }
        *permission
    }
}

#[async_trait]
impl NotificationChannel for DesktopChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Desktop
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn deliver(&self, notification: &LiveNotification) -> Result<()> {
        match self.ensure_permission().await {
            PermissionState::Granted => {
                self.backend
                    .show(
                        &notification.title(),
                        &notification.body(),
                        notification.info.thumbnail_url.as_deref(),
                    )
                    .await
            }
            _ => {
                debug!("desktop notifications denied; skipping");
                Ok(())
            }
        }
    }
}

/// Shows notifications with the freedesktop `notify-send` tool.
#[derive(Debug, Clone)]
pub struct NotifySendBackend {
    program: String,
    app_name: String,
}

impl NotifySendBackend {
    pub fn new() -> Self {
        Self {
            program: "notify-send".to_string(),
            app_name: "livewall".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, title: &str, body: &str, icon: Option<&str>) -> Vec<String> {
        let mut args = vec!["--app-name".to_string(), self.app_name.clone()];
        if let Some(icon) = icon {
            args.push("--icon".to_string());
            args.push(icon.to_string());
        }
        args.push(title.to_string());
        args.push(body.to_string());
        args
    }
}

impl Default for NotifySendBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DesktopBackend for NotifySendBackend {
    async fn request_permission(&self) -> PermissionState {
        // There is no prompt on freedesktop; permission means the tool exists.
        match Command::new(&self.program).arg("--version").output().await {
            Ok(output) if output.status.success() => PermissionState::Granted,
            Ok(_) | Err(_) => PermissionState::Denied,
        }
    }

    async fn show(&self, title: &str, body: &str, icon: Option<&str>) -> Result<()> {
        let status = Command::new(&self.program)
            .args(self.args(title, body, icon))
            .status()
            .await?;

        if !status.success() {
            return Err(Error::notification(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}
