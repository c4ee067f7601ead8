pub use crate::shell_channel_stt::*;
use crate::{adb, android_shizuku};
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

/// A command executor with elevated rights, e.g. Shizuku or adb.
#[cfg_attr(test, mockall::automock)]
pub trait PrivilegedChannel: Send + Sync {
    /// The broker (service, device, shell) can be reached.
    fn is_available(&self) -> bool;
    /// The caller may run commands through the broker.
    fn has_permission(&self) -> bool;
    /// Ask the broker to prompt the user for consent.
    fn request_permission(&self);
    /// Run a shell command and return its stdout without trailing whitespace.
    fn exec(&self, command: &str) -> std::io::Result<String>;
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adb" => Ok(ChannelKind::Adb),
            "shizuku" => Ok(ChannelKind::Shizuku),
            "local" | "sh" | "shell" => Ok(ChannelKind::Local),
            other => Err(format!(
                "unknown channel '{}', expected adb, shizuku or local",
                other
            )),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChannelKind::Adb => "adb",
            ChannelKind::Shizuku => "shizuku",
            ChannelKind::Local => "local",
        };
        f.write_str(name)
    }
}

impl ChannelKind {
    pub fn open(&self, device: Option<String>) -> Arc<dyn PrivilegedChannel> {
        match self {
            ChannelKind::Adb => Arc::new(AdbChannel { device }),
            ChannelKind::Shizuku => Arc::new(ShizukuChannel),
            ChannelKind::Local => Arc::new(LocalShellChannel::default()),
        }
    }
}

impl From<i32> for BindState {
    fn from(code: i32) -> Self {
        match code {
            1 => BindState::Binding,
            2 => BindState::Bound,
            3 => BindState::Failed,
            _ => BindState::NotBound,
        }
    }
}

impl PrivilegedChannel for AdbChannel {
    fn is_available(&self) -> bool {
        match adb::get_devices() {
            Ok(devices) => match &self.device {
                Some(serial) => devices.iter().any(|d| d == serial),
                None => !devices.is_empty(),
            },
            Err(e) => {
                debug!("adb devices failed: {}", e);
                false
            }
        }
    }

    // adb shell already runs as the shell user, which may write global settings.
    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) {}

    fn exec(&self, command: &str) -> std::io::Result<String> {
        adb::shell(self.device.as_deref(), command).map(|out| out.trim_end().to_string())
    }
}

const BIND_POLL_ATTEMPTS: u32 = 30;
const BIND_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl ShizukuChannel {
    /// Bind the ShellService if needed and wait briefly for it to come up.
    fn ensure_bound(&self) -> std::io::Result<()> {
        if !android_shizuku::shizuku_is_available() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Shizuku is not running",
            ));
        }
        if android_shizuku::shizuku_is_service_bound() || android_shizuku::shizuku_bind_service() {
            return Ok(());
        }
        for _ in 0..BIND_POLL_ATTEMPTS {
            match BindState::from(android_shizuku::shizuku_get_bind_state()) {
                BindState::Bound => return Ok(()),
                BindState::Failed => break,
                BindState::NotBound | BindState::Binding => thread::sleep(BIND_POLL_INTERVAL),
            }
        }
        error!("Shizuku ShellService did not bind");
        Err(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "Shizuku ShellService is not bound",
        ))
    }
}

impl PrivilegedChannel for ShizukuChannel {
    fn is_available(&self) -> bool {
        android_shizuku::shizuku_is_available()
    }

    fn has_permission(&self) -> bool {
        android_shizuku::shizuku_has_permission()
    }

    fn request_permission(&self) {
        android_shizuku::shizuku_request_permission();
    }

    fn exec(&self, command: &str) -> std::io::Result<String> {
        self.ensure_bound()?;
        android_shizuku::shizuku_exec(command).map(|out| out.trim_end().to_string())
    }
}

impl Default for LocalShellChannel {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl PrivilegedChannel for LocalShellChannel {
    fn is_available(&self) -> bool {
        true
    }

    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) {}

    fn exec(&self, command: &str) -> std::io::Result<String> {
        debug!("Running via {}: {}", self.shell, command);
        let output = Command::new(&self.shell).arg("-c").arg(command).output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            let err = String::from_utf8_lossy(&output.stderr).to_string();
            warn!("{} exited with {}: {}", self.shell, output.status, err);
            Err(std::io::Error::new(std::io::ErrorKind::Other, err))
        }
    }
}
