// interface for adb commands wrapper
// list_devices : parsed value of "adb devices -l"
// get_devices  : serials of attached devices
// shell        : run a command with "adb shell" on a device

pub use crate::adb_stt::AdbDevice;
use std::process::Command;
use tracing::{debug, error};

pub fn list_devices() -> std::io::Result<Vec<AdbDevice>> {
    let output = Command::new("adb").arg("devices").arg("-l").output()?;

    if output.status.success() {
        let devices = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(parse_devices(&devices))
    } else {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        Err(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

pub fn get_devices() -> std::io::Result<Vec<String>> {
    Ok(list_devices()?.into_iter().map(|d| d.serial).collect())
}

fn parse_devices(text: &str) -> Vec<AdbDevice> {
    // Parse output like:
    // List of devices attached
    // 7f1c2a3b               device usb:1-1 product:meizu_20 model:MEIZU_20 device:meizu20 transport_id:1
    // emulator-5554          offline transport_id:2
    text.lines()
        .filter_map(|line| {
            if line.trim().is_empty() || line.starts_with("List of devices") {
                return None;
            }

            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_string();
            if tokens.next()? != "device" {
                return None;
            }
            let model = tokens
                .find_map(|t| t.strip_prefix("model:"))
                .map(|m| m.to_string());
            Some(AdbDevice { serial, model })
        })
        .collect()
}

/// Run `command` through the device shell. `adb shell` hands a single
/// argument to the remote `sh`, so the command keeps its own quoting.
pub fn shell(device: Option<&str>, command: &str) -> std::io::Result<String> {
    debug!("adb shell ({}): {}", device.unwrap_or("default"), command);
    let mut cmd = Command::new("adb");
    if let Some(serial) = device {
        cmd.arg("-s").arg(serial);
    }
    let output = cmd.arg("shell").arg(command).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        error!("ADB command failed: {}", err);
        Err(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}
