use crate::shell_channel::PrivilegedChannel;
use std::collections::HashMap;
use std::sync::Mutex;

/// Global settings table kept in memory, driven by `settings get/put global`.
#[derive(Default)]
pub struct MemoryChannel {
    pub values: Mutex<HashMap<String, String>>,
    pub commands: Mutex<Vec<String>>,
}

impl MemoryChannel {
    pub fn with_value(key: &str, value: &str) -> Self {
        let channel = Self::default();
        channel.set(key, value);
        channel
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn puts(&self) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("settings put"))
            .count()
    }
}

impl PrivilegedChannel for MemoryChannel {
    fn is_available(&self) -> bool {
        true
    }

    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) {}

    fn exec(&self, command: &str) -> std::io::Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        let parts: Vec<&str> = command.splitn(5, ' ').collect();
        match parts.as_slice() {
            ["settings", "get", "global", key] => {
                Ok(self.get(key).unwrap_or_else(|| "null".to_string()))
            }
            ["settings", "put", "global", key, value] => {
                let value = if *value == "''" { "" } else { *value };
                self.set(key, value);
                Ok(String::new())
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unexpected command: {}", command),
            )),
        }
    }
}
