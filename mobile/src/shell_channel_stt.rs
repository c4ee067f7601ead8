/// Which privileged channel runs the `settings` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelKind {
    /// `adb shell` against a connected device
    #[default]
    Adb,
    /// Shizuku ShellService (Android only)
    Shizuku,
    /// `sh -c` in this process, for shell or root users
    Local,
}

/// Mirrors ShizukuBridge.getBindState()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    NotBound,
    Binding,
    Bound,
    Failed,
}

pub struct AdbChannel {
    /// Serial passed to `adb -s`; the first attached device when `None`
    pub device: Option<String>,
}

pub struct ShizukuChannel;

pub struct LocalShellChannel {
    pub shell: String,
}
