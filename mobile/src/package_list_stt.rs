use crate::shell_channel::PrivilegedChannel;
use std::sync::Arc;

/// Delimiter used by the global settings value.
pub const LIST_DELIMITER: char = ',';

/// The two Flyme video processing allow-lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKey {
    /// MEMC frame interpolation (`flyme_vpp_frc_pkg_list`)
    FrameInterpolation,
    /// AI super resolution (`flyme_vpp_ais_pkg_list`)
    SuperResolution,
}

/// Ordered, de-duplicated package identifiers.
pub type PackageList = Vec<String>;

/// What the privileged channel currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Broker not running or no device attached
    Unavailable,
    /// Broker reachable but permission not granted
    Denied,
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("privileged channel is not available")]
    Unavailable,
    #[error("privileged channel permission not granted")]
    Denied,
    #[error("command failed: {0}")]
    Command(#[from] std::io::Error),
}

/// Reads and writes package lists through a privileged channel.
///
/// Every operation re-reads the persisted value; nothing is cached between calls.
#[derive(Clone)]
pub struct PackageListStore {
    pub(crate) channel: Arc<dyn PrivilegedChannel>,
}
