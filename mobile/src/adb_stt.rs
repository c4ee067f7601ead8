/// One line of `adb devices -l` in the `device` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDevice {
    pub serial: String,
    pub model: Option<String>,
}
