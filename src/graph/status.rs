//! Per-node error and warning flags.
//!
//! Both sets are keyed by stable codes so the same condition can be raised
//! and cleared every tick without piling up duplicates.

use std::collections::BTreeMap;
use std::fmt;

const CLASS_MASK: u32 = 0xFF_0000;

/// Stable error key. High byte is the class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const CLASS_CONFIGURATION: u32 = 0x01_0000;
    pub const CLASS_RUNTIME: u32 = 0x02_0000;
    pub const CLASS_LOADING: u32 = 0x03_0000;

    /// A required attribute is missing or unusable.
    pub const INVALID_CONFIGURATION: ErrorCode = ErrorCode(Self::CLASS_CONFIGURATION | 0x01);
    /// No usable sample rate could be determined.
    pub const SAMPLE_RATE_INVALID: ErrorCode = ErrorCode(Self::CLASS_CONFIGURATION | 0x02);
    /// The external source could not be opened.
    pub const SOURCE_NOT_READABLE: ErrorCode = ErrorCode(Self::CLASS_LOADING | 0x01);
    /// The external source was opened but its content could not be parsed.
    pub const FORMAT_NOT_READABLE: ErrorCode = ErrorCode(Self::CLASS_LOADING | 0x02);

    pub fn class(self) -> u32 {
        self.0 & CLASS_MASK
    }
}

impl fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorCode({:#08x})", self.0)
    }
}

/// Stable warning key. High byte is the class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WarningCode(pub u32);

impl WarningCode {
    pub const CLASS_RUNTIME: u32 = 0x03_0000;
    pub const CLASS_CONFIGURATION: u32 = 0x04_0000;

    pub const SOURCE_EMPTY: WarningCode = WarningCode(Self::CLASS_RUNTIME | 0x01);
    pub const PRODUCER_DISCONNECTED: WarningCode = WarningCode(Self::CLASS_RUNTIME | 0x02);
    pub const FRAME_SIZE_MISMATCH: WarningCode = WarningCode(Self::CLASS_RUNTIME | 0x03);
    pub const SAMPLE_RATE_MISMATCH: WarningCode = WarningCode(Self::CLASS_CONFIGURATION | 0x01);
    pub const INPUT_NOT_CONNECTED: WarningCode = WarningCode(Self::CLASS_CONFIGURATION | 0x02);

    pub fn class(self) -> u32 {
        self.0 & CLASS_MASK
    }
}

impl fmt::Debug for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WarningCode({:#08x})", self.0)
    }
}

/// Error and warning state of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeStatus {
    errors: BTreeMap<ErrorCode, String>,
    warnings: BTreeMap<WarningCode, String>,
    changed: bool,
}

impl NodeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an error. Returns true if it was not already set.
    pub fn set_error(&mut self, code: ErrorCode, message: impl Into<String>) -> bool {
        let newly_set = self.errors.insert(code, message.into()).is_none();
        self.changed |= newly_set;
        newly_set
    }

    /// Clear an error. Returns true if it was set.
    pub fn clear_error(&mut self, code: ErrorCode) -> bool {
        let cleared = self.errors.remove(&code).is_some();
        self.changed |= cleared;
        cleared
    }

    pub fn set_warning(&mut self, code: WarningCode, message: impl Into<String>) -> bool {
        let newly_set = self.warnings.insert(code, message.into()).is_none();
        self.changed |= newly_set;
        newly_set
    }

    pub fn clear_warning(&mut self, code: WarningCode) -> bool {
        let cleared = self.warnings.remove(&code).is_some();
        self.changed |= cleared;
        cleared
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.contains_key(&code)
    }

    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.contains_key(&code)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = (ErrorCode, &str)> {
        self.errors.iter().map(|(code, msg)| (*code, msg.as_str()))
    }

    pub fn warnings(&self) -> impl Iterator<Item = (WarningCode, &str)> {
        self.warnings.iter().map(|(code, msg)| (*code, msg.as_str()))
    }

    pub fn clear(&mut self) {
        if self.has_errors() || self.has_warnings() {
            self.changed = true;
        }
        self.errors.clear();
        self.warnings.clear();
    }

    /// True if any flag was raised or cleared since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let mut status = NodeStatus::new();
        assert!(status.set_error(ErrorCode::SOURCE_NOT_READABLE, "missing"));
        assert!(!status.set_error(ErrorCode::SOURCE_NOT_READABLE, "missing"));
        assert_eq!(status.errors().count(), 1);

        assert!(status.clear_error(ErrorCode::SOURCE_NOT_READABLE));
        assert!(!status.clear_error(ErrorCode::SOURCE_NOT_READABLE));
        assert!(!status.has_errors());
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut status = NodeStatus::new();
        status.set_warning(WarningCode::SOURCE_EMPTY, "no samples");
        assert!(!status.has_errors());
        assert!(status.has_warning(WarningCode::SOURCE_EMPTY));
    }

    #[test]
    fn test_code_classes() {
        assert_eq!(
            ErrorCode::FORMAT_NOT_READABLE.class(),
            ErrorCode::CLASS_LOADING
        );
        assert_eq!(
            WarningCode::SAMPLE_RATE_MISMATCH.class(),
            WarningCode::CLASS_CONFIGURATION
        );
    }

    #[test]
    fn test_change_tracking() {
        let mut status = NodeStatus::new();
        assert!(!status.take_changed());
        status.set_warning(WarningCode::SOURCE_EMPTY, "empty");
        assert!(status.take_changed());
        assert!(!status.take_changed());
        status.set_warning(WarningCode::SOURCE_EMPTY, "empty");
        assert!(!status.take_changed());
        status.clear();
        assert!(status.take_changed());
    }
}
