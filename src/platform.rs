//! Platform-extension parsing
//!
//! A file named `Button.ios.js` provides the iOS variant of module
//! `Button`: the token between the base name and the final extension is
//! the platform. Tokens outside the configured platform set fall through
//! to the generic sentinel.

use std::path::Path;

/// Sentinel platform for files without a platform token. A generic entry
/// applies to all platforms unless a more specific one exists.
pub const GENERIC_PLATFORM: &str = "g";

/// Platform token recognized by the module map's native fallback.
pub const NATIVE_PLATFORM: &str = "native";

/// Extract the platform token from the double-extension form
/// `Name.<platform>.<ext>`, if the token is in `platforms`.
pub fn platform_from_path(path: &str, platforms: &[String]) -> Option<String> {
    let file_name = Path::new(path).file_name()?.to_str()?;
    let mut parts = file_name.rsplit('.');
    let _ext = parts.next()?;
    let candidate = parts.next()?;
    // `a.ios.js` has a base name left over; bare `ios.js` does not.
    parts.next()?;
    if platforms.iter().any(|p| p == candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}
