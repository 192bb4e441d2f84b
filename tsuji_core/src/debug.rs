//! Debug logging module for development-time diagnostics
//!
//! Conditional compilation macros that enable detailed logging while
//! developing the router, with zero runtime overhead in production builds.
//! All macros are controlled by the `dev-log` feature flag.
//!
//! Enable the feature in your Cargo.toml or via command line:
//! ```bash
//! cargo test --features "dev-log"
//! ```

/// General-purpose debug logging macro
///
/// Outputs informational messages prefixed with `[DEBUG]`.
///
/// # Examples
/// ```rust
/// use tsuji_core::debug_log;
/// debug_log!("registered {} endpoints", 3);
/// ```
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        println!("[DEBUG] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

/// Warning logging macro for potentially problematic conditions
///
/// Outputs to stderr with `[WARN]` prefix.
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_warn {
    ($($arg:tt)*) => {
        eprintln!("[WARN] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_warn {
    ($($arg:tt)*) => {};
}

/// Detailed trace logging for verbose debugging
///
/// Outputs with `[TRACE]` prefix. Used on the trie walk path, where one
/// request can produce many lines.
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        println!("[TRACE] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_trace {
    ($($arg:tt)*) => {};
}
