//! Logging macros that forward to `tracing` when the matching level feature is
//! enabled on this crate and expand to nothing otherwise.
//!
//! The feature check happens here, when the macros are defined, so the caller's
//! own feature set has no say in what gets logged. A disabled macro discards
//! its arguments at expansion time.

#[doc(hidden)]
pub use tracing as __tracing;

#[cfg(feature = "log_info")]
#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {
        $crate::__tracing::info!($($t)*)
    };
}

#[cfg(not(feature = "log_info"))]
#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "log_warnings")]
#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {
        $crate::__tracing::warn!($($t)*)
    };
}

#[cfg(not(feature = "log_warnings"))]
#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "log_errors")]
#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {
        $crate::__tracing::error!($($t)*)
    };
}

#[cfg(not(feature = "log_errors"))]
#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "log_debug")]
#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {
        $crate::__tracing::debug!($($t)*)
    };
}

#[cfg(not(feature = "log_debug"))]
#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "log_trace")]
#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {
        $crate::__tracing::trace!($($t)*)
    };
}

#[cfg(not(feature = "log_trace"))]
#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {{}};
}
