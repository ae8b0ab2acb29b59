//! Standardized logging for the outputdevice server
//!
//! This module provides the `wlog!` macro which ensures lifecycle logs
//! follow the `YYYY-MM-DD HH:MM:SS [MODULE] Message` format.

#[macro_export]
macro_rules! wlog {
    ($module:expr, $($arg:tt)*) => {{
        let now = chrono::Local::now();
        eprintln!("{} [{}] {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            $module,
            format!($($arg)*)
        );
    }};
}

/// Standardized module identifiers
pub const MAIN: &str = "MAIN";
pub const OUTPUT: &str = "OUTPUT";
pub const DISCOVERY: &str = "DISCOVERY";
pub const PROTOCOL: &str = "PROTOCOL";
pub const CONFIG: &str = "CONFIG";
pub const COMPOSITOR: &str = "COMPOSITOR";
