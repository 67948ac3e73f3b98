//! Logging shim.
//!
//! Forwards to `defmt` when the `defmt` feature is on and compiles to nothing otherwise, so host
//! tests link without a global logger.
#![macro_use]
#![allow(unused_macros)]

macro_rules! log_shim {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($t:tt)*) => { log_shim!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { log_shim!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { log_shim!(info, $($t)*) };
}

macro_rules! warn {
    ($($t:tt)*) => { log_shim!(warn, $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { log_shim!(error, $($t)*) };
}
