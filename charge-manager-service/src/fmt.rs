//! Logging macros forwarding to `defmt` or `log`
#![macro_use]
#![allow(unused_macros)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("You may not enable both `defmt` and `log` features.");

macro_rules! trace {
    ($s:literal $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::trace!($s);
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s);
        }
    };
    ($s:literal, $($x:expr),+ $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::trace!($s, $($x),+);
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s, $($x),+);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x, )+);
        }
    };
}

macro_rules! debug {
    ($s:literal $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::debug!($s);
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s);
        }
    };
    ($s:literal, $($x:expr),+ $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::debug!($s, $($x),+);
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s, $($x),+);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x, )+);
        }
    };
}

macro_rules! info {
    ($s:literal $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::info!($s);
            #[cfg(feature = "defmt")]
            ::defmt::info!($s);
        }
    };
    ($s:literal, $($x:expr),+ $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::info!($s, $($x),+);
            #[cfg(feature = "defmt")]
            ::defmt::info!($s, $($x),+);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x, )+);
        }
    };
}

macro_rules! warn {
    ($s:literal $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::warn!($s);
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s);
        }
    };
    ($s:literal, $($x:expr),+ $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::warn!($s, $($x),+);
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s, $($x),+);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x, )+);
        }
    };
}

macro_rules! error {
    ($s:literal $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::error!($s);
            #[cfg(feature = "defmt")]
            ::defmt::error!($s);
        }
    };
    ($s:literal, $($x:expr),+ $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::error!($s, $($x),+);
            #[cfg(feature = "defmt")]
            ::defmt::error!($s, $($x),+);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x, )+);
        }
    };
}
