// Panic in debug builds, no-op in release
#[macro_export]
macro_rules! debug_panic
{
    ($($arg:tt)*) =>
    {
        if cfg!(debug_assertions)
        {
            panic!($($arg)*)
        }
    }
}

/// Log (at warn) and return the error, for use with `map_err` or `inspect_err` at job boundaries
#[macro_export]
macro_rules! warn_err
{
    ($err:expr) =>
    {{
        let err = $err;
        log::warn!("{err:?}");
        err
    }};
    ($err:expr, $($arg:tt)+) =>
    {{
        let err = $err;
        log::warn!("{}: {err:?}", format_args!($($arg)+));
        err
    }};
}
