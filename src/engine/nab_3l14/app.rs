use std::fmt::Debug;
use std::process::ExitCode;
use std::sync::atomic::{AtomicI32, Ordering};

// every engine crate logs at the app's verbosity, everything else at the default
const ENGINE_CRATES: [&str; 4] = ["nab_3l14", "math_3l14", "anim_3l14", "geometry_3l14"];

fn joined_args() -> String
{
    std::env::args().collect::<Vec<_>>().join(" ")
}

pub trait CliArgs: clap::Parser + Debug { }
impl<T: clap::Parser + Debug> CliArgs for T { }

fn crate_name<T>() -> &'static str
{
    let name = std::any::type_name::<T>();
    match name.find("::")
    {
        Some(end) => &name[0..end],
        None => name,
    }
}

#[derive(Debug)]
pub struct AppRun<TCliArgs: CliArgs>
{
    pub app_name: &'static str,
    pub version_str: &'static str,

    pub start_time: chrono::DateTime<chrono::Local>,
    pub args: TCliArgs,
    pub pid: u32,
    pub is_elevated: bool,

    exit_reason: AtomicI32,
}
impl<TCliArgs: CliArgs> AppRun<TCliArgs>
{
    pub fn startup(app_name: &'static str, app_version: &'static str) -> Self
    {
        let args = TCliArgs::parse();
        Self::startup_with_args(app_name, app_version, args)
    }

    pub fn startup_with_args(app_name: &'static str, app_version: &'static str, args: TCliArgs) -> Self
    {
        #[cfg(debug_assertions)]
        let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Debug);
        #[cfg(not(debug_assertions))]
        let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Info);
        let app_crate = crate_name::<TCliArgs>();

        let mut logger = colog::basic_builder();
        logger
            .filter_level(default_log_levels.0)
            .filter_module(app_crate, default_log_levels.1);
        for engine_crate in ENGINE_CRATES
        {
            logger.filter_module(engine_crate, default_log_levels.1);
        }
        // a logger may already be installed (e.g. multiple runs in one process)
        let _ = logger.parse_default_env().try_init();

        let app_run = Self
        {
            app_name,
            version_str: app_version,
            start_time: chrono::Local::now(),
            args,
            pid: std::process::id(),
            #[cfg(not(target_family="wasm"))]
            is_elevated: is_root::is_root(),
            #[cfg(target_family="wasm")]
            is_elevated: false,
            exit_reason: AtomicI32::new(ExitReason::NormalExit as i32),
        };

        log::info!(target: app_crate,
            "=== Starting {} v{} [{}] (PID {}){} at {} ===",
            app_run.app_name,
            app_run.version_str,
            joined_args(),
            app_run.pid,
            if app_run.is_elevated { " elevated" } else { "" },
            app_run.start_time);
        log::debug!(target: app_crate, "{:?}", app_run.args);

        app_run
    }

    pub fn set_exit_reason(&self, exit_reason: ExitReason)
    {
        self.exit_reason.store(exit_reason as i32, Ordering::SeqCst);
    }
    pub fn get_exit_reason(&self) -> ExitReason
    {
        ExitReason::from_i32(self.exit_reason.load(Ordering::SeqCst))
    }
}
impl<TCliArgs: CliArgs> Drop for AppRun<TCliArgs>
{
    fn drop(&mut self)
    {
        log::info!(target: "app",
            "Exiting {} (PID {}) at {} with reason {:?}",
            self.app_name,
            self.pid,
            chrono::Local::now(),
            self.get_exit_reason());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitReason
{
    Unset = !1, // this should never be set
    NormalExit = 0,
    InvalidInput = 2,
    JobFailed = 3,
    Panic = -99,
}
impl ExitReason
{
    fn from_i32(value: i32) -> Self
    {
        match value
        {
            0 => Self::NormalExit,
            2 => Self::InvalidInput,
            3 => Self::JobFailed,
            -99 => Self::Panic,
            _ => Self::Unset,
        }
    }
}
impl std::process::Termination for ExitReason
{
    fn report(self) -> ExitCode
    {
        (self as u8).into()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[derive(clap::Parser, Debug)]
    struct TestArgs
    {
        #[arg(long, default_value_t = 1)]
        count: u32,
    }

    #[test]
    fn exit_reasons()
    {
        for reason in [ExitReason::NormalExit, ExitReason::InvalidInput, ExitReason::JobFailed, ExitReason::Panic]
        {
            assert_eq!(ExitReason::from_i32(reason as i32), reason);
        }
        assert_eq!(ExitReason::from_i32(12345), ExitReason::Unset);
    }

    #[test]
    fn startup()
    {
        use clap::Parser;
        let args = TestArgs::parse_from(["test", "--count", "4"]);
        let app = AppRun::startup_with_args("test", "0.0", args);
        assert_eq!(app.args.count, 4);
        assert_eq!(app.get_exit_reason(), ExitReason::NormalExit);
        app.set_exit_reason(ExitReason::JobFailed);
        assert_eq!(app.get_exit_reason(), ExitReason::JobFailed);
        assert_eq!(crate_name::<TestArgs>(), "nab_3l14");
    }
}
