use core::fmt::Debug;
use log::{Level, STATIC_MAX_LEVEL};

/// When enabling backtraces (but not feature `backtrace_full`), the number of
/// stack frames to log.
#[cfg(feature = "backtrace")]
const SHORT_BACKTRACE_LOG_FRAMES: usize = 2;

/// Utility trait for error reporting, primarily used with [`Option`].
///
/// This provides an alternative to `Option`'s `ok_or()` which reports the
/// error at the point it is generated.  Checked offset arithmetic on untrusted
/// buffers is the main user: the interesting information (which offset
/// overflowed) is lost by the time the error reaches the caller.
pub(crate) trait OkOrLog<O, E>: Sized
where
  E: Debug,
{
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E>;
}

impl<O, E> OkOrLog<O, E> for Option<O>
where
  E: Debug,
{
  #[inline(always)]
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E> {
    match self {
      Some(value) => Ok(value),
      None => Err(log_err_value(level, error)),
    }
  }
}

/// Logs errors passing through a `Result` at the given level.
pub(crate) trait LogErr<O, E>
where
  E: Debug,
{
  fn log_err(self, level: Level) -> Result<O, E>;
}

impl<O, E> LogErr<O, E> for Result<O, E>
where
  E: Debug,
{
  #[inline(always)]
  fn log_err(self, level: Level) -> Result<O, E> {
    self.map_err(|error| log_err_value(level, error))
  }
}

#[inline(always)]
fn log_err_value<E: Debug>(level: Level, error: E) -> E {
  // Const comparison allows dead code elimination.
  if level <= STATIC_MAX_LEVEL {
    log::log!(level, "{:?}", error);
    #[cfg(feature = "backtrace")]
    {
      let mut bt = backtrace::Backtrace::new_unresolved();
      bt.resolve();
      if cfg!(feature = "backtrace_full") {
        log::trace!("{:?}", bt);
      } else {
        for frame in bt.frames().iter().skip(1).take(SHORT_BACKTRACE_LOG_FRAMES)
        {
          log::trace!("{frame:?}");
        }
      }
    }
  }
  error
}
