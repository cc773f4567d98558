//! Code useful for testing.
use core::sync::atomic::{AtomicBool, Ordering::SeqCst};

/// Tracks whether the global default logger is initialized.
static LOGGER_INIT: AtomicBool = AtomicBool::new(false);

/// Ensures the test logger is initialized.
///
/// This function uses atomics to ensure that the test logger is only
/// ever initialized once.  Set `RUST_LOG=rift=trace` to see where errors are
/// raised.
pub(crate) fn init_test_logger() {
  if LOGGER_INIT
    .compare_exchange(false, true, SeqCst, SeqCst)
    .is_ok()
  {
    let result = env_logger::Builder::from_default_env()
      .default_format()
      .format_timestamp_nanos()
      .is_test(true)
      .try_init();
    match result {
      Ok(_) => log::info!("Initialized test logger"),
      Err(err) => std::eprintln!("test logger unavailable: {err}"),
    }
  }
}
