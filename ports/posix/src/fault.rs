//! Controller-side assertion failures.

use std::thread;

/// Reports a fatal controller assertion and parks the calling thread forever.
///
/// A controller that trips an assertion cannot be trusted to keep talking to
/// the host, so the thread stops here instead of unwinding.
pub fn controller_assert(file: &str, line: u32) -> ! {
    log::error!("controller assert at {file}:{line}");
    loop {
        thread::park();
    }
}

/// Invokes [`controller_assert`] with the caller's location when `cond` fails.
#[macro_export]
macro_rules! controller_assert {
    ($cond:expr) => {
        if !$cond {
            $crate::fault::controller_assert(file!(), line!());
        }
    };
}
