/// Whether [`assert_param!`](crate::assert_param) checks are live.
pub const FULL_ASSERT: bool = cfg!(feature = "full-assert");

/// Parameter-check failure hook. Logs where the check failed, then parks
/// the calling thread forever. There is no recovery path.
pub fn assert_failed(file: &str, line: u32) -> ! {
    tracing::error!("Wrong parameter value: file {} on line {}", file, line);
    loop {
        std::thread::park();
    }
}

/// Check a driver parameter. Compiled out unless `full-assert` is enabled.
#[macro_export]
macro_rules! assert_param {
    ($cond:expr) => {
        if $crate::fault::FULL_ASSERT && !($cond) {
            $crate::fault::assert_failed(file!(), line!());
        }
    };
}
