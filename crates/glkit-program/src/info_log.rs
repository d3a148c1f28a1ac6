//! Growing-buffer retrieval of program diagnostics.

use glkit_common::InfoLogConfig;
use glkit_driver::Driver;
use tracing::{trace, warn};

/// Read the program info log, growing the buffer until the text fits.
///
/// The text fits once the driver writes fewer than `size - 1` bytes. If every
/// candidate size is exhausted, the truncated text of the last attempt is
/// returned (empty if no attempt was made).
pub(crate) fn fetch_info_log(driver: &dyn Driver, program: u32, config: &InfoLogConfig) -> String {
    let mut text = String::new();
    for size in config.buffer_sizes() {
        let mut buf = vec![0u8; size];
        let length = driver.get_program_info_log(program, &mut buf).min(size);
        text = String::from_utf8_lossy(&buf[..length]).into_owned();
        if length < size - 1 {
            return text;
        }
        trace!(program, size, "info log truncated, retrying with a larger buffer");
    }
    warn!(
        program,
        max_size = config.max_size,
        returned = text.len(),
        "info log exceeds the buffer bound, returning truncated text"
    );
    text
}
