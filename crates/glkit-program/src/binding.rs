//! Scoped binding of the current program.

use glkit_common::{GlKitError, Result};
use glkit_driver::Driver;
use tracing::{trace, warn};

/// Makes a program current for as long as the guard lives.
///
/// The previously current program is captured on construction. If binding had
/// to change it, it is restored when the guard is dropped, including during
/// early returns and unwinding. Construction fails if the driver refuses the
/// switch, so nothing is ever written through a guard into another program.
#[must_use = "the previous program is restored as soon as the guard is dropped"]
pub struct ProgramBinding<'a> {
    driver: &'a dyn Driver,
    previous: u32,
    changed: bool,
}

impl<'a> ProgramBinding<'a> {
    /// Bind `program`, remembering what was current.
    pub fn bind(driver: &'a dyn Driver, program: u32) -> Result<Self> {
        let previous = driver.current_program();
        let changed = previous != program;
        if changed {
            trace!(program, previous, "binding program");
            driver.use_program(program);
            let current = driver.current_program();
            if current != program {
                warn!(program, current, "driver refused to bind program");
                return Err(GlKitError::invalid_operation(format!(
                    "program {program} could not be made current"
                )));
            }
        }
        Ok(Self {
            driver,
            previous,
            changed,
        })
    }

    /// The program that was current before the guard was created.
    pub fn previous(&self) -> u32 {
        self.previous
    }

    /// Whether creating the guard changed the current program.
    pub fn changed_binding(&self) -> bool {
        self.changed
    }

    /// Restore the previous program now instead of at end of scope.
    pub fn restore(mut self) {
        self.restore_previous();
    }

    fn restore_previous(&mut self) {
        if std::mem::take(&mut self.changed) {
            trace!(program = self.previous, "restoring program");
            self.driver.use_program(self.previous);
        }
    }
}

impl Drop for ProgramBinding<'_> {
    fn drop(&mut self) {
        self.restore_previous();
    }
}
