//! Toggle gates
//!
//! Every sink carries one gate, resolved from configuration when the sink is
//! built and never changed afterwards. Callers pick per call site whether a
//! disabled sink is skipped or fails the whole operation.

/// A capability that can be switched off
pub trait Togglable {
    /// Whether the capability is on
    fn enabled(&self) -> bool;

    /// No-op when enabled, otherwise hands back `err` unchanged
    fn require_enabled<E>(&self, err: E) -> Result<(), E>
    where
        Self: Sized,
    {
        if self.enabled() { Ok(()) } else { Err(err) }
    }

    /// Run `action` only when enabled; when disabled `action` is never called
    fn guard<T, E>(&self, err: E, action: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized,
    {
        self.require_enabled(err)?;
        action()
    }
}

/// Fixed on/off flag for one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleGate {
    enabled: bool,
}

impl ToggleGate {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub const fn on() -> Self {
        Self::new(true)
    }

    pub const fn off() -> Self {
        Self::new(false)
    }
}

impl Togglable for ToggleGate {
    #[inline]
    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Marker(&'static str);

    #[test]
    fn test_enabled_gate_passes() {
        assert_eq!(ToggleGate::on().require_enabled(Marker("bus")), Ok(()));
    }

    #[test]
    fn test_disabled_gate_returns_supplied_error() {
        assert_eq!(
            ToggleGate::off().require_enabled(Marker("bus required")),
            Err(Marker("bus required"))
        );
    }

    #[test]
    fn test_guard_never_runs_action_when_disabled() {
        let calls = Cell::new(0);
        let result = ToggleGate::off().guard(Marker("off"), || {
            calls.set(calls.get() + 1);
            Ok::<_, Marker>(42)
        });
        assert_eq!(result, Err(Marker("off")));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_guard_runs_action_when_enabled() {
        let calls = Cell::new(0);
        let result = ToggleGate::on().guard(Marker("off"), || {
            calls.set(calls.get() + 1);
            Ok::<_, Marker>(42)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }
}
