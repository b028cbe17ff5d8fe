use crate::error::ScriptError;
use crate::event::ScriptEvent;
use crate::handle::EntityHandle;

/// Lifecycle callbacks a script implements.
///
/// `on_start` runs once, on the first tick after binding. `on_update` runs on
/// every later tick with the elapsed seconds since the previous one. The
/// remaining callbacks are optional.
pub trait Script: Send {
    /// Name of the script kind, for logs and inspectors.
    fn kind(&self) -> &str {
        "custom"
    }

    fn on_start(&mut self, _entity: &mut EntityHandle<'_>) -> Result<(), ScriptError> {
        Ok(())
    }

    fn on_update(&mut self, entity: &mut EntityHandle<'_>, dt: f64) -> Result<(), ScriptError>;

    /// Called before `on_update` for each event that reaches this binding:
    /// broadcasts it subscribed to, events targeted at its entity and its
    /// own timers.
    fn on_event(&mut self, _entity: &mut EntityHandle<'_>, _event: &ScriptEvent) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Called when the binding is explicitly removed while its entity lives.
    fn on_destroy(&mut self, _entity: &mut EntityHandle<'_>) -> Result<(), ScriptError> {
        Ok(())
    }

    fn on_enable(&mut self, _entity: &mut EntityHandle<'_>) -> Result<(), ScriptError> {
        Ok(())
    }

    fn on_disable(&mut self, _entity: &mut EntityHandle<'_>) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// A script whose update is a closure. Handy for host-side glue and tests.
pub struct FnScript<F> {
    update: F,
}

/// Wrap an update closure as a [`Script`].
pub fn from_fn<F>(update: F) -> FnScript<F>
where
    F: FnMut(&mut EntityHandle<'_>, f64) -> Result<(), ScriptError> + Send,
{
    FnScript { update }
}

impl<F> Script for FnScript<F>
where
    F: FnMut(&mut EntityHandle<'_>, f64) -> Result<(), ScriptError> + Send,
{
    fn kind(&self) -> &str {
        "fn"
    }

    fn on_update(&mut self, entity: &mut EntityHandle<'_>, dt: f64) -> Result<(), ScriptError> {
        (self.update)(entity, dt)
    }
}
