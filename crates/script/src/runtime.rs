use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

use orrery_common::EntityId;
use orrery_ecs::{tags, Component, World};
use serde_json::Value;

use crate::error::{Phase, ScriptCallbackError, ScriptError};
use crate::event::ScriptEvent;
use crate::handle::{Deferred, EntityHandle, TimeInfo};
use crate::library::ScriptLibrary;
use crate::script::Script;

/// Lifecycle state of one binding.
///
/// `Unbound -> Started -> Running -> Stopped`. A stopped binding never
/// receives another callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Bound, `on_start` not yet run.
    Unbound,
    /// `on_start` ran; no update yet.
    Started,
    Running,
    Stopped,
}

impl BindingState {
    fn is_live(self) -> bool {
        matches!(self, Self::Started | Self::Running)
    }
}

struct Binding {
    script: Box<dyn Script>,
    state: BindingState,
    enabled: bool,
    subscriptions: BTreeSet<String>,
}

struct Timer {
    entity: EntityId,
    name: String,
    payload: Value,
    due: f64,
}

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub frame: u64,
    pub started: Vec<EntityId>,
    pub updated: Vec<EntityId>,
    /// Bindings that moved to `Stopped` this tick.
    pub stopped: Vec<EntityId>,
    /// Entities destroyed by deferred script requests.
    pub despawned: Vec<EntityId>,
    /// Number of `on_event` calls that succeeded.
    pub delivered: usize,
    pub errors: Vec<ScriptCallbackError>,
}

impl TickReport {
    /// True if no callback failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of binding scripts from declarative `script` components.
#[derive(Debug, Default)]
pub struct BindSummary {
    pub bound: Vec<EntityId>,
    pub failed: Vec<(EntityId, ScriptError)>,
}

/// One callback invocation.
#[derive(Clone, Copy)]
enum Callback<'e> {
    Start,
    Update(f64),
    Event(&'e ScriptEvent),
    Destroy,
    Enable,
    Disable,
}

impl Callback<'_> {
    fn phase(self) -> Phase {
        match self {
            Self::Start => Phase::Start,
            Self::Update(_) => Phase::Update,
            Self::Event(_) => Phase::Event,
            Self::Destroy => Phase::Destroy,
            Self::Enable => Phase::Enable,
            Self::Disable => Phase::Disable,
        }
    }
}

/// Dispatches script callbacks once per tick.
///
/// Bindings are visited in ascending entity id order. A callback error or
/// panic stops only the binding that raised it; the rest of the tick
/// proceeds. Stopped bindings stay queryable until the start of the next
/// tick, then are dropped.
///
/// An entity whose binding was unbound or failed while the entity lived is
/// *retired*: [`bind_from_components`](Self::bind_from_components) and
/// [`bind_entities`](Self::bind_entities) leave it alone until an explicit
/// [`bind`](Self::bind) or until the entity is destroyed.
#[derive(Default)]
pub struct ScriptRuntime {
    bindings: BTreeMap<EntityId, Binding>,
    retired: BTreeSet<EntityId>,
    pending: Vec<ScriptEvent>,
    timers: Vec<Timer>,
    time: TimeInfo,
}

impl std::fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("bindings", &self.bindings.len())
            .field("retired", &self.retired.len())
            .field("pending_events", &self.pending.len())
            .field("timers", &self.timers.len())
            .field("time", &self.time)
            .finish()
    }
}

impl ScriptRuntime {
    /// A runtime with no bindings, at frame 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timing of the most recent tick.
    pub fn time(&self) -> TimeInfo {
        self.time
    }

    /// Bind `script` to a live entity. It starts on the next tick.
    ///
    /// An existing live binding on the same entity is stopped first and gets
    /// its `on_destroy`. Binding explicitly clears the entity's retired mark.
    pub fn bind(
        &mut self,
        world: &mut World,
        entity: EntityId,
        script: Box<dyn Script>,
    ) -> Result<(), ScriptError> {
        self.bind_with(world, entity, script, true)
    }

    /// Like [`bind`](Self::bind), choosing whether the binding starts enabled.
    /// A disabled binding does not start until it is enabled.
    pub fn bind_with(
        &mut self,
        world: &mut World,
        entity: EntityId,
        script: Box<dyn Script>,
        enabled: bool,
    ) -> Result<(), ScriptError> {
        if !world.contains(entity) {
            return Err(ScriptError::UnknownEntity(entity));
        }
        if self.bindings.get(&entity).is_some_and(|b| b.state.is_live()) {
            if let Err(err) = self.unbind(world, entity) {
                tracing::error!(%entity, error = %err, "replaced script failed in on_destroy");
            }
        }
        self.retired.remove(&entity);
        tracing::debug!(%entity, kind = script.kind(), enabled, "script bound");
        self.bindings.insert(
            entity,
            Binding {
                script,
                state: BindingState::Unbound,
                enabled,
                subscriptions: BTreeSet::new(),
            },
        );
        Ok(())
    }

    /// Stop the binding on `entity`. Runs `on_destroy` if the script had
    /// started and the entity is still live.
    ///
    /// Returns whether a binding was stopped.
    pub fn unbind(&mut self, world: &mut World, entity: EntityId) -> Result<bool, ScriptError> {
        let Some(binding) = self.bindings.get_mut(&entity) else {
            return Ok(false);
        };
        if binding.state == BindingState::Stopped {
            return Ok(false);
        }
        let was_live = binding.state.is_live();
        binding.state = BindingState::Stopped;
        tracing::debug!(%entity, "script unbound");

        let mut result = Ok(());
        if was_live && world.contains(entity) {
            let mut deferred = Vec::new();
            result = call(binding.script.as_mut(), Callback::Destroy, entity, world, self.time, &mut deferred);
            self.apply_deferred(world, deferred);
        }
        if world.contains(entity) {
            self.retire(entity);
        } else {
            self.forget_entity(entity);
        }
        result?;
        Ok(true)
    }

    /// Enable or disable a binding. Started scripts get `on_enable` /
    /// `on_disable`; a failure there stops the binding.
    pub fn set_enabled(
        &mut self,
        world: &mut World,
        entity: EntityId,
        enabled: bool,
    ) -> Result<(), ScriptError> {
        let binding = self
            .bindings
            .get_mut(&entity)
            .filter(|b| b.state != BindingState::Stopped)
            .ok_or(ScriptError::NotBound(entity))?;
        if binding.enabled == enabled {
            return Ok(());
        }
        binding.enabled = enabled;
        if !binding.state.is_live() || !world.contains(entity) {
            return Ok(());
        }

        let callback = if enabled { Callback::Enable } else { Callback::Disable };
        let mut deferred = Vec::new();
        let result = call(binding.script.as_mut(), callback, entity, world, self.time, &mut deferred);
        if result.is_err() {
            binding.state = BindingState::Stopped;
        }
        self.apply_deferred(world, deferred);
        if result.is_err() && world.contains(entity) {
            self.retire(entity);
        }
        result.map_err(ScriptError::from)
    }

    /// Stop the binding on an entity the host has just destroyed, without
    /// any callback, and drop its timers and events addressed to it.
    ///
    /// Hosts that destroy entities between ticks call this so a recycled id
    /// never runs the previous occupant's script. Returns whether a binding
    /// was stopped.
    pub fn entity_destroyed(&mut self, entity: EntityId) -> bool {
        self.forget_entity(entity);
        match self.bindings.get_mut(&entity) {
            Some(binding) if binding.state != BindingState::Stopped => {
                binding.state = BindingState::Stopped;
                tracing::debug!(%entity, "entity destroyed; script stopped");
                true
            }
            _ => false,
        }
    }

    /// Current state of the binding on `entity`.
    pub fn state(&self, entity: EntityId) -> Option<BindingState> {
        self.bindings.get(&entity).map(|b| b.state)
    }

    /// Whether the binding on `entity` is enabled.
    pub fn is_enabled(&self, entity: EntityId) -> Option<bool> {
        self.bindings.get(&entity).map(|b| b.enabled)
    }

    /// True if the entity's script was unbound or failed while it lived,
    /// so declarative binding skips it.
    pub fn is_retired(&self, entity: EntityId) -> bool {
        self.retired.contains(&entity)
    }

    /// Kind name of the script bound to `entity`.
    pub fn kind_of(&self, entity: EntityId) -> Option<&str> {
        self.bindings.get(&entity).map(|b| b.script.kind())
    }

    /// Event names the binding on `entity` receives broadcasts for.
    pub fn subscriptions(&self, entity: EntityId) -> impl Iterator<Item = &str> {
        self.bindings
            .get(&entity)
            .into_iter()
            .flat_map(|b| b.subscriptions.iter().map(String::as_str))
    }

    /// Bindings that have not stopped.
    pub fn active_count(&self) -> usize {
        self.bindings
            .values()
            .filter(|b| b.state != BindingState::Stopped)
            .count()
    }

    /// Entities with a binding in any state, ascending.
    pub fn bound_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.bindings.keys().copied()
    }

    /// Queue an event from the host. It is delivered on the next tick.
    pub fn emit(&mut self, event: ScriptEvent) {
        tracing::trace!(name = %event.name, target = ?event.target, "event queued");
        self.pending.push(event);
    }

    /// Events waiting for the next tick, in emission order.
    pub fn pending_events(&self) -> &[ScriptEvent] {
        &self.pending
    }

    /// Timers not yet fired.
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Run one tick: start new bindings, deliver events and update started
    /// ones, then apply deferred requests.
    ///
    /// `dt` is clamped to be non-negative; a non-finite value counts as zero.
    pub fn tick(&mut self, world: &mut World, dt: f64) -> TickReport {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.bindings.retain(|_, b| b.state != BindingState::Stopped);
        self.time.delta = dt;
        self.time.elapsed += dt;
        self.time.frame += 1;
        let time = self.time;
        let events = self.take_due_events();

        let mut report = TickReport {
            frame: time.frame,
            ..TickReport::default()
        };
        let mut deferred = Vec::new();
        let mut gone = Vec::new();
        let mut failed = Vec::new();

        for (&id, binding) in self.bindings.iter_mut() {
            if !world.contains(id) {
                tracing::debug!(entity = %id, "entity gone; script stopped");
                binding.state = BindingState::Stopped;
                report.stopped.push(id);
                gone.push(id);
                continue;
            }
            if !binding.enabled {
                continue;
            }
            let Binding {
                script,
                state,
                subscriptions,
                ..
            } = binding;
            let outcome = match *state {
                BindingState::Unbound => {
                    tracing::trace!(entity = %id, "starting script");
                    call(script.as_mut(), Callback::Start, id, world, time, &mut deferred)
                        .map(|()| BindingState::Started)
                }
                BindingState::Started | BindingState::Running => {
                    tracing::trace!(entity = %id, dt, "updating script");
                    deliver(script.as_mut(), subscriptions, id, &events, world, time, &mut deferred)
                        .and_then(|delivered| {
                            report.delivered += delivered;
                            call(script.as_mut(), Callback::Update(dt), id, world, time, &mut deferred)
                        })
                        .map(|()| BindingState::Running)
                }
                BindingState::Stopped => continue,
            };

            match outcome {
                Ok(next) => {
                    *state = next;
                    if next == BindingState::Started {
                        report.started.push(id);
                    } else {
                        report.updated.push(id);
                    }
                }
                Err(err) => {
                    tracing::error!(
                        entity = %id,
                        kind = script.kind(),
                        error = %err,
                        "script callback failed; binding stopped"
                    );
                    *state = BindingState::Stopped;
                    report.stopped.push(id);
                    report.errors.push(err);
                    failed.push(id);
                }
            }
        }

        for id in gone {
            self.forget_entity(id);
        }
        for id in failed {
            self.retire(id);
        }
        for id in self.apply_deferred(world, deferred) {
            report.despawned.push(id);
            if !report.stopped.contains(&id) && self.bindings.contains_key(&id) {
                report.stopped.push(id);
            }
        }
        report
    }

    /// Bind every entity that carries a `script` component, has no live
    /// binding and is not retired, creating scripts from `library`.
    ///
    /// Entities whose script kind is unknown or whose params are invalid are
    /// reported and skipped; the rest still bind.
    pub fn bind_from_components(&mut self, world: &mut World, library: &ScriptLibrary) -> BindSummary {
        let entities: Vec<EntityId> = world.components().entities_with(tags::SCRIPT).collect();
        self.bind_entities(world, library, &entities)
    }

    /// [`bind_from_components`](Self::bind_from_components) restricted to
    /// `entities`, visited in the order given.
    pub fn bind_entities(
        &mut self,
        world: &mut World,
        library: &ScriptLibrary,
        entities: &[EntityId],
    ) -> BindSummary {
        let candidates: Vec<_> = entities
            .iter()
            .copied()
            .filter(|id| !self.retired.contains(id))
            .filter(|id| {
                self.bindings
                    .get(id)
                    .is_none_or(|b| b.state == BindingState::Stopped)
            })
            .filter_map(|id| {
                world
                    .get_component(id, tags::SCRIPT)
                    .and_then(Component::as_script)
                    .cloned()
                    .map(|spec| (id, spec))
            })
            .collect();

        let mut summary = BindSummary::default();
        for (id, spec) in candidates {
            let created = library
                .create(&spec.kind, &spec.params)
                .and_then(|script| self.bind_with(world, id, script, spec.enabled));
            match created {
                Ok(()) => summary.bound.push(id),
                Err(err) => {
                    tracing::warn!(entity = %id, kind = %spec.kind, error = %err, "skipping script component");
                    summary.failed.push((id, err));
                }
            }
        }
        summary
    }

    /// Stop every binding, running `on_destroy` for live ones. Errors are
    /// logged and returned; every binding is stopped regardless. Pending
    /// events, timers and retired marks are cleared.
    pub fn shutdown(&mut self, world: &mut World) -> Vec<ScriptError> {
        let ids: Vec<EntityId> = self.bindings.keys().copied().collect();
        let mut errors = Vec::new();
        for id in ids {
            if let Err(err) = self.unbind(world, id) {
                tracing::error!(entity = %id, error = %err, "script failed during shutdown");
                errors.push(err);
            }
        }
        self.bindings.clear();
        self.retired.clear();
        self.pending.clear();
        self.timers.clear();
        errors
    }

    /// Pending events followed by timers that are now due, earliest first.
    fn take_due_events(&mut self) -> Vec<ScriptEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let now = self.time.elapsed;
        let (mut due, waiting): (Vec<Timer>, Vec<Timer>) =
            std::mem::take(&mut self.timers).into_iter().partition(|t| t.due <= now);
        self.timers = waiting;
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        events.extend(due.into_iter().map(|timer| ScriptEvent {
            name: timer.name,
            payload: timer.payload,
            sender: Some(timer.entity),
            target: Some(timer.entity),
        }));
        events
    }

    /// Mark a live entity's stopped binding as not to be rebound from data.
    fn retire(&mut self, entity: EntityId) {
        self.timers.retain(|t| t.entity != entity);
        self.retired.insert(entity);
    }

    /// Drop everything kept for an entity that no longer exists.
    fn forget_entity(&mut self, entity: EntityId) {
        self.retired.remove(&entity);
        self.timers.retain(|t| t.entity != entity);
        self.pending.retain(|e| e.target != Some(entity));
    }

    /// Apply deferred requests. Bindings on destroyed entities stop without
    /// further callbacks. Returns the entities actually destroyed.
    fn apply_deferred(&mut self, world: &mut World, deferred: Vec<Deferred>) -> Vec<EntityId> {
        let mut destroyed = Vec::new();
        for request in deferred {
            match request {
                Deferred::Despawn(id) => {
                    if world.destroy(id) {
                        self.entity_destroyed(id);
                        destroyed.push(id);
                    }
                }
                Deferred::Emit(event) => self.pending.push(event),
                Deferred::Subscribe { entity, name } => {
                    if let Some(binding) = self.bindings.get_mut(&entity) {
                        binding.subscriptions.insert(name);
                    }
                }
                Deferred::Unsubscribe { entity, name } => {
                    if let Some(binding) = self.bindings.get_mut(&entity) {
                        binding.subscriptions.remove(&name);
                    }
                }
                Deferred::Timer {
                    entity,
                    name,
                    seconds,
                    payload,
                } => {
                    if self.bindings.get(&entity).is_some_and(|b| b.state != BindingState::Stopped) {
                        self.timers.push(Timer {
                            entity,
                            name,
                            payload,
                            due: self.time.elapsed + seconds,
                        });
                    }
                }
            }
        }
        destroyed
    }
}

/// Run one callback. A panic inside it is caught and reported like an error.
fn call(
    script: &mut dyn Script,
    callback: Callback<'_>,
    entity: EntityId,
    world: &mut World,
    time: TimeInfo,
    deferred: &mut Vec<Deferred>,
) -> Result<(), ScriptCallbackError> {
    let mut handle = EntityHandle::new(entity, world, time, deferred);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match callback {
        Callback::Start => script.on_start(&mut handle),
        Callback::Update(dt) => script.on_update(&mut handle, dt),
        Callback::Event(event) => script.on_event(&mut handle, event),
        Callback::Destroy => script.on_destroy(&mut handle),
        Callback::Enable => script.on_enable(&mut handle),
        Callback::Disable => script.on_disable(&mut handle),
    }));
    let result = outcome.unwrap_or_else(|payload| Err(ScriptError::Panicked(panic_message(&*payload))));
    result.map_err(|source| ScriptCallbackError {
        entity,
        phase: callback.phase(),
        source: Box::new(source),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Hand `entity` every event that reaches it, in order. Returns how many
/// were delivered; stops at the first failure.
fn deliver(
    script: &mut dyn Script,
    subscriptions: &BTreeSet<String>,
    entity: EntityId,
    events: &[ScriptEvent],
    world: &mut World,
    time: TimeInfo,
    deferred: &mut Vec<Deferred>,
) -> Result<usize, ScriptCallbackError> {
    let mut delivered = 0;
    for event in events.iter().filter(|e| e.reaches(entity, |name| subscriptions.contains(name))) {
        tracing::trace!(%entity, name = %event.name, "delivering event");
        call(script, Callback::Event(event), entity, world, time, deferred)?;
        delivered += 1;
    }
    Ok(delivered)
}
