//! The pass manager
//!
//! Owns the registry of pass kinds and the memoized instance table.
//! During a pipeline run the manager owns the CFG and metadata store;
//! exactly one pass executes at a time and receives them mutably
//! through its context. Everything here is single-threaded.

use crate::invoke::{Invocation, PassQuery};
use crate::pass::{InstanceKey, ParamSpec, Pass, Preserved, ResolvedArgs};
use indexmap::IndexMap;
use mica_common::{CancelToken, DebugSink, MicaResult, PassError};
use mica_ir::{Cfg, MetadataStore};

/// A registered pass kind: identity, docs, parameter table, and the
/// constructor from resolved arguments.
pub struct Registration {
    pub id: &'static str,
    pub summary: &'static str,
    pub params: &'static [ParamSpec],
    pub build: fn(&ResolvedArgs) -> Result<Box<dyn Pass>, PassError>,
}

impl Registration {
    /// Computed signature string, e.g. `cfold(iters=1)`; keyword-only
    /// formals follow a `*` marker.
    pub fn signature(&self) -> String {
        let mut parts = Vec::new();
        let mut starred = false;
        for param in self.params {
            if !param.positional && !starred {
                parts.push("*".to_string());
                starred = true;
            }
            parts.push(format!("{}={}", param.name, param.default));
        }
        if parts.is_empty() {
            self.id.to_string()
        } else {
            format!("{}({})", self.id, parts.join(", "))
        }
    }
}

struct Instance {
    /// Taken out while the pass is running; `None` here during
    /// `ensure_valid` means a require cycle.
    pass: Option<Box<dyn Pass>>,
    valid: bool,
    runs: usize,
}

#[derive(Clone)]
enum Binding {
    Wildcard,
    Given(String),
}

#[derive(Default)]
pub struct PassManager {
    registry: IndexMap<&'static str, Registration>,
    instances: IndexMap<InstanceKey, Instance>,
    sink: Option<Box<dyn DebugSink>>,
}

impl PassManager {
    pub fn new() -> PassManager {
        PassManager::default()
    }

    /// A manager with the stock passes registered.
    pub fn with_default_passes() -> PassManager {
        let mut manager = PassManager::new();
        for registration in crate::passes::defaults() {
            manager
                .register(registration)
                .expect("stock pass ids are unique");
        }
        manager
    }

    /// Install a sink for the debug channel. Messages also go to
    /// `log::debug!` regardless.
    pub fn set_debug_sink(&mut self, sink: Box<dyn DebugSink>) {
        self.sink = Some(sink);
    }

    pub fn take_debug_sink(&mut self) -> Option<Box<dyn DebugSink>> {
        self.sink.take()
    }

    pub fn register(&mut self, registration: Registration) -> Result<(), PassError> {
        if self.registry.contains_key(registration.id) {
            return Err(PassError::DuplicateId {
                id: registration.id.to_string(),
            });
        }
        self.registry.insert(registration.id, registration);
        Ok(())
    }

    /// Registered kinds, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.registry.values()
    }

    /// Human docstring plus computed signature.
    pub fn explain(&self, id: &str) -> Result<String, PassError> {
        let registration = self.registry.get(id).ok_or_else(|| PassError::UnknownPass {
            id: id.to_string(),
        })?;
        Ok(format!(
            "{} — {}",
            registration.signature(),
            registration.summary
        ))
    }

    /// Whether the instance's results reflect the current CFG.
    pub fn is_valid(&self, key: &InstanceKey) -> bool {
        self.instances
            .get(key)
            .map(|instance| instance.valid)
            .unwrap_or(false)
    }

    /// How many times the instance has run to completion.
    pub fn runs(&self, key: &InstanceKey) -> usize {
        self.instances
            .get(key)
            .map(|instance| instance.runs)
            .unwrap_or(0)
    }

    /// Keys of all memoized instances of `id`, in creation order.
    pub fn instances_of(&self, id: &str) -> Vec<InstanceKey> {
        self.instances
            .keys()
            .filter(|key| key.id == id)
            .cloned()
            .collect()
    }

    /// Resolve a query to an instance and make sure it is valid,
    /// running it (and, recursively, anything it requires) if not.
    pub fn require(
        &mut self,
        query: &PassQuery,
        cfg: &mut Cfg,
        meta: &mut MetadataStore,
        cancel: &CancelToken,
    ) -> MicaResult<InstanceKey> {
        let key = self.resolve_query(query)?;
        self.ensure_valid(&key, cfg, meta, cancel)?;
        Ok(key)
    }

    /// Run a pipeline: each invocation in order, skipping instances
    /// that are already valid. Cancellation is checked before every
    /// step and reports the index of the step about to run.
    pub fn run_pipeline(
        &mut self,
        steps: &[Invocation],
        cfg: &mut Cfg,
        meta: &mut MetadataStore,
        cancel: &CancelToken,
    ) -> MicaResult<Vec<InstanceKey>> {
        let mut keys = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PassError::Cancelled { index }.into());
            }
            let query = PassQuery::from(step);
            let key = self.require(&query, cfg, meta, cancel)?;
            keys.push(key);
        }
        Ok(keys)
    }

    /// Memoized lookup: returns an existing instance whose concrete
    /// arguments agree with the query, or constructs one substituting
    /// defaults for wildcards and unbound formals.
    fn resolve_query(&mut self, query: &PassQuery) -> Result<InstanceKey, PassError> {
        let registration =
            self.registry
                .get(query.id.as_str())
                .ok_or_else(|| PassError::UnknownPass {
                    id: query.id.clone(),
                })?;
        let bindings = bind(registration, query)?;

        for key in self.instances.keys() {
            if key.id != query.id {
                continue;
            }
            let agrees = bindings.iter().zip(&key.args).all(|(binding, arg)| {
                match binding {
                    Binding::Wildcard => true,
                    Binding::Given(value) => value == arg,
                }
            });
            if agrees {
                return Ok(key.clone());
            }
        }

        let args: Vec<String> = bindings
            .iter()
            .zip(registration.params)
            .map(|(binding, param)| match binding {
                Binding::Wildcard => param.default.to_string(),
                Binding::Given(value) => value.clone(),
            })
            .collect();
        let key = InstanceKey::new(query.id.clone(), args.clone());
        if self.instances.contains_key(&key) {
            return Ok(key);
        }

        let names: Vec<&'static str> = registration.params.iter().map(|p| p.name).collect();
        let resolved = ResolvedArgs::new(names.into_iter().zip(args).collect());
        let pass = (registration.build)(&resolved)?;
        self.instances.insert(
            key.clone(),
            Instance {
                pass: Some(pass),
                valid: false,
                runs: 0,
            },
        );
        log::debug!("constructed pass instance {key}");
        Ok(key)
    }

    fn ensure_valid(
        &mut self,
        key: &InstanceKey,
        cfg: &mut Cfg,
        meta: &mut MetadataStore,
        cancel: &CancelToken,
    ) -> MicaResult<()> {
        let Some(instance) = self.instances.get_mut(key) else {
            return Err(PassError::UnknownPass { id: key.to_string() }.into());
        };
        if instance.valid {
            return Ok(());
        }
        let Some(mut pass) = instance.pass.take() else {
            return Err(PassError::RequireCycle { id: key.to_string() }.into());
        };

        self.debug(&key.to_string(), "running");
        let result = pass.run(&mut PassCtx {
            cfg,
            meta,
            manager: self,
            cancel,
            origin: key.clone(),
        });

        let instance = self
            .instances
            .get_mut(key)
            .expect("instances are never removed");
        instance.pass = Some(pass);
        match result {
            Ok(preserved) => {
                instance.valid = true;
                instance.runs += 1;
                self.apply_preservation(key, &preserved);
                Ok(())
            }
            Err(err) => {
                // The pass may have half-mutated the CFG; its own
                // results certainly no longer hold.
                instance.valid = false;
                self.debug(&key.to_string(), &format!("failed: {err}"));
                Err(err)
            }
        }
    }

    /// Invalidate every instance the finished pass did not vouch for.
    /// A pass never invalidates itself by omission.
    fn apply_preservation(&mut self, just_ran: &InstanceKey, preserved: &Preserved) {
        let Preserved::Only(kept) = preserved else {
            return;
        };
        let mut dropped = Vec::new();
        for (key, instance) in &mut self.instances {
            if key != just_ran && instance.valid && !kept.contains(key) {
                instance.valid = false;
                dropped.push(key.to_string());
            }
        }
        if !dropped.is_empty() {
            self.debug(&just_ran.to_string(), &format!("invalidated {}", dropped.join(", ")));
        }
    }

    fn debug(&mut self, origin: &str, message: &str) {
        log::debug!(target: "mica_passes", "{origin}: {message}");
        if let Some(sink) = &mut self.sink {
            sink.emit(origin, message);
        }
    }
}

/// Bind query arguments against the formal parameter table.
fn bind(registration: &Registration, query: &PassQuery) -> Result<Vec<Binding>, PassError> {
    let params = registration.params;
    let bad = |reason: String| PassError::BadArguments {
        id: registration.id.to_string(),
        reason,
    };

    let mut slots: Vec<Option<Binding>> = vec![None; params.len()];
    let positional_slots: Vec<usize> = params
        .iter()
        .enumerate()
        .filter(|(_, param)| param.positional)
        .map(|(index, _)| index)
        .collect();
    if query.positional.len() > positional_slots.len() {
        return Err(bad(format!(
            "takes at most {} positional arguments, got {}",
            positional_slots.len(),
            query.positional.len()
        )));
    }
    for (value, slot) in query.positional.iter().zip(positional_slots) {
        slots[slot] = Some(match value {
            None => Binding::Wildcard,
            Some(value) => Binding::Given(value.clone()),
        });
    }
    for (name, value) in &query.keyword {
        let Some(slot) = params.iter().position(|param| param.name == name) else {
            return Err(bad(format!("unknown keyword {name:?}")));
        };
        if slots[slot].is_some() {
            return Err(bad(format!("argument {name:?} bound twice")));
        }
        slots[slot] = Some(match value {
            None => Binding::Wildcard,
            Some(value) => Binding::Given(value.clone()),
        });
    }

    Ok(slots
        .into_iter()
        .zip(params)
        .map(|(slot, param)| slot.unwrap_or(Binding::Given(param.default.to_string())))
        .collect())
}

/// What a running pass sees: the CFG and metadata it owns for the
/// duration, plus the manager for `require` and the debug channel.
pub struct PassCtx<'a> {
    pub cfg: &'a mut Cfg,
    pub meta: &'a mut MetadataStore,
    manager: &'a mut PassManager,
    cancel: &'a CancelToken,
    origin: InstanceKey,
}

impl PassCtx<'_> {
    /// Depend on another pass: resolve it and run it first if its
    /// results are stale. Call this before mutating the CFG, never
    /// mid-surgery.
    pub fn require(&mut self, query: &PassQuery) -> MicaResult<InstanceKey> {
        let key = self.manager.resolve_query(query)?;
        self.manager
            .ensure_valid(&key, self.cfg, self.meta, self.cancel)?;
        Ok(key)
    }

    /// Keys of the memoized instances of `id`; useful for building
    /// preservation sets.
    pub fn instances_of(&self, id: &str) -> Vec<InstanceKey> {
        self.manager.instances_of(id)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emit on the debug channel. The message closure only runs when
    /// someone is listening.
    pub fn debug(&mut self, message: impl FnOnce() -> String) {
        if self.manager.sink.is_some() || log::log_enabled!(log::Level::Debug) {
            let origin = self.origin.to_string();
            let message = message();
            self.manager.debug(&origin, &message);
        }
    }
}
