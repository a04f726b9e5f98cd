// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::CairnError;
use crate::merge::merge_all;
use crate::path::ConfigPath;
use crate::source;
use crate::value::{
    ConfigList, ConfigObject, DelayedMerge, ResolveStatus, Substitution, Value, ValueKind,
};

use super::ResolveOptions;

/// Why a step of the resolve could not produce a value.
pub(super) enum Failure {
    /// The value is part of a cycle. Carries the paths in flight when the cycle
    /// closed. Only a substitution may turn this into a user-facing error.
    Cycle(Vec<ConfigPath>),
    /// A user-facing error that aborts the whole resolve.
    Fatal(CairnError),
}

type Step<T> = std::result::Result<T, Failure>;

pub(super) fn render_trace(trace: &[ConfigPath]) -> String {
    trace
        .iter()
        .map(ConfigPath::render)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// State of one resolve pass.
pub(super) struct ResolveContext<'a> {
    root: &'a ConfigObject,
    options: &'a ResolveOptions,
    /// Only this subtree is rewritten by the top-level walk.
    restrict_to: Option<ConfigPath>,
    /// Paths whose substitution or delayed merge is currently being resolved.
    in_flight: Vec<ConfigPath>,
    /// While a delayed merge layer resolves, lookups of the merge's own path
    /// see the layers below it. Latest entry wins.
    overrides: Vec<(ConfigPath, Value)>,
    memos: HashMap<ConfigPath, Option<Value>>,
    cycles_seen: usize,
}

impl<'a> ResolveContext<'a> {
    pub(super) fn new(
        root: &'a ConfigObject,
        options: &'a ResolveOptions,
        restrict_to: Option<ConfigPath>,
    ) -> Self {
        Self {
            root,
            options,
            restrict_to,
            in_flight: Vec::new(),
            overrides: Vec::new(),
            memos: HashMap::new(),
            cycles_seen: 0,
        }
    }

    pub(super) fn memo_count(&self) -> usize {
        self.memos.len()
    }

    /// Resolves `value`, which lives at `at`. `Ok(None)` means the value
    /// vanished (an optional substitution with no target).
    pub(super) fn resolve_value(&mut self, value: &Value, at: &ConfigPath) -> Step<Option<Value>> {
        if value.is_resolved() {
            return Ok(Some(value.clone()));
        }
        match value.kind() {
            ValueKind::Object(o) => self.resolve_object(value, o, at),
            ValueKind::List(l) => self.resolve_list(value, l, at),
            ValueKind::Reference(s) => self.resolve_reference(value, s, at),
            ValueKind::DelayedMerge(m) => self.resolve_delayed_merge(m, at),
            _ => Ok(Some(value.clone())),
        }
    }

    fn in_scope(&self, path: &ConfigPath) -> bool {
        match &self.restrict_to {
            None => true,
            Some(r) => r.starts_with(path) || path.starts_with(r),
        }
    }

    fn must_be_complete(&self) -> bool {
        self.restrict_to.is_none() && !self.options.allow_unresolved
    }

    fn resolve_object(&mut self, value: &Value, o: &ConfigObject, at: &ConfigPath) -> Step<Option<Value>> {
        let mut fields = IndexMap::with_capacity(o.len());
        for (key, child) in o.iter() {
            let child_path = at.child(key);
            if child.is_resolved() || !self.in_scope(&child_path) {
                fields.insert(key.clone(), child.clone());
                continue;
            }
            if let Some(resolved) = self.resolve_value(child, &child_path)? {
                fields.insert(key.clone(), resolved);
            }
        }

        let object = if self.must_be_complete() {
            ConfigObject::with_status(fields, ResolveStatus::Resolved, o.ignores_fallbacks())
                .map_err(Failure::Fatal)?
        } else {
            ConfigObject::from_parts(fields, o.ignores_fallbacks())
        };
        Ok(Some(Value::from_object(value.origin().clone(), object)))
    }

    fn resolve_list(&mut self, value: &Value, l: &ConfigList, at: &ConfigPath) -> Step<Option<Value>> {
        // a list has no child paths, so a restriction below it leaves it alone
        if let Some(r) = &self.restrict_to {
            if !at.starts_with(r) {
                return Ok(Some(value.clone()));
            }
        }

        let mut items = Vec::with_capacity(l.len());
        for item in l.iter() {
            if let Some(resolved) = self.resolve_value(item, at)? {
                items.push(resolved);
            }
        }

        let list = if self.must_be_complete() {
            ConfigList::with_status(items, ResolveStatus::Resolved).map_err(Failure::Fatal)?
        } else {
            ConfigList::new(items)
        };
        Ok(Some(Value::new(value.origin().clone(), ValueKind::List(list))))
    }

    fn resolve_reference(&mut self, value: &Value, s: &Substitution, at: &ConfigPath) -> Step<Option<Value>> {
        self.in_flight.push(at.clone());
        let outcome = self.lookup(s.path());
        self.in_flight.pop();

        match outcome {
            Ok(Some(found)) => Ok(Some(found)),
            Ok(None) => self.missing(value, s),
            Err(Failure::Cycle(trace)) => {
                if s.is_optional() {
                    log::trace!("optional {} is part of a cycle, dropping it", s.render());
                    Ok(None)
                } else if self.options.allow_unresolved {
                    Ok(Some(value.clone()))
                } else {
                    Err(Failure::Fatal(CairnError::CycleDetected {
                        path: s.path().render(),
                        origin: value.origin().description(),
                        trace: render_trace(&trace),
                    }))
                }
            }
            Err(fatal) => Err(fatal),
        }
    }

    fn missing(&self, value: &Value, s: &Substitution) -> Step<Option<Value>> {
        if self.options.use_system_environment {
            if let Some(env) = env_lookup(s) {
                log::trace!("{} taken from the environment", s.render());
                return Ok(Some(env));
            }
        }
        if s.is_optional() {
            return Ok(None);
        }
        if self.options.allow_unresolved {
            return Ok(Some(value.clone()));
        }
        Err(Failure::Fatal(CairnError::MissingValue {
            path: s.path().render(),
            origin: value.origin().description(),
            hint: Some(format!(
                "Define '{}' in one of the merged sources, or use ${{?{}}} if it may be absent",
                s.unprefixed_path().render(),
                s.unprefixed_path().render()
            )),
        }))
    }

    fn resolve_delayed_merge(&mut self, m: &DelayedMerge, at: &ConfigPath) -> Step<Option<Value>> {
        self.in_flight.push(at.clone());
        let outcome = self.collapse(m, at);
        self.in_flight.pop();
        outcome
    }

    /// Resolves each layer and merges them top down.
    fn collapse(&mut self, m: &DelayedMerge, at: &ConfigPath) -> Step<Option<Value>> {
        let stack = m.stack();
        log::trace!("collapsing {} merge layers at {}", stack.len(), at);

        let mut merged: Option<Value> = None;
        for (i, layer) in stack.iter().enumerate() {
            let resolved = if layer.is_resolved() {
                Some(layer.clone())
            } else {
                let below = &stack[i + 1..];
                let pushed = !below.is_empty();
                if pushed {
                    self.overrides.push((at.clone(), merge_all(below)));
                }
                let outcome = self.resolve_value(layer, at);
                if pushed {
                    self.overrides.pop();
                }
                outcome?
            };

            if let Some(r) = resolved {
                merged = Some(match merged {
                    None => r,
                    Some(above) => above.with_fallback(&r),
                });
            }

            if merged.as_ref().is_some_and(Value::ignores_fallbacks) {
                break;
            }
        }
        Ok(merged)
    }

    fn cycle(&mut self, target: &ConfigPath) -> Failure {
        self.cycles_seen += 1;
        let mut trace = self.in_flight.clone();
        trace.push(target.clone());
        Failure::Cycle(trace)
    }

    fn override_index(&self, path: &ConfigPath) -> Option<usize> {
        self.overrides.iter().rposition(|(p, _)| p == path)
    }

    /// Finds and fully resolves the value at `target` in the root.
    fn lookup(&mut self, target: &ConfigPath) -> Step<Option<Value>> {
        log::trace!("looking up ${{{}}}", target);

        let keys = target.keys();
        let mut current: ConfigObject = self.root.clone();
        let mut here = ConfigPath::root();

        for (i, key) in keys.iter().enumerate() {
            here = here.child(key);
            let last = i + 1 == keys.len();

            let node = if let Some(index) = self.override_index(&here) {
                // the override is hidden while its own value resolves
                let (path, replacement) = self.overrides.remove(index);
                let outcome = if last {
                    self.resolve_target(&replacement, &here, true)
                } else {
                    self.see_through(&replacement, &here)
                };
                self.overrides.insert(index, (path, replacement));
                outcome?
            } else {
                let Some(child) = current.get(key).cloned() else {
                    return Ok(None);
                };
                if last {
                    self.resolve_target(&child, &here, false)?
                } else {
                    self.see_through(&child, &here)?
                }
            };

            let Some(node) = node else {
                return Ok(None);
            };
            if last {
                return Ok(Some(node));
            }
            match node.kind() {
                ValueKind::Object(o) => current = o.clone(),
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Resolves a placeholder met half way along a lookup path so the walk can continue.
    fn see_through(&mut self, value: &Value, here: &ConfigPath) -> Step<Option<Value>> {
        match value.kind() {
            ValueKind::Reference(_) | ValueKind::DelayedMerge(_) => {
                if self.in_flight.contains(here) {
                    return Err(self.cycle(here));
                }
                self.resolve_value(value, here)
            }
            _ => Ok(Some(value.clone())),
        }
    }

    fn resolve_target(&mut self, value: &Value, target: &ConfigPath, from_override: bool) -> Step<Option<Value>> {
        if value.is_resolved() {
            return Ok(Some(value.clone()));
        }

        if !from_override {
            // the target itself, or something inside it, is already being resolved
            if self.in_flight.iter().any(|p| p.starts_with(target)) {
                return Err(self.cycle(target));
            }
            if self.overrides.is_empty() {
                if let Some(memo) = self.memos.get(target) {
                    return Ok(memo.clone());
                }
            }
        }

        let saved = self.restrict_to.take();
        let cycles_before = self.cycles_seen;
        let outcome = self.resolve_value(value, target);
        self.restrict_to = saved;
        let resolved = outcome?;

        // results shaped by a cycle depend on what was in flight, so they are not reused
        if !from_override && self.overrides.is_empty() && self.cycles_seen == cycles_before {
            self.memos.insert(target.clone(), resolved.clone());
        }
        Ok(resolved)
    }
}

fn env_lookup(s: &Substitution) -> Option<Value> {
    let unprefixed = s.unprefixed_path();
    if unprefixed.len() != 1 {
        return None;
    }
    let key = unprefixed.first()?;
    source::env_variables().as_object()?.get(key).cloned()
}
