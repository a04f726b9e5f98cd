// Author: Dustin Pilgrim
// License: MIT

//! Substitution resolution.
//!
//! Resolution walks a merged tree and replaces every `${path}` with the value
//! found at `path` in the *whole* tree, collapsing delayed merges on the way.
//! The result is either a tree with no placeholders left or an error naming the
//! substitution that could not be satisfied.

use serde::{Deserialize, Serialize};

use crate::error::{CairnError, Result};
use crate::path::ConfigPath;
use crate::value::Value;

mod context;

use context::{Failure, ResolveContext};

/// Knobs for a resolve pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Look up substitutions that are missing from the tree in the process environment.
    pub use_system_environment: bool,
    /// Leave unsatisfiable substitutions in place instead of failing.
    pub allow_unresolved: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            use_system_environment: true,
            allow_unresolved: false,
        }
    }
}

impl ResolveOptions {
    /// Defaults without the environment fallback.
    pub fn no_system() -> Self {
        Self {
            use_system_environment: false,
            ..Self::default()
        }
    }

    pub fn set_use_system_environment(mut self, value: bool) -> Self {
        self.use_system_environment = value;
        self
    }

    pub fn set_allow_unresolved(mut self, value: bool) -> Self {
        self.allow_unresolved = value;
        self
    }
}

/// Resolves every substitution in `root`, which must be an object.
///
/// Resolving an already resolved tree returns it unchanged.
pub fn resolve(root: &Value, options: &ResolveOptions) -> Result<Value> {
    resolve_inner(root, None, options)
}

/// Resolves only the subtree at `restrict_to`, leaving the rest of `root` as it is.
///
/// Substitutions inside the subtree may still point anywhere in `root`.
pub fn resolve_restricted(
    root: &Value,
    restrict_to: &ConfigPath,
    options: &ResolveOptions,
) -> Result<Value> {
    resolve_inner(root, Some(restrict_to.clone()), options)
}

fn resolve_inner(
    root: &Value,
    restrict_to: Option<ConfigPath>,
    options: &ResolveOptions,
) -> Result<Value> {
    if root.is_resolved() {
        return Ok(root.clone());
    }

    let object = root.as_object().ok_or_else(|| {
        CairnError::bug("only an object can be the root of a resolve")
    })?;

    log::debug!(
        "resolving tree from {}{}",
        root.origin(),
        restrict_to
            .as_ref()
            .map(|p| format!(" restricted to {}", p))
            .unwrap_or_default()
    );

    let mut context = ResolveContext::new(object, options, restrict_to);
    let outcome = context.resolve_value(root, &ConfigPath::root());

    match outcome {
        Ok(Some(resolved)) => {
            log::debug!("resolve finished, {} memoized lookups", context.memo_count());
            Ok(resolved)
        }
        // the root is an object and objects never resolve to nothing
        Ok(None) => Err(CairnError::bug("root object resolved to nothing")),
        Err(Failure::Fatal(e)) => Err(e),
        Err(Failure::Cycle(trace)) => Err(CairnError::CycleDetected {
            path: trace.first().map(ConfigPath::render).unwrap_or_default(),
            origin: root.origin().description(),
            trace: context::render_trace(&trace),
        }),
    }
}

#[cfg(test)]
mod tests;
