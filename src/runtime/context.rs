//! Per-evaluation state: the scope arena and the user-data channel.
//!
//! Scopes are frames in a stack-shaped arena, each holding its own [`Environment`] and the
//! id of its parent. When [`EvalCtx::with_derived`] (and so [`Expr::eval_with_env`])
//! returns, the frames it pushed are popped from the top down until one is still pinned by
//! a live [`Expr`]; an `Expr` that escapes its call therefore keeps its defining scope, and
//! everything below it, alive. A [`ScopeId`] carries the serial of its frame, so using the
//! id of a popped frame panics instead of reading whatever frame took its slot.
//!
//! [`Expr`]: crate::runtime::Expr
//! [`Expr::eval_with_env`]: crate::runtime::Expr::eval_with_env

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::trace;

use crate::runtime::{Environment, Value};

/// Default budget of nested expression dispatches per evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Largest depth budget the CLI accepts; the same bound the matcher puts on nesting.
pub const MAX_DEPTH_CEILING: usize = crate::syntax::matcher::MAX_NESTING;

static NEXT_CTX_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of a scope frame inside one [`EvalCtx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: usize,
    serial: u64,
}

#[derive(Debug)]
struct Scope {
    env: Environment,
    parent: Option<ScopeId>,
    serial: u64,
    /// Cloned into every `Expr` created in this scope.
    pin: Arc<()>,
}

pub struct EvalCtx {
    scopes: Vec<Scope>,
    current: ScopeId,
    user_data: Option<Arc<dyn Any + Send + Sync>>,
    max_depth: usize,
    depth: usize,
    next_serial: u64,
    id: u64,
}

impl EvalCtx {
    pub fn new(env: Environment) -> Self {
        Self {
            scopes: vec![Scope {
                env,
                parent: None,
                serial: 0,
                pin: Arc::new(()),
            }],
            current: ScopeId {
                index: 0,
                serial: 0,
            },
            user_data: None,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            next_serial: 1,
            id: NEXT_CTX_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A context whose procedures can reach `data` through [`user_data`](Self::user_data).
    pub fn with_user_data<T: Any + Send + Sync>(env: Environment, data: T) -> Self {
        Self::with_shared_user_data(env, Arc::new(data))
    }

    pub fn with_shared_user_data(env: Environment, data: Arc<dyn Any + Send + Sync>) -> Self {
        let mut ctx = Self::new(env);
        ctx.user_data = Some(data);
        ctx
    }

    /// Every nested dispatch costs native stack, so a budget of several thousand levels
    /// can overflow the thread's stack before it is spent. The CLI caps `--max-depth` at
    /// [`MAX_DEPTH_CEILING`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Looks `id` up from the active scope outwards; the innermost binding wins.
    pub fn lookup(&self, id: &str) -> Option<&Value> {
        self.lookup_from(self.current, id)
    }

    pub fn lookup_from(&self, scope: ScopeId, id: &str) -> Option<&Value> {
        let mut next = Some(scope);
        while let Some(scope) = next {
            let frame = self.frame(scope);
            if let Some(value) = frame.env.lookup(id) {
                return Some(value);
            }
            next = frame.parent;
        }
        None
    }

    /// The environment of the active scope.
    pub fn env(&self) -> &Environment {
        &self.frame(self.current).env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.scopes[self.current.index].env
    }

    /// The environment of the scope enclosing the active one, if any.
    pub fn outer_env(&self) -> Option<&Environment> {
        let parent = self.frame(self.current).parent?;
        Some(&self.frame(parent).env)
    }

    /// Adds a child of the active scope holding `env`. The active scope is unchanged.
    ///
    /// The frame lives until the innermost enclosing [`with_derived`](Self::with_derived)
    /// returns, or until the context is dropped when there is none. Prefer `with_derived`
    /// inside loops.
    pub fn derive(&mut self, env: Environment) -> ScopeId {
        self.push_scope(Some(self.current), env)
    }

    /// Runs `f` with a child of the active scope holding `env`, then drops that frame and
    /// the frames pushed while `f` ran, unless a surviving `Expr` still refers to them.
    /// The active scope is unchanged.
    pub fn with_derived<R>(
        &mut self,
        env: Environment,
        f: impl FnOnce(&mut Self, ScopeId) -> R,
    ) -> R {
        self.with_child_of(self.current, env, f)
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_deref()?.downcast_ref::<T>()
    }

    pub fn shared_user_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.user_data.clone()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn with_child_of<R>(
        &mut self,
        parent: ScopeId,
        env: Environment,
        f: impl FnOnce(&mut Self, ScopeId) -> R,
    ) -> R {
        let mark = self.scopes.len();
        let scope = self.push_scope(Some(parent), env);
        let result = f(self, scope);
        self.release(mark);
        result
    }

    pub(crate) fn push_scope(&mut self, parent: Option<ScopeId>, env: Environment) -> ScopeId {
        if let Some(parent) = parent {
            self.frame(parent);
        }
        let id = ScopeId {
            index: self.scopes.len(),
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.scopes.push(Scope {
            env,
            parent,
            serial: id.serial,
            pin: Arc::new(()),
        });
        trace!(scope = id.index, parent = ?parent.map(|p| p.index), "scope pushed");
        id
    }

    pub(crate) fn pin(&self, scope: ScopeId) -> Arc<()> {
        Arc::clone(&self.frame(scope).pin)
    }

    /// Pops frames at index `mark` and above until one is active or pinned.
    fn release(&mut self, mark: usize) {
        let before = self.scopes.len();
        while self.scopes.len() > mark {
            let Some(top) = self.scopes.last() else {
                break;
            };
            if top.serial == self.current.serial || Arc::strong_count(&top.pin) > 1 {
                break;
            }
            self.scopes.pop();
        }
        trace!(released = before - self.scopes.len(), kept = self.scopes.len(), "scopes released");
    }

    /// Makes `scope` active and returns the previously active scope.
    pub(crate) fn switch_to(&mut self, scope: ScopeId) -> ScopeId {
        self.frame(scope);
        std::mem::replace(&mut self.current, scope)
    }

    fn frame(&self, scope: ScopeId) -> &Scope {
        match self.scopes.get(scope.index) {
            Some(frame) if frame.serial == scope.serial => frame,
            _ => panic!("scope {scope:?} is not live in this context"),
        }
    }

    /// Enters one nested dispatch; false once the depth budget is spent.
    pub(crate) fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl std::fmt::Debug for EvalCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalCtx")
            .field("scopes", &self.scopes)
            .field("current", &self.current)
            .field("has_user_data", &self.user_data.is_some())
            .field("max_depth", &self.max_depth)
            .field("depth", &self.depth)
            .finish()
    }
}
