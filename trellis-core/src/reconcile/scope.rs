//! Variable scopes and binding callables.
//!
//! Structural bindings evaluate their expressions and templates against a
//! [`Scope`]: a chain of variable frames. Each list instance gets a child
//! scope holding its item (and index) variables; lookups fall through to
//! the enclosing scope.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::NodeId;
use crate::error::EvalError;
use crate::reactive::Value;

/// A binding expression evaluated against a scope.
pub type Expression = Rc<dyn Fn(&Scope) -> Result<Value, EvalError>>;

/// Builds the detached root nodes of one list instance or branch.
pub type Template = Rc<dyn Fn(&Scope) -> Result<Vec<NodeId>, EvalError>>;

pub fn expression(f: impl Fn(&Scope) -> Result<Value, EvalError> + 'static) -> Expression {
    Rc::new(f)
}

pub fn template(f: impl Fn(&Scope) -> Result<Vec<NodeId>, EvalError> + 'static) -> Template {
    Rc::new(f)
}

#[derive(Default)]
struct Frame {
    vars: RefCell<IndexMap<Rc<str>, Value>>,
    parent: Option<Scope>,
}

/// Chain of variable frames. Clones share the frame.
#[derive(Clone, Default)]
pub struct Scope(Rc<Frame>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new empty frame whose lookups fall through to `self`.
    pub fn child(&self) -> Scope {
        Scope(Rc::new(Frame {
            vars: RefCell::new(IndexMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Define or overwrite a variable in this frame.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.0.vars.borrow_mut().insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Like [`get`](Self::get), failing on unknown names.
    pub fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.vars.borrow().contains_key(name)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<Rc<str>> = self.0.vars.borrow().keys().cloned().collect();
        f.debug_struct("Scope")
            .field("vars", &names)
            .field("parent", &self.0.parent)
            .finish()
    }
}
