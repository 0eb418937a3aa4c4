//! Runtime scope chain: variable bindings and callable functions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tarn_syntax::ast::Statement;
use tarn_syntax::error::{error, Result};

use crate::value::Value;

/// A runtime variable binding.
pub struct Binding {
    pub name: String,
    pub mutable: bool,
    pub value: Value,
}

/// How a function runs when called.
pub enum Callable {
    /// Host-provided built-in.
    Builtin(Box<dyn Fn(&[Value]) -> Result<Value>>),
    /// User function: its body plus the scope captured when it was
    /// installed. A call always enters a child of `closure`, never of the
    /// call site.
    Defined {
        parameters: Vec<String>,
        body: Rc<Vec<Statement>>,
        closure: Scope,
    },
}

pub struct RuntimeFunction {
    pub name: String,
    pub arity: usize,
    pub callable: Callable,
}

/// Parent-linked runtime scope. Cloning shares the underlying storage; a
/// captured scope therefore stays alive for as long as any function value
/// referencing it does.
#[derive(Clone)]
pub struct Scope {
    data: Rc<RefCell<ScopeData>>,
}

struct ScopeData {
    parent: Option<Scope>,
    variables: HashMap<String, Rc<RefCell<Binding>>>,
    functions: HashMap<(String, usize), Rc<RuntimeFunction>>,
}

impl Scope {
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<Scope>) -> Self {
        Scope {
            data: Rc::new(RefCell::new(ScopeData {
                parent,
                variables: HashMap::new(),
                functions: HashMap::new(),
            })),
        }
    }

    pub fn define_variable(&self, name: impl Into<String>, mutable: bool, value: Value) {
        let name = name.into();
        let binding = Binding {
            name: name.clone(),
            mutable,
            value,
        };
        self.data
            .borrow_mut()
            .variables
            .insert(name, Rc::new(RefCell::new(binding)));
    }

    pub fn define_function(&self, name: impl Into<String>, arity: usize, callable: Callable) {
        let name = name.into();
        let function = RuntimeFunction {
            name: name.clone(),
            arity,
            callable,
        };
        self.data
            .borrow_mut()
            .functions
            .insert((name, arity), Rc::new(function));
    }

    pub fn lookup_variable(&self, name: &str) -> Result<Rc<RefCell<Binding>>> {
        let data = self.data.borrow();
        if let Some(binding) = data.variables.get(name) {
            return Ok(binding.clone());
        }
        match &data.parent {
            Some(parent) => parent.lookup_variable(name),
            None => error(format!("undefined variable '{}'", name)),
        }
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Result<Rc<RuntimeFunction>> {
        let data = self.data.borrow();
        if let Some(function) = data.functions.get(&(name.to_string(), arity)) {
            return Ok(function.clone());
        }
        match &data.parent {
            Some(parent) => parent.lookup_function(name, arity),
            None => error(format!("undefined function '{}/{}'", name, arity)),
        }
    }
}
