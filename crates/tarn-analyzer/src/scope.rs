//! Lexical scope chain used during semantic analysis.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tarn_syntax::ast::{FunctionSig, Variable};
use tarn_syntax::error::{error, Result};

/// A parent-linked mapping from names to variables and from name/arity pairs
/// to function signatures. Lookups walk toward the root; parents never see
/// their children. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct Scope {
    data: Rc<RefCell<ScopeData>>,
}

struct ScopeData {
    parent: Option<Scope>,
    variables: HashMap<String, Variable>,
    functions: HashMap<(String, usize), FunctionSig>,
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

    pub fn define_variable(&self, variable: Variable) {
        self.data
            .borrow_mut()
            .variables
            .insert(variable.name.clone(), variable);
    }

    pub fn define_function(&self, signature: FunctionSig) {
        let key = (signature.name.clone(), signature.parameter_types.len());
        self.data.borrow_mut().functions.insert(key, signature);
    }

    pub fn lookup_variable(&self, name: &str) -> Result<Variable> {
        let data = self.data.borrow();
        if let Some(variable) = data.variables.get(name) {
            return Ok(variable.clone());
        }
        match &data.parent {
            Some(parent) => parent.lookup_variable(name),
            None => error(format!("undefined variable '{}'", name)),
        }
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Result<FunctionSig> {
        let data = self.data.borrow();
        if let Some(signature) = data.functions.get(&(name.to_string(), arity)) {
            return Ok(signature.clone());
        }
        match &data.parent {
            Some(parent) => parent.lookup_function(name, arity),
            None => error(format!("undefined function '{}/{}'", name, arity)),
        }
    }
}
