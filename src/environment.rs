use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// One link in the lexical environment chain.
///
/// Shared ownership (`Rc<RefCell<..>>`) because closures capture their
/// defining environment and may outlive the block that created it.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined(name, line))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Read `name` in the environment exactly `depth` links up the chain.
    /// No further delegation happens there: the resolver already proved the
    /// binding lives in that frame.
    pub fn get_at(&self, depth: usize, name: &str, line: usize) -> Result<Value> {
        if depth == 0 {
            self.values
                .get(name)
                .cloned()
                .ok_or_else(|| undefined(name, line))
        } else {
            match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get_at(depth - 1, name, line),

                None => Err(undefined(name, line)),
            }
        }
    }

    /// Counterpart of [`Environment::get_at`] for assignment.
    pub fn assign_at(&mut self, depth: usize, name: &str, value: Value, line: usize) -> Result<()> {
        if depth == 0 {
            if self.values.contains_key(name) {
                self.values.insert(name.to_string(), value);
                Ok(())
            } else {
                Err(undefined(name, line))
            }
        } else {
            match &self.enclosing {
                Some(enclosing) => enclosing.borrow_mut().assign_at(depth - 1, name, value, line),

                None => Err(undefined(name, line)),
            }
        }
    }
}

fn undefined(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
