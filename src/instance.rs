use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::class::LoxClass;
use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// An object: a class plus its per-instance field table.
///
/// Handles share the allocation, so a field set through one copy is visible
/// through every other.
#[derive(Clone)]
pub struct LoxInstance {
    data: Rc<RefCell<InstanceData>>,
}

struct InstanceData {
    class: LoxClass,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: LoxClass) -> Self {
        LoxInstance {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    /// Property access: fields shadow methods; methods come back bound to
    /// this instance.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.data.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method = self.data.borrow().class.find_method(&name.lexeme);

        match method {
            Some(method) => Ok(Value::Function(method.bind(self.clone()))),

            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Fields spring into existence on first assignment.
    pub fn set(&self, name: &Token, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.lexeme.clone(), value);
    }
}

impl PartialEq for LoxInstance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.data.borrow().class)
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.data.borrow().class)
    }
}
