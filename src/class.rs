use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::callable::LoxFunction;
use crate::error::Result;
use crate::instance::LoxInstance;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// A class value.  Cheap to clone; identity is the shared allocation.
#[derive(Clone)]
pub struct LoxClass {
    data: Rc<ClassData>,
}

struct ClassData {
    name: String,
    superclass: Option<LoxClass>,
    methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<LoxClass>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        LoxClass {
            data: Rc::new(ClassData {
                name,
                superclass,
                methods,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Look up a method on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),

            None => self
                .data
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// A class is called like a function; its arity is its initializer's.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Construct an instance, running `init` (bound to it) when one exists
    /// anywhere on the class chain.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Instantiating class {}", self.name());

        let instance: LoxInstance = LoxInstance::new(self.clone());

        if let Some(initializer) = self.find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl PartialEq for LoxClass {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name())
    }
}
