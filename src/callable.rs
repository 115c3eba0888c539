use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::instance::LoxInstance;
use crate::interpreter::{Interpreter, Interrupt};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user-defined function or method: a declaration paired with the
/// environment it closed over.
#[derive(Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Produce the bound-method variant: the same declaration closing over a
    /// one-entry environment that maps `this` to the instance.
    pub fn bind(&self, instance: LoxInstance) -> LoxFunction {
        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        environment.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function.  A `Return` raised inside the body is consumed
    /// here; an initializer always yields the `this` of its closure.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling fn<{}> with {} arg(s)", self.name(), arguments.len());

        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let frame: Rc<RefCell<Environment>> = Rc::new(RefCell::new(environment));

        match interpreter.execute_block(&self.declaration.body, frame) {
            Ok(()) => {
                if self.is_initializer {
                    self.bound_this()
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Interrupt::Return(value)) => {
                if self.is_initializer {
                    self.bound_this()
                } else {
                    Ok(value)
                }
            }

            Err(Interrupt::Error(e)) => Err(e),
        }
    }

    fn bound_this(&self) -> Result<Value> {
        self.closure
            .borrow()
            .get_at(0, "this", self.declaration.name.line)
    }
}

impl PartialEq for LoxFunction {
    // Binding produces a fresh closure but keeps the declaration, so a bound
    // method still compares equal to the method it came from.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn<{}>", self.name())
    }
}

impl fmt::Debug for LoxFunction {
    // The closure chain can be cyclic through `this`; never walk it here.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn<{}>", self.name())
    }
}

/// A host function installed into the global environment.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value>,
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.func == other.func
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// Shared arity check for every callable kind.
pub fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(LoxError::runtime(
            line,
            format!("Expected {} arguments but got {}.", expected, got),
        ))
    }
}
