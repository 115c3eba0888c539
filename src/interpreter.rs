use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::callable::{check_arity, LoxFunction, NativeFunction};
use crate::class::LoxClass;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local exit propagated by the statement executor.
///
/// `Return` is control flow, not a failure; it is consumed at the enclosing
/// function frame and never surfaces to the host.
pub enum Interrupt {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Interrupt {
    fn from(e: LoxError) -> Self {
        Interrupt::Error(e)
    }
}

/// Tree-walking evaluator.
///
/// Generic over its output sink so tests can capture `print` output; the CLI
/// passes stdout.
pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    // Binding depths recorded by the resolver, keyed by expression identity.
    // A missing key means the variable is global.
    locals: HashMap<ExprId, usize>,
    writer: W,
    echo: bool,
}

impl<W: Write> Interpreter<W> {
    pub fn new(writer: W) -> Self {
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::Native(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock_native,
            }),
        );

        debug!("Interpreter initialised, natives installed");

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            writer,
            echo: false,
        }
    }

    /// Echo the value of bare expression statements (REPL mode).
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Record a variable occurrence as a local at the given depth.  Called by
    /// the resolver; occurrences it never reports are globals.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program to completion.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Interrupt::Error(e)) => return Err(e),

                // The resolver rejects top-level 'return'; an escaped signal
                // here is an interpreter bug.
                Err(Interrupt::Return(_)) => unreachable!("'return' escaped all call frames"),
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> std::result::Result<(), Interrupt> {
        match stmt {
            Stmt::Expression(expr) => {
                let value: Value = self.evaluate(expr)?;

                if self.echo {
                    writeln!(self.writer, "{}", value).map_err(LoxError::from)?;
                }

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.writer, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let block_env: Environment = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(block_env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function: LoxFunction =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(function));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                Err(Interrupt::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run a statement list in the given environment, restoring the previous
    /// one on every exit path, including errors and `Return`.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> std::result::Result<(), Interrupt> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::stmt::FunctionDecl>],
    ) -> std::result::Result<(), Interrupt> {
        // 1. Evaluate the superclass expression; it must name a class.
        let superclass_value: Option<LoxClass> = match superclass {
            Some(expr) => {
                let line: usize = match expr {
                    Expr::Variable { name, .. } => name.line,

                    _ => name.line,
                };

                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),

                    _ => {
                        return Err(LoxError::runtime(line, "Superclass must be a class.").into());
                    }
                }
            }

            None => None,
        };

        // 2. Two-phase definition so methods can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // 3. Methods of a subclass close over an extra frame binding 'super'.
        let method_env: Rc<RefCell<Environment>> = match &superclass_value {
            Some(class) => {
                let mut environment: Environment =
                    Environment::with_enclosing(self.environment.clone());

                environment.define("super", Value::Class(class.clone()));

                Rc::new(RefCell::new(environment))
            }

            None => self.environment.clone(),
        };

        // 4. Build the method table; 'init' is flagged as the initializer.
        let mut method_map: HashMap<String, LoxFunction> = HashMap::new();

        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";

            let function: LoxFunction =
                LoxFunction::new(method.clone(), method_env.clone(), is_initializer);

            method_map.insert(method.name.lexeme.clone(), function);
        }

        // 5. Construct the class and assign it back over the placeholder.
        let class: LoxClass = LoxClass::new(name.lexeme.clone(), superclass_value, method_map);

        debug!("Defined class {}", class.name());

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> std::result::Result<Value, Interrupt> {
        match expr {
            Expr::Literal(token) => Ok(self.evaluate_literal(token)?),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&depth) => self.environment.borrow_mut().assign_at(
                        depth,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(instance.get(name)?),

                _ => Err(LoxError::runtime(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;

                    instance.set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
            },

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(LoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(
        &mut self,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Interrupt> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(operator.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Interrupt> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        let line: usize = operator.line;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(line, "Division by zero.").into())
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(LoxError::runtime(line, "Operands must be numbers.").into()),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(LoxError::runtime(line, "Invalid binary operator.").into()),
        }
    }

    /// 'and' / 'or' short-circuit on truthiness and yield the last operand
    /// evaluated, not a boolean.
    fn evaluate_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Interrupt> {
        let left_val: Value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR => {
                if is_truthy(&left_val) {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            TokenType::AND => {
                if !is_truthy(&left_val) {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            _ => Err(LoxError::runtime(operator.line, "Invalid logical operator.").into()),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> std::result::Result<Value, Interrupt> {
        let callee_val: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee_val {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren.line)?;

                Ok(function.call(self, args)?)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren.line)?;

                Ok(class.call(self, args)?)
            }

            Value::Native(native) => {
                check_arity(native.arity, args.len(), paren.line)?;

                Ok((native.func)(&args)?)
            }

            _ => Err(LoxError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> std::result::Result<Value, Interrupt> {
        let depth: usize = match self.locals.get(&id) {
            Some(&depth) => depth,

            None => {
                return Err(
                    LoxError::runtime(keyword.line, "Undefined variable 'super'.").into(),
                );
            }
        };

        let superclass: LoxClass =
            match self.environment.borrow().get_at(depth, "super", keyword.line)? {
                Value::Class(class) => class,

                _ => {
                    return Err(
                        LoxError::runtime(keyword.line, "'super' is not a class.").into(),
                    );
                }
            };

        // 'this' lives in the frame just inside the one holding 'super'.
        let object = match self
            .environment
            .borrow()
            .get_at(depth - 1, "this", keyword.line)?
        {
            Value::Instance(instance) => instance,

            _ => {
                return Err(
                    LoxError::runtime(keyword.line, "'this' is not an instance.").into(),
                );
            }
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(object))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    fn look_up_variable(
        &self,
        id: ExprId,
        name: &Token,
    ) -> std::result::Result<Value, Interrupt> {
        let value: Value = match self.locals.get(&id) {
            Some(&depth) => self
                .environment
                .borrow()
                .get_at(depth, &name.lexeme, name.line)?,

            None => self.globals.borrow().get(&name.lexeme, name.line)?,
        };

        Ok(value)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LoxError::runtime(0, format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
