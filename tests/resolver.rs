use loxrs as lox;

use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

/// Runs scanner, parser and resolver; evaluation never starts.
fn resolve(source: &str) -> Result<(), LoxError> {
    let mut interpreter: Interpreter<Vec<u8>> = Interpreter::new(Vec::new());

    let program = Parser::new(Scanner::new(source)).parse()?;

    Resolver::new(&mut interpreter).resolve(&program)
}

fn resolve_err(source: &str) -> LoxError {
    let err = resolve(source).expect_err("expected a resolve error");

    assert!(matches!(err, LoxError::Resolve { .. }), "got {:?}", err);

    err
}

#[test]
fn duplicate_declaration_in_local_scope_errors() {
    let err = resolve_err("{ var a = 1; var a = 2; }");

    assert!(err.to_string().contains("already declared"));
}

#[test]
fn duplicate_global_declaration_is_allowed() {
    assert!(resolve("var a = 1; var a = 2;").is_ok());
}

#[test]
fn top_level_return_errors() {
    let err = resolve_err("return 1;");

    assert!(err.to_string().contains("'return' used outside of function"));
}

#[test]
fn this_outside_class_errors() {
    let err = resolve_err("print this;");

    assert!(err.to_string().contains("'this' outside of a class"));
}

#[test]
fn this_in_standalone_function_errors() {
    resolve_err("fun f() { return this; }");
}

#[test]
fn super_outside_class_errors() {
    let err = resolve_err("print super.m;");

    assert!(err.to_string().contains("'super' outside of a class"));
}

#[test]
fn super_without_superclass_errors() {
    let err = resolve_err("class A { m() { super.m(); } }");

    assert!(err.to_string().contains("no superclass"));
}

#[test]
fn reading_variable_in_own_initializer_errors() {
    let err = resolve_err("{ var a = a; }");

    assert!(err.to_string().contains("own initializer"));
}

#[test]
fn returning_value_from_initializer_errors() {
    let err = resolve_err("class A { init() { return 1; } }");

    assert!(err.to_string().contains("initializer"));
}

#[test]
fn bare_return_in_initializer_is_allowed() {
    assert!(resolve("class A { init() { return; } }").is_ok());
}

#[test]
fn returning_value_from_method_is_allowed() {
    assert!(resolve("class A { m() { return 1; } }").is_ok());
}

#[test]
fn self_inheritance_errors() {
    let err = resolve_err("class A < A {}");

    assert!(err.to_string().contains("inherit from itself"));
}

#[test]
fn super_in_subclass_resolves() {
    assert!(resolve("class A { m() {} } class B < A { m() { super.m(); } }").is_ok());
}

#[test]
fn shadowing_in_nested_scope_is_allowed() {
    assert!(resolve("var a = 1; { var a = 2; { var a = 3; } }").is_ok());
}

#[test]
fn resolving_twice_is_idempotent() {
    let mut interpreter: Interpreter<Vec<u8>> = Interpreter::new(Vec::new());

    let program = Parser::new(Scanner::new(
        "var a = 1; { fun f() { return a; } f(); }",
    ))
    .parse()
    .unwrap();

    Resolver::new(&mut interpreter).resolve(&program).unwrap();
    Resolver::new(&mut interpreter).resolve(&program).unwrap();

    interpreter.interpret(&program).unwrap();
}
