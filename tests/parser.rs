use loxrs as lox;

use lox::ast_printer::Ast;
use lox::error::{LoxError, Result};
use lox::expr::Expr;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::stmt::Stmt;
use lox::token::TokenType;

fn parse(source: &str) -> Result<Vec<Stmt>> {
    Parser::new(Scanner::new(source)).parse()
}

/// Renders the expression of the first statement, which must be an
/// expression or print statement.
fn print_first_expr(source: &str) -> String {
    let program: Vec<Stmt> = parse(source).expect("parse failed");

    match program.first() {
        Some(Stmt::Expression(expr)) | Some(Stmt::Print(expr)) => Ast.print(expr),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(print_first_expr("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(print_first_expr("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
}

#[test]
fn unary_minus_nests() {
    assert_eq!(print_first_expr("-1 - -2;"), "(- (- 1.0) (- 2.0))");
}

#[test]
fn comparison_binds_tighter_than_equality() {
    assert_eq!(print_first_expr("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(print_first_expr("a or b and c;"), "(or a (and b c))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(print_first_expr("a = b = 1;"), "(= a (= b 1.0))");
}

#[test]
fn calls_and_property_access_chain() {
    assert_eq!(
        print_first_expr("foo.bar(1).baz;"),
        "(. (call (. foo bar) 1.0) baz)"
    );
}

#[test]
fn property_assignment_becomes_set() {
    assert_eq!(print_first_expr("a.b = 2;"), "(= (. a b) 2.0)");
}

#[test]
fn super_call_parses() {
    assert_eq!(print_first_expr("super.m();"), "(call (super m))");
}

#[test]
fn parsing_is_deterministic() {
    let source = "print 1 + 2 * -3 == (4 / 5) or a.b(c) and !d;";

    assert_eq!(print_first_expr(source), print_first_expr(source));
}

#[test]
fn invalid_assignment_target_is_rejected() {
    let err: LoxError = parse("1 = 2;").unwrap_err();

    assert!(matches!(err, LoxError::Parse { .. }));
    assert!(err.to_string().contains("Invalid assignment target."));
}

#[test]
fn missing_semicolon_is_rejected() {
    let err: LoxError = parse("print 1").unwrap_err();

    assert!(matches!(err, LoxError::Parse { .. }));
}

#[test]
fn scan_error_aborts_the_parse() {
    let err: LoxError = parse("print 1 $ 2;").unwrap_err();

    assert!(matches!(err, LoxError::Lex { .. }));
}

#[test]
fn for_loop_desugars_to_while() {
    let program: Vec<Stmt> = parse("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();

    assert_eq!(program.len(), 1);

    // { var i = 0; while (i < 3) { print i; i = i + 1; } }
    let outer = match &program[0] {
        Stmt::Block(stmts) => stmts,
        other => panic!("expected block, got {:?}", other),
    };

    assert!(matches!(outer[0], Stmt::Var { .. }));

    let (condition, body) = match &outer[1] {
        Stmt::While { condition, body } => (condition, body),
        other => panic!("expected while, got {:?}", other),
    };

    assert_eq!(Ast.print(condition), "(< i 3.0)");

    let inner = match body.as_ref() {
        Stmt::Block(stmts) => stmts,
        other => panic!("expected block body, got {:?}", other),
    };

    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_loop_without_clauses_runs_on_true() {
    let program: Vec<Stmt> = parse("for (;;) print 1;").unwrap();

    let condition = match &program[0] {
        Stmt::While { condition, .. } => condition,
        other => panic!("expected while, got {:?}", other),
    };

    match condition {
        Expr::Literal(token) => assert_eq!(token.token_type, TokenType::TRUE),
        other => panic!("expected literal true, got {:?}", other),
    }
}

#[test]
fn class_declaration_parses() {
    let program: Vec<Stmt> = parse("class B < A { init(x) {} m() { return 1; } }").unwrap();

    match &program[0] {
        Stmt::Class {
            name,
            superclass,
            methods,
        } => {
            assert_eq!(name.lexeme, "B");
            assert!(matches!(superclass, Some(Expr::Variable { .. })));
            assert_eq!(methods.len(), 2);
            assert_eq!(methods[0].name.lexeme, "init");
            assert_eq!(methods[1].name.lexeme, "m");
        }

        other => panic!("expected class, got {:?}", other),
    }
}

#[test]
fn function_declaration_parses() {
    let program: Vec<Stmt> = parse("fun add(a, b) { return a + b; }").unwrap();

    match &program[0] {
        Stmt::Function(declaration) => {
            assert_eq!(declaration.name.lexeme, "add");
            assert_eq!(declaration.params.len(), 2);
            assert_eq!(declaration.body.len(), 1);
        }

        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn too_many_arguments_is_rejected() {
    let args: String = vec!["0"; 256].join(", ");
    let err: LoxError = parse(&format!("f({});", args)).unwrap_err();

    assert!(err.to_string().contains("Can't have more than 255 arguments."));
}

#[test]
fn too_many_parameters_is_rejected() {
    let params: String = (0..256)
        .map(|i| format!("p{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let err: LoxError = parse(&format!("fun f({}) {{}}", params)).unwrap_err();

    assert!(err.to_string().contains("Can't have more than 255 parameters."));
}
