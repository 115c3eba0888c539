use loxrs as lox;

use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner: Scanner = Scanner::new(source);
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn scans_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_one_and_two_char_operators() {
    assert_token_sequence(
        "! != = == < <= > >= / -",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::SLASH, "/"),
            (TokenType::MINUS, "-"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn skips_comments_and_whitespace() {
    assert_token_sequence(
        "// a comment\n(\t) // trailing",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn tracks_lines() {
    let tokens: Vec<Token> = Scanner::new("+\n-\n*")
        .filter_map(Result::ok)
        .collect();

    let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();

    assert_eq!(lines, vec![1, 2, 3, 3]);
}

#[test]
fn scans_string_literal() {
    let tokens: Vec<Token> = Scanner::new("\"hi there\"")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].lexeme, "\"hi there\"");

    match &tokens[0].token_type {
        TokenType::STRING(literal) => assert_eq!(literal, "hi there"),
        other => panic!("expected STRING, got {:?}", other),
    }
}

#[test]
fn unterminated_string_reports_opening_line() {
    let results: Vec<_> = Scanner::new("\"abc\ndef").collect();

    let error = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("expected a scan error");

    assert_eq!(error.line, 1);
    assert!(error.message.contains("Unterminated string"));
}

#[test]
fn scans_numbers() {
    let tokens: Vec<Token> = Scanner::new("123 3.14 7.")
        .filter_map(Result::ok)
        .collect();

    match tokens[0].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 123.0),
        _ => panic!("expected NUMBER"),
    }

    match tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 3.14),
        _ => panic!("expected NUMBER"),
    }

    // A trailing '.' is not consumed as part of the number.
    match tokens[2].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 7.0),
        _ => panic!("expected NUMBER"),
    }
    assert_eq!(tokens[3].token_type, TokenType::DOT);
}

#[test]
fn distinguishes_keywords_from_identifiers() {
    assert_token_sequence(
        "var x = while_ nilly nil",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::EQUAL, "="),
            (TokenType::IDENTIFIER, "while_"),
            (TokenType::IDENTIFIER, "nilly"),
            (TokenType::NIL, "nil"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn recovers_after_unexpected_character() {
    let results: Vec<_> = Scanner::new(",.$(#").collect();

    // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF.
    assert_eq!(results.len(), 6);

    assert!(results[0].as_ref().is_ok_and(|t| t.token_type == TokenType::COMMA));
    assert!(results[1].as_ref().is_ok_and(|t| t.token_type == TokenType::DOT));
    assert!(results[3].as_ref().is_ok_and(|t| t.token_type == TokenType::LEFT_PAREN));
    assert!(results[5].as_ref().is_ok_and(|t| t.token_type == TokenType::EOF));

    let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(errors.len(), 2);

    for error in errors {
        assert!(error.message.contains("Unexpected character"));
    }
}

#[test]
fn tokens_display_kind_lexeme_and_literal() {
    let tokens: Vec<Token> = Scanner::new("var pi = 3.0; print \"x\";")
        .filter_map(Result::ok)
        .collect();

    let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

    assert_eq!(rendered[0], "VAR var null");
    assert_eq!(rendered[1], "IDENTIFIER pi null");
    assert_eq!(rendered[3], "NUMBER 3.0 3.0");
    assert_eq!(rendered[6], "STRING \"x\" x");
}

#[test]
fn lexemes_form_a_subsequence_of_the_source() {
    let source = "var answer = 6 * 7; // the obvious one\nprint answer;";

    let mut cursor: usize = 0;

    for token in Scanner::new(source).filter_map(Result::ok) {
        if token.lexeme.is_empty() {
            continue;
        }

        let found = source[cursor..]
            .find(&token.lexeme)
            .unwrap_or_else(|| panic!("lexeme '{}' out of order", token.lexeme));

        cursor += found + token.lexeme.len();
    }
}
