use pretty_assertions::assert_eq;
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::{Expr, Parser, Stmt};
use rox::scanner::Scanner;

fn parse(source: &str) -> Result<Vec<Stmt<'_>>, Vec<LoxError>> {
    let (tokens, lex_errors) = Scanner::new(source).scan_all();
    assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);

    Parser::new(tokens).parse()
}

fn print_program(source: &str) -> Vec<String> {
    parse(source)
        .expect("program parses")
        .iter()
        .map(AstPrinter::print_stmt)
        .collect()
}

fn messages(errors: &[LoxError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(
        print_program("print -1 + 2 * (3 - 4) == !true;"),
        vec!["(print (== (+ (- 1.0) (* 2.0 (group (- 3.0 4.0)))) (! true)))"]
    );
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(
        print_program("1 - 2 - 3; a = b = c;"),
        vec!["(; (- (- 1.0 2.0) 3.0))", "(; (= a (= b c)))"]
    );
}

#[test]
fn logical_operators_bind_looser_than_equality() {
    assert_eq!(
        print_program("a or b and c == d;"),
        vec!["(; (or a (and b (== c d))))"]
    );
}

#[test]
fn calls_properties_and_setters() {
    assert_eq!(
        print_program("obj.field.method(1, \"two\")(); obj.x = 3;"),
        vec![
            "(; (call (call (. (. obj field) method) 1.0 two)))",
            "(; (= (. obj x) 3.0))",
        ]
    );
}

#[test]
fn declarations_print_in_prefix_form() {
    assert_eq!(
        print_program(
            "var a; var b = 1.5; fun add(x, y) { return x + y; } \
             class B < A { init(n) { this.n = n; } get() { return super.get(); } }"
        ),
        vec![
            "(var a)",
            "(var b 1.5)",
            "(fun add(x y) (return (+ x y)))",
            "(class B < A (method init(n) (; (= (. this n) n))) (method get() (return (call (super get)))))",
        ]
    );
}

#[test]
fn for_loops_desugar_into_blocks_and_while() {
    assert_eq!(
        print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
        vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
    );

    assert_eq!(
        print_program("for (;;) print 1;"),
        vec!["(while true (print 1.0))"]
    );
}

#[test]
fn if_else_binds_to_the_nearest_if() {
    assert_eq!(
        print_program("if (a) if (b) print 1; else print 2;"),
        vec!["(if a (if b (print 1.0) (print 2.0)))"]
    );
}

#[test]
fn superclass_is_parsed_as_a_variable() {
    let program = parse("class B < A {}").expect("program parses");

    match &program[0] {
        Stmt::Class {
            superclass: Some(Expr::Variable { name, .. }),
            methods,
            ..
        } => {
            assert_eq!(name.lexeme, "A");
            assert!(methods.is_empty());
        }
        other => panic!("expected a class with a superclass, got {:?}", other),
    }
}

#[test]
fn errors_are_collected_across_statements() {
    let errors = parse("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;").expect_err("program fails");
    assert!(errors.iter().all(LoxError::is_static));

    assert_eq!(
        messages(&errors),
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect ')' after expression.",
        ]
    );
}

#[test]
fn missing_semicolon_at_end_reports_at_end() {
    let errors = parse("print 1").expect_err("program fails");

    assert_eq!(
        messages(&errors),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn invalid_assignment_target_does_not_stop_parsing() {
    let errors = parse("1 + 2 = 3;\n(a) = 4;\nprint nope").expect_err("program fails");

    assert_eq!(
        messages(&errors),
        vec![
            "[line 1] Error at '=': Invalid assignment target.",
            "[line 2] Error at '=': Invalid assignment target.",
            "[line 3] Error at end: Expect ';' after value.",
        ]
    );
}

#[test]
fn argument_count_is_capped() {
    let arguments = vec!["1"; 256].join(", ");
    let source = format!("f({});", arguments);
    let errors = parse(&source).expect_err("program fails");

    assert_eq!(
        messages(&errors),
        vec!["[line 1] Error at '1': Can't have more than 255 arguments."]
    );
}

#[test]
fn parameter_count_is_capped() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let source = format!("fun f({}) {{}}", params.join(", "));
    let errors = parse(&source).expect_err("program fails");

    assert_eq!(
        messages(&errors),
        vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
    );
}

#[test]
fn missing_token_sequence_gets_an_eof() {
    let program = Parser::new(Vec::new()).parse().expect("empty program parses");
    assert!(program.is_empty());
}
