use pretty_assertions::assert_eq;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;

/// Resolve `source` and return the rendered static errors, if any.
fn resolve_errors(source: &str) -> Vec<String> {
    let (tokens, lex_errors) = Scanner::new(source).scan_all();
    assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);

    let statements = Parser::new(tokens).parse().expect("program parses");

    let mut interpreter = Interpreter::with_output(Vec::new());
    let result = Resolver::new(&mut interpreter).resolve(&statements);

    match result {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn well_formed_program_resolves_cleanly() {
    let source = r#"
        var a = "global";
        {
            fun show() { print a; }
            var b = a;
            show();
        }
        class A { method() { return this; } }
        class B < A {
            init() { this.x = 1; return; }
            method() { return super.method(); }
        }
    "#;

    assert!(resolve_errors(source).is_empty());
}

#[test]
fn reading_a_local_in_its_own_initializer() {
    assert_eq!(
        resolve_errors("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_self_reference_is_allowed() {
    assert!(resolve_errors("var a = 1; var a = a;").is_empty());
}

#[test]
fn duplicate_local_declaration() {
    assert_eq!(
        resolve_errors("fun f(a) { var a; }\n{ var b; var b; }"),
        vec![
            "[line 1] Error at 'a': Already a variable with this name in this scope.",
            "[line 2] Error at 'b': Already a variable with this name in this scope.",
        ]
    );
}

#[test]
fn top_level_return() {
    assert_eq!(
        resolve_errors("return 1;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn returning_a_value_from_an_initializer() {
    assert_eq!(
        resolve_errors("class A { init() { return 5; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
}

#[test]
fn nested_function_inside_initializer_may_return_values() {
    assert!(resolve_errors("class A { init() { fun f() { return 5; } } }").is_empty());
}

#[test]
fn this_outside_a_class() {
    assert_eq!(
        resolve_errors("print this;\nfun f() { return this; }"),
        vec![
            "[line 1] Error at 'this': Can't use 'this' outside of a class.",
            "[line 2] Error at 'this': Can't use 'this' outside of a class.",
        ]
    );
}

#[test]
fn super_outside_a_class_or_without_a_superclass() {
    assert_eq!(
        resolve_errors("super.f();\nclass A { f() { super.f(); } }"),
        vec![
            "[line 1] Error at 'super': Can't use 'super' outside of a class.",
            "[line 2] Error at 'super': Can't use 'super' in a class with no superclass.",
        ]
    );
}

#[test]
fn class_inheriting_from_itself() {
    assert_eq!(
        resolve_errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
}

#[test]
fn every_error_in_a_program_is_reported() {
    let source = "return;\n{ var x = x; }\nprint this;\nclass C < C {}";

    assert_eq!(
        resolve_errors(source),
        vec![
            "[line 1] Error at 'return': Can't return from top-level code.",
            "[line 2] Error at 'x': Can't read local variable in its own initializer.",
            "[line 3] Error at 'this': Can't use 'this' outside of a class.",
            "[line 4] Error at 'C': A class can't inherit from itself.",
        ]
    );
}
