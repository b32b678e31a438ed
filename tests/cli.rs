use std::io::Write;
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn script(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp script");
    file.write_all(source.as_bytes()).expect("write temp script");
    file
}

fn rox(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rox"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("run rox binary")
}

fn run_script(source: &str, extra: &[&str]) -> Output {
    let file = script(source);
    let path = file.path().to_str().expect("utf-8 temp path");

    let mut args = extra.to_vec();
    args.push(path);
    rox(&args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn successful_script_exits_zero() {
    let output = run_script("var greeting = \"hello\";\nprint greeting + \" world\";\n", &[]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "hello world\n");
    assert!(stderr(&output).is_empty());
}

#[test]
fn static_error_exits_65_without_running() {
    let output = run_script("print \"nope\";\nprint (;\n{ var a = a; }\n", &[]);

    assert_eq!(output.status.code(), Some(65));
    assert!(stdout(&output).is_empty());
    assert_eq!(
        stderr(&output),
        "[line 2] Error at ';': Expect expression.\n"
    );
}

#[test]
fn resolver_error_exits_65() {
    let output = run_script("fun f() {}\nreturn f;\n", &[]);

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(
        stderr(&output),
        "[line 2] Error at 'return': Can't return from top-level code.\n"
    );
}

#[test]
fn runtime_error_exits_70_after_partial_output() {
    let output = run_script("print 1;\nprint -\"x\";\nprint 2;\n", &[]);

    assert_eq!(output.status.code(), Some(70));
    assert_eq!(stdout(&output), "1\n");
    assert_eq!(stderr(&output), "Operand must be a number.\n[line 2]\n");
}

#[test]
fn missing_script_is_reported() {
    let output = rox(&["/definitely/not/here.lox"]);

    assert_ne!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("Could not read script"));
}

#[test]
fn dump_tokens_prints_one_token_per_line() {
    let output = run_script("var x = 1;", &["--dump", "tokens"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "VAR var null\nIDENTIFIER x null\nEQUAL = null\nNUMBER 1 1.0\nSEMICOLON ; null\nEOF  null\n"
    );
}

#[test]
fn dump_tokens_as_json_lines() {
    let output = run_script("\"s\"", &["--dump", "tokens", "--json"]);

    assert_eq!(output.status.code(), Some(0));

    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(
        lines,
        vec![
            serde_json::json!({ "token_type": { "STRING": "s" }, "lexeme": "\"s\"", "line": 1 }),
            serde_json::json!({ "token_type": "EOF", "lexeme": "", "line": 1 }),
        ]
    );
}

#[test]
fn dump_tokens_reports_lex_errors_and_exits_65() {
    let output = run_script("1 $ 2", &["--dump", "tokens"]);

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(stdout(&output), "NUMBER 1 1.0\nNUMBER 2 2.0\nEOF  null\n");
    assert_eq!(stderr(&output), "[line 1] Error: Unexpected character: $\n");
}

#[test]
fn dump_ast_prints_statements() {
    let output = run_script("print 1 + 2 * 3;\nvar a;", &["--dump", "ast"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "(print (+ 1.0 (* 2.0 3.0)))\n(var a)\n");
}

#[test]
fn dump_ast_exits_65_on_syntax_errors() {
    let output = run_script("print ;", &["--dump", "ast"]);

    assert_eq!(output.status.code(), Some(65));
    assert!(stdout(&output).is_empty());
    assert_eq!(stderr(&output), "[line 1] Error at ';': Expect expression.\n");
}

#[test]
fn json_requires_a_dump_mode() {
    let output = run_script("print 1;", &["--json"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("Usage:"));
}

#[test]
fn extra_positional_arguments_exit_64() {
    let output = rox(&["one.lox", "two.lox"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("Usage:"));
}

#[test]
fn help_still_exits_zero() {
    let output = rox(&["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn deep_recursion_runs_in_the_binary() {
    let output = run_script(
        "fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; }\nprint f(5000);\n",
        &[],
    );

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "5000\n");
}

#[test]
fn runaway_recursion_exits_70() {
    let output = run_script("fun f() { return f(); }\nf();\n", &[]);

    assert_eq!(output.status.code(), Some(70));
    assert_eq!(stderr(&output), "Stack overflow.\n[line 1]\n");
}

#[test]
fn prompt_runs_lines_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_rox"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn rox");

    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(b"var a = 20;\nprint a +;\nprint a + 22;\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait for rox");

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("42\n"));
    assert!(stderr(&output).contains("Expect expression."));
}
