//! Unit tests for the expression parser.

use super::*;
use rstest::rstest;

fn list(items: Vec<Form>) -> Form {
    Form::List(items)
}

#[rstest]
fn parses_nested_forms() {
    let form = parse("(if-one-target (external ssh) (external-parallel ssh))")
        .expect("expression should parse");
    assert_eq!(
        form,
        list(vec![
            Form::atom("if-one-target"),
            list(vec![Form::atom("external"), Form::atom("ssh")]),
            list(vec![Form::atom("external-parallel"), Form::atom("ssh")]),
        ])
    );
}

#[rstest]
fn parses_quoted_atoms_with_whitespace_and_escapes() {
    let form = parse(r#"(external "my ssh" "say \"hi\"\n")"#).expect("quoted atoms parse");
    assert_eq!(
        form,
        list(vec![
            Form::atom("external"),
            Form::atom("my ssh"),
            Form::atom("say \"hi\"\n"),
        ])
    );
}

#[rstest]
fn parses_empty_list_and_bare_atom_roots() {
    assert_eq!(parse("()").expect("empty list parses"), list(Vec::new()));
    assert_eq!(parse("  noop \n").expect("atom parses"), Form::atom("noop"));
}

#[rstest]
#[case("", ParseError::Empty)]
#[case("   ", ParseError::Empty)]
#[case("(noop", ParseError::UnclosedList { offset: 0 })]
#[case("(a (b)", ParseError::UnclosedList { offset: 0 })]
#[case(")", ParseError::UnexpectedClose { offset: 0 })]
#[case("(noop) (noop)", ParseError::TrailingInput { offset: 7 })]
#[case("(noop))", ParseError::TrailingInput { offset: 6 })]
fn rejects_unbalanced_or_extra_input(#[case] source: &str, #[case] expected: ParseError) {
    assert_eq!(parse(source), Err(expected));
}

#[rstest]
#[case(r#"(external "unterminated)"#)]
#[case(r#"(external "bad \q escape")"#)]
fn rejects_malformed_atoms(#[case] source: &str) {
    let err = parse(source).expect_err("malformed atom must fail");
    assert!(
        matches!(err, ParseError::MalformedAtom { offset: 10, .. }),
        "unexpected error: {err:?}"
    );
}

#[rstest]
#[case("(assert-command (external-sequential ssh))")]
#[case(r#"(external "two words" "" "quote\"d" "back\\slash" "(paren)")"#)]
#[case("(list)")]
fn rendering_parses_back_to_the_same_tree(#[case] source: &str) {
    let form = parse(source).expect("source parses");
    let rendered = form.to_string();
    assert_eq!(parse(&rendered).expect("rendered form parses"), form);
}

#[rstest]
fn renders_canonical_spacing() {
    let form = parse("(  if-command\n (ssh-exec)\t(noop) )").expect("source parses");
    assert_eq!(form.to_string(), "(if-command (ssh-exec) (noop))");
}
