//! Tests for the generic node builder.

use std::fmt;

use super::*;
use crate::rewrite::RewriteRule;
use rstest::rstest;

/// Minimal node family exercising every schema shape.
#[derive(Debug, Eq, PartialEq)]
enum Shape {
    Leaf,
    Word(Vec<String>),
    Pair(Box<Shape>, Box<Shape>),
    Group(Vec<Shape>),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => f.write_str("leaf"),
            Self::Word(words) => write!(f, "word[{}]", words.join(",")),
            Self::Pair(left, right) => write!(f, "pair[{left};{right}]"),
            Self::Group(items) => write!(f, "group[{}]", items.len()),
        }
    }
}

static SHAPE_MACROS: &[RewriteRule] = &[
    RewriteRule::new("(two-leaves)", "(pair (leaf) (leaf))"),
    RewriteRule::new("(greeting)", "(word hello)"),
    RewriteRule::new("(self)", "(self x)"),
    RewriteRule::new("(ping)", "(pong x)"),
    RewriteRule::new("(pong)", "(ping y)"),
];

static SHAPES: &[Entry<Shape>] = &[
    Entry::new("leaf", ArgSchema::NONE, |_, _| Ok(Shape::Leaf)),
    Entry::new(
        "word",
        ArgSchema::new(Arity::AtLeast(1), Slot::Literal),
        |name, args| args.into_literals(name).map(Shape::Word),
    ),
    Entry::new(
        "pair",
        ArgSchema::new(Arity::Exactly(2), Slot::Node),
        |name, args| {
            let (left, right) = args.into_pair(name)?;
            Ok(Shape::Pair(Box::new(left), Box::new(right)))
        },
    ),
    Entry::new(
        "group",
        ArgSchema::new(Arity::AtLeast(0), Slot::Node),
        |name, args| args.into_nodes(name).map(Shape::Group),
    ),
];

impl NodeKind for Shape {
    const KIND: &'static str = "shape";

    fn registry() -> &'static [Entry<Self>] {
        SHAPES
    }

    fn rewriter() -> Rewriter {
        Rewriter::new(SHAPE_MACROS)
    }
}

#[rstest]
fn builds_nested_nodes() {
    let shape: Shape = compile("(pair (word a b) (group (leaf) (leaf)))").expect("compiles");
    assert_eq!(shape.to_string(), "pair[word[a,b];group[2]]");
}

#[rstest]
fn zero_argument_group_is_allowed() {
    assert_eq!(compile::<Shape>("(group)"), Ok(Shape::Group(Vec::new())));
}

#[rstest]
fn bare_macros_expand_before_parsing() {
    let shape: Shape = compile("(group (two-leaves) (greeting))").expect("compiles");
    assert_eq!(
        shape,
        Shape::Group(vec![
            Shape::Pair(Box::new(Shape::Leaf), Box::new(Shape::Leaf)),
            Shape::Word(vec![String::from("hello")]),
        ])
    );
}

#[rstest]
fn head_macro_appends_call_site_arguments() {
    let shape: Shape = compile("(greeting world)").expect("compiles");
    assert_eq!(
        shape,
        Shape::Word(vec![String::from("hello"), String::from("world")])
    );
}

#[rstest]
fn self_referencing_head_macro_is_reported() {
    let err = compile::<Shape>("(self y)").expect_err("self expansion loops");
    assert!(matches!(err, CompileError::Rewrite(_)), "unexpected error: {err}");
}

#[rstest]
#[case::direct("(ping z)")]
#[case::bare("(ping)")]
#[case::nested("(group (pong z))")]
fn mutually_recursive_head_macros_hit_the_pass_cap(#[case] source: &str) {
    assert_eq!(
        compile::<Shape>(source),
        Err(CompileError::Rewrite(RewriteError::DidNotConverge {
            passes: MAX_REWRITE_PASSES,
        }))
    );
}

#[rstest]
#[case::bare_atom("leaf", "expected a parenthesised shape form, found leaf")]
#[case::empty_form("()", "empty form cannot be built as a shape")]
#[case::list_head("((leaf))", "shape form ((leaf)) must start with a name")]
#[case::unknown("(circle)", "shape \"circle\" is not known")]
#[case::arity("(pair (leaf))", "pair expects exactly 2 nested forms")]
#[case::literal_slot("(word (leaf))", "word expects at least 1 literal argument")]
#[case::node_slot("(group leaf)", "group expects at least 0 nested forms")]
#[case::none("(leaf x)", "leaf expects no arguments")]
fn reports_structural_errors(#[case] source: &str, #[case] message: &str) {
    let err = compile::<Shape>(source).expect_err("must fail");
    assert_eq!(err.to_string(), message);
}

#[rstest]
fn parse_errors_pass_through() {
    let err = compile::<Shape>("(pair (leaf)").expect_err("unbalanced");
    assert!(matches!(err, CompileError::Parse(_)));
}

#[rstest]
fn names_are_sorted_and_include_macros() {
    assert_eq!(
        Shape::names(),
        vec![
            "greeting", "group", "leaf", "pair", "ping", "pong", "self", "two-leaves", "word",
        ]
    );
}
