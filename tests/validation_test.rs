//! Tests for the structural validation pass

use bactree::domain::edit;
use bactree::domain::{validate, DecisionOption, Issue, Node, Tree};

fn opt(label: &str, next: &str) -> DecisionOption {
    DecisionOption::new(label, next)
}

fn valid_tree() -> Tree {
    Tree::from_nodes(vec![
        Node::decision(
            "root",
            "Start",
            "Oxidase positive?",
            vec![opt("Yes", "pseudomonas"), opt("No", "ecoli")],
        ),
        Node::result("pseudomonas", "Pseudomonas", "Pseudomonas aeruginosa"),
        Node::result("ecoli", "E. coli", "Escherichia coli"),
    ])
}

#[test]
fn given_valid_tree_when_validating_then_no_issues() {
    let report = validate(&valid_tree());
    assert!(report.is_valid());
    assert!(!report.has_errors());
}

#[test]
fn given_no_root_when_validating_then_only_missing_root_reported() {
    // Arrange: also dangling and empty, which must not be reported
    let tree = Tree::from_nodes(vec![Node::decision(
        "start",
        "Start",
        "",
        vec![opt("a", ""), opt("b", "ghost")],
    )]);

    // Act
    let report = validate(&tree);

    // Assert
    assert_eq!(report.errors, vec![Issue::MissingRoot]);
    assert!(report.warnings.is_empty());
}

#[test]
fn given_empty_and_dangling_targets_when_validating_then_both_are_errors() {
    // Arrange
    let tree = Tree::from_nodes(vec![Node::decision(
        "root",
        "Start",
        "",
        vec![opt("a", ""), opt("b", "ghost")],
    )]);

    // Act
    let report = validate(&tree);

    // Assert
    assert_eq!(
        report.errors,
        vec![
            Issue::EmptyTarget {
                node: "root".into(),
                option: 0
            },
            Issue::MissingTarget {
                node: "root".into(),
                target: "ghost".into()
            },
        ]
    );
}

#[test]
fn given_cycle_when_validating_then_one_error_lists_all_ids_sorted() {
    // Arrange
    let tree = Tree::from_nodes(vec![
        Node::decision("root", "Start", "", vec![opt("go", "a")]),
        Node::decision("a", "A", "", vec![opt("go", "b")]),
        Node::decision("b", "B", "", vec![opt("back", "root")]),
    ]);

    // Act
    let report = validate(&tree);

    // Assert
    let cycles: Vec<_> = report
        .errors
        .iter()
        .filter(|i| matches!(i, Issue::Cycle { .. }))
        .collect();
    assert_eq!(
        cycles,
        vec![&Issue::Cycle {
            nodes: vec!["a".into(), "b".into(), "root".into()]
        }]
    );
}

#[test]
fn given_orphan_when_validating_then_warns_and_removing_it_clears_warning() {
    // Arrange
    let mut tree = valid_tree();
    tree.insert(Node::result("orphan", "Orphan", "x"));

    // Act
    let report = validate(&tree);

    // Assert
    assert!(!report.has_errors());
    assert_eq!(
        report.warnings,
        vec![Issue::Unreachable {
            node: "orphan".into()
        }]
    );

    let cleaned = edit::delete_node(&tree, "orphan").unwrap();
    assert!(validate(&cleaned).is_valid());
}

#[test]
fn given_decision_without_options_when_validating_then_warns() {
    let mut tree = valid_tree();
    let mut root = tree.get("root").cloned().unwrap();
    root.options_mut().unwrap().push(opt("More", "more"));
    tree.insert(root);
    tree.insert(Node::decision("more", "More", "", vec![]));

    let report = validate(&tree);

    assert!(report.warnings.contains(&Issue::EmptyDecision {
        node: "more".into()
    }));
}

#[test]
fn given_repeated_targets_when_validating_then_warns_once_per_node() {
    // Arrange: two duplicates on the same node
    let tree = Tree::from_nodes(vec![
        Node::decision(
            "root",
            "Start",
            "",
            vec![
                opt("a", "x"),
                opt("b", "x"),
                opt("c", "y"),
                opt("d", "y"),
            ],
        ),
        Node::result("x", "X", "x"),
        Node::result("y", "Y", "y"),
    ]);

    // Act
    let report = validate(&tree);

    // Assert
    assert_eq!(
        report.warnings,
        vec![Issue::DuplicateTarget {
            node: "root".into(),
            target: "x".into()
        }]
    );
}

#[test]
fn given_issues_when_displaying_then_messages_are_readable() {
    assert_eq!(
        Issue::MissingTarget {
            node: "root".into(),
            target: "ghost".into()
        }
        .to_string(),
        "Node \"root\" references missing node \"ghost\"."
    );
    assert!(Issue::MissingRoot.is_error());
    assert!(!Issue::Unreachable { node: "x".into() }.is_error());
}
