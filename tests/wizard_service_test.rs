//! Tests for the wizard service and the interactive walk loop

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use bactree::application::services::{SessionStore, WizardAction, WizardService};
use bactree::application::ApplicationError;
use bactree::cli::commands::run_wizard;
use bactree::domain::{DecisionOption, DomainError, Node, Position, Tree, TreeKey, Walk};
use bactree::infrastructure::traits::{RealFileSystem, SelectionItem, Selector};

/// Mock selector that answers with scripted action tokens
struct ScriptedSelector {
    answers: Mutex<VecDeque<Option<String>>>,
    menus: Mutex<Vec<Vec<SelectionItem>>>,
}

impl ScriptedSelector {
    fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(String::from)).collect()),
            menus: Mutex::new(Vec::new()),
        }
    }

    fn menus(&self) -> Vec<Vec<SelectionItem>> {
        self.menus.lock().unwrap().clone()
    }
}

impl Selector for ScriptedSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        _prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        self.menus.lock().unwrap().push(items.to_vec());
        match self.answers.lock().unwrap().pop_front() {
            Some(Some(token)) => items
                .iter()
                .find(|i| i.value == token)
                .cloned()
                .map(Some)
                .ok_or_else(|| format!("no menu item for {token}")),
            Some(None) | None => Ok(None), // User cancelled
        }
    }
}

fn tree() -> Tree {
    Tree::from_nodes(vec![
        Node::decision(
            "root",
            "Start",
            "Shape?",
            vec![
                DecisionOption::new("Cocci", "catalase"),
                DecisionOption::new("Rods", "listeria"),
            ],
        ),
        Node::decision(
            "catalase",
            "Catalase",
            "Bubbles?",
            vec![
                DecisionOption::new("Yes", "staph"),
                DecisionOption::new("No", "strep"),
            ],
        ),
        Node::result("staph", "Staphylococcus", "Staphylococcus spp."),
        Node::result("strep", "Streptococcus", "Streptococcus spp."),
        Node::result("listeria", "Listeria", "Listeria monocytogenes"),
    ])
}

fn service(temp: &TempDir) -> WizardService {
    WizardService::new(SessionStore::in_dir(Arc::new(RealFileSystem), temp.path()))
}

// ============================================================
// actions
// ============================================================

#[test]
fn given_tokens_when_parsing_actions_then_round_trip() {
    for action in [
        WizardAction::Choose(3),
        WizardAction::Back,
        WizardAction::Jump(0),
        WizardAction::Reset,
        WizardAction::Quit,
    ] {
        assert_eq!(action.token().parse::<WizardAction>(), Ok(action));
    }
    assert!("choose:x".parse::<WizardAction>().is_err());
    assert!("dance".parse::<WizardAction>().is_err());
}

#[test]
fn given_choice_when_applying_then_position_persisted() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = tree();
    let mut walk = svc.start(TreeKey::Positive, &tree, false).unwrap();

    // Act
    let keep_going = svc
        .apply(TreeKey::Positive, &tree, &mut walk, WizardAction::Choose(0))
        .unwrap();

    // Assert
    assert!(keep_going);
    assert_eq!(svc.share(TreeKey::Positive).unwrap().to_string(), "pos:0");
}

#[test]
fn given_saved_position_when_resuming_then_walk_continues_there() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tree = tree();
    {
        let svc = service(&temp);
        let mut walk = svc.start(TreeKey::Positive, &tree, false).unwrap();
        svc.apply(TreeKey::Positive, &tree, &mut walk, WizardAction::Choose(0))
            .unwrap();
        svc.apply(TreeKey::Positive, &tree, &mut walk, WizardAction::Choose(1))
            .unwrap();
    }

    // Act
    let resumed = service(&temp).start(TreeKey::Positive, &tree, true).unwrap();
    let fresh = service(&temp).start(TreeKey::Positive, &tree, false).unwrap();

    // Assert
    assert_eq!(resumed.current_id(), "strep");
    assert_eq!(fresh.current_id(), "root");
}

#[test]
fn given_shared_code_when_opening_then_replayed_and_persisted() {
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let position: Position = "pos:0,0".parse().unwrap();

    let walk = svc.open(&position, &tree()).unwrap();

    assert_eq!(walk.current_id(), "staph");
    assert_eq!(svc.share(TreeKey::Positive).unwrap(), position);
}

#[test]
fn given_reset_when_applying_then_store_cleared_and_walk_at_root() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = tree();
    let mut walk = Walk::replay(&tree, &[0]).unwrap();
    svc.store().save(&walk.position(TreeKey::Positive)).unwrap();

    // Act
    svc.apply(TreeKey::Positive, &tree, &mut walk, WizardAction::Reset)
        .unwrap();

    // Assert
    assert_eq!(walk.current_id(), "root");
    assert_eq!(svc.store().load(TreeKey::Positive).unwrap(), None);
    assert_eq!(
        svc.share(TreeKey::Positive).unwrap(),
        Position::root(TreeKey::Positive)
    );
}

#[test]
fn given_quit_when_applying_then_returns_false() {
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = tree();
    let mut walk = Walk::start(&tree).unwrap();

    assert!(!svc
        .apply(TreeKey::Positive, &tree, &mut walk, WizardAction::Quit)
        .unwrap());
}

#[test]
fn given_cyclic_tree_when_starting_or_opening_then_rejected_with_cycle_members() {
    // Arrange: root -> loop_a -> loop_b -> loop_a
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = Tree::from_nodes(vec![
        Node::decision("root", "Start", "Q", vec![DecisionOption::new("go", "loop_a")]),
        Node::decision("loop_a", "A", "Q", vec![DecisionOption::new("on", "loop_b")]),
        Node::decision("loop_b", "B", "Q", vec![DecisionOption::new("back", "loop_a")]),
    ]);
    let expected = DomainError::CyclicTree(vec!["loop_a".into(), "loop_b".into()]);

    // Act
    let started = svc.start(TreeKey::Positive, &tree, false);
    let opened = svc.open(&Position::root(TreeKey::Positive), &tree);

    // Assert
    assert!(matches!(started, Err(ApplicationError::Domain(ref e)) if *e == expected));
    assert!(matches!(opened, Err(ApplicationError::Domain(ref e)) if *e == expected));
    assert_eq!(svc.store().load(TreeKey::Positive).unwrap(), None);
}

// ============================================================
// menu
// ============================================================

#[test]
fn given_walk_at_root_when_building_menu_then_options_and_quit_only() {
    let temp = TempDir::new().unwrap();
    let tree = tree();
    let walk = Walk::start(&tree).unwrap();

    let menu = service(&temp).menu(&tree, &walk);

    let values: Vec<_> = menu.iter().map(|i| i.value.as_str()).collect();
    assert_eq!(values, vec!["choose:0", "choose:1", "quit"]);
    assert_eq!(menu[0].display, "1. Cocci");
}

#[test]
fn given_walk_two_steps_in_when_building_menu_then_breadcrumbs_and_navigation() {
    let temp = TempDir::new().unwrap();
    let tree = tree();
    let walk = Walk::replay(&tree, &[0, 0]).unwrap();

    let menu = service(&temp).menu(&tree, &walk);

    let values: Vec<_> = menu.iter().map(|i| i.value.as_str()).collect();
    assert_eq!(values, vec!["jump:1", "jump:0", "back", "reset", "quit"]);
}

// ============================================================
// interactive loop
// ============================================================

#[test]
fn given_scripted_picks_when_running_wizard_then_reaches_result_and_persists() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = tree();
    let mut walk = svc.start(TreeKey::Positive, &tree, false).unwrap();
    let selector = ScriptedSelector::new(&[
        Some("choose:0"),
        Some("choose:1"),
        Some("back"),
        Some("choose:0"),
        Some("quit"),
    ]);
    let mut out = Vec::new();

    // Act
    run_wizard(&svc, &selector, TreeKey::Positive, &tree, &mut walk, &mut out).unwrap();

    // Assert
    assert_eq!(walk.current_id(), "staph");
    assert_eq!(selector.menus().len(), 5);
    assert_eq!(svc.share(TreeKey::Positive).unwrap().to_string(), "pos:0,0");
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Staphylococcus spp."));
    assert!(text.contains("Bubbles?"));
}

#[test]
fn given_cancel_when_running_wizard_then_stops_without_error() {
    let temp = TempDir::new().unwrap();
    let svc = service(&temp);
    let tree = tree();
    let mut walk = Walk::start(&tree).unwrap();
    let selector = ScriptedSelector::new(&[None]);
    let mut out = Vec::new();

    run_wizard(&svc, &selector, TreeKey::Positive, &tree, &mut walk, &mut out).unwrap();

    assert_eq!(walk.current_id(), "root");
}
