//! Wizard service
//!
//! Drives a [`Walk`] from user actions and persists the position after every
//! transition so a walk can be resumed or shared.

use std::str::FromStr;

use tracing::{debug, instrument};

use crate::application::services::session::SessionStore;
use crate::application::ApplicationResult;
use crate::domain::{validate, DomainError, Issue, Position, Tree, TreeKey, Walk};
use crate::infrastructure::traits::SelectionItem;

/// One user action on the wizard screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Choose(usize),
    Back,
    /// Jump to breadcrumb index (0 = root)
    Jump(usize),
    Reset,
    Quit,
}

impl WizardAction {
    /// Token stored in [`SelectionItem::value`].
    pub fn token(&self) -> String {
        match self {
            WizardAction::Choose(i) => format!("choose:{i}"),
            WizardAction::Back => "back".to_string(),
            WizardAction::Jump(i) => format!("jump:{i}"),
            WizardAction::Reset => "reset".to_string(),
            WizardAction::Quit => "quit".to_string(),
        }
    }
}

impl FromStr for WizardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_index = |v: &str| {
            v.parse::<usize>()
                .map_err(|_| format!("invalid index in action: {s}"))
        };
        match s.split_once(':') {
            Some(("choose", i)) => Ok(WizardAction::Choose(parse_index(i)?)),
            Some(("jump", i)) => Ok(WizardAction::Jump(parse_index(i)?)),
            None if s == "back" => Ok(WizardAction::Back),
            None if s == "reset" => Ok(WizardAction::Reset),
            None if s == "quit" => Ok(WizardAction::Quit),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

/// Service for running and persisting wizard walks.
pub struct WizardService {
    store: SessionStore,
}

impl WizardService {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Rejects trees whose cycles would make progress undefined.
    fn check_walkable(tree: &Tree) -> ApplicationResult<()> {
        let report = validate(tree);
        let cycle = report.errors.into_iter().find_map(|issue| match issue {
            Issue::Cycle { nodes } => Some(nodes),
            _ => None,
        });
        match cycle {
            Some(nodes) => Err(DomainError::CyclicTree(nodes).into()),
            None => Ok(()),
        }
    }

    /// Begin a walk; with `resume`, replay the persisted position if any.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn start(&self, key: TreeKey, tree: &Tree, resume: bool) -> ApplicationResult<Walk> {
        Self::check_walkable(tree)?;
        if resume {
            if let Some(position) = self.store.load(key)? {
                debug!("resuming {} at {}", key, position);
                return Ok(Walk::replay(tree, &position.choices)?);
            }
        }
        Ok(Walk::start(tree)?)
    }

    /// Replay a shared position against `tree` and persist the resolved prefix.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn open(&self, position: &Position, tree: &Tree) -> ApplicationResult<Walk> {
        Self::check_walkable(tree)?;
        let walk = Walk::replay(tree, &position.choices)?;
        self.store.save(&walk.position(position.tree))?;
        Ok(walk)
    }

    /// Position to share for `key`: the persisted one, or root.
    pub fn share(&self, key: TreeKey) -> ApplicationResult<Position> {
        Ok(self
            .store
            .load(key)?
            .unwrap_or_else(|| Position::root(key)))
    }

    /// Forget the persisted position and return to root.
    pub fn reset(&self, key: TreeKey, walk: &mut Walk) -> ApplicationResult<()> {
        walk.reset();
        self.store.clear(key)
    }

    /// Apply one action; returns `false` when the user quits.
    ///
    /// Actions that do not resolve (dangling option, back at root) are ignored.
    pub fn apply(
        &self,
        key: TreeKey,
        tree: &Tree,
        walk: &mut Walk,
        action: WizardAction,
    ) -> ApplicationResult<bool> {
        let changed = match action {
            WizardAction::Quit => return Ok(false),
            WizardAction::Reset => {
                self.reset(key, walk)?;
                return Ok(true);
            }
            WizardAction::Choose(i) => walk.choose(tree, i),
            WizardAction::Back => walk.back(),
            WizardAction::Jump(i) => walk.jump_to(i),
        };
        if changed {
            self.store.save(&walk.position(key))?;
        } else {
            debug!("ignored wizard action {:?}", action);
        }
        Ok(true)
    }

    /// Menu for the current step: options first, then navigation.
    pub fn menu(&self, tree: &Tree, walk: &Walk) -> Vec<SelectionItem> {
        let mut items = Vec::new();
        if let Some(node) = walk.current(tree) {
            for (i, option) in node.options().iter().enumerate() {
                let label = if option.label.is_empty() {
                    format!("Option {}", i + 1)
                } else {
                    option.label.clone()
                };
                items.push(SelectionItem::new(
                    format!("{}. {}", i + 1, label),
                    WizardAction::Choose(i).token(),
                ));
            }
        }
        for (i, id) in walk.history().iter().enumerate().rev().skip(1) {
            let label = tree.get(id).map(|n| n.label.as_str()).unwrap_or(id.as_str());
            items.push(SelectionItem::new(
                format!("<< {label} (step {i})"),
                WizardAction::Jump(i).token(),
            ));
        }
        if walk.steps_done() > 0 {
            items.push(SelectionItem::new("<- Back", WizardAction::Back.token()));
            items.push(SelectionItem::new("Start over", WizardAction::Reset.token()));
        }
        items.push(SelectionItem::new("Quit", WizardAction::Quit.token()));
        items
    }
}
