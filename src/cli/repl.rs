//! Line-oriented editing session behind `bactree edit`.
//!
//! Commands are read one per line; failures are reported and the session
//! keeps going. Option numbers are 1-based on this surface.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::services::{EditSession, EditorService};
use crate::application::ApplicationError;
use crate::cli::error::{CliError, CliResult};
use crate::domain::edit::sanitize_node_id;
use crate::domain::{MoveDirection, NodePatch, NodeType, TreeKey};
use crate::infrastructure::traits::Editor;
use crate::infrastructure::InfraError;

pub const HELP: &str = "\
commands:
  list                         list nodes of the active tree
  select <id>                  select a node
  show                         show the selected node
  add                          add a result node and select it
  set <field> [text]           field: label | description | question | organism
  type <decision|result>       switch node type (clears type specific fields)
  option add                   append a blank option
  option set <n> label [text]  set the label of option n
  option set <n> next [id]     set the target of option n
  option rm <n>                remove option n
  option up|down <n>           move option n
  delete [id]                  delete a node (default: selected)
  rename [old] <new>           rename a node (default: selected)
  undo | redo                  step through history
  tree <pos|neg>               switch the active tree
  validate                     validate the active tree
  edit                         edit the selected node as JSON in $EDITOR
  save                         write both trees
  quit | quit!                 leave (quit! discards unsaved changes)";

/// Editable text field of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Label,
    Description,
    Question,
    Organism,
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" => Ok(Field::Label),
            "description" | "desc" => Ok(Field::Description),
            "question" => Ok(Field::Question),
            "organism" => Ok(Field::Organism),
            other => Err(format!("unknown field: {other}")),
        }
    }
}

impl Field {
    fn patch(self, value: String) -> NodePatch {
        let mut patch = NodePatch::default();
        match self {
            Field::Label => patch.label = Some(value),
            Field::Description => patch.description = Some(value),
            Field::Question => patch.question = Some(value),
            Field::Organism => patch.organism = Some(value),
        }
        patch
    }
}

/// Part of an option that `option set` changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionField {
    Label(String),
    Next(String),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    List,
    Select(String),
    Show,
    Add,
    Set(Field, String),
    Type(NodeType),
    OptionAdd,
    /// Zero-based option index
    OptionSet(usize, OptionField),
    OptionRemove(usize),
    OptionMove(usize, MoveDirection),
    Delete(Option<String>),
    Rename {
        old: Option<String>,
        new: String,
    },
    Undo,
    Redo,
    Tree(TreeKey),
    Validate,
    Edit,
    Save,
    Quit {
        force: bool,
    },
}

/// Splits off the first word; the rest keeps its inner spacing.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s, ""),
    }
}

fn option_number(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("option numbers start at 1".to_string()),
        Ok(n) => Ok(n - 1),
        Err(_) => Err(format!("not an option number: {s}")),
    }
}

impl FromStr for ReplCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (cmd, rest) = split_word(line.trim());
        let require = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("{cmd}: missing {what}"))
            } else {
                Ok(rest.to_string())
            }
        };

        match cmd {
            "help" | "?" => Ok(ReplCommand::Help),
            "list" | "ls" => Ok(ReplCommand::List),
            "select" | "sel" => Ok(ReplCommand::Select(require("node id")?)),
            "show" => Ok(ReplCommand::Show),
            "add" => Ok(ReplCommand::Add),
            "set" => {
                let (field, value) = split_word(rest);
                if field.is_empty() {
                    return Err("set: missing field".to_string());
                }
                Ok(ReplCommand::Set(field.parse()?, value.to_string()))
            }
            "type" => Ok(ReplCommand::Type(require("node type")?.parse()?)),
            "option" | "opt" => {
                let (sub, args) = split_word(rest);
                match sub {
                    "add" => Ok(ReplCommand::OptionAdd),
                    "set" => {
                        let (n, tail) = split_word(args);
                        let (what, value) = split_word(tail);
                        let index = option_number(n)?;
                        match what {
                            "label" => Ok(ReplCommand::OptionSet(
                                index,
                                OptionField::Label(value.to_string()),
                            )),
                            "next" => Ok(ReplCommand::OptionSet(
                                index,
                                OptionField::Next(value.to_string()),
                            )),
                            _ => Err("option set <n> label|next [value]".to_string()),
                        }
                    }
                    "rm" | "remove" => Ok(ReplCommand::OptionRemove(option_number(args)?)),
                    "up" => Ok(ReplCommand::OptionMove(
                        option_number(args)?,
                        MoveDirection::Up,
                    )),
                    "down" => Ok(ReplCommand::OptionMove(
                        option_number(args)?,
                        MoveDirection::Down,
                    )),
                    _ => Err("option add|set|rm|up|down".to_string()),
                }
            }
            "delete" | "del" => Ok(ReplCommand::Delete(
                (!rest.is_empty()).then(|| rest.to_string()),
            )),
            "rename" => {
                let (first, second) = split_word(rest);
                match (first, second) {
                    ("", _) => Err("rename: missing new id".to_string()),
                    (new, "") => Ok(ReplCommand::Rename {
                        old: None,
                        new: new.to_string(),
                    }),
                    (old, new) => Ok(ReplCommand::Rename {
                        old: Some(old.to_string()),
                        new: new.to_string(),
                    }),
                }
            }
            "undo" => Ok(ReplCommand::Undo),
            "redo" => Ok(ReplCommand::Redo),
            "tree" => Ok(ReplCommand::Tree(
                require("tree key")?.parse().map_err(|e| format!("{e}"))?,
            )),
            "validate" => Ok(ReplCommand::Validate),
            "edit" => Ok(ReplCommand::Edit),
            "save" => Ok(ReplCommand::Save),
            "quit" | "exit" | "q" => Ok(ReplCommand::Quit { force: false }),
            "quit!" | "q!" => Ok(ReplCommand::Quit { force: true }),
            other => Err(format!("unknown command: {other} (try `help`)")),
        }
    }
}

/// Whether the loop keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn write_err(e: io::Error) -> CliError {
    InfraError::io("write output", e).into()
}

/// Editing session bound to an input/output pair.
pub struct Repl<'a> {
    service: &'a EditorService,
    editor: &'a dyn Editor,
    session: EditSession,
}

impl<'a> Repl<'a> {
    pub fn new(service: &'a EditorService, editor: &'a dyn Editor, session: EditSession) -> Self {
        Self {
            service,
            editor,
            session,
        }
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn into_session(self) -> EditSession {
        self.session
    }

    /// Reads commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> CliResult<()> {
        self.prompt(out)?;
        for line in input.lines() {
            let line = line.map_err(|e| InfraError::io("read input", e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.prompt(out)?;
                continue;
            }

            let outcome = trimmed
                .parse::<ReplCommand>()
                .map_err(CliError::InvalidArgs)
                .and_then(|cmd| self.execute(cmd, out));
            match outcome {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(e @ CliError::Infra(InfraError::Io { .. })) => return Err(e),
                Err(e) => writeln!(out, "{}: {}", "error".red().bold(), e).map_err(write_err)?,
            }
            self.prompt(out)?;
        }

        if self.session.is_dirty() {
            writeln!(
                out,
                "{}: end of input, unsaved changes discarded",
                "Warning".yellow()
            )
            .map_err(write_err)?;
        }
        Ok(())
    }

    fn prompt<W: Write>(&self, out: &mut W) -> CliResult<()> {
        let marker = if self.session.is_dirty() { "*" } else { "" };
        write!(
            out,
            "{} ",
            format!(
                "{}:{}{}>",
                self.session.active(),
                self.session.selected(),
                marker
            )
            .cyan()
        )
        .map_err(write_err)?;
        out.flush().map_err(write_err)
    }

    fn selected(&self) -> String {
        self.session.selected().to_string()
    }

    #[instrument(level = "debug", skip(self, out))]
    pub fn execute<W: Write>(&mut self, cmd: ReplCommand, out: &mut W) -> CliResult<Flow> {
        let id = self.selected();
        match cmd {
            ReplCommand::Help => writeln!(out, "{HELP}").map_err(write_err)?,
            ReplCommand::List => self.list(out)?,
            ReplCommand::Select(target) => {
                self.session.select(&target)?;
                self.show(out)?;
            }
            ReplCommand::Show => self.show(out)?,
            ReplCommand::Add => {
                let new_id = self.session.add_node();
                writeln!(out, "added {new_id}").map_err(write_err)?;
            }
            ReplCommand::Set(field, value) => {
                self.session.update_node(&id, &field.patch(value))?;
            }
            ReplCommand::Type(node_type) => {
                let patch = NodePatch {
                    node_type: Some(node_type),
                    ..NodePatch::default()
                };
                self.session.update_node(&id, &patch)?;
            }
            ReplCommand::OptionAdd => {
                let index = self.session.add_option(&id)?;
                writeln!(out, "added option {}", index + 1).map_err(write_err)?;
            }
            ReplCommand::OptionSet(index, OptionField::Label(label)) => {
                self.session.set_option(&id, index, Some(&label), None)?;
            }
            ReplCommand::OptionSet(index, OptionField::Next(next)) => {
                self.session.set_option(&id, index, None, Some(&next))?;
            }
            ReplCommand::OptionRemove(index) => self.session.remove_option(&id, index)?,
            ReplCommand::OptionMove(index, direction) => {
                self.session.move_option(&id, index, direction)?;
            }
            ReplCommand::Delete(target) => {
                let target = target.unwrap_or(id);
                let cleared = self.session.delete_node(&target)?;
                writeln!(out, "deleted {target}").map_err(write_err)?;
                if !cleared.is_empty() {
                    writeln!(out, "cleared options in: {}", cleared.join(", "))
                        .map_err(write_err)?;
                }
            }
            ReplCommand::Rename { old, new } => {
                let old = old.unwrap_or(id);
                let new = sanitize_node_id(&new);
                self.session.rename_node(&old, &new)?;
                writeln!(out, "renamed {old} -> {new}").map_err(write_err)?;
            }
            ReplCommand::Undo => {
                let msg = if self.session.undo() { "undone" } else { "nothing to undo" };
                writeln!(out, "{msg}").map_err(write_err)?;
            }
            ReplCommand::Redo => {
                let msg = if self.session.redo() { "redone" } else { "nothing to redo" };
                writeln!(out, "{msg}").map_err(write_err)?;
            }
            ReplCommand::Tree(key) => {
                self.session.switch_tree(key);
                writeln!(out, "editing {}", key.title()).map_err(write_err)?;
            }
            ReplCommand::Validate => self.validate(out)?,
            ReplCommand::Edit => self.edit_selected(out)?,
            ReplCommand::Save => {
                self.service.save_session(&mut self.session)?;
                writeln!(out, "{} saved", "✓".green()).map_err(write_err)?;
            }
            ReplCommand::Quit { force } => {
                if self.session.is_dirty() && !force {
                    writeln!(
                        out,
                        "{}: unsaved changes, `save` first or `quit!` to discard",
                        "Warning".yellow()
                    )
                    .map_err(write_err)?;
                } else {
                    return Ok(Flow::Quit);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn list<W: Write>(&self, out: &mut W) -> CliResult<()> {
        for node in self.session.tree().nodes() {
            let marker = if node.id == self.session.selected() { "*" } else { " " };
            writeln!(
                out,
                "{} {:<24} {:<8} {}",
                marker,
                node.id,
                node.node_type(),
                node.label
            )
            .map_err(write_err)?;
        }
        Ok(())
    }

    fn show<W: Write>(&self, out: &mut W) -> CliResult<()> {
        let Some(node) = self.session.selected_node() else {
            return Ok(());
        };
        let tree = self.session.tree();
        writeln!(out, "{} ({})", node.id.bold(), node.node_type()).map_err(write_err)?;
        writeln!(out, "  label:       {}", node.label).map_err(write_err)?;
        if !node.description.is_empty() {
            writeln!(out, "  description: {}", node.description).map_err(write_err)?;
        }
        if let Some(question) = node.question() {
            writeln!(out, "  question:    {question}").map_err(write_err)?;
            for (i, option) in node.options().iter().enumerate() {
                let target = if option.next_id.is_empty() {
                    "(unset)".yellow().to_string()
                } else if tree.contains(&option.next_id) {
                    option.next_id.clone()
                } else {
                    format!("{} (missing)", option.next_id).red().to_string()
                };
                writeln!(out, "  {}. {} -> {}", i + 1, option.label, target)
                    .map_err(write_err)?;
            }
        }
        if let Some(organism) = node.organism() {
            writeln!(out, "  organism:    {organism}").map_err(write_err)?;
        }
        Ok(())
    }

    fn validate<W: Write>(&self, out: &mut W) -> CliResult<()> {
        let report = self.session.validate();
        if report.is_valid() {
            writeln!(out, "{} tree is valid", "✓".green()).map_err(write_err)?;
        }
        for issue in &report.errors {
            writeln!(out, "  {} {}", "✗".red(), issue).map_err(write_err)?;
        }
        for issue in &report.warnings {
            writeln!(out, "  {} {}", "!".yellow(), issue).map_err(write_err)?;
        }
        Ok(())
    }

    /// Round-trips the selected node through the external editor as JSON.
    ///
    /// An edited `id` renames the node; an edited `type` switches its variant.
    fn edit_selected<W: Write>(&mut self, out: &mut W) -> CliResult<()> {
        let Some(node) = self.session.selected_node().cloned() else {
            return Ok(());
        };
        let Some(mut edited) = edit_node_json(self.editor, &node)? else {
            writeln!(out, "no changes").map_err(write_err)?;
            return Ok(());
        };
        edited.id = sanitize_node_id(&edited.id);
        if edited == node {
            writeln!(out, "no changes").map_err(write_err)?;
            return Ok(());
        }

        debug!("edit_selected: replacing {}", node.id);
        self.session.replace_node(&node.id, &edited)?;
        if edited.id != node.id {
            writeln!(out, "renamed {} -> {}", node.id, edited.id).map_err(write_err)?;
        }
        Ok(())
    }
}

/// Writes `value` to a temp file, opens it in `editor` and reads it back.
///
/// Returns `None` when the file was left untouched.
pub fn edit_node_json<T>(editor: &dyn Editor, value: &T) -> CliResult<Option<T>>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let content = serde_json::to_string_pretty(value).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "serialize node".to_string(),
            source: Box::new(e),
        }
    })?;
    let file = tempfile::Builder::new()
        .prefix("bactree-node-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| InfraError::io("create temp file", e))?;
    std::fs::write(file.path(), &content).map_err(|e| InfraError::io("write temp file", e))?;

    editor.open(file.path()).map_err(|e| InfraError::Editor {
        message: e.to_string(),
    })?;

    let edited =
        std::fs::read_to_string(file.path()).map_err(|e| InfraError::io("read temp file", e))?;
    if edited.trim() == content.trim() {
        return Ok(None);
    }
    serde_json::from_str(&edited)
        .map(Some)
        .map_err(|e| CliError::InvalidArgs(format!("edited node is not valid JSON: {e}")))
}
