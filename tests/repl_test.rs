//! Tests for the line-oriented edit session

use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use bactree::application::services::{EditorService, TreePaths};
use bactree::cli::repl::Repl;
use bactree::domain::{NodeType, TreeKey};
use bactree::infrastructure::traits::{Editor, RealFileSystem};

type Rewrite = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Mock editor that optionally rewrites the file content
struct MockEditor {
    rewrite: Option<Rewrite>,
}

impl MockEditor {
    fn untouched() -> Self {
        Self { rewrite: None }
    }

    fn rewriting(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            rewrite: Some(Box::new(f)),
        }
    }

    /// Edits one top-level field of the dumped node.
    fn setting(field: &'static str, value: serde_json::Value) -> Self {
        Self::rewriting(move |content| {
            let mut node: serde_json::Value = serde_json::from_str(content).unwrap();
            node[field] = value.clone();
            serde_json::to_string_pretty(&node).unwrap()
        })
    }
}

impl Editor for MockEditor {
    fn open(&self, path: &Path) -> io::Result<()> {
        if let Some(rewrite) = &self.rewrite {
            let content = std::fs::read_to_string(path)?;
            std::fs::write(path, rewrite(&content))?;
        }
        Ok(())
    }
}

fn service(dir: &Path) -> EditorService {
    let paths = TreePaths {
        positive: dir.join("gram_positive.json"),
        negative: dir.join("gram_negative.json"),
    };
    EditorService::new(Arc::new(RealFileSystem), paths, 50)
}

/// Runs `script` against a fresh positive-tree session; returns the output.
fn run_script(
    svc: &EditorService,
    editor: &MockEditor,
    script: &str,
) -> (bactree::application::services::EditSession, String) {
    let session = svc.open_session(TreeKey::Positive).unwrap();
    let mut repl = Repl::new(svc, editor, session);
    let mut out = Vec::new();
    repl.run(Cursor::new(script), &mut out).unwrap();
    (repl.into_session(), String::from_utf8(out).unwrap())
}

#[test]
fn given_build_script_when_running_then_tree_saved_and_collision_reported() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let script = "\
# build a two node tree
set question Shape?
option add
option set 1 label Cocci
add
rename staph
set organism Staphylococcus aureus
select root
option set 1 next staph
add
rename staph
save
quit
";

    // Act
    let (session, out) = run_script(&svc, &MockEditor::untouched(), script);

    // Assert
    assert!(!session.is_dirty());
    assert!(out.contains("added option 1"));
    assert!(out.contains("-> staph"));
    assert!(out.contains("ID already exists: staph"));

    let saved = svc.load_tree(TreeKey::Positive).unwrap();
    let root = saved.get("root").unwrap();
    assert_eq!(root.question(), Some("Shape?"));
    assert_eq!(root.options()[0].label, "Cocci");
    assert_eq!(root.options()[0].next_id, "staph");
    assert_eq!(
        saved.get("staph").unwrap().organism(),
        Some("Staphylococcus aureus")
    );
    assert_eq!(saved.len(), 3);
}

#[test]
fn given_unsaved_changes_when_quitting_then_refused_until_forced() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    // Act
    let (session, out) = run_script(
        &svc,
        &MockEditor::untouched(),
        "set label Begin\nquit\nquit!\nset label never\n",
    );

    // Assert
    assert!(out.contains("unsaved changes, `save` first"));
    assert_eq!(session.tree().get("root").unwrap().label, "Begin");
    assert!(!temp.path().join("gram_positive.json").exists());
}

#[test]
fn given_end_of_input_with_changes_when_running_then_warns_and_discards() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (_, out) = run_script(&svc, &MockEditor::untouched(), "add\n");

    assert!(out.contains("unsaved changes discarded"));
    assert!(!temp.path().join("gram_positive.json").exists());
}

#[test]
fn given_edits_when_undoing_and_redoing_then_history_reported() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (session, out) = run_script(
        &svc,
        &MockEditor::untouched(),
        "set label A\nundo\nundo\nredo\nredo\nquit!\n",
    );

    assert_eq!(session.tree().get("root").unwrap().label, "A");
    let lines: Vec<_> = ["undone", "nothing to undo", "redone", "nothing to redo"]
        .iter()
        .map(|msg| out.find(msg).unwrap())
        .collect();
    assert!(lines.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn given_bad_input_when_running_then_error_reported_and_session_continues() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (session, out) = run_script(
        &svc,
        &MockEditor::untouched(),
        "frobnicate\noption rm 0\nset organism E. coli\nset label Still here\nquit!\n",
    );

    assert!(out.contains("unknown command: frobnicate"));
    assert!(out.contains("option numbers start at 1"));
    assert!(out.contains("does not apply to decision node root"));
    assert_eq!(session.tree().get("root").unwrap().label, "Still here");
}

#[test]
fn given_referenced_node_when_deleting_then_referencing_options_reported() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let script = "\
option add
add
rename target
select root
option set 1 next target
delete target
show
quit!
";

    let (session, out) = run_script(&svc, &MockEditor::untouched(), script);

    assert!(out.contains("deleted target"));
    assert!(out.contains("cleared options in: root"));
    assert!(!session.tree().contains("target"));
    assert_eq!(session.tree().get("root").unwrap().options()[0].next_id, "");
}

#[test]
fn given_editor_changes_when_editing_node_then_fields_applied() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let editor = MockEditor::rewriting(|content| {
        content
            .replace(r#""label": "Start""#, r#""label": "Edited""#)
            .replace(r#""question": """#, r#""question": "Motile?""#)
    });

    let (session, _) = run_script(&svc, &editor, "edit\nquit!\n");

    let root = session.tree().get("root").unwrap();
    assert_eq!(root.label, "Edited");
    assert_eq!(root.question(), Some("Motile?"));
    assert!(session.can_undo());
}

#[test]
fn given_edited_type_when_editing_node_then_variant_switched() {
    // Arrange: a decision with a question and an option
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let editor = MockEditor::setting("type", serde_json::json!("result"));

    // Act
    let (session, out) = run_script(
        &svc,
        &editor,
        "set question Gram stain?\noption add\nedit\nquit!\n",
    );

    // Assert
    assert!(!out.contains("error"));
    let root = session.tree().get("root").unwrap();
    assert_eq!(root.node_type(), NodeType::Result);
    assert_eq!(root.organism(), Some(""));
    assert!(root.options().is_empty());
}

#[test]
fn given_edited_id_when_editing_node_then_node_renamed_with_references() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let editor = MockEditor::setting("id", serde_json::json!("listeria"));
    let script = "\
option add
add
rename target
select root
option set 1 next target
select target
edit
quit!
";

    // Act
    let (session, out) = run_script(&svc, &editor, script);

    // Assert
    assert!(out.contains("renamed target -> listeria"));
    let tree = session.tree();
    assert!(!tree.contains("target"));
    assert!(tree.contains("listeria"));
    assert_eq!(tree.get("root").unwrap().options()[0].next_id, "listeria");
    assert_eq!(session.selected(), "listeria");
}

#[test]
fn given_edited_id_colliding_when_editing_node_then_error_and_tree_unchanged() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let editor = MockEditor::setting("id", serde_json::json!("root"));

    let (session, out) = run_script(&svc, &editor, "add\nedit\nquit!\n");

    assert!(out.contains("ID already exists: root"));
    assert_eq!(session.tree().len(), 2);
    assert!(session.selected().starts_with("node_"));
}

#[test]
fn given_edited_root_id_when_editing_node_then_rename_rejected() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());
    let editor = MockEditor::setting("id", serde_json::json!("start"));

    let (session, out) = run_script(&svc, &editor, "edit\nquit\n");

    assert!(out.contains("cannot rename root"));
    assert!(session.tree().contains("root"));
    assert!(!session.is_dirty());
}

#[test]
fn given_edit_followed_by_undo_when_quitting_then_no_unsaved_warning() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (session, out) = run_script(
        &svc,
        &MockEditor::untouched(),
        "set label Begin\nundo\nquit\nset label after quit\n",
    );

    assert!(!out.contains("unsaved changes"));
    assert_eq!(session.tree().get("root").unwrap().label, "Start");
}

#[test]
fn given_editor_leaves_file_when_editing_node_then_no_changes() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (session, out) = run_script(&svc, &MockEditor::untouched(), "edit\nquit\n");

    assert!(out.contains("no changes"));
    assert!(!session.is_dirty());
}

#[test]
fn given_tree_command_when_switching_then_negative_tree_edited() {
    let temp = TempDir::new().unwrap();
    let svc = service(temp.path());

    let (session, out) = run_script(
        &svc,
        &MockEditor::untouched(),
        "tree neg\nset label Negative start\nsave\nquit\n",
    );

    assert!(out.contains("editing"));
    assert_eq!(session.active(), TreeKey::Negative);
    let saved = svc.load_tree(TreeKey::Negative).unwrap();
    assert_eq!(saved.get("root").unwrap().label, "Negative start");
}
