//! Tests for persisted wizard positions

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use bactree::application::services::{SessionStore, SESSION_FILE};
use bactree::domain::{Position, TreeKey};
use bactree::infrastructure::traits::RealFileSystem;

fn store(temp: &TempDir) -> SessionStore {
    SessionStore::in_dir(Arc::new(RealFileSystem), temp.path())
}

#[test]
fn given_empty_store_when_loading_then_none() {
    let temp = TempDir::new().unwrap();
    assert_eq!(store(&temp).load(TreeKey::Positive).unwrap(), None);
}

#[test]
fn given_saved_position_when_reloading_store_then_position_survives() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let position: Position = "pos:0,2".parse().unwrap();
    store(&temp).save(&position).unwrap();

    // Act: fresh store instance on the same file
    let reloaded = store(&temp);

    // Assert
    assert_eq!(reloaded.load(TreeKey::Positive).unwrap(), Some(position));
    assert_eq!(reloaded.load(TreeKey::Negative).unwrap(), None);
    assert!(reloaded.saved_at(TreeKey::Positive).unwrap().is_some());
    assert!(temp.path().join(SESSION_FILE).exists());
}

#[test]
fn given_two_trees_when_clearing_one_then_other_kept() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let s = store(&temp);
    s.save(&"pos:1".parse().unwrap()).unwrap();
    s.save(&"neg:0,0".parse().unwrap()).unwrap();

    // Act
    s.clear(TreeKey::Positive).unwrap();

    // Assert
    assert_eq!(s.load(TreeKey::Positive).unwrap(), None);
    assert_eq!(
        s.load(TreeKey::Negative).unwrap(),
        Some(Position {
            tree: TreeKey::Negative,
            choices: vec![0, 0]
        })
    );
}

#[test]
fn given_corrupt_store_when_loading_then_treated_as_empty_and_overwritten() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(SESSION_FILE), "garbage").unwrap();
    let s = store(&temp);

    // Act / Assert
    assert_eq!(s.load(TreeKey::Negative).unwrap(), None);
    s.save(&"neg:1".parse().unwrap()).unwrap();
    assert!(s.load(TreeKey::Negative).unwrap().is_some());
}

#[test]
fn given_missing_data_dir_when_saving_then_directory_created() {
    let temp = TempDir::new().unwrap();
    let s = SessionStore::in_dir(Arc::new(RealFileSystem), &temp.path().join("nested/data"));

    s.save(&"pos:".parse().unwrap()).unwrap();

    assert!(temp.path().join("nested/data").join(SESSION_FILE).exists());
}
