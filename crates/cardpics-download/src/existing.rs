//! Existing-file filtering.
//!
//! Pre-drops tasks whose output is already on disk so the coordinator
//! never schedules them. Both output directories are listed once up
//! front, not per task.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use cardpics_core::{DownloadTask, Subfolder};

use crate::validate::is_valid_jpeg;

/// Lowercased `.jpg` filenames present in `dir`; empty if unreadable.
fn list_existing_images(dir: &Path) -> HashSet<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return HashSet::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .map(|name| name.to_lowercase())
        .filter(|name| name.ends_with(".jpg"))
        .collect()
}

/// Drop tasks whose output already exists.
///
/// With neither flag set the input is returned unchanged. A task is
/// dropped when its target filename exists AND (`validate_existing` is
/// off, OR the file passes integrity validation). A task whose existing
/// file fails validation is kept for re-download even when
/// `only_missing` is set.
#[must_use]
pub fn filter_existing(
    tasks: Vec<DownloadTask>,
    pics_dir: &Path,
    only_missing: bool,
    validate_existing: bool,
) -> Vec<DownloadTask> {
    if !only_missing && !validate_existing {
        return tasks;
    }

    let existing_root = list_existing_images(pics_dir);
    let existing_field = list_existing_images(&Subfolder::Field.dir_under(pics_dir));

    tasks
        .into_iter()
        .filter(|task| {
            let listing = match task.subfolder {
                Subfolder::Root => &existing_root,
                Subfolder::Field => &existing_field,
            };
            if !listing.contains(&task.file_name().to_lowercase()) {
                return true;
            }
            if validate_existing {
                return !is_valid_jpeg(&task.output_path(pics_dir));
            }
            // only_missing without validation: trust whatever is on disk
            false
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::jpeg_bytes;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn task(image_id: u64, subfolder: Subfolder) -> DownloadTask {
        DownloadTask {
            card_id: image_id,
            name: format!("Card {image_id}"),
            image_id,
            url: format!("https://img.example/{image_id}.jpg"),
            subfolder,
        }
    }

    fn pics_with_field() -> (TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let pics = root.path().join("pics");
        fs::create_dir_all(pics.join("field")).unwrap();
        (root, pics)
    }

    #[test]
    fn no_flags_returns_input_unchanged() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("5.jpg"), jpeg_bytes(2048)).unwrap();

        let tasks = vec![task(5, Subfolder::Root)];
        let filtered = filter_existing(tasks.clone(), &pics, false, false);
        assert_eq!(filtered, tasks);
    }

    #[test]
    fn only_missing_drops_existing_file() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("5.jpg"), jpeg_bytes(2048)).unwrap();

        let tasks = vec![task(5, Subfolder::Root), task(6, Subfolder::Root)];
        let filtered = filter_existing(tasks, &pics, true, false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].image_id, 6);
    }

    #[test]
    fn truncated_file_is_kept_when_validating() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("5.jpg"), jpeg_bytes(512)).unwrap();

        let tasks = vec![task(5, Subfolder::Root)];
        let filtered = filter_existing(tasks, &pics, true, true);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn valid_file_is_dropped_when_validating() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("5.jpg"), jpeg_bytes(2048)).unwrap();

        let tasks = vec![task(5, Subfolder::Root)];
        assert!(filter_existing(tasks, &pics, true, true).is_empty());
    }

    #[test]
    fn field_tasks_check_the_field_listing() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("field").join("7.jpg"), jpeg_bytes(2048)).unwrap();

        // Same id in the root listing is a different file
        let tasks = vec![task(7, Subfolder::Field), task(7, Subfolder::Root)];
        let filtered = filter_existing(tasks, &pics, true, false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].subfolder, Subfolder::Root);
    }

    #[test]
    fn is_idempotent_on_unchanged_directory() {
        let (_root, pics) = pics_with_field();
        fs::write(pics.join("1.jpg"), jpeg_bytes(2048)).unwrap();
        fs::write(pics.join("2.jpg"), jpeg_bytes(512)).unwrap();

        let tasks = vec![
            task(1, Subfolder::Root),
            task(2, Subfolder::Root),
            task(3, Subfolder::Root),
        ];
        let once = filter_existing(tasks, &pics, true, true);
        let twice = filter_existing(once.clone(), &pics, true, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_directories_keep_everything() {
        let root = tempfile::tempdir().unwrap();
        let pics = root.path().join("pics"); // never created

        let tasks = vec![task(1, Subfolder::Root), task(2, Subfolder::Field)];
        let filtered = filter_existing(tasks.clone(), &pics, true, false);
        assert_eq!(filtered, tasks);
    }
}
