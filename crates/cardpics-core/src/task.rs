//! Download task derivation.
//!
//! Turns catalog entries into a flat list of (url, output path) units and
//! applies the optional type/set filters. Everything here is pure; the
//! existing-file filter needs the filesystem and lives in the engine
//! crate.

use std::path::{Path, PathBuf};

use crate::catalog::Card;

/// Output subfolder for a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Subfolder {
    /// Standard art, directly under the pics directory.
    #[default]
    Root,
    /// Cropped field-spell art, under `pics/field`.
    Field,
}

impl Subfolder {
    /// Path component of this subfolder; empty for the root.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Field => "field",
        }
    }

    /// Directory this subfolder maps to under `pics_dir`.
    #[must_use]
    pub fn dir_under(self, pics_dir: &Path) -> PathBuf {
        match self {
            Self::Root => pics_dir.to_path_buf(),
            Self::Field => pics_dir.join("field"),
        }
    }
}

/// One concrete download unit derived from the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Id of the card this artwork belongs to.
    pub card_id: u64,
    /// Card name, carried along for log lines and error details.
    pub name: String,
    /// Determines the output filename (`<image_id>.jpg`).
    pub image_id: u64,
    /// Source URL.
    pub url: String,
    /// Where the file lands relative to the pics directory.
    pub subfolder: Subfolder,
}

impl DownloadTask {
    /// Output filename for this task.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.image_id)
    }

    /// Final output path under `pics_dir`.
    #[must_use]
    pub fn output_path(&self, pics_dir: &Path) -> PathBuf {
        self.subfolder.dir_under(pics_dir).join(self.file_name())
    }
}

/// Derive the flat task list from catalog entries, in catalog order.
///
/// Every artwork of every card becomes one root task. Field-spell cards
/// additionally get a task for the first artwork's cropped URL, keyed by
/// the card id rather than the image id - the crop lives in its own
/// subfolder and must not collide with the regular art id space.
///
/// No deduplication happens here; duplicate `(subfolder, image_id)` pairs
/// produce redundant but idempotent writes.
#[must_use]
pub fn build_tasks(cards: &[Card]) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();

    for card in cards {
        for image in &card.card_images {
            tasks.push(DownloadTask {
                card_id: card.id,
                name: card.name.clone(),
                image_id: image.id,
                url: image.image_url.clone(),
                subfolder: Subfolder::Root,
            });
        }

        if card.is_field_spell() {
            if let Some(cropped) = card
                .card_images
                .first()
                .and_then(|image| image.image_url_cropped.as_ref())
            {
                tasks.push(DownloadTask {
                    card_id: card.id,
                    name: card.name.clone(),
                    image_id: card.id,
                    url: cropped.clone(),
                    subfolder: Subfolder::Field,
                });
            }
        }
    }

    tasks
}

/// Apply the optional type and set filters to the catalog.
///
/// Both filters are trimmed, case-insensitive substring matches: the type
/// filter against the card's type line, the set filter against any set
/// name or code. When both are given, a card must satisfy both. Empty
/// filters pass everything.
#[must_use]
pub fn filter_cards(cards: Vec<Card>, type_filter: &str, set_filter: &str) -> Vec<Card> {
    let type_filter = type_filter.trim().to_lowercase();
    let set_filter = set_filter.trim().to_lowercase();
    if type_filter.is_empty() && set_filter.is_empty() {
        return cards;
    }

    cards
        .into_iter()
        .filter(|card| {
            if !type_filter.is_empty() && !card.card_type.to_lowercase().contains(&type_filter) {
                return false;
            }
            if !set_filter.is_empty() {
                let matched = card.card_sets.iter().any(|set| {
                    set.set_name.to_lowercase().contains(&set_filter)
                        || set.set_code.to_lowercase().contains(&set_filter)
                });
                if !matched {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CardImage, CardSet};

    fn card(id: u64, name: &str, card_type: &str) -> Card {
        Card {
            id,
            name: name.to_string(),
            card_type: card_type.to_string(),
            card_images: vec![CardImage {
                id,
                image_url: format!("https://img.example/{id}.jpg"),
                image_url_cropped: None,
            }],
            card_sets: Vec::new(),
        }
    }

    #[test]
    fn spell_card_yields_one_root_task() {
        let cards = vec![card(1, "X", "Spell Card")];
        let tasks = build_tasks(&cards);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].card_id, 1);
        assert_eq!(tasks[0].image_id, 1);
        assert_eq!(tasks[0].url, "https://img.example/1.jpg");
        assert_eq!(tasks[0].subfolder, Subfolder::Root);
    }

    #[test]
    fn field_spell_gets_crop_task_keyed_by_card_id() {
        let mut c = card(2, "Y", "Field Spell Card");
        c.card_images[0].image_url_cropped = Some("https://img.example/2c.jpg".to_string());

        let tasks = build_tasks(&[c]);
        assert_eq!(tasks.len(), 2);

        assert_eq!(tasks[0].image_id, 2);
        assert_eq!(tasks[0].subfolder, Subfolder::Root);
        assert_eq!(tasks[0].url, "https://img.example/2.jpg");

        assert_eq!(tasks[1].image_id, 2); // card id, not the image's own id
        assert_eq!(tasks[1].card_id, 2);
        assert_eq!(tasks[1].subfolder, Subfolder::Field);
        assert_eq!(tasks[1].url, "https://img.example/2c.jpg");
    }

    #[test]
    fn field_spell_without_cropped_url_gets_no_crop_task() {
        let c = card(3, "Z", "Field Spell Card");
        let tasks = build_tasks(&[c]);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn alternate_arts_each_get_a_task() {
        let mut c = card(4, "W", "Effect Monster");
        c.card_images.push(CardImage {
            id: 40,
            image_url: "https://img.example/40.jpg".to_string(),
            image_url_cropped: None,
        });

        let tasks = build_tasks(&[c]);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].image_id, 40);
    }

    #[test]
    fn output_path_routes_by_subfolder() {
        let root = DownloadTask {
            card_id: 1,
            name: "X".to_string(),
            image_id: 5,
            url: String::new(),
            subfolder: Subfolder::Root,
        };
        let field = DownloadTask {
            subfolder: Subfolder::Field,
            ..root.clone()
        };

        let pics = Path::new("/tmp/pics");
        assert_eq!(root.output_path(pics), Path::new("/tmp/pics/5.jpg"));
        assert_eq!(field.output_path(pics), Path::new("/tmp/pics/field/5.jpg"));
    }

    #[test]
    fn type_filter_is_case_insensitive_substring() {
        let cards = vec![card(1, "A", "Normal Monster"), card(2, "B", "Spell Card")];
        let filtered = filter_cards(cards, "spell", "");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 2);
    }

    #[test]
    fn set_filter_matches_name_or_code() {
        let mut a = card(1, "A", "Spell Card");
        a.card_sets.push(CardSet {
            set_name: "Legend of Blue Eyes".to_string(),
            set_code: "LOB-005".to_string(),
        });
        let b = card(2, "B", "Spell Card");

        let filtered = filter_cards(vec![a.clone(), b.clone()], "", "lob");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);

        let filtered = filter_cards(vec![a, b], "", "blue eyes");
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn both_filters_must_match() {
        let mut a = card(1, "A", "Spell Card");
        a.card_sets.push(CardSet {
            set_name: "Starter Deck".to_string(),
            set_code: "SDY-001".to_string(),
        });

        assert_eq!(filter_cards(vec![a.clone()], "spell", "sdy").len(), 1);
        assert_eq!(filter_cards(vec![a.clone()], "trap", "sdy").len(), 0);
        assert_eq!(filter_cards(vec![a], "spell", "lob").len(), 0);
    }

    #[test]
    fn blank_filters_pass_everything() {
        let cards = vec![card(1, "A", "Spell Card"), card(2, "B", "Trap Card")];
        assert_eq!(filter_cards(cards, "  ", "").len(), 2);
    }
}
