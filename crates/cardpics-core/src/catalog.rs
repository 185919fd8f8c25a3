//! Card catalog domain types.
//!
//! Pure data types decoded straight from the catalog API's JSON payload.
//! Entries are immutable once fetched; everything downstream (task
//! derivation, filtering) works on borrowed or owned copies of these.

use serde::{Deserialize, Serialize};

/// One card in the remote catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable external identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Free-form type line (e.g. "Field Spell Card").
    #[serde(rename = "type")]
    pub card_type: String,
    /// Artwork variants, in catalog order.
    #[serde(default)]
    pub card_images: Vec<CardImage>,
    /// Sets this card was printed in.
    #[serde(default)]
    pub card_sets: Vec<CardSet>,
}

impl Card {
    /// Whether this card gets the extra cropped field artwork.
    ///
    /// The type line must mention both "Field" and "Spell"; plain spell
    /// cards and field-themed monsters don't qualify.
    #[must_use]
    pub fn is_field_spell(&self) -> bool {
        self.card_type.contains("Field") && self.card_type.contains("Spell")
    }
}

/// One artwork variant of a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardImage {
    /// Identifier of this artwork; distinct ids for alternate arts.
    pub id: u64,
    /// Full-size art URL.
    pub image_url: String,
    /// Cropped art URL, present for most but not all entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url_cropped: Option<String>,
}

/// One set printing of a card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSet {
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub set_code: String,
}

/// Top-level catalog payload: `{"data": [ ... ]}`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub data: Vec<Card>,
}
