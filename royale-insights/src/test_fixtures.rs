//! Battle-log fixtures for tests.
//!
//! [`BattleRow`] describes one battle in the flattened `winner.*` /
//! `loser.*` layout; [`battle_table`] turns rows into a raw battle table
//! whose first column (`index`) holds the battle identifier, the way the
//! exported battle logs do before normalization.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::catalog::{
    CARD_ID_COLUMN, CARD_NAME_COLUMN, WIN_CONDITION_ID_COLUMN, WIN_CONDITION_NAME_COLUMN,
};
use crate::error::Result;
use crate::pipeline::registry::{BATTLE_INPUTS, CARD_MASTER_LIST, WINCONS};
use crate::pipeline::ArtifactStore;
use crate::stages::RarityTier;

/// Number of card slots per deck.
pub const DECK_SIZE: usize = 8;

/// One battle of a fixture table.
#[derive(Debug, Clone)]
pub struct BattleRow {
    pub battle_id: String,
    pub winner_tag: Option<String>,
    pub loser_tag: Option<String>,
    pub winner_cards: Vec<i64>,
    pub loser_cards: Vec<i64>,
    /// Counts per rarity tier, in [`RarityTier::ALL`] order.
    pub winner_rarity: [i64; 4],
    pub loser_rarity: [i64; 4],
    pub winner_trophies: i64,
}

impl BattleRow {
    pub fn new(battle_id: impl Into<String>) -> Self {
        let battle_id = battle_id.into();
        Self {
            winner_tag: Some(format!("#W{battle_id}")),
            loser_tag: Some(format!("#L{battle_id}")),
            battle_id,
            winner_cards: Vec::new(),
            loser_cards: Vec::new(),
            winner_rarity: [0; 4],
            loser_rarity: [0; 4],
            winner_trophies: 5000,
        }
    }

    pub fn with_tags(mut self, winner: Option<&str>, loser: Option<&str>) -> Self {
        self.winner_tag = winner.map(str::to_string);
        self.loser_tag = loser.map(str::to_string);
        self
    }

    /// Winner deck; slots beyond the given cards stay empty.
    pub fn with_winner_cards(mut self, cards: &[i64]) -> Self {
        self.winner_cards = cards.iter().copied().take(DECK_SIZE).collect();
        self
    }

    pub fn with_loser_cards(mut self, cards: &[i64]) -> Self {
        self.loser_cards = cards.iter().copied().take(DECK_SIZE).collect();
        self
    }

    pub fn with_winner_rarity(mut self, counts: [i64; 4]) -> Self {
        self.winner_rarity = counts;
        self
    }

    pub fn with_loser_rarity(mut self, counts: [i64; 4]) -> Self {
        self.loser_rarity = counts;
        self
    }

    fn deck(&self, side: &str) -> &[i64] {
        if side == "winner" {
            &self.winner_cards
        } else {
            &self.loser_cards
        }
    }

    fn rarity(&self, side: &str) -> [i64; 4] {
        if side == "winner" {
            self.winner_rarity
        } else {
            self.loser_rarity
        }
    }
}

fn string_column(values: impl Iterator<Item = Option<String>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

fn int_column(values: impl Iterator<Item = Option<i64>>) -> ArrayRef {
    Arc::new(values.collect::<Int64Array>())
}

/// Raw battle table for `rows`.
///
/// Columns: `index`, `battleTime`, the player tags, eight card slots per
/// side, the rarity counts per side and `winner.startingTrophies`.
pub fn battle_table(rows: &[BattleRow]) -> Result<RecordBatch> {
    let mut columns: Vec<(String, ArrayRef)> = vec![
        (
            "index".to_string(),
            string_column(rows.iter().map(|r| Some(r.battle_id.clone()))),
        ),
        (
            "battleTime".to_string(),
            string_column(rows.iter().map(|_| Some("2020-12-27T00:00:00Z".to_string()))),
        ),
        (
            "winner.tag".to_string(),
            string_column(rows.iter().map(|r| r.winner_tag.clone())),
        ),
        (
            "loser.tag".to_string(),
            string_column(rows.iter().map(|r| r.loser_tag.clone())),
        ),
    ];

    for side in ["winner", "loser"] {
        for slot in 0..DECK_SIZE {
            columns.push((
                format!("{side}.card{}.id", slot + 1),
                int_column(rows.iter().map(|r| r.deck(side).get(slot).copied())),
            ));
        }
    }

    for side in ["winner", "loser"] {
        for (i, tier) in RarityTier::ALL.iter().enumerate() {
            columns.push((
                tier.column(side),
                int_column(rows.iter().map(|r| Some(r.rarity(side)[i]))),
            ));
        }
    }

    columns.push((
        "winner.startingTrophies".to_string(),
        int_column(rows.iter().map(|r| Some(r.winner_trophies))),
    ));

    Ok(RecordBatch::try_from_iter(columns)?)
}

/// Master card list with `(id, name)` rows.
pub fn card_list(cards: &[(i64, &str)]) -> Result<RecordBatch> {
    Ok(RecordBatch::try_from_iter(vec![
        (
            CARD_ID_COLUMN,
            int_column(cards.iter().map(|(id, _)| Some(*id))),
        ),
        (
            CARD_NAME_COLUMN,
            string_column(cards.iter().map(|(_, name)| Some(name.to_string()))),
        ),
    ])?)
}

/// Win-condition list with `(id, name)` rows.
pub fn wincon_list(cards: &[(i64, &str)]) -> Result<RecordBatch> {
    Ok(RecordBatch::try_from_iter(vec![
        (
            WIN_CONDITION_ID_COLUMN,
            int_column(cards.iter().map(|(id, _)| Some(*id))),
        ),
        (
            WIN_CONDITION_NAME_COLUMN,
            string_column(cards.iter().map(|(_, name)| Some(name.to_string()))),
        ),
    ])?)
}

pub const KNIGHT: i64 = 26000000;
pub const ARCHERS: i64 = 26000001;
pub const GIANT: i64 = 26000003;
pub const HOG_RIDER: i64 = 26000021;
pub const FIREBALL: i64 = 28000000;

/// Store holding a small but complete set of catalog inputs.
///
/// Three battle tables of two, one and one battles. Knight is in every
/// deck, Giant and Hog Rider are the win conditions.
pub fn sample_store() -> Result<ArtifactStore> {
    let first = battle_table(&[
        BattleRow::new("B1")
            .with_winner_cards(&[KNIGHT, GIANT, FIREBALL])
            .with_loser_cards(&[KNIGHT, ARCHERS])
            .with_winner_rarity([4, 2, 1, 1])
            .with_loser_rarity([5, 2, 1, 0]),
        BattleRow::new("B2")
            .with_winner_cards(&[KNIGHT, HOG_RIDER])
            .with_loser_cards(&[KNIGHT, GIANT])
            .with_winner_rarity([3, 3, 1, 1])
            .with_loser_rarity([4, 3, 1, 0]),
    ])?;
    let second = battle_table(&[BattleRow::new("B3")
        .with_winner_cards(&[KNIGHT, HOG_RIDER, ARCHERS])
        .with_loser_cards(&[KNIGHT])
        .with_winner_rarity([4, 2, 2, 0])
        .with_loser_rarity([3, 3, 2, 0])])?;
    let third = battle_table(&[BattleRow::new("B4")
        .with_winner_cards(&[KNIGHT, GIANT])
        .with_loser_cards(&[KNIGHT, FIREBALL])
        .with_winner_rarity([2, 4, 1, 1])
        .with_loser_rarity([4, 2, 2, 0])])?;

    let mut store = ArtifactStore::new();
    for (name, table) in BATTLE_INPUTS.into_iter().zip([first, second, third]) {
        store.insert(name, table);
    }
    store.insert(
        CARD_MASTER_LIST,
        card_list(&[
            (KNIGHT, "Knight"),
            (ARCHERS, "Archers"),
            (GIANT, "Giant"),
            (HOG_RIDER, "Hog Rider"),
            (FIREBALL, "Fireball"),
        ])?,
    );
    store.insert(WINCONS, wincon_list(&[(GIANT, "Giant"), (HOG_RIDER, "Hog Rider")])?);
    Ok(store)
}
