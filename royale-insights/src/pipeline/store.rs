//! In-memory artifact store.

use arrow::record_batch::RecordBatch;
use std::collections::HashMap;

use crate::catalog::{CardCatalog, WinConditionCatalog};
use crate::error::{InsightsError, Result};
use crate::stages::business::{BusinessObjectives, CurrentSituation, MlObjectives, ProjectPlan};
use crate::stages::summary::{BusinessSummary, EdaSummary, PreparationSummary};
use crate::stages::{
    CardUsageOutcome, RarityReport, SelectedTables, ValidationReport, WinConditionOutcome,
};

/// A named stage input or output.
#[derive(Debug, Clone)]
pub enum Artifact {
    Table(RecordBatch),
    SelectedTables(SelectedTables),
    BusinessObjectives(BusinessObjectives),
    CurrentSituation(CurrentSituation),
    MlObjectives(MlObjectives),
    ProjectPlan(ProjectPlan),
    BusinessSummary(BusinessSummary),
    Validation(ValidationReport),
    PreparationSummary(PreparationSummary),
    Rarity(RarityReport),
    CardUsage(CardUsageOutcome),
    WinConditions(WinConditionOutcome),
    EdaSummary(EdaSummary),
}

/// Typed view of one [`Artifact`] variant.
pub trait ArtifactValue: Sized {
    /// Name of the variant, used in type mismatch errors.
    const KIND: &'static str;

    fn from_artifact(artifact: &Artifact) -> Option<&Self>;
}

macro_rules! artifact_value {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl ArtifactValue for $ty {
            const KIND: &'static str = $kind;

            fn from_artifact(artifact: &Artifact) -> Option<&Self> {
                match artifact {
                    Artifact::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Artifact {
            fn from(value: $ty) -> Self {
                Artifact::$variant(value)
            }
        }
    };
}

artifact_value!(RecordBatch, Table, "table");
artifact_value!(SelectedTables, SelectedTables, "selected_tables");
artifact_value!(BusinessObjectives, BusinessObjectives, "business_objectives");
artifact_value!(CurrentSituation, CurrentSituation, "current_situation");
artifact_value!(MlObjectives, MlObjectives, "ml_objectives");
artifact_value!(ProjectPlan, ProjectPlan, "project_plan");
artifact_value!(BusinessSummary, BusinessSummary, "business_summary");
artifact_value!(ValidationReport, Validation, "validation_report");
artifact_value!(PreparationSummary, PreparationSummary, "preparation_summary");
artifact_value!(RarityReport, Rarity, "rarity_report");
artifact_value!(CardUsageOutcome, CardUsage, "card_usage");
artifact_value!(WinConditionOutcome, WinConditions, "win_conditions");
artifact_value!(EdaSummary, EdaSummary, "eda_summary");

impl Artifact {
    /// Name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => RecordBatch::KIND,
            Self::SelectedTables(_) => SelectedTables::KIND,
            Self::BusinessObjectives(_) => BusinessObjectives::KIND,
            Self::CurrentSituation(_) => CurrentSituation::KIND,
            Self::MlObjectives(_) => MlObjectives::KIND,
            Self::ProjectPlan(_) => ProjectPlan::KIND,
            Self::BusinessSummary(_) => BusinessSummary::KIND,
            Self::Validation(_) => ValidationReport::KIND,
            Self::PreparationSummary(_) => PreparationSummary::KIND,
            Self::Rarity(_) => RarityReport::KIND,
            Self::CardUsage(_) => CardUsageOutcome::KIND,
            Self::WinConditions(_) => WinConditionOutcome::KIND,
            Self::EdaSummary(_) => EdaSummary::KIND,
        }
    }

    /// JSON form of report artifacts; `None` for tables.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>> {
        let value = match self {
            Self::Table(_) | Self::SelectedTables(_) => return Ok(None),
            Self::BusinessObjectives(v) => serde_json::to_value(v)?,
            Self::CurrentSituation(v) => serde_json::to_value(v)?,
            Self::MlObjectives(v) => serde_json::to_value(v)?,
            Self::ProjectPlan(v) => serde_json::to_value(v)?,
            Self::BusinessSummary(v) => serde_json::to_value(v)?,
            Self::Validation(v) => serde_json::to_value(v)?,
            Self::PreparationSummary(v) => serde_json::to_value(v)?,
            Self::Rarity(v) => serde_json::to_value(v)?,
            Self::CardUsage(v) => serde_json::to_value(v)?,
            Self::WinConditions(v) => serde_json::to_value(v)?,
            Self::EdaSummary(v) => serde_json::to_value(v)?,
        };
        Ok(Some(value))
    }
}

/// Artifacts by name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    artifacts: HashMap<String, Artifact>,
    order: Vec<String>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, replacing any previous artifact.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Artifact>) {
        let name = name.into();
        if self.artifacts.insert(name.clone(), value.into()).is_none() {
            self.order.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Untyped lookup.
    pub fn artifact(&self, name: &str) -> Result<&Artifact> {
        self.artifacts
            .get(name)
            .ok_or_else(|| InsightsError::ArtifactNotFound {
                name: name.to_string(),
            })
    }

    /// Typed lookup.
    pub fn get<T: ArtifactValue>(&self, name: &str) -> Result<&T> {
        let artifact = self.artifact(name)?;
        T::from_artifact(artifact).ok_or_else(|| InsightsError::ArtifactTypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            found: artifact.kind(),
        })
    }

    /// Artifact names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Card catalog built from the `card_master_list` style table `name`.
    pub fn card_catalog(&self, name: &str) -> Result<CardCatalog> {
        CardCatalog::from_batch(self.get::<RecordBatch>(name)?)
    }

    /// Win-condition catalog built from the table `name`.
    pub fn win_condition_catalog(&self, name: &str) -> Result<WinConditionCatalog> {
        WinConditionCatalog::from_batch(self.get::<RecordBatch>(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::define_ml_objectives;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn table() -> RecordBatch {
        RecordBatch::try_from_iter(vec![("x", Arc::new(Int64Array::from(vec![1])) as ArrayRef)])
            .unwrap()
    }

    #[test]
    fn test_typed_lookup() {
        let mut store = ArtifactStore::new();
        store.insert("battles_1", table());
        store.insert("ml_objectives_definition", define_ml_objectives());

        assert_eq!(store.get::<RecordBatch>("battles_1").unwrap().num_rows(), 1);
        assert_eq!(
            store
                .get::<MlObjectives>("ml_objectives_definition")
                .unwrap()
                .objectives
                .len(),
            3
        );
        assert_eq!(
            store.names().collect::<Vec<_>>(),
            vec!["battles_1", "ml_objectives_definition"]
        );
    }

    #[test]
    fn test_lookup_errors() {
        let mut store = ArtifactStore::new();
        store.insert("battles_1", table());

        let err = store.get::<RecordBatch>("battles_9").unwrap_err();
        assert!(matches!(err, InsightsError::ArtifactNotFound { .. }));

        let err = store.get::<RarityReport>("battles_1").unwrap_err();
        match err {
            InsightsError::ArtifactTypeMismatch { expected, found, .. } => {
                assert_eq!(expected, "rarity_report");
                assert_eq!(found, "table");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tables_have_no_json_form() {
        assert!(Artifact::Table(table()).to_json().unwrap().is_none());
        let json = Artifact::from(define_ml_objectives()).to_json().unwrap();
        assert!(json.unwrap().get("objectives").is_some());
    }
}
