use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{Document, WriteResult};

/// One logged meal, stored as `{name, calories, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    pub name: String,
    pub calories: i32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MealRecord {
    /// Field map persisted for this meal.
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from(self.name));
        doc.insert("calories".into(), Value::from(self.calories));
        doc.insert("type".into(), Value::from(self.kind));
        doc
    }
}

/// A committed meal write.
#[derive(Debug, Clone)]
pub struct WriteConfirmation {
    pub write: WriteResult,
}

impl WriteConfirmation {
    pub fn message(&self) -> String {
        format!("Meal logged at {}", self.write.update_time_rfc3339())
    }
}

impl From<WriteResult> for WriteConfirmation {
    fn from(write: WriteResult) -> Self {
        Self { write }
    }
}
