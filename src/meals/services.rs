use tracing::{info, instrument};

use super::dto::{MealRecord, WriteConfirmation};
use crate::auth::UserId;
use crate::storage::{CollectionPath, DocumentStore, StoreError};

/// `users/{uid}/meals`
pub fn meals_collection(user_id: &UserId) -> Result<CollectionPath, StoreError> {
    CollectionPath::new(["users", user_id.as_str(), "meals"])
}

/// Appends `meal` as a new document owned by `user_id`.
#[instrument(skip(store, meal))]
pub async fn log_meal(
    store: &dyn DocumentStore,
    user_id: &UserId,
    meal: MealRecord,
) -> Result<WriteConfirmation, StoreError> {
    let collection = meals_collection(user_id)?;
    let calories = meal.calories;
    let write = store.add(&collection, meal.into_document()).await?;
    info!(path = %write.document_path, calories, "meal logged");
    Ok(write.into())
}
