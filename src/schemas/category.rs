use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::Category;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CategoryCreate {
    #[validate(length(min = 1, max = 100, message = "genre must be 1-100 characters"))]
    pub(crate) genre: String,
    #[serde(default)]
    pub(crate) info: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CategoryUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "genre must be 1-100 characters"))]
    pub(crate) genre: Option<String>,
    #[serde(default)]
    pub(crate) info: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) genre: String,
    pub(crate) info: String,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: Category) -> Self {
        Self { id: category.id, genre: category.genre, info: category.info }
    }
}
