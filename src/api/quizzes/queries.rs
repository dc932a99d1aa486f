use serde::Deserialize;

use crate::schemas::quiz::QuizStatusValue;

#[derive(Debug, Deserialize)]
pub(super) struct ListQuizzesQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
    #[serde(default)]
    #[serde(alias = "isComp")]
    pub(super) is_comp: Option<bool>,
    #[serde(default)]
    pub(super) status: Option<QuizStatusValue>,
}
