use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod attempt;
pub(crate) mod auth;
pub(crate) mod category;
pub(crate) mod invoice;
pub(crate) mod leaderboard;
pub(crate) mod question;
pub(crate) mod quiz;
pub(crate) mod results;
pub(crate) mod school;
pub(crate) mod setting;
pub(crate) mod student;
pub(crate) mod teacher;
pub(crate) mod team;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}
