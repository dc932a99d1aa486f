pub(crate) mod accounts;
pub(crate) mod auth;
pub(crate) mod categories;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod invoices;
pub(crate) mod leaderboard;
pub(crate) mod pagination;
pub(crate) mod question_attempts;
pub(crate) mod questions;
pub(crate) mod quiz_attempts;
pub(crate) mod quizzes;
pub(crate) mod results;
pub(crate) mod router;
pub(crate) mod schools;
pub(crate) mod settings;
pub(crate) mod students;
pub(crate) mod teachers;
pub(crate) mod teams;
