pub(crate) mod app_settings;
pub(crate) mod categories;
pub(crate) mod invoices;
pub(crate) mod leaderboard;
pub(crate) mod question_attempts;
pub(crate) mod questions;
pub(crate) mod quiz_attempts;
pub(crate) mod quiz_slots;
pub(crate) mod quizzes;
pub(crate) mod results;
pub(crate) mod schools;
pub(crate) mod students;
pub(crate) mod teachers;
pub(crate) mod teams;
pub(crate) mod users;
