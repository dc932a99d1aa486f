use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::Invoice;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct InvoiceCreate {
    #[serde(alias = "schoolId", alias = "school")]
    pub(crate) school_id: String,
    #[serde(alias = "date", deserialize_with = "deserialize_date")]
    pub(crate) issued_on: Date,
    #[serde(default)]
    pub(crate) address: String,
    #[serde(default, alias = "studentCount")]
    #[validate(range(min = 0, message = "student_count must not be negative"))]
    pub(crate) student_count: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "cost must not be negative"))]
    pub(crate) cost: i64,
    #[serde(default = "default_subject")]
    #[validate(length(min = 1, max = 200, message = "subject must be 1-200 characters"))]
    pub(crate) subject: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct InvoiceUpdate {
    #[serde(default, alias = "date", deserialize_with = "deserialize_optional_date")]
    pub(crate) issued_on: Option<Date>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default, alias = "studentCount")]
    #[validate(range(min = 0, message = "student_count must not be negative"))]
    pub(crate) student_count: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, message = "cost must not be negative"))]
    pub(crate) cost: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "subject must be 1-200 characters"))]
    pub(crate) subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InvoiceResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) issued_on: String,
    pub(crate) address: String,
    pub(crate) student_count: i32,
    pub(crate) cost: i64,
    pub(crate) subject: String,
    pub(crate) created_at: String,
}

impl InvoiceResponse {
    pub(crate) fn from_db(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            school_id: invoice.school_id,
            issued_on: format_date(invoice.issued_on),
            address: invoice.address,
            student_count: invoice.student_count,
            cost: invoice.cost,
            subject: invoice.subject,
            created_at: format_primitive(invoice.created_at),
        }
    }
}

fn default_subject() -> String {
    "Registration".to_string()
}

fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), &format_description!("[year]-[month]-[day]")).ok()
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {raw}"))),
        None => Ok(None),
    }
}
