use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::AppSetting;

#[derive(Debug, Deserialize)]
pub(crate) struct SettingUpdate {
    pub(crate) value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct SettingResponse {
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) value: serde_json::Value,
    pub(crate) updated_at: String,
}

impl SettingResponse {
    pub(crate) fn from_db(setting: AppSetting) -> Self {
        Self {
            id: setting.id,
            key: setting.key,
            value: setting.value.0,
            updated_at: format_primitive(setting.updated_at),
        }
    }
}
