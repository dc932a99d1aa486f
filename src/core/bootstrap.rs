use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Creates the first staff account, or repairs its password and flags.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        let mut update = repositories::users::UpdateUser::default();
        if !verified {
            update.hashed_password = Some(security::hash_password(&admin.first_superuser_password)?);
        }
        if !user.is_staff {
            update.is_staff = Some(true);
        }
        if !user.is_active {
            update.is_active = Some(true);
        }

        let needs_update =
            update.hashed_password.is_some() || update.is_staff.is_some() || update.is_active.is_some();
        if needs_update {
            repositories::users::update(state.db(), &user.id, update, now).await?;
            tracing::info!(username = %username, "Updated default superuser");
        } else {
            tracing::info!("Default superuser already up to date");
        }

        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    let id = Uuid::new_v4().to_string();
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &id,
            username,
            hashed_password,
            first_name: "Super",
            last_name: "Admin",
            email: "",
            is_staff: true,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(username = %username, "Created default superuser");
    Ok(())
}
