//! Startup provisioning.

use carenest_core::{Role, User};
use carenest_storage::{Constraint, EntityStore, Filter, typed};

use crate::config::AdminUserConfig;
use crate::services::accounts::{NewUser, create_user};

/// Creates the configured admin account unless its email is already taken.
///
/// An existing account is left untouched, whatever its role.
pub async fn ensure_admin(
    store: &dyn EntityStore,
    admin: &AdminUserConfig,
) -> anyhow::Result<Option<User>> {
    let email = admin.email.trim().to_lowercase();
    let existing =
        typed::find_one::<User>(store, Filter::from(Constraint::eq("email", email.as_str())))
            .await?;
    if let Some(user) = existing {
        tracing::debug!(user = %user.id, "bootstrap admin already present");
        return Ok(None);
    }

    let user = create_user(
        store,
        NewUser {
            name: admin.name.clone(),
            email,
            password: admin.password.clone(),
            role: Role::Admin,
            phone: None,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("creating bootstrap admin: {e}"))?;
    tracing::info!(user = %user.id, email = %user.email, "bootstrap admin created");
    Ok(Some(user))
}
