use crate::audit::AuditLog;
use crate::storage::{PermissionRequest, PrincipalType, Role, Storage};
use anyhow::{Context, Result as AnyhowResult};

/// Grants every viewer reader access and every editor writer access on `target_id`, without
/// notifying anyone. There is no deduplication: a principal listed in both sets receives both
/// grants. The first failing grant aborts the replication; earlier grants stay in place.
pub fn replicate(
    storage: &mut dyn Storage,
    audit: &mut AuditLog,
    target_id: &str,
    viewers: &[String],
    editors: &[String],
) -> AnyhowResult<()> {
    let grants = viewers
        .iter()
        .map(|principal| (Role::Reader, principal))
        .chain(editors.iter().map(|principal| (Role::Writer, principal)));
    for (role, principal) in grants {
        storage
            .insert_permission(
                target_id,
                &PermissionRequest {
                    role,
                    principal_type: PrincipalType::User,
                    principal: principal.clone(),
                    send_notification_emails: false,
                },
            )
            .context(format!(
                "Failed to grant {} access to {principal} on {target_id}",
                role.as_str()
            ))?;
        audit.detail(&["grant", target_id, role.as_str(), principal]);
    }
    Ok(())
}
