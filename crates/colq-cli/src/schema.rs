//! Built-in table descriptors for the `auth` module.

use colq_core::catalog::{ColumnDef, ColumnType, Module, RelationDef, TableDef};

/// Name of the built-in module.
pub const AUTH_MODULE: &str = "auth";

/// `id`, `created_at`, `updated_at` and the `deleted_at` soft-delete marker.
fn base_table(entity: &str, table: &str) -> TableDef {
    TableDef::new(entity, table)
        .with_column(ColumnDef::new("id", ColumnType::Uuid))
        .with_column(ColumnDef::new("created_at", ColumnType::Timestamp))
        .with_column(ColumnDef::new("updated_at", ColumnType::Timestamp))
        .with_soft_delete("deleted_at")
}

/// Users, their profiles and sessions, and role-based permissions.
pub fn auth_module() -> Module {
    let users = base_table("User", "users")
        .with_column(ColumnDef::new("username", ColumnType::Text))
        .with_column(ColumnDef::new("email", ColumnType::Text))
        .with_column(ColumnDef::new("password_hash", ColumnType::Text))
        .with_column(ColumnDef::new("is_active", ColumnType::Bool))
        .with_column(ColumnDef::new("metadata", ColumnType::Json).nullable())
        .with_relation(RelationDef::has_one("profile", "UserProfile", "user_id"))
        .with_relation(RelationDef::has_many("roles", "UserRole", "user_id"))
        .with_relation(RelationDef::has_many("sessions", "Session", "user_id"));

    let profiles = base_table("UserProfile", "user_profiles")
        .with_column(ColumnDef::new("user_id", ColumnType::Uuid))
        .with_column(ColumnDef::new("first_name", ColumnType::Text))
        .with_column(ColumnDef::new("last_name", ColumnType::Text))
        .with_column(ColumnDef::new("phone_number", ColumnType::Text))
        .with_column(ColumnDef::new("avatar_url", ColumnType::Text))
        .with_column(ColumnDef::new("bio", ColumnType::Text))
        .with_column(ColumnDef::new("date_of_birth", ColumnType::Timestamp).nullable())
        .with_relation(RelationDef::belongs_to("user", "User", "user_id"));

    let sessions = base_table("Session", "sessions")
        .with_column(ColumnDef::new("user_id", ColumnType::Uuid))
        .with_column(ColumnDef::new("jwt_id", ColumnType::Uuid))
        .with_column(ColumnDef::new("refresh_token", ColumnType::Text))
        .with_column(ColumnDef::new("expires_at", ColumnType::Timestamp))
        .with_column(ColumnDef::new("revoked", ColumnType::Bool))
        .with_column(ColumnDef::new("ip_address", ColumnType::Text))
        .with_column(ColumnDef::new("user_agent", ColumnType::Text))
        .with_relation(RelationDef::belongs_to("user", "User", "user_id"));

    let roles = base_table("Role", "roles")
        .with_column(ColumnDef::new("name", ColumnType::Text))
        .with_relation(RelationDef::has_many("permissions", "RolePermission", "role_id"))
        .with_relation(RelationDef::has_many("users", "UserRole", "role_id"));

    let permissions = base_table("Permission", "permissions")
        .with_column(ColumnDef::new("name", ColumnType::Text))
        .with_column(ColumnDef::new("description", ColumnType::Text))
        .with_relation(RelationDef::has_many("roles", "RolePermission", "permission_id"));

    let role_permissions = TableDef::new("RolePermission", "role_permissions")
        .with_column(ColumnDef::new("role_id", ColumnType::Uuid))
        .with_column(ColumnDef::new("permission_id", ColumnType::Uuid))
        .with_relation(RelationDef::belongs_to("role", "Role", "role_id"))
        .with_relation(RelationDef::belongs_to("permission", "Permission", "permission_id"));

    let user_roles = TableDef::new("UserRole", "user_roles")
        .with_column(ColumnDef::new("user_id", ColumnType::Uuid))
        .with_column(ColumnDef::new("role_id", ColumnType::Uuid))
        .with_relation(RelationDef::belongs_to("user", "User", "user_id"))
        .with_relation(RelationDef::belongs_to("role", "Role", "role_id"));

    Module::new(AUTH_MODULE)
        .with_table(users)
        .with_table(profiles)
        .with_table(sessions)
        .with_table(roles)
        .with_table(permissions)
        .with_table(role_permissions)
        .with_table(user_roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colq_core::catalog::Catalog;

    #[test]
    fn test_auth_module_builds() {
        let catalog = Catalog::from_module(auth_module()).unwrap();
        assert_eq!(
            catalog.entities().collect::<Vec<_>>(),
            vec![
                "User",
                "UserProfile",
                "Session",
                "Role",
                "Permission",
                "RolePermission",
                "UserRole"
            ]
        );
        let users = catalog.table("users").unwrap();
        assert_eq!(users.soft_delete.as_deref(), Some("deleted_at"));
        assert!(catalog.table("user_roles").unwrap().soft_delete.is_none());
    }
}
