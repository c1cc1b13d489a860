use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    PublishContent,
    Interact,
    ManageSuggestions,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::PublishContent,
    Permission::Interact,
    Permission::ManageSuggestions,
];
const REGULAR_PERMISSIONS: &[Permission] = &[Permission::PublishContent, Permission::Interact];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Regular => "Regular",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_every_permission() {
        let perms = UserRole::Admin.permissions();
        assert_eq!(perms.len(), 3);
        assert!(perms.contains(&Permission::ManageSuggestions));
        assert!(perms.contains(&Permission::PublishContent));
    }

    #[test]
    fn regular_user_can_publish_and_interact_only() {
        let perms = UserRole::Regular.permissions();
        assert_eq!(perms, &[Permission::PublishContent, Permission::Interact]);
        assert!(!perms.contains(&Permission::ManageSuggestions));
    }

    #[test]
    fn role_names() {
        assert_eq!(UserRole::Admin.as_str(), "Admin");
        assert_eq!(UserRole::Regular.as_str(), "Regular");
    }
}
