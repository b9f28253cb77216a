use anyhow::Error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    EditOwnProfile,
    LogActivities,

    PreviewDraftPlans,

    ViewAdminDashboard,
    ManageFitnessPlans,
    ManageNutritionPlans,

    ManageUsers,
    ManageFeedback,
}

/// Closed set of role tags stored on a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    AdminSuper,
    AdminNutritionist,
    AdminFitness,
    Nutritionist,
    Planner,
}

static USER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::EditOwnProfile);
    permissions.insert(Permission::LogActivities);

    permissions
});

// Nutritionists and planners author content elsewhere; here they can only
// preview unpublished plans.
static STAFF_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(USER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::PreviewDraftPlans);

    permissions
});

static FITNESS_ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(STAFF_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewAdminDashboard);
    permissions.insert(Permission::ManageFitnessPlans);

    permissions
});

static NUTRITION_ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(STAFF_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewAdminDashboard);
    permissions.insert(Permission::ManageNutritionPlans);

    permissions
});

static SUPER_ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(FITNESS_ADMIN_PERMISSIONS.iter().copied());
    permissions.extend(NUTRITION_ADMIN_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageUsers);
    permissions.insert(Permission::ManageFeedback);

    permissions
});

impl Role {
    pub const ALL: [Role; 6] = [
        Role::User,
        Role::AdminSuper,
        Role::AdminNutritionist,
        Role::AdminFitness,
        Role::Nutritionist,
        Role::Planner,
    ];

    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::User => &USER_PERMISSIONS,
            Role::Nutritionist | Role::Planner => &STAFF_PERMISSIONS,
            Role::AdminFitness => &FITNESS_ADMIN_PERMISSIONS,
            Role::AdminNutritionist => &NUTRITION_ADMIN_PERMISSIONS,
            Role::AdminSuper => &SUPER_ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Every `admin_*` role reaches the back-office.
    pub fn is_admin(&self) -> bool {
        self.as_str().starts_with("admin_")
    }

    pub fn is_super_admin(&self) -> bool {
        *self == Role::AdminSuper
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::AdminSuper => "admin_super",
            Role::AdminNutritionist => "admin_nutritionist",
            Role::AdminFitness => "admin_fitness",
            Role::Nutritionist => "nutritionist",
            Role::Planner => "planner",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::msg(format!("Unknown role: {}", s)))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
