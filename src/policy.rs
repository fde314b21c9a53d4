use serde::{Deserialize, Serialize};

/// Account type reported by the backend on the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Freelancer,
    Admin,
}

/// Actions the UI gates on. One variant per capability check the app makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PlaceOrder,
    LeaveReview,
    CreateService,
    ManageServices,
    ViewSellerAnalytics,
    ModerateUsers,
    ViewAdminDashboard,
}

/// Capability table, one row per role. Admins are granted everything in
/// `is_allowed`, so their row only lists what is exclusive to them.
const POLICY: &[(Role, &[Capability])] = &[
    (
        Role::Client,
        &[Capability::PlaceOrder, Capability::LeaveReview],
    ),
    (
        Role::Freelancer,
        &[
            Capability::CreateService,
            Capability::ManageServices,
            Capability::ViewSellerAnalytics,
        ],
    ),
    (
        Role::Admin,
        &[Capability::ModerateUsers, Capability::ViewAdminDashboard],
    ),
];

pub fn capabilities(role: Role) -> &'static [Capability] {
    POLICY
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, caps)| *caps)
        .unwrap_or(&[])
}

pub fn is_allowed(role: Role, capability: Capability) -> bool {
    if role == Role::Admin {
        return true;
    }
    capabilities(role).contains(&capability)
}
