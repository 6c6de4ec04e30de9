use crate::error::VitalsError;
use crate::types::{
    HistorySeries, ImportRequest, LoginRequest, LoginResponse, Metric, Period, ProfileUpdate,
    ProfileUpdateResponse, RawStats, Registration, UserDetails, UserId,
};
use async_trait::async_trait;

/// Fallback messages used when the service gives no usable detail.
pub mod messages {
    pub const LOGIN_FAILED: &str = "Login failed";
    pub const REGISTRATION_FAILED: &str = "Registration failed";
    pub const LOGOUT_FAILED: &str = "Logout failed";
    pub const USER_DETAILS_FAILED: &str = "Error fetching user details";
    pub const CURRENT_STATS_FAILED: &str = "Error fetching current statistics";
    pub const HISTORY_FAILED: &str = "Error fetching history";
    pub const IMPORT_FAILED: &str = "Error importing data";
    pub const PROFILE_UPDATE_FAILED: &str = "Error updating profile";
}

/// Request/response contract of the health-tracking service.
///
/// Implementations normalize failures before returning them: a rejection
/// becomes [`VitalsError::Remote`] whose message is the server `detail` for
/// the auth endpoints and the generic default from [`messages`] otherwise.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, VitalsError>;

    async fn register(&self, registration: &Registration) -> Result<(), VitalsError>;

    async fn logout(&self) -> Result<(), VitalsError>;

    async fn user_details(&self, user_id: &UserId) -> Result<UserDetails, VitalsError>;

    async fn current_stats(&self, user_id: &UserId) -> Result<RawStats, VitalsError>;

    async fn history(
        &self,
        user_id: &UserId,
        metric: Metric,
        period: Period,
    ) -> Result<HistorySeries, VitalsError>;

    async fn import_data(&self, user_id: &UserId, request: &ImportRequest)
        -> Result<(), VitalsError>;

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdateResponse, VitalsError>;
}
