pub mod auth;
pub mod errors;
pub mod user;

pub use auth::{AuthResponse, AuthType, LoginRequest, ProfileResponse, RegisterRequest};
pub use errors::ErrorResponse;
pub use user::UserProfile;
