//! Backend Gateway: the remote booking service, seen from the client.
//!
//! [`Gateway`] is the seam every workflow talks through. [`HttpGateway`] is
//! the JSON-over-HTTPS implementation; tests substitute a scripted stub.

mod http;
mod types;

pub use http::HttpGateway;
pub use types::*;

use async_trait::async_trait;

use crate::error::ClientError;

/// Calls taking a `token` send it as `Authorization: Bearer <token>`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ClientError>;

    /// `POST /auth/signup`, returning the backend's message if it sent one
    async fn signup(&self, req: &SignupRequest) -> Result<Option<String>, ClientError>;

    /// `POST /auth/sendotp`
    async fn send_otp(&self, email: &str) -> Result<(), ClientError>;

    /// `POST /auth/resetOtp`
    async fn reset_otp(&self, email: &str) -> Result<(), ClientError>;

    /// `POST /auth/resetPassword`
    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ClientError>;

    /// `POST /booking/createbooking`
    async fn create_booking(
        &self,
        token: &str,
        req: &CreateBookingRequest,
    ) -> Result<(), ClientError>;

    /// `GET /booking/getallbookings` (admin)
    async fn list_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError>;

    /// `GET /booking/user/bookings`
    async fn user_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError>;

    /// `GET /booking/getbooking/:id`
    async fn get_booking(&self, token: &str, id: &str) -> Result<Booking, ClientError>;

    /// `PUT /booking/assign-driver/:id`
    async fn assign_driver(
        &self,
        token: &str,
        id: &str,
        driver: &DriverAssignment,
    ) -> Result<(), ClientError>;

    /// `DELETE /booking/deletebooking/:id`
    async fn delete_booking(&self, token: &str, id: &str) -> Result<(), ClientError>;

    /// `PUT /user/update` (multipart)
    async fn update_profile(&self, token: &str, update: &ProfileUpdate)
        -> Result<(), ClientError>;
}
