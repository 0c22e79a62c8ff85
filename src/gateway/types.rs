use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmpassword")]
    pub confirm_password: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[serde(rename = "newpassword")]
    pub new_password: String,
    #[serde(rename = "confirmpassword")]
    pub confirm_password: String,
}

/// Common `{success, message}` envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub source_location: String,
    pub destination_location: String,
    pub pickup_point: String,
    pub departure_time: String,
    pub seats: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Backend-owned booking record. Every field but the id is optional because
/// older records are missing some of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_id: Option<BookingRider>,
    #[serde(default)]
    pub source_location: Option<String>,
    #[serde(default)]
    pub destination_location: Option<String>,
    #[serde(default)]
    pub pickup_point: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub seats: Option<u32>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub driver: Option<AssignedDriver>,
}

/// `userId` is either a bare id or the populated user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingRider {
    Id(String),
    Details {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
}

impl BookingRider {
    pub fn email(&self) -> Option<&str> {
        match self {
            BookingRider::Details { email, .. } => email.as_deref(),
            BookingRider::Id(_) => None,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            BookingRider::Details { phone, .. } => phone.as_deref(),
            BookingRider::Id(_) => None,
        }
    }
}

/// Driver as reported back by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedDriver {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub cab_number: String,
    #[serde(default)]
    pub car_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BookingListResponse {
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BookingResponse {
    pub booking: Booking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarModel {
    #[default]
    #[serde(rename = "Innova Crysta")]
    InnovaCrysta,
    #[serde(rename = "Xylo")]
    Xylo,
}

impl CarModel {
    pub const ALL: [CarModel; 2] = [CarModel::InnovaCrysta, CarModel::Xylo];

    pub fn as_str(&self) -> &'static str {
        match self {
            CarModel::InnovaCrysta => "Innova Crysta",
            CarModel::Xylo => "Xylo",
        }
    }
}

impl fmt::Display for CarModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarModel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "innovacrysta" | "innova" => Ok(CarModel::InnovaCrysta),
            "xylo" => Ok(CarModel::Xylo),
            _ => Err(ClientError::validation(
                "Car model must be Innova Crysta or Xylo",
            )),
        }
    }
}

/// Body of the assign-driver call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignment {
    pub name: String,
    pub contact_number: String,
    pub cab_number: String,
    pub car_model: CarModel,
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProfileImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            file_name: "profileImage.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes,
        }
    }
}

/// Multipart profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    pub phone: String,
    pub email: String,
    /// Unchanged when `None`
    pub password: Option<String>,
    pub image: Option<ProfileImage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_booking_wire_shape() {
        let req = CreateBookingRequest {
            source_location: "Gangtok".into(),
            destination_location: "Nathula".into(),
            pickup_point: "White Hill".into(),
            departure_time: "07:00 AM".into(),
            seats: 2,
            start_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "sourceLocation": "Gangtok",
                "destinationLocation": "Nathula",
                "pickupPoint": "White Hill",
                "departureTime": "07:00 AM",
                "seats": 2,
                "startDate": "2026-10-20",
                "endDate": "2026-10-20"
            })
        );
    }

    #[test]
    fn test_booking_tolerates_sparse_records() {
        let booking: Booking = serde_json::from_value(json!({
            "_id": "65f0c0ffee123abc",
            "username": "Pemba",
            "userId": "u-1",
            "seats": 3
        }))
        .unwrap();
        assert_eq!(booking.id, "65f0c0ffee123abc");
        assert_eq!(booking.user_id, Some(BookingRider::Id("u-1".into())));
        assert!(booking.driver.is_none());
    }

    #[test]
    fn test_booking_with_populated_rider_and_driver() {
        let booking: Booking = serde_json::from_value(json!({
            "_id": "b1",
            "userId": {"email": "p@b.com", "phone": "9876543210"},
            "driver": {
                "name": "Dawa",
                "contactNumber": "9123456780",
                "cabNumber": "SK01 P 1234",
                "carModel": "Xylo"
            }
        }))
        .unwrap();
        let rider = booking.user_id.unwrap();
        assert_eq!(rider.email(), Some("p@b.com"));
        assert_eq!(rider.phone(), Some("9876543210"));
        assert_eq!(booking.driver.unwrap().car_model, "Xylo");
    }

    #[test]
    fn test_signup_and_reset_field_names() {
        let signup = serde_json::to_value(SignupRequest {
            username: "Pemba".into(),
            phone: "9876543210".into(),
            email: "p@b.com".into(),
            password: "Secret1!".into(),
            confirm_password: "Secret1!".into(),
            otp: "1234".into(),
        })
        .unwrap();
        assert_eq!(signup["confirmpassword"], "Secret1!");
        assert_eq!(signup["otp"], "1234");

        let reset = serde_json::to_value(ResetPasswordRequest {
            email: "p@b.com".into(),
            otp: "1234".into(),
            new_password: "Secret1!".into(),
            confirm_password: "Secret1!".into(),
        })
        .unwrap();
        assert_eq!(reset["newpassword"], "Secret1!");
        assert_eq!(reset["confirmpassword"], "Secret1!");
    }

    #[test]
    fn test_car_model() {
        assert_eq!("innova crysta".parse::<CarModel>().unwrap(), CarModel::InnovaCrysta);
        assert_eq!("Innova-Crysta".parse::<CarModel>().unwrap(), CarModel::InnovaCrysta);
        assert_eq!("XYLO".parse::<CarModel>().unwrap(), CarModel::Xylo);
        assert!("Scorpio".parse::<CarModel>().is_err());

        let body = serde_json::to_value(DriverAssignment {
            name: "Dawa Sherpa".into(),
            contact_number: "9123456780".into(),
            cab_number: "SK01 P 1234".into(),
            car_model: CarModel::InnovaCrysta,
        })
        .unwrap();
        assert_eq!(body["carModel"], "Innova Crysta");
        assert_eq!(body["contactNumber"], "9123456780");
    }
}
