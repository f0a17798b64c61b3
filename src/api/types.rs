//! API request and response types

use crate::db::{
    Appointment, BookingSummary, Consultation, DirectMessage, DoctorFee, DoctorListing, Role,
    User,
};
use crate::intake::{ChatLogEntry, IntakeState};
use crate::triage::TriageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to register a patient
#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request to register a doctor
#[derive(Debug, Deserialize)]
pub struct RegisterDoctorRequest {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub specialization: String,
    pub license_id: String,
}

/// Request to log in
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub fullname: String,
    pub role: Role,
}

/// Who the session cookie belongs to
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub fullname: String,
    pub role: Role,
    pub logged_in_at: DateTime<Utc>,
}

/// Response with a freshly registered account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// Patient dashboard
#[derive(Debug, Serialize)]
pub struct PatientDashboardResponse {
    pub profile: User,
    pub appointments: Vec<Appointment>,
}

/// Doctor dashboard
#[derive(Debug, Serialize)]
pub struct DoctorDashboardResponse {
    pub pending: Vec<Appointment>,
    pub approved: Vec<Appointment>,
}

/// Patient booking page: what can be booked and what already is
#[derive(Debug, Serialize)]
pub struct PatientBookingsResponse {
    pub specializations: Vec<String>,
    pub bookings: Vec<BookingSummary>,
}

/// Patient's recorded triage outcomes
#[derive(Debug, Serialize)]
pub struct ConsultationsResponse {
    pub consultations: Vec<Consultation>,
}

/// Response with the list of specializations
#[derive(Debug, Serialize)]
pub struct SpecializationsResponse {
    pub specializations: Vec<String>,
}

/// Response with doctors for a specialization
#[derive(Debug, Serialize)]
pub struct DoctorsResponse {
    pub specialization: String,
    pub doctors: Vec<DoctorListing>,
}

/// Doctor details shown before finalizing a booking
#[derive(Debug, Serialize)]
pub struct DoctorBookingInfoResponse {
    pub username: String,
    pub fullname: String,
    pub specialization: Option<String>,
    pub fee_amount: Option<f64>,
    pub upi_id: Option<String>,
}

/// Request to book an appointment
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_username: String,
    pub specialization: String,
    pub medical_info: String,
    pub appointment_time: String,
}

/// Response with a single appointment
#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

/// Request to change an appointment's status
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Request to publish a consultation fee
#[derive(Debug, Deserialize)]
pub struct SetFeeRequest {
    pub fee_amount: f64,
    #[serde(default)]
    pub upi_id: String,
}

/// Response with a doctor's fee (absent when never set)
#[derive(Debug, Serialize)]
pub struct FeeResponse {
    pub fee: Option<DoctorFee>,
}

/// Chatbot transcript and progress
#[derive(Debug, Serialize)]
pub struct ChatbotResponse {
    pub chat: Vec<ChatLogEntry>,
    pub state: IntakeState,
    pub done: bool,
}

/// Request to send a chatbot message
#[derive(Debug, Deserialize)]
pub struct ChatbotMessageRequest {
    pub message: String,
}

/// Narrative awaiting confirmation
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub symptoms: String,
}

/// Request to run (or decline) automated analysis
#[derive(Debug, Deserialize)]
pub struct ConsultRequest {
    /// Extra notes typed by the patient
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub ai_consent: bool,
}

/// Triage outcome for the current session
#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub symptoms: String,
    pub ai: TriageResult,
}

/// Summary page
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub ai: TriageResult,
    pub summary: String,
}

/// Request to send a direct message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: String,
    pub message: String,
}

/// Response with a single direct message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: DirectMessage,
}

/// Conversation with one peer
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<DirectMessage>,
}

/// Response for actions with nothing else to report
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
