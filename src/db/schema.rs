//! Database schema and types

use crate::intake::{IntakeState, Transcript};
use crate::triage::{RiskLevel, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fullname TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    specialization TEXT,
    license_id TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    intake_state TEXT NOT NULL,
    chat_log TEXT NOT NULL,
    symptoms TEXT,
    triage TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_username TEXT NOT NULL,
    doctor_username TEXT NOT NULL,
    specialization TEXT NOT NULL,
    medical_info TEXT NOT NULL,
    appointment_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Pending',

    FOREIGN KEY (patient_username) REFERENCES users(username),
    FOREIGN KEY (doctor_username) REFERENCES users(username)
);

CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_username, status);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_username);

CREATE TABLE IF NOT EXISTS doctor_fees (
    doctor_username TEXT PRIMARY KEY,
    fee_amount REAL NOT NULL CHECK (fee_amount >= 0),
    upi_id TEXT NOT NULL,
    last_updated TEXT NOT NULL,

    FOREIGN KEY (doctor_username) REFERENCES users(username)
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    receiver TEXT NOT NULL,
    message TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages(sender, receiver);

CREATE TABLE IF NOT EXISTS consultations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_username TEXT NOT NULL,
    symptoms TEXT NOT NULL,
    risk TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    explanation TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (patient_username) REFERENCES users(username)
);
";

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub specialization: Option<String>,
    pub license_id: Option<String>,
}

/// Fields needed to register an account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub fullname: &'a str,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub specialization: Option<&'a str>,
    pub license_id: Option<&'a str>,
}

/// Doctor as listed on the booking page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorListing {
    pub username: String,
    pub fullname: String,
    pub specialization: String,
}

/// Appointment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(AppointmentStatus::Pending),
            "Approved" => Ok(AppointmentStatus::Approved),
            "Rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(format!("Unknown appointment status: {other}")),
        }
    }
}

/// Appointment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_username: String,
    pub doctor_username: String,
    pub specialization: String,
    pub medical_info: String,
    pub appointment_date: String,
    pub status: AppointmentStatus,
}

/// Row of the patient's booking history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub specialization: String,
    pub status: AppointmentStatus,
    pub doctor_name: String,
    pub appointment_date: String,
}

/// Consultation fee published by a doctor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorFee {
    pub doctor_username: String,
    pub fee_amount: f64,
    pub upi_id: String,
    pub last_updated: DateTime<Utc>,
}

/// Message between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectMessage {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Triage outcome kept for the patient's record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_username: String,
    pub symptoms: String,
    pub risk: RiskLevel,
    pub recommendation: String,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side session: who is logged in plus their intake progress
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub fullname: String,
    pub role: Role,
    pub intake: IntakeState,
    pub chat_log: Transcript,
    /// Narrative confirmed for consultation
    pub symptoms: Option<String>,
    pub triage: Option<TriageResult>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Drop everything the intake produced
    pub fn clear_intake(&mut self) {
        self.intake = IntakeState::new();
        self.chat_log = Transcript::new();
        self.symptoms = None;
        self.triage = None;
    }
}
