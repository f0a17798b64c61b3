//! Database module for Telecare
//!
//! Provides persistence for accounts, sessions, appointments, fees,
//! direct messages and consultation records.

mod schema;

pub use schema::*;

use crate::intake::{IntakeState, Transcript};
use crate::triage::TriageResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Username or Email already exists")]
    UserExists,
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(i64),
    #[error("Session not found")]
    SessionNotFound,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Register a new account
    pub fn create_user(&self, user: &NewUser<'_>) -> DbResult<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (fullname, email, username, password, role, specialization, license_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.fullname,
                user.email,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.specialization,
                user.license_id
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::UserExists
            }
            other => DbError::Sqlite(other),
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            fullname: user.fullname.to_string(),
            email: user.email.to_string(),
            username: user.username.to_string(),
            password_hash: user.password_hash.to_string(),
            role: user.role,
            specialization: user.specialization.map(String::from),
            license_id: user.license_id.map(String::from),
        })
    }

    /// Get user by username
    pub fn get_user(&self, username: &str) -> DbResult<User> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, fullname, email, username, password, role, specialization, license_id
             FROM users WHERE username = ?1",
            params![username],
            parse_user_row,
        )
        .optional()?
        .ok_or_else(|| DbError::UserNotFound(username.to_string()))
    }

    /// Distinct specializations offered by registered doctors
    pub fn list_specializations(&self) -> DbResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT specialization FROM users
             WHERE role = 'doctor' AND specialization IS NOT NULL
             ORDER BY specialization",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Doctors offering a specialization
    pub fn list_doctors(&self, specialization: &str) -> DbResult<Vec<DoctorListing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT username, fullname, specialization FROM users
             WHERE role = 'doctor' AND specialization = ?1
             ORDER BY fullname",
        )?;
        let rows = stmt.query_map(params![specialization], |row| {
            Ok(DoctorListing {
                username: row.get(0)?,
                fullname: row.get(1)?,
                specialization: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Session Operations ====================

    /// Start a session for a logged-in user with an empty intake
    pub fn create_session(&self, token: &str, user: &User) -> DbResult<Session> {
        let conn = self.conn();
        let now = Utc::now();
        let intake = IntakeState::new();
        let chat_log = Transcript::new();

        conn.execute(
            "INSERT INTO sessions (token, user_id, intake_state, chat_log, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                token,
                user.id,
                serde_json::to_string(&intake)?,
                serde_json::to_string(&chat_log)?,
                now.to_rfc3339()
            ],
        )?;

        Ok(Session {
            token: token.to_string(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            role: user.role,
            intake,
            chat_log,
            symptoms: None,
            triage: None,
            created_at: now,
        })
    }

    /// Get session by token
    pub fn get_session(&self, token: &str) -> DbResult<Session> {
        let conn = self.conn();
        let (mut session, intake_json, chat_json, triage_json) = conn
            .query_row(
                "SELECT s.token, u.username, u.fullname, u.role,
                        s.intake_state, s.chat_log, s.symptoms, s.triage, s.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| {
                    let session = Session {
                        token: row.get(0)?,
                        username: row.get(1)?,
                        fullname: row.get(2)?,
                        role: parse_text(row, 3)?,
                        intake: IntakeState::new(),
                        chat_log: Transcript::new(),
                        symptoms: row.get(6)?,
                        triage: None,
                        created_at: parse_datetime(&row.get::<_, String>(8)?),
                    };
                    Ok((
                        session,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()?
            .ok_or(DbError::SessionNotFound)?;

        let username = session.username.clone();
        if let Some(intake) = decode_session_column(&username, "intake_state", &intake_json) {
            session.intake = intake;
        }
        if let Some(chat_log) = decode_session_column(&username, "chat_log", &chat_json) {
            session.chat_log = chat_log;
        }
        session.triage =
            triage_json.and_then(|json| decode_session_column(&username, "triage", &json));

        Ok(session)
    }

    /// Persist the mutable part of a session (intake, transcript, triage)
    pub fn update_session(&self, session: &Session) -> DbResult<()> {
        let conn = self.conn();
        let triage = session
            .triage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let updated = conn.execute(
            "UPDATE sessions SET intake_state = ?1, chat_log = ?2, symptoms = ?3, triage = ?4
             WHERE token = ?5",
            params![
                serde_json::to_string(&session.intake)?,
                serde_json::to_string(&session.chat_log)?,
                session.symptoms,
                triage,
                session.token
            ],
        )?;

        if updated == 0 {
            return Err(DbError::SessionNotFound);
        }
        Ok(())
    }

    /// Delete a session (logout). Unknown tokens are ignored.
    pub fn delete_session(&self, token: &str) -> DbResult<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    // ==================== Appointment Operations ====================

    /// Book an appointment; it starts out `Pending`
    pub fn create_appointment(
        &self,
        patient_username: &str,
        doctor_username: &str,
        specialization: &str,
        medical_info: &str,
        appointment_date: &str,
    ) -> DbResult<Appointment> {
        let conn = self.conn();
        let status = AppointmentStatus::Pending;
        conn.execute(
            "INSERT INTO appointments
                (patient_username, doctor_username, specialization, medical_info, appointment_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                patient_username,
                doctor_username,
                specialization,
                medical_info,
                appointment_date,
                status.as_str()
            ],
        )?;

        Ok(Appointment {
            id: conn.last_insert_rowid(),
            patient_username: patient_username.to_string(),
            doctor_username: doctor_username.to_string(),
            specialization: specialization.to_string(),
            medical_info: medical_info.to_string(),
            appointment_date: appointment_date.to_string(),
            status,
        })
    }

    /// Get appointment by ID
    pub fn get_appointment(&self, id: i64) -> DbResult<Appointment> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, patient_username, doctor_username, specialization, medical_info,
                    appointment_date, status
             FROM appointments WHERE id = ?1",
            params![id],
            parse_appointment_row,
        )
        .optional()?
        .ok_or(DbError::AppointmentNotFound(id))
    }

    /// A doctor's appointments with the given status
    pub fn list_doctor_appointments(
        &self,
        doctor_username: &str,
        status: AppointmentStatus,
    ) -> DbResult<Vec<Appointment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, patient_username, doctor_username, specialization, medical_info,
                    appointment_date, status
             FROM appointments
             WHERE doctor_username = ?1 AND status = ?2
             ORDER BY appointment_date",
        )?;
        let rows = stmt.query_map(params![doctor_username, status.as_str()], parse_appointment_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// All of a patient's appointments
    pub fn list_patient_appointments(&self, patient_username: &str) -> DbResult<Vec<Appointment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, patient_username, doctor_username, specialization, medical_info,
                    appointment_date, status
             FROM appointments
             WHERE patient_username = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![patient_username], parse_appointment_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Booking history with doctor names, newest appointment first
    pub fn list_patient_bookings(&self, patient_username: &str) -> DbResult<Vec<BookingSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.specialization, a.status, u.fullname, a.appointment_date
             FROM appointments a
             JOIN users u ON a.doctor_username = u.username
             WHERE a.patient_username = ?1
             ORDER BY a.appointment_date DESC",
        )?;
        let rows = stmt.query_map(params![patient_username], |row| {
            Ok(BookingSummary {
                specialization: row.get(0)?,
                status: parse_text(row, 1)?,
                doctor_name: row.get(2)?,
                appointment_date: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Set the status of an appointment owned by `doctor_username`
    pub fn update_appointment_status(
        &self,
        id: i64,
        doctor_username: &str,
        status: AppointmentStatus,
    ) -> DbResult<()> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2 AND doctor_username = ?3",
            params![status.as_str(), id, doctor_username],
        )?;

        if updated == 0 {
            return Err(DbError::AppointmentNotFound(id));
        }
        Ok(())
    }

    // ==================== Fee Operations ====================

    /// Fee published by a doctor, if any
    pub fn get_doctor_fee(&self, doctor_username: &str) -> DbResult<Option<DoctorFee>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT doctor_username, fee_amount, upi_id, last_updated
             FROM doctor_fees WHERE doctor_username = ?1",
            params![doctor_username],
            |row| {
                Ok(DoctorFee {
                    doctor_username: row.get(0)?,
                    fee_amount: row.get(1)?,
                    upi_id: row.get(2)?,
                    last_updated: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(DbError::from)
    }

    /// Insert or replace a doctor's fee
    pub fn upsert_doctor_fee(
        &self,
        doctor_username: &str,
        fee_amount: f64,
        upi_id: &str,
    ) -> DbResult<DoctorFee> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO doctor_fees (doctor_username, fee_amount, upi_id, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(doctor_username) DO UPDATE SET
                fee_amount = excluded.fee_amount,
                upi_id = excluded.upi_id,
                last_updated = excluded.last_updated",
            params![doctor_username, fee_amount, upi_id, now.to_rfc3339()],
        )?;

        Ok(DoctorFee {
            doctor_username: doctor_username.to_string(),
            fee_amount,
            upi_id: upi_id.to_string(),
            last_updated: now,
        })
    }

    // ==================== Message Operations ====================

    /// Store a direct message
    pub fn send_message(&self, sender: &str, receiver: &str, message: &str) -> DbResult<DirectMessage> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO messages (sender, receiver, message, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![sender, receiver, message, now.to_rfc3339()],
        )?;

        Ok(DirectMessage {
            id: conn.last_insert_rowid(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            message: message.to_string(),
            timestamp: now,
        })
    }

    /// Messages exchanged between two users, oldest first
    pub fn list_messages_between(&self, user: &str, peer: &str) -> DbResult<Vec<DirectMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, sender, receiver, message, timestamp FROM messages
             WHERE (sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user, peer], |row| {
            Ok(DirectMessage {
                id: row.get(0)?,
                sender: row.get(1)?,
                receiver: row.get(2)?,
                message: row.get(3)?,
                timestamp: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Consultation Operations ====================

    /// Keep a triage outcome on the patient's record
    pub fn record_consultation(
        &self,
        patient_username: &str,
        symptoms: &str,
        triage: &TriageResult,
    ) -> DbResult<Consultation> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO consultations
                (patient_username, symptoms, risk, recommendation, explanation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                patient_username,
                symptoms,
                triage.risk.as_str(),
                triage.recommendation,
                triage.explanation,
                now.to_rfc3339()
            ],
        )?;

        Ok(Consultation {
            id: conn.last_insert_rowid(),
            patient_username: patient_username.to_string(),
            symptoms: symptoms.to_string(),
            risk: triage.risk,
            recommendation: triage.recommendation.clone(),
            explanation: triage.explanation.clone(),
            created_at: now,
        })
    }

    /// A patient's consultations, newest first
    pub fn list_consultations(&self, patient_username: &str) -> DbResult<Vec<Consultation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, patient_username, symptoms, risk, recommendation, explanation, created_at
             FROM consultations WHERE patient_username = ?1
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![patient_username], |row| {
            Ok(Consultation {
                id: row.get(0)?,
                patient_username: row.get(1)?,
                symptoms: row.get(2)?,
                risk: parse_text(row, 3)?,
                recommendation: row.get(4)?,
                explanation: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        fullname: row.get(1)?,
        email: row.get(2)?,
        username: row.get(3)?,
        password_hash: row.get(4)?,
        role: parse_text(row, 5)?,
        specialization: row.get(6)?,
        license_id: row.get(7)?,
    })
}

fn parse_appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_username: row.get(1)?,
        doctor_username: row.get(2)?,
        specialization: row.get(3)?,
        medical_info: row.get(4)?,
        appointment_date: row.get(5)?,
        status: parse_text(row, 6)?,
    })
}

/// Read a text column into a type with a string-based `FromStr`
fn parse_text<T: FromStr<Err = String>>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Unreadable session JSON is logged and treated as absent
fn decode_session_column<T: DeserializeOwned>(username: &str, column: &str, json: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                username = %username,
                column = %column,
                error = %e,
                "Discarding unreadable session data"
            );
            None
        }
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::{classify, RiskLevel};

    fn patient<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            fullname: "Pat Patient",
            email,
            username,
            password_hash: "hash",
            role: Role::Patient,
            specialization: None,
            license_id: None,
        }
    }

    fn doctor<'a>(username: &'a str, fullname: &'a str, specialization: &'a str) -> NewUser<'a> {
        NewUser {
            fullname,
            email: username,
            username,
            password_hash: "hash",
            role: Role::Doctor,
            specialization: Some(specialization),
            license_id: Some("LIC-1"),
        }
    }

    #[test]
    fn test_create_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_user(&patient("pat", "pat@example.com")).unwrap();

        let fetched = db.get_user("pat").unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.role, Role::Patient);
        assert_eq!(fetched.password_hash, "hash");
        assert!(matches!(db.get_user("nobody"), Err(DbError::UserNotFound(_))));
    }

    #[test]
    fn test_duplicate_username_or_email() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&patient("pat", "pat@example.com")).unwrap();

        let same_name = db.create_user(&patient("pat", "other@example.com"));
        assert!(matches!(same_name, Err(DbError::UserExists)));

        let same_email = db.create_user(&patient("pat2", "pat@example.com"));
        assert!(matches!(same_email, Err(DbError::UserExists)));
    }

    #[test]
    fn test_specializations_and_doctors() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&doctor("drheart", "Dr Heart", "Cardiology")).unwrap();
        db.create_user(&doctor("drskin", "Dr Skin", "Dermatology")).unwrap();
        db.create_user(&doctor("drbeat", "Dr Beat", "Cardiology")).unwrap();
        db.create_user(&patient("pat", "pat@example.com")).unwrap();

        assert_eq!(
            db.list_specializations().unwrap(),
            vec!["Cardiology".to_string(), "Dermatology".to_string()]
        );

        let cardiologists: Vec<_> = db
            .list_doctors("Cardiology")
            .unwrap()
            .into_iter()
            .map(|d| d.username)
            .collect();
        assert_eq!(cardiologists, vec!["drbeat", "drheart"]);
    }

    #[test]
    fn test_appointment_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&doctor("drheart", "Dr Heart", "Cardiology")).unwrap();
        db.create_user(&patient("pat", "pat@example.com")).unwrap();

        let appt = db
            .create_appointment("pat", "drheart", "Cardiology", "palpitations", "2026-11-02T10:00")
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);

        let pending = db
            .list_doctor_appointments("drheart", AppointmentStatus::Pending)
            .unwrap();
        assert_eq!(pending, vec![appt.clone()]);

        // Another doctor cannot touch it
        let denied = db.update_appointment_status(appt.id, "drskin", AppointmentStatus::Approved);
        assert!(matches!(denied, Err(DbError::AppointmentNotFound(_))));

        db.update_appointment_status(appt.id, "drheart", AppointmentStatus::Approved)
            .unwrap();
        assert_eq!(
            db.get_appointment(appt.id).unwrap().status,
            AppointmentStatus::Approved
        );
        assert!(db
            .list_doctor_appointments("drheart", AppointmentStatus::Pending)
            .unwrap()
            .is_empty());

        let bookings = db.list_patient_bookings("pat").unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].doctor_name, "Dr Heart");
        assert_eq!(bookings[0].status, AppointmentStatus::Approved);
        assert_eq!(db.list_patient_appointments("pat").unwrap().len(), 1);
    }

    #[test]
    fn test_fee_upsert_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&doctor("drheart", "Dr Heart", "Cardiology")).unwrap();
        assert_eq!(db.get_doctor_fee("drheart").unwrap(), None);

        db.upsert_doctor_fee("drheart", 500.0, "heart@upi").unwrap();
        db.upsert_doctor_fee("drheart", 750.0, "heart2@upi").unwrap();

        let fee = db.get_doctor_fee("drheart").unwrap().unwrap();
        assert!((fee.fee_amount - 750.0).abs() < f64::EPSILON);
        assert_eq!(fee.upi_id, "heart2@upi");
    }

    #[test]
    fn test_negative_fee_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&doctor("drheart", "Dr Heart", "Cardiology")).unwrap();
        assert!(db.upsert_doctor_fee("drheart", -1.0, "x@upi").is_err());
    }

    #[test]
    fn test_messages_between_users() {
        let db = Database::open_in_memory().unwrap();
        db.send_message("pat", "drheart", "hello doctor").unwrap();
        db.send_message("drheart", "pat", "hello patient").unwrap();
        db.send_message("pat", "drskin", "unrelated").unwrap();

        let thread = db.list_messages_between("drheart", "pat").unwrap();
        let texts: Vec<_> = thread.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["hello doctor", "hello patient"]);
    }

    #[test]
    fn test_session_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&patient("pat", "pat@example.com")).unwrap();
        let mut session = db.create_session("tok-1", &user).unwrap();
        assert!(session.chat_log.is_empty());

        let greeting = crate::intake::reset();
        session.intake = greeting.new_state;
        session.chat_log.add_assistant_message(greeting.prompt);
        session.symptoms = Some("Symptom: fever".to_string());
        session.triage = Some(classify("fever"));
        db.update_session(&session).unwrap();

        let loaded = db.get_session("tok-1").unwrap();
        assert_eq!(loaded.username, "pat");
        assert_eq!(loaded.role, Role::Patient);
        assert_eq!(loaded.intake, session.intake);
        assert_eq!(loaded.chat_log, session.chat_log);
        assert_eq!(loaded.triage.map(|t| t.risk), Some(RiskLevel::Medium));

        db.delete_session("tok-1").unwrap();
        assert!(matches!(db.get_session("tok-1"), Err(DbError::SessionNotFound)));
        assert!(matches!(db.update_session(&session), Err(DbError::SessionNotFound)));
    }

    #[test]
    fn test_unreadable_session_json_falls_back() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&patient("pat", "pat@example.com")).unwrap();
        let mut session = db.create_session("tok-1", &user).unwrap();
        session.chat_log.add_assistant_message("hello");
        db.update_session(&session).unwrap();

        db.conn()
            .execute(
                "UPDATE sessions SET intake_state = 'not json', triage = '{' WHERE token = 'tok-1'",
                [],
            )
            .unwrap();

        let loaded = db.get_session("tok-1").unwrap();
        assert_eq!(loaded.intake, IntakeState::new());
        assert_eq!(loaded.triage, None);
        assert_eq!(loaded.chat_log, session.chat_log);
        assert_eq!(loaded.fullname, "Pat Patient");
    }

    #[test]
    fn test_consultations_recorded() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&patient("pat", "pat@example.com")).unwrap();
        db.record_consultation("pat", "tired", &classify("tired")).unwrap();
        db.record_consultation("pat", "chest pain", &classify("chest pain")).unwrap();

        let history = db.list_consultations("pat").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].risk, RiskLevel::High);
        assert_eq!(history[1].risk, RiskLevel::Low);
    }

    #[test]
    fn test_open_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telecare.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_user(&patient("pat", "pat@example.com")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_user("pat").unwrap().username, "pat");
    }
}
