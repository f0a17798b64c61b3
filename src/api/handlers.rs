//! HTTP request handlers

use super::types::{
    AppointmentResponse, BookAppointmentRequest, ChatbotMessageRequest, ChatbotResponse,
    ConfirmResponse, ConsultRequest, ConsultationsResponse, DoctorBookingInfoResponse,
    DoctorDashboardResponse, DoctorsResponse, ErrorResponse, FeeResponse, LoginRequest,
    LoginResponse, MessageResponse, MessagesResponse, PatientBookingsResponse,
    PatientDashboardResponse, RegisterDoctorRequest, RegisterPatientRequest, SendMessageRequest,
    SessionResponse, SetFeeRequest, SpecializationsResponse, StatusRequest, SuccessResponse,
    SummaryResponse, TriageResponse, UserResponse,
};
use super::AppState;
use crate::auth::{
    expired_session_cookie, hash_password, new_session_token, session_cookie, verify_password,
    SESSION_COOKIE,
};
use crate::db::{AppointmentStatus, DbError, NewUser, Role, Session};
use crate::intake::{self, to_narrative, with_manual_notes};
use crate::triage::{self, Consent, TriageResult};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde::Deserialize;

type SessionCookie = Option<TypedHeader<Cookie>>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/api/register/patient", post(register_patient))
        .route("/api/register/doctor", post(register_doctor))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(current_session))
        // Patient pages
        .route("/api/patient/dashboard", get(patient_dashboard))
        .route("/api/patient/bookings", get(patient_bookings))
        .route("/api/patient/consultations", get(patient_consultations))
        // Booking
        .route("/api/specializations", get(list_specializations))
        .route("/api/doctors", get(list_doctors))
        .route("/api/doctors/:username", get(doctor_booking_info))
        .route("/api/appointments", post(book_appointment))
        // Doctor pages
        .route("/api/doctor/dashboard", get(doctor_dashboard))
        .route("/api/appointments/:id/status", post(set_appointment_status))
        .route("/api/doctor/fee", get(get_fee).post(set_fee))
        // Symptom intake
        .route("/api/chatbot", get(chatbot))
        .route("/api/chatbot/message", post(chatbot_message))
        .route("/api/chatbot/clear", post(chatbot_clear))
        .route("/api/intake/confirm", get(confirm_intake))
        .route("/api/intake/consult", post(consult))
        .route("/api/intake/summary", get(intake_summary))
        // Direct messages
        .route("/api/messages", post(send_message))
        .route("/api/messages/:peer", get(list_messages))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Accounts
// ============================================================

async fn register_patient(
    State(state): State<AppState>,
    Json(req): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_filled(&[
        ("fullname", &req.fullname),
        ("email", &req.email),
        ("username", &req.username),
        ("password", &req.password),
    ])?;

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let user = state.db.create_user(&NewUser {
        fullname: &req.fullname,
        email: &req.email,
        username: &req.username,
        password_hash: &password_hash,
        role: Role::Patient,
        specialization: None,
        license_id: None,
    })?;

    audit(&user.username, "register_patient");
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

async fn register_doctor(
    State(state): State<AppState>,
    Json(req): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_filled(&[
        ("fullname", &req.fullname),
        ("email", &req.email),
        ("username", &req.username),
        ("password", &req.password),
        ("specialization", &req.specialization),
        ("license_id", &req.license_id),
    ])?;

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let user = state.db.create_user(&NewUser {
        fullname: &req.fullname,
        email: &req.email,
        username: &req.username,
        password_hash: &password_hash,
        role: Role::Doctor,
        specialization: Some(&req.specialization),
        license_id: Some(&req.license_id),
    })?;

    audit(&user.username, "register_doctor");
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

async fn login(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let user = match state.db.get_user(&req.username) {
        Ok(user) => user,
        Err(DbError::UserNotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    let valid = verify_password(&req.password, &user.password_hash).unwrap_or_else(|e| {
        tracing::warn!(username = %user.username, error = %e, "Stored password hash unreadable");
        false
    });
    if !valid {
        return Err(invalid());
    }

    // Replace whatever session the browser was holding
    if let Some(old) = session_token(&cookie) {
        state.db.delete_session(old)?;
    }

    let token = new_session_token();
    state.db.create_session(&token, &user)?;
    audit(&user.username, "login");

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.cookie_secure),
        )],
        Json(LoginResponse {
            username: user.username,
            fullname: user.fullname,
            role: user.role,
        }),
    ))
}

async fn logout(State(state): State<AppState>, cookie: SessionCookie) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&cookie) {
        if let Ok(session) = state.db.get_session(token) {
            audit(&session.username, "logout");
        }
        state.db.delete_session(token)?;
    }

    Ok((
        [(
            header::SET_COOKIE,
            expired_session_cookie(state.config.cookie_secure),
        )],
        Json(SuccessResponse { success: true }),
    ))
}

async fn current_session(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<SessionResponse>, AppError> {
    let session = authorize(&state, &cookie, None)?;

    Ok(Json(SessionResponse {
        username: session.username,
        fullname: session.fullname,
        role: session.role,
        logged_in_at: session.created_at,
    }))
}

// ============================================================
// Patient Pages
// ============================================================

async fn patient_dashboard(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<PatientDashboardResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Patient))?;
    let profile = state.db.get_user(&session.username)?;
    let appointments = state.db.list_patient_appointments(&session.username)?;

    Ok(Json(PatientDashboardResponse {
        profile,
        appointments,
    }))
}

async fn patient_bookings(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<PatientBookingsResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Patient))?;

    Ok(Json(PatientBookingsResponse {
        specializations: state.db.list_specializations()?,
        bookings: state.db.list_patient_bookings(&session.username)?,
    }))
}

async fn patient_consultations(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<ConsultationsResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Patient))?;

    Ok(Json(ConsultationsResponse {
        consultations: state.db.list_consultations(&session.username)?,
    }))
}

// ============================================================
// Booking
// ============================================================

async fn list_specializations(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<SpecializationsResponse>, AppError> {
    authorize(&state, &cookie, Some(Role::Patient))?;

    Ok(Json(SpecializationsResponse {
        specializations: state.db.list_specializations()?,
    }))
}

#[derive(Debug, Deserialize)]
struct DoctorsQuery {
    specialization: String,
}

async fn list_doctors(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Query(query): Query<DoctorsQuery>,
) -> Result<Json<DoctorsResponse>, AppError> {
    authorize(&state, &cookie, Some(Role::Patient))?;
    let doctors = state.db.list_doctors(&query.specialization)?;

    Ok(Json(DoctorsResponse {
        specialization: query.specialization,
        doctors,
    }))
}

async fn doctor_booking_info(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Path(username): Path<String>,
) -> Result<Json<DoctorBookingInfoResponse>, AppError> {
    authorize(&state, &cookie, Some(Role::Patient))?;

    let doctor = state.db.get_user(&username)?;
    if doctor.role != Role::Doctor {
        return Err(AppError::NotFound(format!("Doctor not found: {username}")));
    }
    let fee = state.db.get_doctor_fee(&username)?;

    Ok(Json(DoctorBookingInfoResponse {
        username: doctor.username,
        fullname: doctor.fullname,
        specialization: doctor.specialization,
        fee_amount: fee.as_ref().map(|f| f.fee_amount),
        upi_id: fee.map(|f| f.upi_id),
    }))
}

async fn book_appointment(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let session = authorize(&state, &cookie, Some(Role::Patient))?;
    require_filled(&[
        ("specialization", &req.specialization),
        ("medical_info", &req.medical_info),
        ("appointment_time", &req.appointment_time),
    ])?;

    let doctor = state.db.get_user(&req.doctor_username)?;
    if doctor.role != Role::Doctor {
        return Err(AppError::NotFound(format!(
            "Doctor not found: {}",
            req.doctor_username
        )));
    }

    let appointment = state.db.create_appointment(
        &session.username,
        &doctor.username,
        &req.specialization,
        &req.medical_info,
        &req.appointment_time,
    )?;

    tracing::info!(
        appointment_id = appointment.id,
        patient = %session.username,
        doctor = %doctor.username,
        "Appointment booked"
    );
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

// ============================================================
// Doctor Pages
// ============================================================

async fn doctor_dashboard(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<DoctorDashboardResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Doctor))?;

    Ok(Json(DoctorDashboardResponse {
        pending: state
            .db
            .list_doctor_appointments(&session.username, AppointmentStatus::Pending)?,
        approved: state
            .db
            .list_doctor_appointments(&session.username, AppointmentStatus::Approved)?,
    }))
}

async fn set_appointment_status(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Doctor))?;
    let status: AppointmentStatus = req.status.parse().map_err(AppError::BadRequest)?;

    state
        .db
        .update_appointment_status(id, &session.username, status)?;
    audit(
        &session.username,
        &format!("appointment {id} -> {}", status.as_str()),
    );

    Ok(Json(AppointmentResponse {
        appointment: state.db.get_appointment(id)?,
    }))
}

async fn get_fee(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<FeeResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Doctor))?;

    Ok(Json(FeeResponse {
        fee: state.db.get_doctor_fee(&session.username)?,
    }))
}

async fn set_fee(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<SetFeeRequest>,
) -> Result<Json<FeeResponse>, AppError> {
    let session = authorize(&state, &cookie, Some(Role::Doctor))?;
    if !req.fee_amount.is_finite() || req.fee_amount < 0.0 {
        return Err(AppError::BadRequest(
            "Fee amount must be a non-negative number".to_string(),
        ));
    }

    let fee = state
        .db
        .upsert_doctor_fee(&session.username, req.fee_amount, req.upi_id.trim())?;
    audit(&session.username, "set_fee");

    Ok(Json(FeeResponse { fee: Some(fee) }))
}

// ============================================================
// Symptom Intake
// ============================================================

async fn chatbot(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<ChatbotResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    // First visit: greet
    if session.chat_log.is_empty() {
        restart_intake(&mut session);
        state.db.update_session(&session)?;
    }

    Ok(Json(chatbot_response(&session)))
}

async fn chatbot_message(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<ChatbotMessageRequest>,
) -> Result<Json<ChatbotResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    if req.message.trim().is_empty() {
        return Ok(Json(chatbot_response(&session)));
    }

    session.chat_log.add_user_message(&req.message);
    match intake::advance(&session.intake, &state.intake_context(), &req.message) {
        Ok(result) => {
            tracing::debug!(
                username = %session.username,
                from = %session.intake.stage,
                to = %result.new_state.stage,
                "Intake advanced"
            );
            session.intake = result.new_state;
            session.chat_log.add_assistant_message(result.prompt);
        }
        Err(e) => {
            tracing::debug!(username = %session.username, error = %e, "Intake answer rejected");
            session.chat_log.add_assistant_message(&e.reprompt());
        }
    }
    state.db.update_session(&session)?;

    Ok(Json(chatbot_response(&session)))
}

async fn chatbot_clear(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<ChatbotResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    restart_intake(&mut session);
    state.db.update_session(&session)?;

    Ok(Json(chatbot_response(&session)))
}

async fn confirm_intake(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<ConfirmResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    let symptoms = to_narrative(&session.intake).map_err(|e| AppError::Conflict(e.to_string()))?;
    session.symptoms = Some(symptoms.clone());
    session.triage = None;
    state.db.update_session(&session)?;

    Ok(Json(ConfirmResponse { symptoms }))
}

async fn consult(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<ConsultRequest>,
) -> Result<Json<TriageResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    let narrative = confirmed_symptoms(&session)?;
    let symptoms = with_manual_notes(&narrative, &req.symptoms);
    let ai = triage::assess(&symptoms, Consent::from(req.ai_consent));

    store_triage(&state, &mut session, &symptoms, &ai)?;

    Ok(Json(TriageResponse { symptoms, ai }))
}

async fn intake_summary(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Json<SummaryResponse>, AppError> {
    let mut session = authorize(&state, &cookie, Some(Role::Patient))?;

    let symptoms = confirmed_symptoms(&session)?;

    let ai = match session.triage.clone() {
        Some(ai) => ai,
        None => {
            let ai = triage::classify(&symptoms);
            store_triage(&state, &mut session, &symptoms, &ai)?;
            ai
        }
    };

    Ok(Json(SummaryResponse {
        ai,
        summary: triage::summarize(&symptoms),
    }))
}

/// Narrative the patient confirmed, or the finished dialogue's narrative.
/// Unfinished dialogues have none.
fn confirmed_symptoms(session: &Session) -> Result<String, AppError> {
    match &session.symptoms {
        Some(symptoms) => Ok(symptoms.clone()),
        None => to_narrative(&session.intake).map_err(|e| AppError::Conflict(e.to_string())),
    }
}

fn restart_intake(session: &mut Session) {
    session.clear_intake();
    let greeting = intake::reset();
    session.intake = greeting.new_state;
    session.chat_log.add_assistant_message(greeting.prompt);
}

fn chatbot_response(session: &Session) -> ChatbotResponse {
    ChatbotResponse {
        chat: session.chat_log.entries().to_vec(),
        state: session.intake.clone(),
        done: session.intake.is_done(),
    }
}

fn store_triage(
    state: &AppState,
    session: &mut Session,
    symptoms: &str,
    ai: &TriageResult,
) -> Result<(), AppError> {
    session.symptoms = Some(symptoms.to_string());
    session.triage = Some(ai.clone());
    state.db.update_session(session)?;
    state
        .db
        .record_consultation(&session.username, symptoms, ai)?;

    tracing::info!(username = %session.username, risk = %ai.risk, "Triage recorded");
    Ok(())
}

// ============================================================
// Direct Messages
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let session = authorize(&state, &cookie, None)?;
    require_filled(&[("message", &req.message)])?;
    if req.receiver == session.username {
        return Err(AppError::BadRequest(
            "Cannot send a message to yourself".to_string(),
        ));
    }

    let receiver = state.db.get_user(&req.receiver)?;
    let message = state
        .db
        .send_message(&session.username, &receiver.username, &req.message)?;

    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

async fn list_messages(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Path(peer): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let session = authorize(&state, &cookie, None)?;

    Ok(Json(MessagesResponse {
        messages: state.db.list_messages_between(&session.username, &peer)?,
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("telecare ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Sessions and Authorization
// ============================================================

fn session_token(cookie: &SessionCookie) -> Option<&str> {
    cookie
        .as_ref()
        .and_then(|TypedHeader(cookie)| cookie.get(SESSION_COOKIE))
}

/// Load the caller's session, optionally requiring a role
fn authorize(state: &AppState, cookie: &SessionCookie, role: Option<Role>) -> Result<Session, AppError> {
    let login_first = || AppError::Unauthorized("Please login first".to_string());

    let token = session_token(cookie).ok_or_else(login_first)?;
    let session = state.db.get_session(token).map_err(|e| match e {
        DbError::SessionNotFound => login_first(),
        other => other.into(),
    })?;

    match role {
        Some(required) if session.role != required => {
            Err(AppError::Forbidden("Unauthorized access".to_string()))
        }
        _ => Ok(session),
    }
}

fn require_filled(fields: &[(&str, &String)]) -> Result<(), AppError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(AppError::BadRequest(format!("Missing field: {name}"))),
        None => Ok(()),
    }
}

fn audit(username: &str, action: &str) {
    tracing::info!(target: "audit", username = %username, action = %action, "audit");
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UserNotFound(_) | DbError::AppointmentNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            DbError::UserExists => AppError::Conflict(e.to_string()),
            DbError::SessionNotFound => AppError::Unauthorized(e.to_string()),
            DbError::Sqlite(_) | DbError::Serde(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
