/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `users`: Account listing and administration
/// - `services`, `industries`, `locations`, `case_studies`, `impact_stories`:
///   Site content (public reads, editor writes)
/// - `forms`: Contact, quote and demo intake plus submission review
/// - `uploads`: Multipart file uploads and their analysis

pub mod auth;
pub mod case_studies;
pub mod forms;
pub mod health;
pub mod impact_stories;
pub mod industries;
pub mod locations;
pub mod services;
pub mod uploads;
pub mod users;
