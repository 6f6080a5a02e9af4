/// Middleware modules for the API server
///
/// - `auth`: JWT authentication (required and optional)

pub mod auth;
