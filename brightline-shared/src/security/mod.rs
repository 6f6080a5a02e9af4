/// Security gate primitives
///
/// # Modules
///
/// - [`captcha`]: CAPTCHA verification collaborator (fails closed)
/// - [`sanitize`]: unsafe-input detection, text sanitization, upload checks
/// - [`client_ip`]: caller address resolution from proxy headers
///
/// The intake pipeline composes these into the security-check stage.

pub mod captcha;
pub mod client_ip;
pub mod sanitize;
