use crate::errors::AppError;

/// Proof that a caller presented the server's admin credential.
///
/// Only [`AdminAuthorizer::authorize`] can build one, so any service method
/// taking a grant cannot be reached with a client-side flag alone.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    _private: (),
}

#[derive(Clone)]
pub struct AdminAuthorizer {
    token: Option<String>,
}

impl AdminAuthorizer {
    /// With no token configured every admin request is refused.
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Checks an `Authorization` header value of the form `Bearer <token>`.
    /// The scheme name is case-insensitive.
    pub fn authorize(&self, header: Option<&str>) -> Result<AdminGrant, AppError> {
        let expected = self.token.as_deref().ok_or(AppError::Unauthorized)?;
        let presented = header.and_then(bearer_token).ok_or(AppError::Unauthorized)?;
        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            tracing::warn!("rejected admin credential");
            return Err(AppError::Unauthorized);
        }
        Ok(AdminGrant { _private: () })
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.trim().splitn(2, ' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Compares every byte regardless of where the first mismatch is. Only the
/// length can short-circuit.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
