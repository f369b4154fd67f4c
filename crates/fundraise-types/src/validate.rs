/// Maximum email length (RFC 5321).
const EMAIL_MAX_LENGTH: usize = 254;

/// Request bodies that can check themselves before reaching a service.
///
/// On failure returns one human-readable message per offending field, in
/// field declaration order.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<String>>;
}

/// Accumulates per-field validation messages.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{} is required", field));
        }
        self
    }

    /// Format check only; an empty value is left to `required`.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_valid_email(value) {
            self.errors.push(format!("{} must be a valid email address", field));
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if !value.is_empty() && value.chars().count() < min {
            self.errors
                .push(format!("{} must be at least {} characters", field, min));
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.errors.push(format!("{} must be greater than zero", field));
        }
        self
    }

    pub fn at_most(&mut self, field: &str, value: i64, max: i64) -> &mut Self {
        if value > max {
            self.errors.push(format!("{} must be at most {}", field, max));
        }
        self
    }

    pub fn push(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    pub fn finish(&mut self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// Canonical stored form of an email: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic structural email check. Real verification would need a confirmation
/// round trip, which this service does not do.
pub fn is_valid_email(email: &str) -> bool {
    let email = normalize_email(email);
    if email.len() > EMAIL_MAX_LENGTH {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }

    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }

    // Domain shouldn't start or end with dot or hyphen
    !(domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-'))
}
