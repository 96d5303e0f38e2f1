use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger and contact data (e-mail, phone, passport number) so it never
/// shows up in `Debug`/`Display` output, e.g. `tracing::info!("{:?}", booking)`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Responses and events carry the real value; only log formatting is masked.
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_value() {
        let email = Masked("traveller@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
        assert_eq!(email.expose(), "traveller@example.com");
    }

    #[test]
    fn test_serializes_real_value() {
        let phone = Masked("+15550100".to_string());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+15550100\"");

        let back: Masked<String> = serde_json::from_str("\"+15550100\"").unwrap();
        assert_eq!(back, phone);
    }
}
