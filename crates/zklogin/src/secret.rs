use crate::error::{Result, ZkLoginError};
use std::fmt;
use zeroize::Zeroizing;

/// Number of digits in a user secret (PIN)
pub const SECRET_LENGTH: usize = 6;

/// User-chosen PIN. It is both the password the user re-enters and the salt
/// of the address seed, so it only ever lives in memory and is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSecret(Zeroizing<String>);

impl UserSecret {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = Zeroizing::new(value.into());
        let trimmed = value.trim();
        if trimmed.len() != SECRET_LENGTH || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ZkLoginError::InvalidSecret(format!(
                "PIN must be exactly {} digits",
                SECRET_LENGTH
            )));
        }
        Ok(Self(Zeroizing::new(trimmed.to_string())))
    }

    /// First-time setup: the PIN and its confirmation must agree.
    pub fn confirm(entry: impl Into<String>, confirmation: impl Into<String>) -> Result<Self> {
        let entry = Self::new(entry)?;
        let confirmation = Self::new(confirmation)?;
        if entry != confirmation {
            return Err(ZkLoginError::InvalidSecret("PINs do not match".to_string()));
        }
        Ok(entry)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserSecret(******)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_six_digits() {
        assert_eq!(UserSecret::new("123456").unwrap().expose(), "123456");
        assert_eq!(UserSecret::new(" 000123\n").unwrap().expose(), "000123");
    }

    #[test]
    fn test_rejects_bad_shape() {
        for bad in ["", "12345", "1234567", "12a456", "١٢٣٤٥٦"] {
            let err = UserSecret::new(bad).unwrap_err();
            assert_eq!(err.to_string(), "PIN must be exactly 6 digits");
        }
    }

    #[test]
    fn test_confirmation_mismatch() {
        assert!(UserSecret::confirm("123456", "123456").is_ok());
        let err = UserSecret::confirm("123456", "123457").unwrap_err();
        assert_eq!(err.to_string(), "PINs do not match");
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = UserSecret::new("654321").unwrap();
        assert!(!format!("{:?}", secret).contains("654321"));
    }
}
