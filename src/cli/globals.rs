use secrecy::SecretString;

/// Process-wide configuration shared with every handler.
///
/// Secrets are loaded once at startup and never logged.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub origin: String,
    pub signing_key: SecretString,
    pub handshake_code: SecretString,
    pub failure_threshold: u32,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(origin: String) -> Self {
        Self {
            origin,
            signing_key: SecretString::default(),
            handshake_code: SecretString::default(),
            failure_threshold: 5,
        }
    }

    pub fn set_signing_key(&mut self, key: SecretString) {
        self.signing_key = key;
    }

    pub fn set_handshake_code(&mut self, code: SecretString) {
        self.handshake_code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let origin = "https://portal.tld".to_string();
        let args = GlobalArgs::new(origin);
        assert_eq!(args.origin, "https://portal.tld");
        assert_eq!(args.signing_key.expose_secret(), "");
        assert_eq!(args.handshake_code.expose_secret(), "");
        assert_eq!(args.failure_threshold, 5);
    }

    #[test]
    fn test_set_secrets() {
        let mut args = GlobalArgs::new("http://localhost:3000".to_string());
        args.set_signing_key(SecretString::from("sekret".to_string()));
        args.set_handshake_code(SecretString::from("handshake".to_string()));
        assert_eq!(args.signing_key.expose_secret(), "sekret");
        assert_eq!(args.handshake_code.expose_secret(), "handshake");
    }
}
