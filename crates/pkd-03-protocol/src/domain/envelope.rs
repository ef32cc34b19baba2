//! # Outer Envelope
//!
//! ```json
//! {
//!   "!pkd-context": "v1-encrypted-message" | "v1-plaintext-message",
//!   "actor": "https://...",
//!   "encrypted-message" | "plaintext-message": "..."
//! }
//! ```
//!
//! The tag decides which field must be present; the other must be absent.

use crate::domain::errors::ProtocolError;
use pkd_crypto::is_ciphertext;
use serde::{Deserialize, Serialize};

/// Tag of a sealed envelope.
pub const ENCRYPTED_CONTEXT: &str = "v1-encrypted-message";

/// Tag of a plaintext envelope.
pub const PLAINTEXT_CONTEXT: &str = "v1-plaintext-message";

/// How the message reached the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Submitted straight to this directory.
    #[default]
    Direct,
    /// Forwarded by an external relay we do not trust for high-impact actions.
    ExternalRelay,
}

impl Transport {
    /// From the request layer's "relayed" flag.
    pub fn from_relayed(relayed: bool) -> Self {
        if relayed {
            Transport::ExternalRelay
        } else {
            Transport::Direct
        }
    }
}

/// Declared context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// `v1-encrypted-message`.
    Encrypted,
    /// `v1-plaintext-message`.
    Plaintext,
}

impl Context {
    /// Wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Context::Encrypted => ENCRYPTED_CONTEXT,
            Context::Plaintext => PLAINTEXT_CONTEXT,
        }
    }
}

/// Envelope as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "!pkd-context")]
    pub context: String,
    pub actor: String,
    #[serde(
        rename = "encrypted-message",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encrypted_message: Option<String>,
    #[serde(
        rename = "plaintext-message",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub plaintext_message: Option<String>,
}

/// The payload the tag selected, checked against its own shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// HPKE blob to open.
    Sealed(&'a str),
    /// Bundle JSON.
    Plain(&'a str),
}

impl Envelope {
    /// Parse the outer JSON.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::InvalidEnvelope {
            reason: e.to_string(),
        })
    }

    /// Sealed envelope around `blob`.
    pub fn sealed(actor: impl Into<String>, blob: impl Into<String>) -> Self {
        Self {
            context: ENCRYPTED_CONTEXT.to_string(),
            actor: actor.into(),
            encrypted_message: Some(blob.into()),
            plaintext_message: None,
        }
    }

    /// Plaintext envelope around bundle JSON.
    pub fn plaintext(actor: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self {
            context: PLAINTEXT_CONTEXT.to_string(),
            actor: actor.into(),
            encrypted_message: None,
            plaintext_message: Some(bundle.into()),
        }
    }

    /// Declared context.
    pub fn context(&self) -> Result<Context, ProtocolError> {
        match self.context.as_str() {
            ENCRYPTED_CONTEXT => Ok(Context::Encrypted),
            PLAINTEXT_CONTEXT => Ok(Context::Plaintext),
            other => Err(ProtocolError::UnknownContext {
                tag: other.to_string(),
            }),
        }
    }

    /// Select the field the tag names and make sure the payload really is
    /// what the tag claims.
    pub fn payload(&self) -> Result<Payload<'_>, ProtocolError> {
        let context = self.context()?;
        let field = match (
            context,
            self.encrypted_message.as_deref(),
            self.plaintext_message.as_deref(),
        ) {
            (Context::Encrypted, Some(blob), None) => blob,
            (Context::Plaintext, None, Some(body)) => body,
            _ => {
                return Err(ProtocolError::MessageFieldMismatch {
                    tag: context.tag().to_string(),
                })
            }
        };

        match (context, is_ciphertext(field)) {
            (Context::Encrypted, true) => Ok(Payload::Sealed(field)),
            (Context::Plaintext, false) => Ok(Payload::Plain(field)),
            (Context::Encrypted, false) => Err(ProtocolError::ContextMismatch {
                declared: ENCRYPTED_CONTEXT,
                actual: "plaintext",
            }),
            (Context::Plaintext, true) => Err(ProtocolError::ContextMismatch {
                declared: PLAINTEXT_CONTEXT,
                actual: "ciphertext",
            }),
        }
    }

    /// JSON wire form.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::InvalidEnvelope {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkd_crypto::{seal, HpkeKeyPair};
    use pkd_types::Ciphersuite;

    #[test]
    fn test_json_form_parses_back() {
        let env = Envelope::plaintext("https://a.example/u/x", "{\"k\":1}");
        let json = env.to_json().unwrap();
        assert!(json.contains("\"actor\":\"https://a.example/u/x\""));
        let parsed = Envelope::parse(&json).unwrap();
        assert_eq!(parsed.payload().unwrap(), Payload::Plain("{\"k\":1}"));
    }

    #[test]
    fn test_plaintext_selects_field() {
        let env = Envelope::plaintext("https://a.example/u/x", "{}");
        assert_eq!(env.payload().unwrap(), Payload::Plain("{}"));
    }

    #[test]
    fn test_both_fields_rejected() {
        let mut env = Envelope::plaintext("https://a.example/u/x", "{}");
        env.encrypted_message = Some("pkd-hpke-v1:abc".into());
        assert!(matches!(
            env.payload(),
            Err(ProtocolError::MessageFieldMismatch { .. })
        ));
    }

    #[test]
    fn test_tag_field_disagreement_rejected() {
        let raw = r#"{"!pkd-context":"v1-encrypted-message","actor":"a","plaintext-message":"{}"}"#;
        let env = Envelope::parse(raw).unwrap();
        assert!(matches!(
            env.payload(),
            Err(ProtocolError::MessageFieldMismatch { .. })
        ));
    }

    #[test]
    fn test_ciphertext_under_plaintext_tag_is_mismatch() {
        let recipient = HpkeKeyPair::generate();
        let blob = seal(&recipient.public, Ciphersuite::default(), b"{}").unwrap();
        let env = Envelope::plaintext("a", blob);
        assert!(matches!(
            env.payload(),
            Err(ProtocolError::ContextMismatch { actual: "ciphertext", .. })
        ));
    }

    #[test]
    fn test_plaintext_under_encrypted_tag_is_mismatch() {
        let env = Envelope::sealed("a", "{\"action\":\"AddKey\"}");
        assert!(matches!(
            env.payload(),
            Err(ProtocolError::ContextMismatch { actual: "plaintext", .. })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let raw = r#"{"!pkd-context":"v2","actor":"a","plaintext-message":"{}"}"#;
        assert!(matches!(
            Envelope::parse(raw).unwrap().payload(),
            Err(ProtocolError::UnknownContext { .. })
        ));
        assert!(matches!(
            Envelope::parse("not json"),
            Err(ProtocolError::InvalidEnvelope { .. })
        ));
    }
}
