//! Wire shapes of an inbound signed message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outer envelope a participant posts to another participant's endpoint.
///
/// The sender fields are claims: they are only trusted once they match the
/// metadata inside the signed body and the body verifies against a key
/// published for that sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(rename = "SenderDomain", default)]
    pub sender_domain: String,
    #[serde(rename = "SenderRole", default)]
    pub sender_role: String,
    /// Base64 of `signature ++ message`.
    #[serde(rename = "Body")]
    pub body: String,
}

/// Metadata every protocol message carries inside its signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(rename = "SenderDomain")]
    pub sender_domain: String,
    #[serde(rename = "SenderRole")]
    pub sender_role: String,
    #[serde(rename = "RecipientDomain")]
    pub recipient_domain: String,
    #[serde(rename = "RecipientRole")]
    pub recipient_role: String,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "ConversationID")]
    pub conversation_id: String,
    #[serde(rename = "TimeStamp")]
    pub timestamp: DateTime<Utc>,
    /// Exclusive upper bound on the message's validity.
    #[serde(rename = "ValidUntil", default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

impl MessageMetadata {
    /// Returns `true` if the message declares an expiry and `now` is strictly
    /// after it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.valid_until, Some(until) if now > until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn metadata(valid_until: Option<DateTime<Utc>>) -> MessageMetadata {
        MessageMetadata {
            sender_domain: "agr.example.com".to_string(),
            sender_role: "AGR".to_string(),
            recipient_domain: "dso.example.com".to_string(),
            recipient_role: "DSO".to_string(),
            message_id: "5d6bd2a0-3c4e-4a43-8f3f-0b51b8b3ad61".to_string(),
            conversation_id: "c0ffee".to_string(),
            timestamp: Utc.with_ymd_and_hms(2015, 6, 1, 12, 0, 0).unwrap(),
            valid_until,
        }
    }

    #[test]
    fn no_expiry_never_expires() {
        let now = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        assert!(!metadata(None).is_expired_at(now));
    }

    #[test]
    fn expiry_is_exclusive_upper_bound() {
        let until = Utc.with_ymd_and_hms(2015, 6, 1, 13, 0, 0).unwrap();
        let md = metadata(Some(until));
        assert!(!md.is_expired_at(until));
        assert!(md.is_expired_at(until + Duration::milliseconds(1)));
        assert!(!md.is_expired_at(until - Duration::seconds(1)));
    }

    #[test]
    fn metadata_uses_protocol_field_names() {
        let json = serde_json::to_value(metadata(None)).expect("serialize");
        assert_eq!(json["MessageID"], "5d6bd2a0-3c4e-4a43-8f3f-0b51b8b3ad61");
        assert_eq!(json["SenderRole"], "AGR");
        assert!(json.get("ValidUntil").is_none());
    }

    #[test]
    fn envelope_missing_sender_fields_default_to_empty() {
        let envelope: SignedEnvelope =
            serde_json::from_str(r#"{"Body":"AAAA"}"#).expect("deserialize");
        assert!(envelope.sender_domain.is_empty());
        assert!(envelope.sender_role.is_empty());
    }
}
