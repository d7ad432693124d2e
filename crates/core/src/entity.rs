use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type OrderId = String;

/// A push-notification recipient. Read-only to the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, alias = "fcmToken")]
    pub push_token: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, push_token: Option<&str>) -> Self {
        Self {
            id: id.into(),
            push_token: push_token.map(str::to_string),
        }
    }

    /// The destination token, treating blank strings as absent.
    pub fn push_token(&self) -> Option<&str> {
        self.push_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// An order whose leading order-code characters encode its calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default, alias = "orderNumber")]
    pub order_code: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub memo: Option<String>,
}

impl Order {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, order_code: &str) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            order_code: Some(order_code.to_string()),
            completed: false,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = Some(memo.to_string());
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Human-readable label: the memo if present, otherwise the part of the
    /// order code after the date prefix, otherwise the whole code.
    pub fn label(&self) -> String {
        if let Some(memo) = self.memo.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            return memo.to_string();
        }
        let code = self.order_code.as_deref().unwrap_or_default();
        match code.get(8..) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ if !code.is_empty() => code.to_string(),
            _ => self.id.clone(),
        }
    }
}

/// Notification window relative to an order's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Threshold {
    #[serde(rename = "3hours")]
    ThreeHours,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "passed")]
    Passed,
}

impl Threshold {
    /// All thresholds in evaluation order.
    pub const ALL: [Threshold; 3] = [Threshold::ThreeHours, Threshold::OneHour, Threshold::Passed];

    /// Stable key used in ledger records.
    pub fn as_key(&self) -> &'static str {
        match self {
            Threshold::ThreeHours => "3hours",
            Threshold::OneHour => "1hour",
            Threshold::Passed => "passed",
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Threshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Threshold::ALL
            .into_iter()
            .find(|t| t.as_key() == s)
            .ok_or_else(|| format!("unknown threshold key: {s}"))
    }
}

/// Identity of a sent notification. Scoped per user, like the
/// `users/{uid}/notifications/{order}_{threshold}` document layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub threshold: Threshold,
}

impl NotificationKey {
    pub fn new(user_id: &str, order_id: &str, threshold: Threshold) -> Self {
        Self {
            user_id: user_id.to_string(),
            order_id: order_id.to_string(),
            threshold,
        }
    }

    /// Document id within the user's notification collection.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.order_id, self.threshold)
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.doc_id())
    }
}

/// Existence of a record means the notification was already sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub key: NotificationKey,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_keys_are_stable() {
        assert_eq!(Threshold::ThreeHours.as_key(), "3hours");
        assert_eq!(Threshold::OneHour.to_string(), "1hour");
        assert_eq!("passed".parse::<Threshold>().unwrap(), Threshold::Passed);
        assert!("2hours".parse::<Threshold>().is_err());
    }

    #[test]
    fn threshold_serializes_as_key() {
        let json = serde_json::to_string(&Threshold::OneHour).unwrap();
        assert_eq!(json, "\"1hour\"");
    }

    #[test]
    fn blank_token_is_absent() {
        assert_eq!(User::new("u1", Some("  ")).push_token(), None);
        assert_eq!(User::new("u1", None).push_token(), None);
        assert_eq!(User::new("u1", Some("tok")).push_token(), Some("tok"));
    }

    #[test]
    fn label_prefers_memo() {
        let order = Order::new("o1", "u1", "2024031500XY").with_memo("Birthday cake");
        assert_eq!(order.label(), "Birthday cake");
    }

    #[test]
    fn label_falls_back_to_code_suffix() {
        let order = Order::new("o1", "u1", "2024031500XY");
        assert_eq!(order.label(), "00XY");

        let bare = Order::new("o2", "u1", "20240315");
        assert_eq!(bare.label(), "20240315");

        let blank_memo = Order::new("o3", "u1", "2024031577").with_memo(" ");
        assert_eq!(blank_memo.label(), "77");
    }

    #[test]
    fn notification_key_doc_id() {
        let key = NotificationKey::new("u1", "o1", Threshold::ThreeHours);
        assert_eq!(key.doc_id(), "o1_3hours");
        assert_eq!(key.to_string(), "u1/o1_3hours");
    }

    #[test]
    fn order_deserializes_camel_case_aliases() {
        let order: Order = serde_json::from_str(
            r#"{"id":"o1","user_id":"u1","orderNumber":"2024031500XY","completed":false}"#,
        )
        .unwrap();
        assert_eq!(order.order_code.as_deref(), Some("2024031500XY"));
        assert_eq!(order.memo, None);
    }
}
