use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Finite set of consultation categories a consultant can serve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    Visa,
    Labor,
    Contract,
    Business,
    Other,
}

impl Specialty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specialty::Visa => "visa",
            Specialty::Labor => "labor",
            Specialty::Contract => "contract",
            Specialty::Business => "business",
            Specialty::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visa" => Some(Specialty::Visa),
            "labor" => Some(Specialty::Labor),
            "contract" => Some(Specialty::Contract),
            "business" => Some(Specialty::Business),
            "other" => Some(Specialty::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMethod {
    Email,
    Document,
    Call,
    Video,
}

impl ConsultationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationMethod::Email => "email",
            ConsultationMethod::Document => "document",
            ConsultationMethod::Call => "call",
            ConsultationMethod::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(ConsultationMethod::Email),
            "document" => Some(ConsultationMethod::Document),
            "call" => Some(ConsultationMethod::Call),
            "video" => Some(ConsultationMethod::Video),
            _ => None,
        }
    }
}

/// Consultation lifecycle status. Transitions are validated by
/// `can_transition_to`; `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Requested,
    Matched,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Requested => "requested",
            ConsultationStatus::Matched => "matched",
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::InProgress => "in_progress",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "requested" => Some(ConsultationStatus::Requested),
            "matched" => Some(ConsultationStatus::Matched),
            "scheduled" => Some(ConsultationStatus::Scheduled),
            "in_progress" => Some(ConsultationStatus::InProgress),
            "completed" => Some(ConsultationStatus::Completed),
            "cancelled" => Some(ConsultationStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Cancelled
        )
    }

    /// Requester-side cancellation is only allowed before the consultation
    /// actually starts.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Requested
                | ConsultationStatus::Matched
                | ConsultationStatus::Scheduled
        )
    }

    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        match (self, next) {
            (Requested, Matched) => true,
            (Matched, Scheduled) => true,
            // Rejection returns a matched consultation to the unassigned pool.
            (Matched, Requested) => true,
            (Scheduled, InProgress) => true,
            (InProgress, Completed) => true,
            (from, Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }
}

/// Payment status, used both for the payment record and for the
/// consultation's parallel payment axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Toss,
    Portone,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Toss => "toss",
            PaymentMethod::Portone => "portone",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "toss" => Some(PaymentMethod::Toss),
            "portone" => Some(PaymentMethod::Portone),
            "card" => Some(PaymentMethod::Card),
            "transfer" => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialty_round_trips_through_strings() {
        for tag in ["visa", "labor", "contract", "business", "other"] {
            let specialty = Specialty::parse(tag).unwrap();
            assert_eq!(specialty.as_str(), tag);
        }
        assert!(Specialty::parse("tax").is_none());
    }

    #[test]
    fn method_round_trips_through_strings() {
        for tag in ["email", "document", "call", "video"] {
            let method = ConsultationMethod::parse(tag).unwrap();
            assert_eq!(method.as_str(), tag);
        }
        assert!(ConsultationMethod::parse("fax").is_none());
    }

    #[test]
    fn lifecycle_follows_forward_path() {
        use ConsultationStatus::*;
        assert!(Requested.can_transition_to(Matched));
        assert!(Matched.can_transition_to(Scheduled));
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn rejection_returns_matched_to_requested() {
        use ConsultationStatus::*;
        assert!(Matched.can_transition_to(Requested));
        assert!(!Scheduled.can_transition_to(Requested));
    }

    #[test]
    fn cancellation_only_before_start() {
        use ConsultationStatus::*;
        assert!(Requested.can_transition_to(Cancelled));
        assert!(Matched.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        use ConsultationStatus::*;
        for next in [Requested, Matched, Scheduled, InProgress, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn no_skipping_lifecycle_stages() {
        use ConsultationStatus::*;
        assert!(!Requested.can_transition_to(Scheduled));
        assert!(!Requested.can_transition_to(Completed));
        assert!(!Matched.can_transition_to(InProgress));
        assert!(!Scheduled.can_transition_to(Completed));
    }

    #[test]
    fn payment_status_round_trips() {
        for tag in ["pending", "completed", "failed", "refunded", "cancelled"] {
            let status = PaymentStatus::parse(tag).unwrap();
            assert_eq!(status.as_str(), tag);
        }
    }

    #[test]
    fn payment_method_round_trips() {
        for tag in ["toss", "portone", "card", "transfer"] {
            let method = PaymentMethod::parse(tag).unwrap();
            assert_eq!(method.as_str(), tag);
        }
        assert!(PaymentMethod::parse("paypal").is_none());
    }

    #[test]
    fn serde_uses_snake_case_tokens() {
        let json = serde_json::to_string(&ConsultationStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: Specialty = serde_json::from_str("\"visa\"").unwrap();
        assert_eq!(parsed, Specialty::Visa);
    }
}
