//! Event extended object
//!
//! Adds the event vocabulary on top of the generic object envelope.
//! Enumerated attributes are validated: an invalid value is refused with a
//! warning and the previous value is retained, so a bad CMS metadata row
//! can never corrupt an outbound document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::context;
use super::object::BaseObject;
use crate::error::AppError;

/// Reply moderation policy of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepliesModerationOption {
    AllowAll,
    Closed,
}

impl RepliesModerationOption {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow_all" => Some(Self::AllowAll),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn comments_enabled(&self) -> bool {
        matches!(self, Self::AllowAll)
    }
}

/// How participants may join an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    Free,
    Restricted,
    Invite,
    External,
}

impl JoinMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "restricted" => Some(Self::Restricted),
            "invite" => Some(Self::Invite),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

/// iCalendar event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Tentative,
    Confirmed,
    Cancelled,
}

impl EventStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TENTATIVE" => Some(Self::Tentative),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// An Event object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    base: BaseObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_mode: Option<JoinMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_participation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replies_moderation_option: Option<RepliesModerationOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comments_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum_attendee_capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    participant_count: Option<u32>,
}

impl Event {
    pub fn new() -> Self {
        let mut base = BaseObject::new("Event");
        base.set_context(context::event_context());

        Self {
            base,
            start_time: None,
            end_time: None,
            timezone: None,
            location: None,
            status: None,
            join_mode: None,
            external_participation_url: None,
            replies_moderation_option: None,
            comments_enabled: None,
            maximum_attendee_capacity: None,
            participant_count: None,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseObject {
        &mut self.base
    }

    pub fn base(&self) -> &BaseObject {
        &self.base
    }

    pub fn set_start_time(&mut self, at: DateTime<Utc>) {
        self.start_time = Some(at);
    }

    pub fn set_end_time(&mut self, at: DateTime<Utc>) {
        self.end_time = Some(at);
    }

    pub fn set_timezone(&mut self, timezone: impl Into<String>) {
        self.timezone = Some(timezone.into());
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    pub fn set_maximum_attendee_capacity(&mut self, capacity: u32) {
        self.maximum_attendee_capacity = Some(capacity);
    }

    pub fn set_participant_count(&mut self, count: u32) {
        self.participant_count = Some(count);
    }

    /// Set the reply moderation policy.
    ///
    /// Also derives `commentsEnabled` (`allow_all` ⇔ true, `closed` ⇔ false).
    /// An unknown value is refused: both fields keep their prior values.
    pub fn set_replies_moderation_option(&mut self, raw: &str) -> Result<(), AppError> {
        let Some(option) = RepliesModerationOption::parse(raw) else {
            tracing::warn!(value = raw, "Invalid repliesModerationOption, keeping previous value");
            return Err(AppError::Validation(format!(
                "Invalid repliesModerationOption: {}",
                raw
            )));
        };

        self.replies_moderation_option = Some(option);
        self.comments_enabled = Some(option.comments_enabled());
        Ok(())
    }

    pub fn replies_moderation_option(&self) -> Option<RepliesModerationOption> {
        self.replies_moderation_option
    }

    /// Set whether comments are enabled.
    ///
    /// Also derives `repliesModerationOption` (true ⇔ `allow_all`,
    /// false ⇔ `closed`).
    pub fn set_comments_enabled(&mut self, enabled: bool) {
        self.comments_enabled = Some(enabled);
        self.replies_moderation_option = Some(if enabled {
            RepliesModerationOption::AllowAll
        } else {
            RepliesModerationOption::Closed
        });
    }

    pub fn comments_enabled(&self) -> Option<bool> {
        self.comments_enabled
    }

    /// Set the join mode; unknown values are refused.
    pub fn set_join_mode(&mut self, raw: &str) -> Result<(), AppError> {
        let Some(mode) = JoinMode::parse(raw) else {
            tracing::warn!(value = raw, "Invalid joinMode, keeping previous value");
            return Err(AppError::Validation(format!("Invalid joinMode: {}", raw)));
        };

        self.join_mode = Some(mode);
        Ok(())
    }

    pub fn join_mode(&self) -> Option<JoinMode> {
        self.join_mode
    }

    /// Set the iCalendar status; unknown values are refused.
    pub fn set_status(&mut self, raw: &str) -> Result<(), AppError> {
        let Some(status) = EventStatus::parse(raw) else {
            tracing::warn!(value = raw, "Invalid ical status, keeping previous value");
            return Err(AppError::Validation(format!("Invalid ical status: {}", raw)));
        };

        self.status = Some(status);
        Ok(())
    }

    pub fn status(&self) -> Option<EventStatus> {
        self.status
    }

    /// Set the external participation URL.
    ///
    /// An http(s) URL implies `joinMode = external`; anything else is
    /// refused and leaves both fields untouched.
    pub fn set_external_participation_url(&mut self, raw: &str) -> Result<(), AppError> {
        let is_http_url = url::Url::parse(raw)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);

        if !is_http_url {
            tracing::warn!(value = raw, "Invalid externalParticipationUrl, keeping previous value");
            return Err(AppError::Validation(format!(
                "Invalid externalParticipationUrl: {}",
                raw
            )));
        }

        self.external_participation_url = Some(raw.to_string());
        self.join_mode = Some(JoinMode::External);
        Ok(())
    }

    pub fn external_participation_url(&self) -> Option<&str> {
        self.external_participation_url.as_deref()
    }

    pub fn to_json(&self) -> Result<Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Validation(format!("Unserializable event: {}", e)))
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_moderation_allow_all_enables_comments() {
        let mut event = Event::new();
        event.set_replies_moderation_option("allow_all").unwrap();

        assert_eq!(
            event.replies_moderation_option(),
            Some(RepliesModerationOption::AllowAll)
        );
        assert_eq!(event.comments_enabled(), Some(true));

        let json = event.to_json().unwrap();
        assert_eq!(json["repliesModerationOption"], "allow_all");
        assert_eq!(json["commentsEnabled"], true);
    }

    #[test]
    fn replies_moderation_closed_disables_comments() {
        let mut event = Event::new();
        event.set_replies_moderation_option("closed").unwrap();

        assert_eq!(event.comments_enabled(), Some(false));
    }

    #[test]
    fn comments_enabled_derives_moderation_option_bidirectionally() {
        let mut event = Event::new();

        event.set_comments_enabled(true);
        assert_eq!(
            event.replies_moderation_option(),
            Some(RepliesModerationOption::AllowAll)
        );

        event.set_comments_enabled(false);
        assert_eq!(
            event.replies_moderation_option(),
            Some(RepliesModerationOption::Closed)
        );
    }

    #[test]
    fn invalid_replies_moderation_option_keeps_both_fields_unchanged() {
        let mut event = Event::new();
        event.set_replies_moderation_option("closed").unwrap();

        let result = event.set_replies_moderation_option("everyone");
        assert!(result.is_err());
        assert_eq!(
            event.replies_moderation_option(),
            Some(RepliesModerationOption::Closed)
        );
        assert_eq!(event.comments_enabled(), Some(false));
    }

    #[test]
    fn invalid_replies_moderation_option_on_fresh_event_sets_nothing() {
        let mut event = Event::new();
        assert!(event.set_replies_moderation_option("everyone").is_err());
        assert_eq!(event.replies_moderation_option(), None);
        assert_eq!(event.comments_enabled(), None);
    }

    #[test]
    fn external_participation_url_implies_external_join_mode() {
        let mut event = Event::new();
        event
            .set_external_participation_url("https://tickets.example/event/1")
            .unwrap();

        assert_eq!(event.join_mode(), Some(JoinMode::External));
        assert_eq!(
            event.external_participation_url(),
            Some("https://tickets.example/event/1")
        );
    }

    #[test]
    fn non_http_participation_url_is_refused() {
        let mut event = Event::new();
        event.set_join_mode("free").unwrap();

        assert!(event.set_external_participation_url("ftp://tickets.example").is_err());
        assert!(event.set_external_participation_url("not a url").is_err());
        assert_eq!(event.join_mode(), Some(JoinMode::Free));
        assert_eq!(event.external_participation_url(), None);
    }

    #[test]
    fn invalid_join_mode_and_status_are_refused() {
        let mut event = Event::new();
        event.set_status("CONFIRMED").unwrap();

        assert!(event.set_join_mode("open").is_err());
        assert!(event.set_status("MAYBE").is_err());
        assert_eq!(event.join_mode(), None);
        assert_eq!(event.status(), Some(EventStatus::Confirmed));
    }

    #[test]
    fn event_serializes_with_event_context_and_type() {
        let mut event = Event::new();
        event.base_mut().set_id("https://blog.example/?p=9");
        event.set_status("CONFIRMED").unwrap();
        event.set_join_mode("free").unwrap();

        let json = event.to_json().unwrap();
        assert_eq!(json["type"], "Event");
        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["joinMode"], "free");
        let context = json["@context"].as_array().unwrap();
        assert!(context[1].as_object().unwrap().contains_key("joinMode"));
    }
}
