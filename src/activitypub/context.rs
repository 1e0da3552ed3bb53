//! JSON-LD `@context` blocks
//!
//! A context is an ordered array of context IRIs and term maps; later
//! entries override earlier key definitions, per JSON-LD processing rules.

use serde_json::{Value, json};

/// Core ActivityStreams 2.0 context IRI
pub const ACTIVITYSTREAMS: &str = "https://www.w3.org/ns/activitystreams";

/// W3C security vocabulary (publicKey et al.)
pub const SECURITY: &str = "https://w3id.org/security/v1";

/// The public addressing collection
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Context for plain content objects (Article, Note, Image, ...)
pub fn object_context() -> Vec<Value> {
    vec![
        json!(ACTIVITYSTREAMS),
        json!({
            "Hashtag": "as:Hashtag",
            "sensitive": "as:sensitive",
        }),
    ]
}

/// Context for actor documents
pub fn actor_context() -> Vec<Value> {
    vec![
        json!(ACTIVITYSTREAMS),
        json!(SECURITY),
        json!({
            "toot": "http://joinmastodon.org/ns#",
            "featured": {
                "@id": "toot:featured",
                "@type": "@id",
            },
        }),
    ]
}

/// Context for Event objects
///
/// Extends the base vocabulary with the Mobilizon and PeerTube terms the
/// wider fediverse understands for events.
pub fn event_context() -> Vec<Value> {
    vec![
        json!(ACTIVITYSTREAMS),
        json!({
            "pt": "https://joinpeertube.org/ns#",
            "mz": "https://joinmobilizon.org/ns#",
            "sc": "http://schema.org#",
            "ical": "http://www.w3.org/2002/12/cal/ical#",
            "commentsEnabled": {
                "@id": "pt:commentsEnabled",
                "@type": "sc:Boolean",
            },
            "repliesModerationOption": {
                "@id": "mz:repliesModerationOption",
                "@type": "sc:Text",
            },
            "joinMode": {
                "@id": "mz:joinMode",
                "@type": "mz:joinModeType",
            },
            "externalParticipationUrl": {
                "@id": "mz:externalParticipationUrl",
                "@type": "sc:URL",
            },
            "timezone": {
                "@id": "mz:timezone",
                "@type": "sc:Text",
            },
            "participantCount": {
                "@id": "mz:participantCount",
                "@type": "sc:Integer",
            },
            "maximumAttendeeCapacity": {
                "@id": "sc:maximumAttendeeCapacity",
                "@type": "sc:Integer",
            },
            "status": {
                "@id": "ical:status",
                "@type": "sc:Text",
            },
        }),
    ]
}

/// Context for activity envelopes
pub fn activity_context() -> Vec<Value> {
    vec![json!(ACTIVITYSTREAMS)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_context_leads_with_activitystreams() {
        let context = object_context();
        assert_eq!(context[0], ACTIVITYSTREAMS);
        // Term maps follow the base IRI so they can override its definitions.
        assert!(context[1].is_object());
    }

    #[test]
    fn event_context_declares_event_terms() {
        let context = event_context();
        let map = context[1].as_object().expect("term map");
        assert!(map.contains_key("repliesModerationOption"));
        assert!(map.contains_key("joinMode"));
        assert!(map.contains_key("commentsEnabled"));
    }
}
