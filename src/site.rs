//! Site identity and IRI derivation
//!
//! Every federated IRI is derived here. Content IRIs are keyed on numeric
//! entity ids via query parameters, never on slugs or permalinks, so
//! renames cannot break federated references.

/// The local site as seen by the fediverse
#[derive(Debug, Clone)]
pub struct Site {
    base_url: String,
}

impl Site {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// IRI of a local actor
    pub fn actor_iri(&self, username: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(username))
    }

    /// IRI of an actor's featured (pinned) collection
    pub fn featured_collection_iri(&self, username: &str) -> String {
        format!("{}/collections/featured", self.actor_iri(username))
    }

    /// Stable IRI of a post
    pub fn post_iri(&self, post_id: i64) -> String {
        format!("{}/?p={}", self.base_url, post_id)
    }

    /// Stable IRI of a comment
    pub fn comment_iri(&self, comment_id: i64) -> String {
        format!("{}/?c={}", self.base_url, comment_id)
    }

    /// Stable IRI of a media attachment
    pub fn attachment_iri(&self, attachment_id: i64) -> String {
        format!("{}/?attachment_id={}", self.base_url, attachment_id)
    }

    /// Stable IRI of a taxonomy term, qualified by taxonomy and numeric id
    pub fn term_iri(&self, taxonomy: &str, term_id: i64) -> String {
        format!(
            "{}/?taxonomy={}&term_id={}",
            self.base_url,
            urlencoding::encode(taxonomy),
            term_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let site = Site::new("https://blog.example/");
        assert_eq!(site.base_url(), "https://blog.example");
        assert_eq!(site.post_iri(12), "https://blog.example/?p=12");
    }

    #[test]
    fn actor_iri_encodes_username() {
        let site = Site::new("https://blog.example");
        assert_eq!(
            site.actor_iri("alice"),
            "https://blog.example/users/alice"
        );
    }

    #[test]
    fn term_iri_is_keyed_on_taxonomy_and_numeric_id() {
        let site = Site::new("https://blog.example");
        assert_eq!(
            site.term_iri("category", 7),
            "https://blog.example/?taxonomy=category&term_id=7"
        );
    }
}
