//! Term transformer
//!
//! Taxonomy terms federate as minimal generic objects. The IRI is keyed on
//! the taxonomy and numeric term id, so slug renames never break federated
//! references.

use super::{FederatedObject, Transform, TransformError};
use crate::activitypub::{BaseObject, Tombstone};
use crate::data::TermEntity;
use crate::site::Site;

pub struct TermTransformer<'a> {
    term: &'a TermEntity,
    site: &'a Site,
}

impl<'a> TermTransformer<'a> {
    pub fn new(term: &'a TermEntity, site: &'a Site) -> Self {
        Self { term, site }
    }
}

impl Transform for TermTransformer<'_> {
    fn to_object(&self) -> Result<FederatedObject, TransformError> {
        if self.term.name.is_empty() {
            return Err(TransformError::Invalid(format!(
                "term {} has no name",
                self.term.id
            )));
        }

        let mut object = BaseObject::new("Object");
        object.set_id(self.to_id());
        object.set_name(&self.term.name);
        if let Some(description) = self.term.description.as_deref().filter(|s| !s.is_empty()) {
            object.set_summary(ammonia::clean(description));
        }

        Ok(FederatedObject::Object(Box::new(object)))
    }

    fn to_id(&self) -> String {
        self.site.term_iri(&self.term.taxonomy, self.term.id)
    }

    fn to_tombstone(&self) -> Tombstone {
        Tombstone::new(self.to_id())
    }
}
