pub mod employment;
pub mod flexibility;
pub mod location;

use crate::document::Document;
use crate::reference::ReferenceData;
pub use flexibility::Flexibility;
use location::LocationShape;

#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub flexibility: Flexibility,
}

pub fn extract_all(doc: &Document, summary: Option<&str>, reference: &ReferenceData) -> Fields {
    let shape = LocationShape {
        company: doc.company.as_deref(),
        known_places: &reference.known_places,
    };
    let location = location::extract(doc, summary, &shape);
    let employment_type = employment::extract(doc);

    let parts = [doc.title.as_deref(), location.as_deref(), Some(doc.text.as_str())]
        .into_iter()
        .flatten()
        .chain(doc.criteria.iter().map(|c| c.value.as_str()))
        .chain(doc.flavor.iter().map(String::as_str));
    let flexibility = flexibility::detect(parts);

    Fields {
        location,
        employment_type,
        flexibility,
    }
}
