//! Duplicate URL detection across records

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::types::VaultCollection;

/// URLs shared by more than one record, mapped to the owning record ids
///
/// URLs appear in the order they were first found to be shared; ids appear in
/// collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateUrls {
    urls: IndexMap<String, Vec<String>>,
}

impl DuplicateUrls {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Record ids sharing `url`, if it is duplicated
    pub fn get(&self, url: &str) -> Option<&[String]> {
        self.urls.get(url).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.urls
            .iter()
            .map(|(url, ids)| (url.as_str(), ids.as_slice()))
    }

    /// One warning line per duplicated URL, naming the records by name
    pub fn describe(&self, collection: &VaultCollection) -> Vec<String> {
        self.iter()
            .map(|(url, ids)| {
                let names = ids
                    .iter()
                    .map(|id| {
                        let name = collection.get(id).map_or(id.as_str(), |r| r.name.as_str());
                        format!("\"{}\"", name)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Duplicate url {} found for passwords {}.", url, names)
            })
            .collect()
    }
}

/// Report every URL listed by more than one record
///
/// Read-only. A URL repeated inside a single record is not a duplicate.
pub fn duplicate_urls(collection: &VaultCollection) -> DuplicateUrls {
    let mut first_owner: HashMap<&str, &str> = HashMap::new();
    let mut urls: IndexMap<String, Vec<String>> = IndexMap::new();

    for record in collection {
        let mut seen = HashSet::new();

        for url in &record.url {
            if !seen.insert(url.as_str()) {
                continue;
            }

            match first_owner.get(url.as_str()) {
                None => {
                    first_owner.insert(url.as_str(), record.id.as_str());
                }
                Some(owner) => {
                    urls.entry(url.clone())
                        .or_insert_with(|| vec![owner.to_string()])
                        .push(record.id.clone());
                }
            }
        }
    }

    DuplicateUrls { urls }
}
