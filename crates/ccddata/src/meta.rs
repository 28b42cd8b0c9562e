//! Image metadata and the sources it can be normalized from.
//!
//! [`Meta`] is a keyword → value mapping stored as FITS header cards, so the
//! header view of an image is the same storage as its metadata: a value set
//! through one is observed through the other.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::ops::{Deref, Index};

use log::warn;

use crate::error::{Error, Result};
use crate::header::{is_commentary, normalize_keyword, Card, Header};
use crate::value::HeaderValue;

/// Input accepted wherever metadata is assigned.
///
/// Built through `From` impls; anything that is neither a mapping nor a
/// header converts to [`MetaSource::Unsupported`] and is rejected when
/// normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MetaSource {
    /// No metadata; normalizes to an empty mapping.
    #[default]
    Absent,
    /// Key/value pairs; keys are upper-cased.
    Mapping(Vec<(String, HeaderValue)>),
    /// A FITS header; every card is kept, including commentary and comments.
    Header(Header),
    /// Anything else, tagged with a short type name for the error message.
    Unsupported(&'static str),
}

impl From<Header> for MetaSource {
    fn from(header: Header) -> Self {
        MetaSource::Header(header)
    }
}

impl From<&Header> for MetaSource {
    fn from(header: &Header) -> Self {
        MetaSource::Header(header.clone())
    }
}

impl From<Meta> for MetaSource {
    fn from(meta: Meta) -> Self {
        MetaSource::Header(meta.0)
    }
}

impl<K, V, S> From<HashMap<K, V, S>> for MetaSource
where
    K: Into<String>,
    V: Into<HeaderValue>,
    S: BuildHasher,
{
    fn from(map: HashMap<K, V, S>) -> Self {
        MetaSource::Mapping(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V> From<BTreeMap<K, V>> for MetaSource
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        MetaSource::Mapping(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V> From<Vec<(K, V)>> for MetaSource
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        MetaSource::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for MetaSource
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        MetaSource::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<T: Into<MetaSource>> From<Option<T>> for MetaSource {
    fn from(source: Option<T>) -> Self {
        source.map_or(MetaSource::Absent, Into::into)
    }
}

impl From<&str> for MetaSource {
    fn from(_: &str) -> Self {
        MetaSource::Unsupported("string")
    }
}

impl From<String> for MetaSource {
    fn from(_: String) -> Self {
        MetaSource::Unsupported("string")
    }
}

/// Image metadata: an ordered, case-insensitive keyword mapping.
///
/// Dereferences to [`Header`] for card-level access (comments, commentary).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta(Header);

impl Meta {
    pub fn new() -> Meta {
        Meta::default()
    }

    pub fn from_header(header: Header) -> Meta {
        Meta(header)
    }

    /// Normalize any accepted source into metadata.
    pub fn normalize(source: impl Into<MetaSource>) -> Result<Meta> {
        match source.into() {
            MetaSource::Absent => Ok(Meta::new()),
            MetaSource::Header(header) => Ok(Meta(header)),
            MetaSource::Mapping(pairs) => {
                let mut meta = Meta::new();
                for (key, value) in pairs {
                    if let Some(old) = meta.insert(&key, value)? {
                        warn!("metadata key {key:?} given more than once; dropping {old}");
                    }
                }
                Ok(meta)
            }
            MetaSource::Unsupported(kind) => Err(Error::InvalidMeta(kind)),
        }
    }

    /// Set `key` to `value`, returning the previous value.
    ///
    /// `COMMENT` and `HISTORY` keys append a commentary card instead; the
    /// value's text becomes the card text.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) -> Result<Option<HeaderValue>> {
        let key = normalize_keyword(key)?;
        let value = value.into();
        if is_commentary(&key) {
            self.0.push(Card::commentary(&key, value.to_string())?);
            return Ok(None);
        }
        let previous = self.0.get(&key).cloned();
        self.0.set(&key, value)?;
        Ok(previous)
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.0.remove(key).and_then(|card| card.value)
    }

    /// Valued keywords in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|c| !c.is_commentary())
            .map(|c| c.keyword.as_str())
    }

    /// Valued entries in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0
            .iter()
            .filter(|c| !c.is_commentary())
            .filter_map(|c| c.value.as_ref().map(|v| (c.keyword.as_str(), v)))
    }

    pub fn as_header(&self) -> &Header {
        &self.0
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.0
    }

    pub fn into_header(self) -> Header {
        self.0
    }
}

impl Deref for Meta {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.0
    }
}

impl Index<&str> for Meta {
    type Output = HeaderValue;

    /// Panics if `key` has no value.
    fn index(&self, key: &str) -> &HeaderValue {
        &self.0[key]
    }
}

impl PartialEq<Header> for Meta {
    fn eq(&self, other: &Header) -> bool {
        &self.0 == other
    }
}

impl PartialEq<Meta> for Header {
    fn eq(&self, other: &Meta) -> bool {
        self == &other.0
    }
}
