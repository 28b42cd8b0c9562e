//! FITS header cards and the ordered [`Header`] built from them.

use std::fmt;
use std::ops::Index;

use log::debug;

use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, HeaderValue, MAX_STRING_LEN};

/// Size of one FITS logical record.
pub const BLOCK_SIZE: usize = 2880;
/// Size of one header card.
pub const CARD_SIZE: usize = 80;
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;
/// Longest keyword representable without the HIERARCH convention.
pub const MAX_KEYWORD_LEN: usize = 8;

/// Round `len` up to a whole number of blocks.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Keywords whose cards carry free text instead of a value.
const COMMENTARY: [&str; 3] = ["COMMENT", "HISTORY", ""];

pub fn is_commentary(keyword: &str) -> bool {
    COMMENTARY.contains(&keyword)
}

/// Upper-case `keyword` and check it is a legal FITS keyword.
pub fn normalize_keyword(keyword: &str) -> Result<String> {
    let upper = keyword.trim().to_ascii_uppercase();
    let legal = upper
        .bytes()
        .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_'));
    if upper.len() > MAX_KEYWORD_LEN || !legal {
        return Err(Error::InvalidKeyword(keyword.to_string()));
    }
    Ok(upper)
}

/// Check that a value survives a write/read cycle through one card.
fn check_value(keyword: &str, value: &HeaderValue) -> Result<()> {
    if let HeaderValue::String(s) = value {
        check_text(keyword, s)?;
        if s.len() + s.matches('\'').count() > MAX_STRING_LEN {
            return Err(Error::InvalidValue {
                keyword: keyword.to_string(),
                reason: "string value longer than one card",
            });
        }
    }
    Ok(())
}

/// Header text is restricted to printable ASCII.
fn check_text(keyword: &str, text: &str) -> Result<()> {
    if text.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            keyword: keyword.to_string(),
            reason: "text must be printable ASCII",
        })
    }
}

/// Free text of a valueless card fills columns 9..80.
fn check_free_text(keyword: &str, text: &str) -> Result<()> {
    check_text(keyword, text)?;
    if text.len() > CARD_SIZE - MAX_KEYWORD_LEN {
        return Err(Error::InvalidValue {
            keyword: keyword.to_string(),
            reason: "text longer than one card",
        });
    }
    Ok(())
}

/// One 80-byte header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Upper-case keyword without padding.
    pub keyword: String,
    pub value: Option<HeaderValue>,
    /// Inline comment, or the free text of a commentary card.
    pub comment: Option<String>,
}

impl Card {
    /// A valued card. The keyword is normalized to upper case.
    pub fn new(keyword: &str, value: impl Into<HeaderValue>) -> Result<Card> {
        let card = Card {
            keyword: normalize_keyword(keyword)?,
            value: Some(value.into()),
            comment: None,
        };
        card.validate()?;
        Ok(card)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Card {
        self.comment = Some(comment.into());
        self
    }

    /// A `COMMENT`, `HISTORY` or blank card holding free text.
    pub fn commentary(keyword: &str, text: impl Into<String>) -> Result<Card> {
        let keyword = normalize_keyword(keyword)?;
        if !is_commentary(&keyword) {
            return Err(Error::InvalidKeyword(keyword));
        }
        let card = Card {
            keyword,
            value: None,
            comment: Some(text.into()),
        };
        card.validate()?;
        Ok(card)
    }

    /// Fails with [`Error::InvalidValue`] when the card cannot be written
    /// without losing text: non-ASCII characters, a string value longer than
    /// the value field, or free text longer than the card.
    ///
    /// Inline comments on valued cards are truncated to the space left.
    pub fn validate(&self) -> Result<()> {
        match (&self.value, &self.comment) {
            (Some(value), comment) => {
                check_value(&self.keyword, value)?;
                if let Some(comment) = comment {
                    check_text(&self.keyword, comment)?;
                }
            }
            (None, Some(text)) => check_free_text(&self.keyword, text)?,
            (None, None) => {}
        }
        Ok(())
    }

    pub fn is_commentary(&self) -> bool {
        is_commentary(&self.keyword)
    }

    /// Parse one card image.
    pub fn parse(bytes: &[u8; CARD_SIZE]) -> Result<Card> {
        let raw_keyword = &bytes[..MAX_KEYWORD_LEN];
        if !raw_keyword
            .iter()
            .all(|&b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b' '))
        {
            return Err(Error::InvalidKeyword(
                String::from_utf8_lossy(raw_keyword).into_owned(),
            ));
        }
        let keyword = String::from_utf8_lossy(raw_keyword).trim_end().to_string();

        let has_value = !is_commentary(&keyword) && keyword != "END" && &bytes[8..10] == b"= ";
        if has_value {
            let (value, comment) = parse_value(&bytes[10..]);
            return Ok(Card {
                keyword,
                value,
                comment,
            });
        }

        let text = String::from_utf8_lossy(&bytes[8..]).trim_end().to_string();
        Ok(Card {
            keyword,
            value: None,
            comment: (!text.is_empty()).then_some(text),
        })
    }

    /// Render this card as an 80-byte card image.
    pub fn format(&self) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let kw = self.keyword.as_bytes();
        let kw_len = kw.len().min(MAX_KEYWORD_LEN);
        buf[..kw_len].copy_from_slice(&kw[..kw_len]);

        match (&self.value, &self.comment) {
            (Some(value), comment) => {
                buf[8] = b'=';
                buf[9] = b' ';
                buf[10..].copy_from_slice(&format_value(value, comment.as_deref()));
            }
            (None, Some(text)) => {
                let text = text.as_bytes();
                let len = text.len().min(CARD_SIZE - 8);
                buf[8..8 + len].copy_from_slice(&text[..len]);
            }
            (None, None) => {}
        }
        buf
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.comment) {
            (Some(v), Some(c)) => write!(f, "{:<8} = {} / {}", self.keyword, v, c),
            (Some(v), None) => write!(f, "{:<8} = {}", self.keyword, v),
            (None, Some(c)) => write!(f, "{:<8} {}", self.keyword, c),
            (None, None) => write!(f, "{}", self.keyword),
        }
    }
}

/// An ordered FITS header with case-insensitive keyword lookup.
///
/// Valued keywords are unique: [`Header::set`] replaces an existing card in
/// place. Commentary cards (`COMMENT`, `HISTORY`, blank) may repeat and are
/// always appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Header {
        Header::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// First valued card with this keyword.
    pub fn card(&self, keyword: &str) -> Option<&Card> {
        let key = keyword.trim().to_ascii_uppercase();
        self.cards
            .iter()
            .find(|c| !c.is_commentary() && c.keyword == key)
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.card(keyword).and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.card(keyword).is_some()
    }

    /// Set `keyword` to `value`, keeping any existing comment.
    pub fn set(&mut self, keyword: &str, value: impl Into<HeaderValue>) -> Result<()> {
        let key = normalize_keyword(keyword)?;
        let value = value.into();
        check_value(&key, &value)?;
        match self.position(&key) {
            Some(i) => self.cards[i].value = Some(value),
            None => self.cards.push(Card {
                keyword: key,
                value: Some(value),
                comment: None,
            }),
        }
        Ok(())
    }

    /// Set `keyword` to `value` and replace its comment.
    pub fn set_with_comment(
        &mut self,
        keyword: &str,
        value: impl Into<HeaderValue>,
        comment: &str,
    ) -> Result<()> {
        let key = normalize_keyword(keyword)?;
        check_text(&key, comment)?;
        self.set(keyword, value)?;
        if let Some(i) = self.position(&key) {
            self.cards[i].comment = Some(comment.to_string());
        }
        Ok(())
    }

    /// Insert or replace a whole card. Commentary cards are appended.
    pub fn push(&mut self, card: Card) {
        if card.is_commentary() {
            self.cards.push(card);
            return;
        }
        match self.position(&card.keyword) {
            Some(i) => self.cards[i] = card,
            None => self.cards.push(card),
        }
    }

    /// Append `card` as is, even if a card with the same keyword exists.
    ///
    /// Used to copy parsed headers, which may legally repeat a keyword
    /// (`HIERARCH` cards in particular).
    pub fn append(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove the valued card for `keyword`, returning it.
    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        let key = keyword.trim().to_ascii_uppercase();
        self.position(&key).map(|i| self.cards.remove(i))
    }

    pub fn add_comment(&mut self, text: &str) -> Result<()> {
        self.cards.push(Card::commentary("COMMENT", text)?);
        Ok(())
    }

    pub fn add_history(&mut self, text: &str) -> Result<()> {
        self.cards.push(Card::commentary("HISTORY", text)?);
        Ok(())
    }

    /// Free text of every commentary card with this keyword, in order.
    pub fn commentary(&self, keyword: &str) -> Vec<&str> {
        let key = keyword.trim().to_ascii_uppercase();
        self.cards
            .iter()
            .filter(|c| c.is_commentary() && c.keyword == key)
            .filter_map(|c| c.comment.as_deref())
            .collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.cards
            .iter()
            .position(|c| !c.is_commentary() && c.keyword == key)
    }

    /// Parse header blocks from the start of `data` up to and including the
    /// block holding `END`. Returns the header and the bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Header, usize)> {
        let mut header = Header::new();
        for (i, chunk) in data.chunks_exact(CARD_SIZE).enumerate() {
            let bytes: &[u8; CARD_SIZE] = chunk
                .try_into()
                .map_err(|_| Error::InvalidHeader("short card"))?;
            let card = Card::parse(bytes)?;
            if card.keyword == "END" {
                let consumed = padded_len((i + 1) * CARD_SIZE);
                if consumed > data.len() {
                    return Err(Error::UnexpectedEof);
                }
                debug!("parsed header: {} cards, {} bytes", header.len(), consumed);
                return Ok((header, consumed));
            }
            // Trailing blank padding cards are not part of the header.
            if card.keyword.is_empty() && card.comment.is_none() {
                continue;
            }
            header.cards.push(card);
        }
        Err(Error::UnexpectedEof)
    }

    /// Serialize all cards plus `END`, padded with spaces to whole blocks.
    ///
    /// Fails if any card does not pass [`Card::validate`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total = padded_len((self.cards.len() + 1) * CARD_SIZE);
        let mut buf = Vec::with_capacity(total);
        for card in &self.cards {
            card.validate()?;
            buf.extend_from_slice(&card.format());
        }
        let mut end = [b' '; CARD_SIZE];
        end[..3].copy_from_slice(b"END");
        buf.extend_from_slice(&end);
        buf.resize(total, b' ');
        Ok(buf)
    }
}

impl Index<&str> for Header {
    type Output = HeaderValue;

    /// Panics if `keyword` has no value, like indexing a map.
    fn index(&self, keyword: &str) -> &HeaderValue {
        match self.get(keyword) {
            Some(v) => v,
            None => panic!("keyword {keyword:?} not in header"),
        }
    }
}

impl FromIterator<Card> for Header {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Header {
        let mut header = Header::new();
        for card in iter {
            header.push(card);
        }
        header
    }
}

impl<'a> IntoIterator for &'a Header {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}
