//! Parsed HDU headers and the best-effort card fix-up applied before parsing.

use std::fmt;

use fitsio_pure::CARD_SIZE;

pub use fitsio_pure::header::Card;
pub use fitsio_pure::value::Value;

/// The metadata of one HDU: its header cards in file order, without END.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub(crate) fn from_cards(mut cards: Vec<Card>) -> Self {
        cards.retain(|c| !c.is_end());
        Header { cards }
    }

    /// Value of the first card with this keyword (case-insensitive).
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.find(keyword).and_then(|c| c.value.as_ref())
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)? {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating-point lookup; integer values are widened.
    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        match self.get(keyword)? {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)? {
            Value::Logical(v) => Some(*v),
            _ => None,
        }
    }

    /// String lookup with trailing padding removed.
    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword)? {
            Value::String(s) => Some(s.trim_end()),
            _ => None,
        }
    }

    pub fn comment(&self, keyword: &str) -> Option<&str> {
        self.find(keyword).and_then(|c| c.comment.as_deref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.find(keyword).is_some()
    }

    /// Keywords in file order, commentary cards included.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.keyword_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// EXTNAME, if present.
    pub fn extname(&self) -> Option<&str> {
        card_extname(&self.cards)
    }

    /// Byte length of the data unit that follows this header, unpadded.
    ///
    /// `|BITPIX| * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn) / 8`, with
    /// NAXIS1 left out of the product for random groups.
    pub fn data_byte_len(&self) -> Option<u64> {
        let bitpix = self.get_i64("BITPIX")?;
        let naxis = self.get_i64("NAXIS")?;
        if naxis == 0 {
            return Some(0);
        }
        let mut product: u64 = 1;
        for i in 1..=naxis {
            let n = self.get_i64(&format!("NAXIS{i}"))?;
            if i == 1 && n == 0 && self.get_bool("GROUPS") == Some(true) {
                continue;
            }
            product = product.checked_mul(u64::try_from(n).ok()?)?;
        }
        let pcount = u64::try_from(self.get_i64("PCOUNT").unwrap_or(0)).ok()?;
        let gcount = u64::try_from(self.get_i64("GCOUNT").unwrap_or(1)).ok()?;
        let bits = bitpix
            .unsigned_abs()
            .checked_mul(gcount)?
            .checked_mul(pcount.checked_add(product)?)?;
        Some(bits / 8)
    }

    fn find(&self, keyword: &str) -> Option<&Card> {
        self.cards
            .iter()
            .find(|c| c.keyword_str().eq_ignore_ascii_case(keyword))
    }
}

/// EXTNAME of a raw card list, padding trimmed.
pub(crate) fn card_extname(cards: &[Card]) -> Option<&str> {
    cards
        .iter()
        .find(|c| c.keyword_str().eq_ignore_ascii_case("EXTNAME"))
        .and_then(|c| match &c.value {
            Some(Value::String(s)) => Some(s.trim()),
            _ => None,
        })
}

impl<'a> IntoIterator for &'a Header {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for card in &self.cards {
            let keyword = card.keyword_str();
            match &card.value {
                Some(value) => {
                    write!(f, "{keyword:<8}= {}", ValueText(value))?;
                    if let Some(comment) = &card.comment {
                        write!(f, " / {comment}")?;
                    }
                }
                None => {
                    write!(f, "{keyword:<8}")?;
                    if let Some(comment) = &card.comment {
                        write!(f, "{comment}")?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct ValueText<'a>(&'a Value);

impl fmt::Display for ValueText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Logical(true) => f.write_str("T"),
            Value::Logical(false) => f.write_str("F"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::ComplexInt(re, im) => write!(f, "({re}, {im})"),
            Value::ComplexFloat(re, im) => write!(f, "({re:?}, {im:?})"),
        }
    }
}

/// Repair what can be repaired in one raw 80-byte card. Returns `true` if
/// anything changed.
///
/// Lower-case keyword letters are upper-cased and bytes outside printable
/// ASCII are blanked. Card values are otherwise left alone.
pub(crate) fn fix_card(card: &mut [u8]) -> bool {
    let mut changed = false;
    for (i, b) in card.iter_mut().enumerate() {
        if !(0x20..=0x7E).contains(b) {
            *b = b' ';
            changed = true;
        } else if i < 8 && b.is_ascii_lowercase() {
            b.make_ascii_uppercase();
            changed = true;
        }
    }
    changed
}

/// Apply [`fix_card`] to every card of a raw header. Returns the number of
/// cards changed.
pub(crate) fn fix_header_bytes(header: &mut [u8]) -> usize {
    header
        .chunks_exact_mut(CARD_SIZE)
        .map(fix_card)
        .filter(|&changed| changed)
        .count()
}

/// Whether a raw card is the END card, tolerating a lower-case spelling.
pub(crate) fn is_end_card(card: &[u8]) -> bool {
    card.len() >= 8 && card[..8].eq_ignore_ascii_case(b"END     ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keyword(name: &str) -> [u8; 8] {
        let mut k = [b' '; 8];
        let bytes = name.as_bytes();
        let len = bytes.len().min(8);
        k[..len].copy_from_slice(&bytes[..len]);
        k
    }

    fn card(keyword: &str, value: Value) -> Card {
        Card {
            keyword: make_keyword(keyword),
            value: Some(value),
            comment: None,
        }
    }

    fn image_header(naxes: &[i64]) -> Header {
        let mut cards = vec![
            card("SIMPLE", Value::Logical(true)),
            card("BITPIX", Value::Integer(-64)),
            card("NAXIS", Value::Integer(naxes.len() as i64)),
        ];
        for (i, n) in naxes.iter().enumerate() {
            cards.push(card(&format!("NAXIS{}", i + 1), Value::Integer(*n)));
        }
        cards.push(Card {
            keyword: make_keyword("END"),
            value: None,
            comment: None,
        });
        Header::from_cards(cards)
    }

    #[test]
    fn end_card_is_dropped() {
        let h = image_header(&[4, 3]);
        assert_eq!(h.len(), 5);
        assert!(!h.contains("END"));
    }

    #[test]
    fn typed_lookups() {
        let mut cards = vec![
            card("EXPTIME", Value::Float(2.5)),
            card("NCOMBINE", Value::Integer(3)),
            card("OBJECT", Value::String("Sun     ".into())),
        ];
        cards[0].comment = Some("seconds".into());
        let h = Header::from_cards(cards);
        assert_eq!(h.get_f64("EXPTIME"), Some(2.5));
        assert_eq!(h.get_f64("NCOMBINE"), Some(3.0));
        assert_eq!(h.get_i64("exptime"), None);
        assert_eq!(h.get_str("object"), Some("Sun"));
        assert_eq!(h.comment("EXPTIME"), Some("seconds"));
        assert_eq!(h.get_bool("OBJECT"), None);
        assert!(h.get("MISSING").is_none());
    }

    #[test]
    fn data_byte_len_image() {
        assert_eq!(image_header(&[128, 128]).data_byte_len(), Some(128 * 128 * 8));
        assert_eq!(image_header(&[]).data_byte_len(), Some(0));
    }

    #[test]
    fn data_byte_len_table_with_heap() {
        let h = Header::from_cards(vec![
            card("XTENSION", Value::String("BINTABLE".into())),
            card("BITPIX", Value::Integer(8)),
            card("NAXIS", Value::Integer(2)),
            card("NAXIS1", Value::Integer(16)),
            card("NAXIS2", Value::Integer(10)),
            card("PCOUNT", Value::Integer(100)),
            card("GCOUNT", Value::Integer(1)),
        ]);
        assert_eq!(h.data_byte_len(), Some(260));
    }

    #[test]
    fn data_byte_len_random_groups() {
        let h = Header::from_cards(vec![
            card("SIMPLE", Value::Logical(true)),
            card("BITPIX", Value::Integer(-32)),
            card("NAXIS", Value::Integer(3)),
            card("NAXIS1", Value::Integer(0)),
            card("NAXIS2", Value::Integer(3)),
            card("NAXIS3", Value::Integer(2)),
            card("GROUPS", Value::Logical(true)),
            card("PCOUNT", Value::Integer(4)),
            card("GCOUNT", Value::Integer(5)),
        ]);
        assert_eq!(h.data_byte_len(), Some(4 * 5 * (4 + 6)));
    }

    #[test]
    fn data_byte_len_missing_axis() {
        let h = Header::from_cards(vec![
            card("SIMPLE", Value::Logical(true)),
            card("BITPIX", Value::Integer(16)),
            card("NAXIS", Value::Integer(2)),
            card("NAXIS1", Value::Integer(10)),
        ]);
        assert_eq!(h.data_byte_len(), None);
    }

    #[test]
    fn data_byte_len_overflow_is_none() {
        assert_eq!(image_header(&[1 << 60]).data_byte_len(), None);
        let h = Header::from_cards(vec![
            card("XTENSION", Value::String("BINTABLE".into())),
            card("BITPIX", Value::Integer(8)),
            card("NAXIS", Value::Integer(1)),
            card("NAXIS1", Value::Integer(1)),
            card("PCOUNT", Value::Integer(i64::MAX)),
            card("GCOUNT", Value::Integer(1)),
        ]);
        assert_eq!(h.data_byte_len(), None);
    }

    #[test]
    fn card_extname_trims_and_ignores_case() {
        let mut c = card("EXTNAME", Value::String("SCI     ".into()));
        c.keyword = make_keyword("extname");
        assert_eq!(card_extname(&[c]), Some("SCI"));
        assert_eq!(card_extname(&[card("NAXIS", Value::Integer(0))]), None);
    }

    #[test]
    fn display_lists_cards() {
        let mut c = card("EXPTIME", Value::Float(1.5));
        c.comment = Some("s".into());
        let h = Header::from_cards(vec![
            card("SIMPLE", Value::Logical(true)),
            c,
            card("OBJECT", Value::String("it's".into())),
        ]);
        let text = h.to_string();
        assert_eq!(
            text,
            "SIMPLE  = T\nEXPTIME = 1.5 / s\nOBJECT  = 'it''s'\n"
        );
    }

    #[test]
    fn fix_card_uppercases_keyword_only() {
        let mut raw = [b' '; CARD_SIZE];
        raw[..15].copy_from_slice(b"object  = 'sun'");
        assert!(fix_card(&mut raw));
        assert_eq!(&raw[..15], b"OBJECT  = 'sun'");
    }

    #[test]
    fn fix_card_blanks_control_bytes() {
        let mut raw = [b' '; CARD_SIZE];
        raw[..10].copy_from_slice(b"NAXIS   = ");
        raw[30] = 0x00;
        raw[79] = b'\t';
        assert!(fix_card(&mut raw));
        assert_eq!(raw[30], b' ');
        assert_eq!(raw[79], b' ');
    }

    #[test]
    fn fix_card_leaves_valid_card() {
        let mut raw = [b' '; CARD_SIZE];
        raw[..20].copy_from_slice(b"BITPIX  =          8");
        assert!(!fix_card(&mut raw));
    }

    #[test]
    fn fix_header_counts_changed_cards() {
        let mut raw = vec![b' '; CARD_SIZE * 3];
        raw[..6].copy_from_slice(b"simple");
        raw[CARD_SIZE..CARD_SIZE + 6].copy_from_slice(b"BITPIX");
        raw[2 * CARD_SIZE..2 * CARD_SIZE + 5].copy_from_slice(b"naxis");
        assert_eq!(fix_header_bytes(&mut raw), 2);
        assert_eq!(&raw[2 * CARD_SIZE..2 * CARD_SIZE + 5], b"NAXIS");
    }

    #[test]
    fn end_card_detection() {
        let mut raw = [b' '; CARD_SIZE];
        raw[..3].copy_from_slice(b"end");
        assert!(is_end_card(&raw));
        raw[..4].copy_from_slice(b"ENDX");
        assert!(!is_end_card(&raw));
    }
}
