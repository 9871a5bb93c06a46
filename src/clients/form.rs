//! Ordered form and query parameters.

use crate::config::Charset;

/// Ordered key/value parameters that may repeat keys.
///
/// Used both for `application/x-www-form-urlencoded` bodies and for query
/// strings. A key without a value is encoded as `key=`.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::FormParams;
/// use bare_connection::Charset;
///
/// let mut params = FormParams::new();
/// params.insert("tag", "red");
/// params.insert("tag", "blue");
/// params.insert_key("flag");
///
/// assert_eq!(params.encode(&Charset::utf8()), "tag=red&tag=blue&flag=");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormParams {
    entries: Vec<(String, Option<String>)>,
}

impl FormParams {
    /// Creates an empty parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a key/value pair. Existing pairs with the same key are kept.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), Some(value.into())));
    }

    /// Appends a key with no value.
    pub fn insert_key(&mut self, key: impl Into<String>) {
        self.entries.push((key.into(), None));
    }

    /// Returns all values recorded for `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Percent-encodes the pairs, with keys and values first encoded in `charset`.
    #[must_use]
    pub fn encode(&self, charset: &Charset) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                let key = urlencoding::encode_binary(&charset.encode(key)).into_owned();
                let value = value.as_deref().map_or_else(String::new, |value| {
                    urlencoding::encode_binary(&charset.encode(value)).into_owned()
                });
                format!("{key}={value}")
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for FormParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let params: FormParams = [("q", "a b&c"), ("lang", "fr")].into_iter().collect();
        assert_eq!(params.encode(&Charset::utf8()), "q=a%20b%26c&lang=fr");
    }

    #[test]
    fn test_encode_uses_charset_bytes() {
        let params: FormParams = [("city", "Montréal")].into_iter().collect();
        assert_eq!(params.encode(&Charset::utf8()), "city=Montr%C3%A9al");
        assert_eq!(
            params.encode(&Charset::new("ISO-8859-1").unwrap()),
            "city=Montr%E9al"
        );
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let mut params = FormParams::new();
        params.insert("id", "1");
        params.insert("other", "x");
        params.insert("id", "2");

        let ids: Vec<_> = params.get_all("id").collect();
        assert_eq!(ids, vec![Some("1"), Some("2")]);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_params_encode_to_empty_string() {
        assert_eq!(FormParams::new().encode(&Charset::utf8()), "");
        assert!(FormParams::new().is_empty());
    }
}
