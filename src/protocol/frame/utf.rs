use core::str;
use std::{fmt, ops::Deref, str::Utf8Error};

use bytes::Bytes;

/// Text payload of a frame.
///
/// Wraps [`Bytes`] whose content was checked to be valid UTF-8 on the
/// way in, so borrowing the text back out costs nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Utf8Bytes(Bytes);

impl Utf8Bytes {
    /// Wraps a static string without copying it.
    #[inline]
    pub const fn from_static(str: &'static str) -> Self {
        Self(Bytes::from_static(str.as_bytes()))
    }

    /// Borrows the payload as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // Every constructor checked the encoding.
        unsafe { str::from_utf8_unchecked(&self.0) }
    }
}

impl Deref for Utf8Bytes {
    type Target = str;

    /// ```
    /// let payload = gust::Utf8Bytes::from_static("foo123");
    ///
    /// // str methods come along for free
    /// assert_eq!(payload.len(), 6);
    /// assert!(payload.starts_with("foo"));
    /// ```
    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl PartialEq<str> for Utf8Bytes {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Utf8Bytes {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<String> for Utf8Bytes {
    #[inline]
    fn eq(&self, other: &String) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for Utf8Bytes {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<Bytes> for Utf8Bytes {
    type Error = Utf8Error;

    #[inline]
    fn try_from(value: Bytes) -> Result<Self, Self::Error> {
        str::from_utf8(&value)?;
        Ok(Self(value))
    }
}

impl From<String> for Utf8Bytes {
    #[inline]
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for Utf8Bytes {
    #[inline]
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Utf8Bytes> for Bytes {
    #[inline]
    fn from(value: Utf8Bytes) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_rejects_invalid_utf8() {
        let bytes = Bytes::from_static(&[0x66, 0x6f, 0x80]);
        assert!(Utf8Bytes::try_from(bytes).is_err());
    }

    #[test]
    fn test_compares_against_string_types() {
        let payload = Utf8Bytes::from("hello");
        assert_eq!(payload, "hello");
        assert_eq!(payload, *"hello");
        assert_eq!(payload, String::from("hello"));
    }

    #[test]
    fn test_round_trips_through_bytes() {
        let payload = Utf8Bytes::from(String::from("uneven"));
        let raw = Bytes::from(payload);
        let back = Utf8Bytes::try_from(raw).unwrap();
        assert_eq!(back.as_str(), "uneven");
    }
}
