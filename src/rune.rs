//! Component D: an authentication code bound to an ordered list of
//! restrictions, with text and base64 codecs and further-restriction
//! derivation.

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::restriction::Restriction;
use crate::sha256::{padded_len_after, Midstate, MidstateHasher};
use crate::value::FieldValue;

/// A bearer authorization cookie: an authentication code (a SHA-256
/// midstate) plus the restrictions that produced it.
pub struct Rune {
    hasher: MidstateHasher,
    restrictions: Vec<Restriction>,
}

impl Rune {
    /// Reconstruct a rune from a 32-byte authentication code and the
    /// restrictions already absorbed into it (as when decoding text or
    /// base64). The restrictions' text is *not* re-hashed here — the
    /// authentication code already reflects them; only the length
    /// bookkeeping needed to extend the rune correctly in the future is
    /// recomputed.
    pub fn from_auth_code(authcode: &[u8], restrictions: Vec<Restriction>) -> Result<Self> {
        if authcode.len() != 32 {
            log::warn!("authentication code is {} byte(s), need exactly 32", authcode.len());
            return Err(Error::InvalidAuthBase(authcode.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(authcode);

        let mut len = 64u64;
        for r in &restrictions {
            len = padded_len_after(len, r.to_text().len() as u64);
        }

        let midstate = Midstate::from_bytes(&bytes, len);
        Ok(Rune {
            hasher: MidstateHasher::restore(midstate),
            restrictions,
        })
    }

    /// The 32-byte authentication code currently bound to this rune.
    pub fn auth_code(&self) -> [u8; 32] {
        self.hasher.sum()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    /// Absorb one more restriction, extending the authentication code.
    pub fn add_restriction(&mut self, restriction: Restriction) {
        self.hasher.write(restriction.to_text().as_bytes());
        self.hasher.add_padding();
        self.restrictions.push(restriction);
        log::debug!("rune extended, now {} restriction(s)", self.restrictions.len());
    }

    /// Derive a new, further-restricted rune, leaving this one untouched.
    pub fn restrict(&self, extra: impl IntoIterator<Item = Restriction>) -> Result<Rune> {
        let mut next = Rune::from_auth_code(&self.auth_code(), self.restrictions.clone())?;
        for r in extra {
            next.add_restriction(r);
        }
        Ok(next)
    }

    /// Evaluate every restriction as a conjunction; the first failing
    /// restriction's reason short-circuits the result.
    pub fn evaluate(&self, vals: &HashMap<String, FieldValue>) -> (bool, String) {
        for restriction in &self.restrictions {
            let (ok, reason) = restriction.evaluate(vals);
            if !ok {
                return (false, reason);
            }
        }
        (true, String::new())
    }

    fn restriction_text(&self) -> String {
        self.restrictions
            .iter()
            .map(Restriction::to_text)
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `<64 hex digits>:<restrictions>`.
    pub fn to_text(&self) -> String {
        let text = format!("{}:{}", hex::encode(self.auth_code()), self.restriction_text());
        log::debug!("encoded rune to text form, {} restriction(s)", self.restrictions.len());
        text
    }

    /// Parse the text form produced by [`to_text`](Self::to_text).
    pub fn from_text(s: &str) -> Result<Self> {
        if s.len() < 65 || s.as_bytes()[64] != b':' {
            log::warn!("rune text is malformed: missing the 64-hex-digit `:` prefix");
            return Err(Error::MalformedText);
        }
        let authcode = hex::decode(&s[..64]).map_err(|e| {
            log::warn!("rune text has a malformed hex authentication code: {e}");
            Error::from(e)
        })?;

        let mut rest = &s[65..];
        let mut restrictions = Vec::new();
        while !rest.is_empty() {
            let allow_id = restrictions.is_empty();
            let (restriction, after) = Restriction::parse(rest, allow_id)?;
            restrictions.push(restriction);
            rest = after;
        }

        let rune = Rune::from_auth_code(&authcode, restrictions)?;
        log::debug!("decoded rune from text form, {} restriction(s)", rune.restrictions.len());
        Ok(rune)
    }

    /// URL-safe base64 (RFC 4648 §5) of the raw authentication code followed
    /// by the raw restriction-section bytes, without `=` padding.
    pub fn to_base64(&self) -> String {
        let mut buf = Vec::with_capacity(32 + 64);
        buf.extend_from_slice(&self.auth_code());
        buf.extend_from_slice(self.restriction_text().as_bytes());
        log::debug!("encoded rune to base64 form, {} restriction(s)", self.restrictions.len());
        URL_SAFE_NO_PAD.encode(buf)
    }

    /// Same as [`to_base64`](Self::to_base64) but with trailing `=` padding.
    pub fn to_base64_padded(&self) -> String {
        let mut buf = Vec::with_capacity(32 + 64);
        buf.extend_from_slice(&self.auth_code());
        buf.extend_from_slice(self.restriction_text().as_bytes());
        log::debug!("encoded rune to padded base64 form, {} restriction(s)", self.restrictions.len());
        URL_SAFE.encode(buf)
    }

    /// Decode a rune from its base64 form; trailing `=` padding is optional.
    pub fn from_base64(s: &str) -> Result<Self> {
        let trimmed = s.trim_end_matches('=');
        let data = URL_SAFE_NO_PAD.decode(trimmed).map_err(|e| {
            log::warn!("rune base64 is malformed: {e}");
            Error::from(e)
        })?;
        if data.len() < 32 {
            log::warn!("rune base64 decoded to only {} byte(s), need at least 32", data.len());
            return Err(Error::InvalidAuthBase(data.len()));
        }
        let text = format!(
            "{}:{}",
            hex::encode(&data[..32]),
            String::from_utf8_lossy(&data[32..])
        );
        let rune = Rune::from_text(&text)?;
        log::debug!("decoded rune from base64 form, {} restriction(s)", rune.restrictions.len());
        Ok(rune)
    }

    /// The integer unique id, if the first alternative of the first
    /// restriction is a well-formed unique-id alternative. `-1` otherwise.
    pub fn unique_id(&self) -> i64 {
        self.id_parts().map(|(id, _)| id).unwrap_or(-1)
    }

    /// The integer version, if present; `0` otherwise.
    pub fn version(&self) -> i64 {
        self.id_parts().map(|(_, v)| v).unwrap_or(0)
    }

    fn id_parts(&self) -> Option<(i64, i64)> {
        let first = self.restrictions.first()?;
        let alt = first.alternatives().first()?;
        if !alt.is_unique_id() {
            return None;
        }
        let literal = alt.value().canonical();
        match literal.split_once('-') {
            Some((id, version)) => Some((id.parse().ok()?, version.parse().ok()?)),
            None => Some((literal.parse().ok()?, 0)),
        }
    }
}

impl Clone for Rune {
    fn clone(&self) -> Self {
        Rune::from_auth_code(&self.auth_code(), self.restrictions.clone())
            .expect("a valid rune's authentication code is always 32 bytes")
    }
}

impl fmt::Display for Rune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for Rune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rune")
            .field("auth_code", &hex::encode(self.auth_code()))
            .field("restrictions", &self.restrictions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alternative::{Alternative, Operator};
    use crate::value::Value;

    fn zero_secret_master_authcode() -> [u8; 32] {
        let mut h = MidstateHasher::new();
        h.write(&[0u8; 16]);
        h.add_padding();
        h.sum()
    }

    #[test]
    fn unrestricted_master_matches_vector() {
        let code = zero_secret_master_authcode();
        assert_eq!(
            hex::encode(code),
            "374708fff7719dd5979ec875d56cd2286f6d3cf7ec317a3b25632aab28ec37bb"
        );
    }

    #[test]
    fn text_round_trip() {
        let code = zero_secret_master_authcode();
        let rune = Rune::from_auth_code(&code, Vec::new()).unwrap();
        let alt = Alternative::new("method", Operator::StartsWith, Value::String("list".into()), false)
            .unwrap();
        let restricted = rune.restrict([Restriction::new(vec![alt]).unwrap()]).unwrap();
        let text = restricted.to_text();
        let parsed = Rune::from_text(&text).unwrap();
        assert_eq!(parsed.to_text(), text);
    }

    #[test]
    fn base64_round_trip_padded_and_unpadded() {
        let code = zero_secret_master_authcode();
        let rune = Rune::from_auth_code(&code, Vec::new()).unwrap();
        let b64 = rune.to_base64();
        let b64_padded = rune.to_base64_padded();
        assert_eq!(Rune::from_base64(&b64).unwrap().to_text(), rune.to_text());
        assert_eq!(Rune::from_base64(&b64_padded).unwrap().to_text(), rune.to_text());
    }

    #[test]
    fn unique_id_accessors() {
        let code = zero_secret_master_authcode();
        let restriction = Restriction::unique_id(3, None::<&str>).unwrap();
        let rune = Rune::from_auth_code(&code, vec![restriction]).unwrap();
        assert_eq!(rune.unique_id(), 3);
        assert_eq!(rune.version(), 0);
    }

    #[test]
    fn restrict_does_not_mutate_original() {
        let code = zero_secret_master_authcode();
        let rune = Rune::from_auth_code(&code, Vec::new()).unwrap();
        let before = rune.to_text();
        let alt = Alternative::new("x", Operator::Equal, Value::String("1".into()), false).unwrap();
        let _ = rune.restrict([Restriction::new(vec![alt]).unwrap()]).unwrap();
        assert_eq!(rune.to_text(), before);
    }

    #[test]
    fn restrict_with_no_extra_is_idempotent() {
        let code = zero_secret_master_authcode();
        let rune = Rune::from_auth_code(&code, Vec::new()).unwrap();
        let same = rune.restrict(Vec::new()).unwrap();
        assert_eq!(rune.to_text(), same.to_text());
    }
}
