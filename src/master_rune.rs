//! Component E: a rune paired with the secret that minted it.

use std::collections::HashMap;
use std::fmt;

use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::restriction::Restriction;
use crate::rune::Rune;
use crate::sha256::MidstateHasher;
use crate::value::FieldValue;

const MAX_SECRET_LEN: usize = 55;

/// The issuer's half of the system: holds the secret and can mint new
/// restricted runes and verify any candidate's authentication code.
pub struct MasterRune {
    secret: Vec<u8>,
    rune: Rune,
}

impl MasterRune {
    /// Mint a fresh master rune from a secret. The secret must be 1 to 55
    /// bytes: `secret + 0x80 + an 8-byte bit length` must fit in a single
    /// 64-byte SHA-256 chunk so the initial midstate is complete after
    /// exactly one block.
    pub fn new(secret: impl Into<Vec<u8>>, restrictions: Vec<Restriction>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            log::warn!("rejected empty secret");
            return Err(Error::SecretTooShort);
        }
        if secret.len() > MAX_SECRET_LEN {
            log::warn!("rejected secret of {} byte(s), max is {MAX_SECRET_LEN}", secret.len());
            return Err(Error::SecretTooLong(secret.len()));
        }

        let mut hasher = MidstateHasher::new();
        hasher.write(&secret);
        hasher.add_padding();
        let authcode = hasher.sum();

        let mut rune = Rune::from_auth_code(&authcode, Vec::new())?;
        for r in restrictions {
            rune.add_restriction(r);
        }

        log::debug!("minted master rune, secret length {}", secret.len());
        Ok(MasterRune { secret, rune })
    }

    /// Mint a fresh master rune carrying a unique-id restriction as its
    /// first restriction.
    pub fn with_unique_id(
        secret: impl Into<Vec<u8>>,
        id: impl fmt::Display,
        version: Option<impl fmt::Display>,
        restrictions: Vec<Restriction>,
    ) -> Result<Self> {
        let mut all = vec![Restriction::unique_id(id, version)?];
        all.extend(restrictions);
        Self::new(secret, all)
    }

    pub fn rune(&self) -> &Rune {
        &self.rune
    }

    /// Derive a new, further-restricted rune from this master's current
    /// rune. The master itself is unaffected.
    pub fn restrict(&self, extra: impl IntoIterator<Item = Restriction>) -> Result<Rune> {
        self.rune.restrict(extra)
    }

    /// Recompute the authentication code that `candidate`'s restrictions
    /// would produce starting from this master's secret, and compare it to
    /// `candidate`'s actual authentication code in constant time. This is
    /// the only check that confirms a rune genuinely descends from this
    /// secret; it says nothing about whether the rune's predicate holds.
    pub fn is_authorized(&self, candidate: &Rune) -> bool {
        let mut hasher = MidstateHasher::new();
        hasher.write(&self.secret);
        hasher.add_padding();
        for restriction in candidate.restrictions() {
            hasher.write(restriction.to_text().as_bytes());
            hasher.add_padding();
        }
        let expected = hasher.sum();
        let actual = candidate.auth_code();

        let authorized: bool = expected.ct_eq(&actual).into();
        if !authorized {
            log::warn!("rejected a candidate rune: authentication code mismatch");
        }
        authorized
    }

    /// `is_authorized` followed by `evaluate`: the full bearer check a host
    /// performs on an incoming request.
    pub fn check(&self, candidate: &Rune, vals: &HashMap<String, FieldValue>) -> Result<()> {
        if !self.is_authorized(candidate) {
            return Err(Error::Unauthorized);
        }
        let (ok, reason) = candidate.evaluate(vals);
        if ok {
            Ok(())
        } else {
            log::info!("rune predicate failed: {reason}");
            Err(Error::PredicateFailed(reason))
        }
    }
}

impl fmt::Debug for MasterRune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterRune")
            .field("auth_code", &hex::encode(self.rune.auth_code()))
            .field("restrictions", &self.rune.restrictions().len())
            .finish()
    }
}
