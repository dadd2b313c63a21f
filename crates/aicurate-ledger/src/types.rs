use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points required to advance one level.
pub const POINTS_PER_LEVEL: u64 = 100;

/// Non-transferable point currency earned by completing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProofPoints(u64);

impl ProofPoints {
    pub const ZERO: Self = Self(0);

    pub fn new(points: u64) -> Self {
        Self(points)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Level is always derived from points, never stored independently.
    pub fn level(&self) -> u32 {
        (self.0 / POINTS_PER_LEVEL) as u32 + 1
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for ProofPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} PP", self.0)
    }
}

/// External identity a user first shows up with (World ID or wallet-derived).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            bail!("User id cannot be empty");
        }
        if id.len() > 128 {
            bail!("User id too long: {} chars", id.len());
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 20-byte EVM-style wallet address, parsed from 0x-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_string(address: &str) -> Result<Self> {
        let hex_str = address
            .strip_prefix("0x")
            .ok_or_else(|| anyhow::anyhow!("Wallet address must start with 0x"))?;
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 20 {
            bail!("Wallet address must be 20 bytes, got {}", bytes.len());
        }
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes);
        Ok(Self(addr))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Kind of point-earning or reward-issuance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ChallengeComplete,
    QuizComplete,
    BadgeMint,
    TokenMint,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ChallengeComplete => "challenge_complete",
            Self::QuizComplete => "quiz_complete",
            Self::BadgeMint => "badge_mint",
            Self::TokenMint => "token_mint",
        };
        write!(f, "{}", s)
    }
}

/// One-per-campaign badges a user can claim once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    Pioneer,
    Curator,
    TopReviewer,
    LaunchCampaign,
}

impl BadgeType {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "pioneer" => Ok(Self::Pioneer),
            "curator" => Ok(Self::Curator),
            "top_reviewer" => Ok(Self::TopReviewer),
            "launch_campaign" => Ok(Self::LaunchCampaign),
            other => bail!("Unknown badge type: {}", other),
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pioneer => "pioneer",
            Self::Curator => "curator",
            Self::TopReviewer => "top_reviewer",
            Self::LaunchCampaign => "launch_campaign",
        };
        write!(f, "{}", s)
    }
}

/// Idempotency key derived from the triggering event. A retried request
/// carrying the same key must produce the same effect as the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey([u8; 32]);

impl EventKey {
    pub fn derive(user: &UserId, kind: ActivityKind, source_id: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(user.as_str().as_bytes());
        hasher.update(kind.to_string().as_bytes());
        hasher.update(source_id.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            bail!("Event key must be 32 bytes, got {}", bytes.len());
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_formula() {
        assert_eq!(ProofPoints::new(0).level(), 1);
        assert_eq!(ProofPoints::new(99).level(), 1);
        assert_eq!(ProofPoints::new(100).level(), 2);
        assert_eq!(ProofPoints::new(105).level(), 2);
        assert_eq!(ProofPoints::new(250).level(), 3);
    }

    #[test]
    fn test_wallet_address_parsing() {
        let addr = WalletAddress::from_string("0x00112233445566778899aabbccddeeff00112233").unwrap();
        assert_eq!(
            addr.to_string(),
            "0x00112233445566778899aabbccddeeff00112233"
        );

        assert!(WalletAddress::from_string("00112233445566778899aabbccddeeff00112233").is_err());
        assert!(WalletAddress::from_string("0x1234").is_err());
        assert!(WalletAddress::from_string("0xzz112233445566778899aabbccddeeff00112233").is_err());
    }

    #[test]
    fn test_event_key_deterministic() {
        let user = UserId::new("world-id-1").unwrap();
        let a = EventKey::derive(&user, ActivityKind::ChallengeComplete, "challenge-42");
        let b = EventKey::derive(&user, ActivityKind::ChallengeComplete, "challenge-42");
        let c = EventKey::derive(&user, ActivityKind::ChallengeComplete, "challenge-43");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_badge_type_roundtrip() {
        for name in ["pioneer", "curator", "top_reviewer", "launch_campaign"] {
            let badge = BadgeType::from_name(name).unwrap();
            assert_eq!(badge.to_string(), name);
        }
        assert!(BadgeType::from_name("unknown").is_err());
    }
}
