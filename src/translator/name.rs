use std::fmt;
use std::str::FromStr;

use super::TranslateError;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Antelope account/action name packed into a `u64` (base32, up to 13 chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(u64);

impl Name {
    pub const fn from_raw(value: u64) -> Self {
        Name(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > 13 {
            return Err(TranslateError::InvalidName(s.to_string()));
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let symbol =
                char_to_symbol(c).ok_or_else(|| TranslateError::InvalidName(s.to_string()))?;
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                // The 13th character only has 4 bits left.
                if symbol > 0x0f {
                    return Err(TranslateError::InvalidName(s.to_string()));
                }
                value |= symbol;
            }
        }

        Ok(Name(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is pure ASCII.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_name_values() {
        let eosio: Name = "eosio".parse().unwrap();
        assert_eq!(eosio.value(), 6138663577826885632);
        assert_eq!(Name::from_raw(6138663577826885632).to_string(), "eosio");
    }

    #[test]
    fn test_name_display_roundtrip() {
        for s in ["eosio.evm", "pushtx", "active", "miner1.x", "a", "zzzzzzzzzzzzj"] {
            let name: Name = s.parse().unwrap();
            assert_eq!(name.to_string(), s);
        }
        assert_eq!(Name::default().to_string(), "");
    }

    #[test]
    fn test_invalid_names() {
        assert!("UPPER".parse::<Name>().is_err());
        assert!("miner6".parse::<Name>().is_err());
        assert!("waytoolongname1".parse::<Name>().is_err());
        // 13th character must fit in 4 bits (a-j)
        assert!("zzzzzzzzzzzzz".parse::<Name>().is_err());
    }
}
