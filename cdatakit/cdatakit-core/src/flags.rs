use std::{
    fmt::{Display, Formatter, Result},
    ops::BitOr,
};

/// Schema flag bit set as defined by the interchange ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(i64);

impl Flags {
    pub const DICTIONARY_ORDERED: Flags = Flags(1);
    pub const NULLABLE: Flags = Flags(2);
    pub const MAP_KEYS_SORTED: Flags = Flags(4);

    const NAMED: [(Flags, &'static str); 3] = [
        (Flags::DICTIONARY_ORDERED, "dictionary_ordered"),
        (Flags::NULLABLE, "nullable"),
        (Flags::MAP_KEYS_SORTED, "map_keys_sorted"),
    ];

    pub const fn empty() -> Self {
        Flags(0)
    }

    pub const fn from_bits(bits: i64) -> Self {
        Flags(bits)
    }

    pub const fn bits(self) -> i64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Flags, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        let known = Self::DICTIONARY_ORDERED | Self::NULLABLE | Self::MAP_KEYS_SORTED;
        let unknown = self.0 & !known.0;
        if unknown != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}
