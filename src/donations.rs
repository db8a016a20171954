use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Server-side donation amounts for the current period, keyed by character ID
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonationLedger {
    amounts: HashMap<String, i64>,
}

impl DonationLedger {
    /// Amount donated by a member; unknown members have donated 0
    pub fn amount(&self, member_id: &str) -> i64 {
        self.amounts.get(member_id).copied().unwrap_or(0)
    }

    /// Number of characters listed, donors or not
    pub fn entry_count(&self) -> usize {
        self.amounts.len()
    }
}

impl FromIterator<(String, i64)> for DonationLedger {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            amounts: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for DonationLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(id, value)| {
                let amount = parse_amount(&value);
                (id, amount)
            })
            .collect())
    }
}

/// Lenient integer conversion for ledger values.
///
/// Numbers truncate toward zero. Strings are read like `parseInt`: leading
/// whitespace and an optional sign are skipped, a `0x` prefix switches to
/// hex, and digits are taken up to the first non-digit. So `"12abc"` is 12,
/// `"0x10"` is 16 and `"abc"` is 0. Anything else is 0.
pub fn parse_amount(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if n.as_u64().is_some() {
                i64::MAX
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
                    .unwrap_or(0)
            }
        }
        serde_json::Value::String(s) => parse_leading_int(s),
        _ => 0,
    }
}

fn parse_leading_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }

    let magnitude = i64::from_str_radix(digits, radix).unwrap_or(i64::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Members who donated on a given day, stored as `{memberId: true}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorSet {
    donors: BTreeMap<String, bool>,
}

impl DonorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, member_id: impl Into<String>) {
        self.donors.insert(member_id.into(), true);
    }

    #[cfg(test)]
    pub fn contains(&self, member_id: &str) -> bool {
        self.donors.get(member_id).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.donors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.donors.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.donors.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DonorSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Cross-reference the roster with the ledger.
/// Ledger entries for characters that are not on the roster are ignored.
pub fn extract_donors<'a>(
    member_ids: impl IntoIterator<Item = &'a str>,
    ledger: &DonationLedger,
) -> DonorSet {
    member_ids
        .into_iter()
        .filter(|id| ledger.amount(id) > 0)
        .collect()
}
