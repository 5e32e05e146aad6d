use itertools::Itertools;
use std::cmp::Ordering;

/// One release component of a loosely formatted version string
#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    /// Digits with leading zeros stripped, compared by magnitude without
    /// parsing so arbitrarily long numbers never overflow
    Numeric(String),
    /// Any non-numeric run, compared lexically
    Text(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Numeric(a), Component::Numeric(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
            // numbers sort before text at the same position
            (Component::Numeric(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Alpha,
    Separator,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_ascii_digit() {
            CharClass::Digit
        } else if c.is_alphabetic() {
            CharClass::Alpha
        } else if c == '.' {
            CharClass::Separator
        } else {
            CharClass::Other
        }
    }
}

/// A version string split into ordered components.
///
/// Parsing never fails: digit runs become numeric components, letter runs
/// and punctuation runs become text components and dots only separate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LooseVersion {
    components: Vec<Component>,
}

impl LooseVersion {
    pub fn parse(version: &str) -> Self {
        let components = version
            .chars()
            .chunk_by(|c| CharClass::of(*c))
            .into_iter()
            .filter_map(|(class, run)| {
                let run: String = run.collect();
                match class {
                    CharClass::Separator => None,
                    CharClass::Digit => {
                        let trimmed = run.trim_start_matches('0');
                        Some(Component::Numeric(trimmed.to_string()))
                    }
                    CharClass::Alpha | CharClass::Other => Some(Component::Text(run)),
                }
            })
            .collect();

        Self { components }
    }
}

/// Total ordering over version identifiers
pub struct VersionOrder;

impl VersionOrder {
    /// Compare two versions component by component. When one is a prefix
    /// of the other the shorter one is less, so "1.2" < "1.2.0".
    pub fn compare(a: &str, b: &str) -> Ordering {
        LooseVersion::parse(a).cmp(&LooseVersion::parse(b))
    }

    /// Sort ascending; equal versions keep their input order.
    pub fn sort<I, S>(versions: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        versions
            .into_iter()
            .map(Into::into)
            .map(|version: String| (LooseVersion::parse(&version), version))
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, version)| version)
            .collect()
    }

    /// Keep versions that are not less than `floor`, preserving order.
    pub fn at_least<I, S>(versions: I, floor: &str) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let floor = LooseVersion::parse(floor);
        versions
            .into_iter()
            .map(Into::into)
            .filter(|version: &String| LooseVersion::parse(version) >= floor)
            .collect()
    }
}
