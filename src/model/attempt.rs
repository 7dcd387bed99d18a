use std::fmt;

/// Marker distinguishing successive switch attempts made from one surface.
///
/// Tokens are only ever compared for equality against the latest one issued;
/// a completion carrying any other token is stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptToken(u64);

impl AttemptToken {
    pub fn next(self) -> Self { Self(self.0 + 1) }

    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}
