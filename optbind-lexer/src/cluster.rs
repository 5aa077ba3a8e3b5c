/// A run of short flags, like the `abc` in `-abc`. Statically guaranteed to
/// contain at least one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster<'a>(&'a str);

impl<'a> Cluster<'a> {
    #[inline]
    pub fn new(flags: &'a str) -> Option<Self> {
        match flags.is_empty() {
            true => None,
            false => Some(Self(flags)),
        }
    }

    /// The whole point: the first flag always exists
    #[inline]
    pub fn split_first(self) -> (char, &'a str) {
        let mut chars = self.0.chars();

        match chars.next() {
            Some(flag) => (flag, chars.as_str()),
            None => unreachable!("clusters are never empty"),
        }
    }

    #[inline(always)]
    pub fn get(self) -> &'a str {
        self.0
    }
}
