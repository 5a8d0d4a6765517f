use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Member access control, ordered from least to most restrictive.
///
/// The ordering is meaningful: `a <= b` means access level `a` is at least
/// as permissive as `b`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, IntoStaticStr, Serialize,
    Deserialize,
)]
pub enum AccessSpecifier {
    #[default]
    #[strum(serialize = "public")]
    Public,
    #[strum(serialize = "protected")]
    Protected,
    #[strum(serialize = "private")]
    Private,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_public_first() {
        assert!(AccessSpecifier::Public < AccessSpecifier::Protected);
        assert!(AccessSpecifier::Protected < AccessSpecifier::Private);
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(AccessSpecifier::Protected.to_string(), "protected");
    }
}
