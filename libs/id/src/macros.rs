/// Declares one or more typed IDs.
///
/// Each ID is a `Copy` newtype over a ULID with a fixed kind string. It
/// displays and serializes as `{kind}_{ulid}` and parses back through
/// [`parse_prefixed`](crate::parse_prefixed).
///
/// ```ignore
/// define_ids! {
///     /// A resource offer.
///     OfferId => "offer",
///     StepId => "step",
/// }
/// ```
#[macro_export]
macro_rules! define_ids {
    (@one $(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Ulid);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn new() -> Self {
                Self($crate::Ulid::new())
            }

            pub fn ulid(&self) -> $crate::Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}_{}", Self::KIND, self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::parse_prefixed(Self::KIND, s).map(Self)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                s.parse::<Self>().map_err(::serde::de::Error::custom)
            }
        }
    };

    ($($(#[$meta:meta])* $name:ident => $kind:literal),+ $(,)?) => {
        $($crate::define_ids!(@one $(#[$meta])* $name, $kind);)+
    };
}
