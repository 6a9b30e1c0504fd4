//! String forms for the catalog enums.
//!
//! Resource types, structure categories and event kinds are written to
//! checkpoints and templates by their snake_case key. Pair either macro with
//! `#[serde(into = "String", try_from = "String")]` on the enum.

/// Keyed conversions for a closed catalog (`ResourceType`, `EventKind`, ...):
/// `as_str`, `ALL` in declaration order, `Display`, and `String` conversions
/// that reject keys outside the catalog.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(key: String) -> Result<Self, Self::Error> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == key)
                    .ok_or_else(|| format!("{key:?} is not a known {}", stringify!($name)))
            }
        }
    };
}

/// Keyed conversions for `EffectType`, which mods and templates may extend
/// with their own keys. Unknown keys land in `Custom`; an empty key is an error.
macro_rules! string_enum_open {
    ($name:ident, $label:expr, { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $str,)+
                    $name::Custom(key) => key,
                }
            }

            /// True for keys outside the built-in set.
            pub fn is_custom(&self) -> bool {
                matches!(self, $name::Custom(_))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                match v {
                    $name::Custom(key) => key,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(key: String) -> Result<Self, Self::Error> {
                if key.is_empty() {
                    return Err(format!("{} key is empty", $label));
                }
                Ok(match key.as_str() {
                    $($str => $name::$variant,)+
                    _ => $name::Custom(key),
                })
            }
        }
    };
}
