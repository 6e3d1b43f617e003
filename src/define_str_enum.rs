/// Defines an enum whose variants map one-to-one onto string literals.
///
/// The generated type gets `as_str`, `Display`, `FromStr` (case-insensitive,
/// surrounding whitespace ignored) and serde impls that go through the string
/// form, which is how the catalog stores these values.
///
/// ```
/// tarantool_space::define_str_enum! {
///     #[derive(Clone, Copy, Debug, PartialEq, Eq)]
///     pub enum Color {
///         Red = "red",
///         Green = "green",
///     }
///     FromStr::Err = UnknownColor;
/// }
///
/// #[derive(Debug)]
/// pub struct UnknownColor(String);
///
/// assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
/// assert_eq!(Color::Green.to_string(), "green");
/// ```
#[macro_export]
macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        pub enum $enum:ident { $($variant:ident = $str:literal,)+ }
        FromStr::Err = $err:ident;
    ) => {
        $(#[$meta])*
        pub enum $enum {
            $( #[doc = $str] $variant, )+
        }

        impl $enum {
            pub const VARIANTS: &'static [&'static str] = &[$($str),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }
        }

        impl ::std::convert::AsRef<str> for $enum {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl ::std::convert::From<$enum> for ::std::string::String {
            fn from(e: $enum) -> Self {
                e.as_str().into()
            }
        }

        impl ::std::str::FromStr for $enum {
            type Err = $err;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let s = s.trim().to_lowercase();
                match s.as_str() {
                    $( $str => ::std::result::Result::Ok(Self::$variant), )+
                    _ => ::std::result::Result::Err($err(s)),
                }
            }
        }

        impl ::std::fmt::Display for $enum {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::__serde::Serialize for $enum {
            #[inline]
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> $crate::__serde::Deserialize<'de> for $enum {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__serde::Deserializer<'de>,
            {
                use $crate::__serde::de::Error;
                let tmp = <String as $crate::__serde::Deserialize>::deserialize(deserializer)?;
                tmp.parse()
                    .map_err(|_| Error::unknown_variant(&tmp, Self::VARIANTS))
            }
        }
    }
}
