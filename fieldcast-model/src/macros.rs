//! Declarative shorthand for plain replicated structs.

/// Declares a struct and derives its [`Replicated`](crate::Replicated) impl.
///
/// Every field type must implement `Display` and `FromStr`. The attribute a
/// field maps to defaults to the field name lower-cased; append
/// `=> "attribute"` to override it.
///
/// ```
/// use fieldcast_model::{replicated, Replicated};
///
/// replicated! {
///     #[derive(Debug, Default, Clone)]
///     pub struct User {
///         pub name: String,
///         pub email: String => "email_address",
///         pub logins: u32,
///     }
/// }
///
/// let user = User { name: "Alice".into(), email: String::new(), logins: 3 };
/// assert_eq!(user.field("logins").as_deref(), Some("3"));
/// assert_eq!(
///     user.schema().field_by_name("email").map(|f| f.attribute.as_str()),
///     Some("email_address"),
/// );
/// ```
#[macro_export]
macro_rules! replicated {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $fname:ident : $ftype:ty $(=> $attr:literal)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $fname: $ftype,
            )+
        }

        impl $crate::Replicated for $name {
            fn schema(&self) -> &'static $crate::ObjectSchema {
                static SCHEMA: ::std::sync::OnceLock<$crate::ObjectSchema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let builder = $crate::ObjectSchema::builder(stringify!($name));
                    $(
                        let builder = $crate::replicated!(@field builder, $fname $(, $attr)?);
                    )+
                    builder
                        .build()
                        .expect(concat!("invalid schema for ", stringify!($name)))
                })
            }

            fn field(&self, name: &str) -> ::std::option::Option<::std::string::String> {
                match name {
                    $(
                        stringify!($fname) => {
                            ::std::option::Option::Some(self.$fname.to_string())
                        }
                    )+
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(&mut self, name: &str, raw: &str) -> bool {
                match name {
                    $(
                        stringify!($fname) => match raw.parse() {
                            ::std::result::Result::Ok(value) => {
                                self.$fname = value;
                                true
                            }
                            ::std::result::Result::Err(_) => false,
                        },
                    )+
                    _ => false,
                }
            }
        }
    };

    (@field $builder:expr, $fname:ident) => {
        $builder.field(stringify!($fname))
    };
    (@field $builder:expr, $fname:ident, $attr:literal) => {
        $builder.field_as(stringify!($fname), $attr)
    };
}
