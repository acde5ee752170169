//! Macros shared across the crate.

/// Generates a closed field-category enum for one document family.
///
/// Each entry maps a variant to the raw category id emitted by the detector,
/// the line layout used to order its detections, and a short snake_case name
/// used in logs and error messages.
///
/// # Entry Format
///
/// ```text
/// VariantName = id => LayoutKind, "name",
/// ```
///
/// The generated enum gets `ALL` (in id order), `id()`, `from_id()`,
/// `layout()` and `name()`.
macro_rules! impl_field_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $variant:ident = $id:literal => $layout:ident, $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        $vis enum $name {
            $(
                $(#[doc = $doc])*
                $variant,
            )*
        }

        impl $name {
            /// Every category of the family, in ascending id order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Raw category id emitted by the detector.
            pub fn id(self) -> u8 {
                match self {
                    $($name::$variant => $id,)*
                }
            }

            /// Maps a raw detector label onto this family, if supported.
            pub fn from_id(id: i64) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// Line layout used when ordering detections of this category.
            pub fn layout(self) -> $crate::domain::LayoutKind {
                match self {
                    $($name::$variant => $crate::domain::LayoutKind::$layout,)*
                }
            }

            /// Short snake_case name of the category.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} (id {})", self.name(), self.id())
            }
        }
    };
}

pub(crate) use impl_field_enum;
