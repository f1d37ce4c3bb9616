//! Core macros
//!
//! Helpers that cut down on repeated boilerplate.

/// Implements `Default` for a struct from a list of field values.
///
/// ```rust
/// use script_bindings::impl_default;
///
/// struct Limits {
///     depth: u32,
///     label: String,
/// }
///
/// impl_default!(Limits {
///     depth: 8,
///     label: String::new(),
/// });
///
/// assert_eq!(Limits::default().depth, 8);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
