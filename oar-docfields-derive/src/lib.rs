//! Procedural derive macros for oar-docfields.
//!
//! Currently this crate provides a single derive, [`ConfigValidator`], which
//! generates field range checks for the tunable configuration structs of the
//! field post-processing pipeline.

use darling::{FromDeriveInput, FromField, FromMeta, ast};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, Type, parse_macro_input};

/// Parsed arguments for the `range(min, max)` validator.
#[derive(Debug, FromMeta)]
struct RangeArgs {
    min: Expr,
    max: Expr,
}

/// All supported validators that can be applied to a field.
#[derive(Debug, Default, FromMeta)]
struct Validators {
    /// `#[validate(range(min = expr, max = expr))]` - value must be in [min, max]
    #[darling(default)]
    range: Option<RangeArgs>,

    /// `#[validate(max = expr)]` - value must be <= expr
    #[darling(default)]
    max: Option<Expr>,
}

/// A single field with its validation rules.
#[derive(Debug, FromField)]
#[darling(attributes(validate))]
struct ValidatedField {
    ident: Option<syn::Ident>,
    #[allow(dead_code)]
    ty: Type,
    #[darling(flatten)]
    validators: Validators,
}

/// The input struct for ConfigValidator derive.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(validate), supports(struct_named))]
struct ConfigValidatorInput {
    ident: syn::Ident,
    data: ast::Data<(), ValidatedField>,
}

/// Derive macro for implementing the `ConfigValidator` trait.
///
/// Validation rules are specified with `#[validate(...)]` on fields. The
/// generated `get_defaults` delegates to `Default`, so the struct must
/// implement it.
///
/// # Supported Validators
///
/// - `#[validate(range(min = value, max = value))]` - the value must lie in `[min, max]`
/// - `#[validate(max = value)]` - the value must be at most `value`
///
/// # Example
///
/// ```rust,ignore
/// use oar_docfields_derive::ConfigValidator;
///
/// #[derive(ConfigValidator, Default)]
/// pub struct SequencerConfig {
///     #[validate(range(min = 0.0, max = 200.0))]
///     pub line_tolerance: f32,
/// }
/// ```
#[proc_macro_derive(ConfigValidator, attributes(validate))]
pub fn derive_config_validator(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    ConfigValidatorInput::from_derive_input(&input)
        .and_then(|parsed| generate_config_validator(&parsed))
        .unwrap_or_else(|err| err.write_errors())
        .into()
}

fn generate_config_validator(
    input: &ConfigValidatorInput,
) -> darling::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Some(fields) = input.data.as_ref().take_struct() else {
        return Err(darling::Error::custom(
            "ConfigValidator can only be derived for structs with named fields",
        ));
    };

    let validations: Vec<_> = fields
        .iter()
        .filter_map(|field| generate_field_validation(field))
        .collect();

    Ok(quote! {
        impl crate::core::config::ConfigValidator for #name {
            fn validate(&self) -> Result<(), crate::core::config::ConfigError> {
                #(#validations)*
                Ok(())
            }

            fn get_defaults() -> Self
            where
                Self: Sized,
            {
                Self::default()
            }
        }
    })
}

fn generate_field_validation(field: &ValidatedField) -> Option<proc_macro2::TokenStream> {
    let field_name = field.ident.as_ref()?;
    let field_name_str = field_name.to_string();
    let validators = &field.validators;

    let mut validations = Vec::new();

    if let Some(range) = &validators.range {
        let min_expr = &range.min;
        let max_expr = &range.max;
        validations.push(quote! {
            if !(#min_expr..=#max_expr).contains(&self.#field_name) {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!(
                        "{} must be between {} and {}, got {}",
                        #field_name_str,
                        #min_expr,
                        #max_expr,
                        self.#field_name
                    ),
                });
            }
        });
    }

    if let Some(max_expr) = &validators.max {
        validations.push(quote! {
            if self.#field_name > #max_expr {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!("{} must be at most {}", #field_name_str, #max_expr),
                });
            }
        });
    }

    if validations.is_empty() {
        None
    } else {
        Some(quote! { #(#validations)* })
    }
}
