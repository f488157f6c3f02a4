use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, LitStr, parse_macro_input};

/// Implements `weir_base::ConfigSection` for a struct or enum.
///
/// ```rust,ignore
/// #[config_section("database")]
/// #[derive(Deserialize)]
/// struct DatabaseConfig {
///     url: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn config_section(args: TokenStream, input: TokenStream) -> TokenStream {
    let key_arg = parse_macro_input!(args as LitStr);
    let item = parse_macro_input!(input as DeriveInput);

    let key = key_arg.value();
    if key.is_empty() {
        return Error::new(key_arg.span(), "Config section key cannot be empty")
            .to_compile_error()
            .into();
    }

    let ident = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    quote! {
        #item

        impl #impl_generics ::weir_base::ConfigSection for #ident #ty_generics #where_clause {
            fn key() -> &'static str {
                #key
            }
        }
    }
    .into()
}
