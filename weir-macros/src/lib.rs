use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};

use syn::ext::IdentExt as _;
use syn::spanned::Spanned as _;
use syn::{
    Error, FnArg, GenericArgument, ItemFn, Pat, PathArguments, ReturnType, Type, Visibility,
};

/// Turns a function into an injectable unit struct of the same name.
///
/// Every parameter becomes a named `weir::Param` of its type; reference parameters
/// `&T` borrow a `T` from the state instead of cloning it. A function returning
/// `Result<T, E>` produces `T` and fails with `E`.
#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return TokenStream::from(
            Error::new(Span::call_site(), "#[injectable] does not take arguments")
                .to_compile_error(),
        );
    }
    match syn::parse::<ItemFn>(item) {
        Ok(item_fn) => handle_injectable_fn(item_fn),
        Err(_) => TokenStream::from(
            Error::new(
                Span::call_site(),
                "#[injectable] can only be applied to functions",
            )
            .to_compile_error(),
        ),
    }
}

fn handle_injectable_fn(input: ItemFn) -> TokenStream {
    let ident = &input.sig.ident;
    let vis = &input.vis;
    let name = ident.to_string();

    if !input.sig.generics.params.is_empty() {
        return TokenStream::from(
            Error::new(
                input.sig.generics.span(),
                "Generic functions are not supported",
            )
            .to_compile_error(),
        );
    }

    let return_type = match &input.sig.output {
        ReturnType::Default => syn::parse_quote! { () },
        ReturnType::Type(_, ty) => ty.as_ref().clone(),
    };
    let (output_type, is_result) = extract_output_type(&return_type);

    let mut params = Vec::new();
    let mut arg_lets = Vec::new();
    let mut arg_names = Vec::new();

    for (i, fn_arg) in input.sig.inputs.iter().enumerate() {
        let pat_type = match fn_arg {
            FnArg::Receiver(_) => {
                return TokenStream::from(
                    Error::new(fn_arg.span(), "Injectable functions cannot take self")
                        .to_compile_error(),
                );
            }
            FnArg::Typed(pat_type) => pat_type,
        };
        let param_name = match pat_type.pat.as_ref() {
            Pat::Ident(pat_ident) => pat_ident.ident.unraw().to_string(),
            _ => {
                return TokenStream::from(
                    Error::new(pat_type.pat.span(), "Only simple bindings supported")
                        .to_compile_error(),
                );
            }
        };
        let arg_name = format_ident!("arg{i}");
        match pat_type.ty.as_ref() {
            Type::Reference(ref_ty) => {
                if ref_ty.mutability.is_some() {
                    return TokenStream::from(
                        Error::new(ref_ty.span(), "Mutable references cannot be injected")
                            .to_compile_error(),
                    );
                }
                let inner_ty = &ref_ty.elem;
                params.push(quote! { ::weir::Param::new::<#inner_ty>(#param_name) });
                arg_lets.push(quote! {
                    let #arg_name = args.next_ref::<#inner_ty>()?;
                });
            }
            Type::ImplTrait(_) => {
                return TokenStream::from(
                    Error::new(pat_type.ty.span(), "impl Trait parameters are not supported")
                        .to_compile_error(),
                );
            }
            arg_ty => {
                params.push(quote! { ::weir::Param::new::<#arg_ty>(#param_name) });
                arg_lets.push(quote! {
                    let #arg_name = args.next::<#arg_ty>()?;
                });
            }
        }
        arg_names.push(arg_name);
    }

    // The original function moves into the generated `call` under its own name.
    let mut inner_fn = input.clone();
    inner_fn.vis = Visibility::Inherited;
    inner_fn.attrs.retain(|attr| !attr.path().is_ident("doc"));
    let docs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .collect();

    let method_call = if input.sig.asyncness.is_some() {
        quote! { #ident(#(#arg_names),*).await }
    } else {
        quote! { #ident(#(#arg_names),*) }
    };

    let call_body = if is_result {
        quote! {
            #(#arg_lets)*
            #method_call.map_err(::std::convert::Into::<::weir::StdError>::into)
        }
    } else {
        quote! {
            #(#arg_lets)*
            ::std::result::Result::Ok(#method_call)
        }
    };

    let args_pat = if arg_names.is_empty() {
        quote! { _args }
    } else {
        quote! { mut args }
    };

    quote! {
        #(#docs)*
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #vis struct #ident;

        impl ::weir::Injectable for #ident {
            type Output = #output_type;

            fn params(&self) -> ::std::vec::Vec<::weir::Param> {
                ::std::vec![#(#params),*]
            }

            async fn call(
                &self,
                #args_pat: ::weir::Args<'_>,
            ) -> ::std::result::Result<Self::Output, ::weir::StdError> {
                #inner_fn
                #call_body
            }

            fn name(&self) -> &'static str {
                ::std::concat!(::std::module_path!(), "::", #name)
            }
        }
    }
    .into()
}

fn extract_output_type(ty: &Type) -> (Type, bool) {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Result"
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return (inner.clone(), true);
    }
    (ty.clone(), false)
}
