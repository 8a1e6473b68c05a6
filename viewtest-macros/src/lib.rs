use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, Type};

/// Turns a function taking a view test fixture into a `#[test]`.
///
/// The fixture is built with `ViewTest::<Case>::setup()` right before the
/// body runs, so every test gets a fresh view and request factory.
///
/// # Example
///
/// ```ignore
/// use viewtest::prelude::*;
///
/// #[view_test(LoginCase)]
/// fn anonymous_users_see_the_form(case: &ViewTest<LoginCase>) {
///     let response = case.view().call(case.factory().get("/login/").build().unwrap());
///     case.assert_not_redirect(&response);
/// }
/// ```
///
/// The argument may also be taken by `&mut` or by value, and the function
/// may return a `Result` like any other test.
#[proc_macro_attribute]
pub fn view_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    view_test_core(attr.into(), item.into()).into()
}

fn view_test_core(
    attr: proc_macro2::TokenStream,
    item: proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    let case: syn::Path = match syn::parse2(attr) {
        Ok(path) => path,
        Err(_) => {
            return syn::Error::new(
                proc_macro2::Span::call_site(),
                "expected the test case type, e.g. #[view_test(MyCase)]",
            )
            .to_compile_error();
        }
    };
    let func: ItemFn = match syn::parse2(item) {
        Ok(func) => func,
        Err(e) => return e.to_compile_error(),
    };

    if let Some(asyncness) = &func.sig.asyncness {
        return syn::Error::new_spanned(asyncness, "#[view_test] functions must not be async")
            .to_compile_error();
    }

    let arg = match single_typed_arg(&func) {
        Some(arg) => arg,
        None => {
            return syn::Error::new_spanned(
                &func.sig,
                "#[view_test] functions take exactly one argument: the ViewTest fixture",
            )
            .to_compile_error();
        }
    };

    let pass_fixture = match &*arg.ty {
        Type::Reference(reference) if reference.mutability.is_some() => {
            quote! { &mut __viewtest_case }
        }
        Type::Reference(_) => quote! { &__viewtest_case },
        _ => quote! { __viewtest_case },
    };
    let binding = match &*arg.ty {
        Type::Reference(reference) if reference.mutability.is_some() => {
            quote! { let mut __viewtest_case }
        }
        _ => quote! { let __viewtest_case },
    };

    let attrs = &func.attrs;
    let vis = &func.vis;
    let name = &func.sig.ident;
    let output = &func.sig.output;
    let block = &func.block;

    quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() #output {
            fn __viewtest_body(#arg) #output #block

            #binding = ::viewtest::case::ViewTest::<#case>::setup();
            __viewtest_body(#pass_fixture)
        }
    }
}

fn single_typed_arg(func: &ItemFn) -> Option<&syn::PatType> {
    let mut inputs = func.sig.inputs.iter();
    match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(arg)), None) => Some(arg),
        _ => None,
    }
}
