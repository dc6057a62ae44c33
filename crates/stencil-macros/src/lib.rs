use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, Ident, LitStr, Token};

/// `key = <expr>, "<markup with {} holes>", values...`
struct TemplateInput {
    key: Option<Expr>,
    markup: LitStr,
    values: Vec<Expr>,
}

impl Parse for TemplateInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut key = None;
        if input.peek(Ident) && input.peek2(Token![=]) {
            let name: Ident = input.parse()?;
            if name != "key" {
                return Err(syn::Error::new(name.span(), "expected `key = ...`"));
            }
            input.parse::<Token![=]>()?;
            key = Some(input.parse()?);
            input.parse::<Token![,]>()?;
        }
        let markup: LitStr = input.parse()?;
        let mut values = Vec::new();
        if !input.is_empty() {
            input.parse::<Token![,]>()?;
            let rest = Punctuated::<Expr, Token![,]>::parse_terminated(input)?;
            values.extend(rest);
        }
        Ok(Self {
            key,
            markup,
            values,
        })
    }
}

/// Splits template markup on `{}` holes. `{{` and `}}` stand for literal
/// braces.
fn split_fragments(markup: &str) -> Result<Vec<String>, String> {
    let mut fragments = vec![String::new()];
    let mut chars = markup.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some('{') => push(&mut fragments, '{'),
                Some('}') => fragments.push(String::new()),
                _ => return Err("unmatched `{` in template; write `{{` for a literal brace".into()),
            },
            '}' => match chars.next() {
                Some('}') => push(&mut fragments, '}'),
                _ => return Err("unmatched `}` in template; write `}}` for a literal brace".into()),
            },
            other => push(&mut fragments, other),
        }
    }
    Ok(fragments)
}

fn push(fragments: &mut [String], c: char) {
    if let Some(last) = fragments.last_mut() {
        last.push(c);
    }
}

fn expand(input: TemplateInput, namespace: TokenStream2) -> TokenStream2 {
    let fragments = match split_fragments(&input.markup.value()) {
        Ok(fragments) => fragments,
        Err(message) => return syn::Error::new(input.markup.span(), message).to_compile_error(),
    };
    if fragments.len() != input.values.len() + 1 {
        let message = format!(
            "template has {} holes but {} values were given",
            fragments.len() - 1,
            input.values.len()
        );
        return syn::Error::new(input.markup.span(), message).to_compile_error();
    }

    let count = fragments.len();
    let values = &input.values;
    let keyed = input.key.map(|key| quote! { .keyed(#key) });
    quote! {
        {
            static __STENCIL_STRINGS: [&str; #count] = [#(#fragments),*];
            ::stencil_core::Invocation::new(
                ::stencil_core::Strings::Static(&__STENCIL_STRINGS),
                ::std::vec![#(::stencil_core::Value::from(#values)),*],
                #namespace,
            )
            #keyed
        }
    }
}

/// Builds an HTML [`Invocation`] from a template literal with `{}` holes.
///
/// ```ignore
/// let row = html!(key = id, "<li class={}>{}</li>", class, label);
/// ```
///
/// Every call site owns one static fragment array, so repeated calls share a
/// compiled blueprint.
#[proc_macro]
pub fn html(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as TemplateInput);
    expand(input, quote! { ::stencil_core::Namespace::Html }).into()
}

/// Like [`html!`], parsing the markup in the SVG namespace.
#[proc_macro]
pub fn svg(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as TemplateInput);
    expand(input, quote! { ::stencil_core::Namespace::Svg }).into()
}
