//! Derive macro for `tagplan::Schema`. See the `tagplan` crate for the
//! attribute reference.
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, GenericParam, Ident, LitStr, Token,
    Visibility, parse_macro_input, parse_quote,
};

static SCHEMA_ATTRIBUTE_NAME: &str = "schema";

/// Derives `tagplan::Schema` for a struct.
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ContainerAttrs {
    initialize: bool,
    validate: bool,
    text: bool,
    from_str: bool,
    json: bool,
    dict: bool,
    name: Option<LitStr>,
}

impl ContainerAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(SCHEMA_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                    return Ok(());
                }
                let flag = if meta.path.is_ident("initialize") {
                    &mut out.initialize
                } else if meta.path.is_ident("validate") {
                    &mut out.validate
                } else if meta.path.is_ident("text") {
                    &mut out.text
                } else if meta.path.is_ident("from_str") {
                    &mut out.from_str
                } else if meta.path.is_ident("json") {
                    &mut out.json
                } else if meta.path.is_ident("dict") {
                    &mut out.dict
                } else {
                    return Err(meta.error("unknown schema attribute on a struct"));
                };
                *flag = true;
                Ok(())
            })?;
        }
        if out.text && out.from_str {
            return Err(Error::new_spanned(
                &attrs[0],
                "`text` and `from_str` both register a text decoder, pick one",
            ));
        }
        Ok(out)
    }

    fn hooks(&self) -> TokenStream2 {
        let mut calls = Vec::new();
        if self.initialize {
            calls.push(quote!(.initializer()));
        }
        if self.validate {
            calls.push(quote!(.validator()));
        }
        if self.text {
            calls.push(quote!(.text()));
        }
        if self.from_str {
            calls.push(quote!(.text_from_str()));
        }
        if self.json {
            calls.push(quote!(.json()));
        }
        if self.dict {
            calls.push(quote!(.dict()));
        }
        if calls.is_empty() {
            return TokenStream2::new();
        }
        quote! {
            fn hooks() -> ::tagplan::Hooks<Self> {
                ::tagplan::Hooks::new() #(#calls)*
            }
        }
    }
}

#[derive(Default)]
struct FieldAttrs {
    modifiers: Vec<TokenStream2>,
    method: Option<(LitStr, Ident)>,
}

impl FieldAttrs {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in field
            .attrs
            .iter()
            .filter(|a| a.path().is_ident(SCHEMA_ATTRIBUTE_NAME))
        {
            attr.parse_nested_meta(|meta| {
                let Some(key) = meta.path.get_ident().map(IdentExt::unraw) else {
                    return Err(meta.error("expected a metadata key"));
                };
                if key == "tag" {
                    let raw: LitStr = meta.value()?.parse()?;
                    out.modifiers.push(quote!(.tag(#raw)));
                } else if key == "or_method" {
                    let name: LitStr = meta.value()?.parse()?;
                    let method: Ident = name.parse()?;
                    out.modifiers.push(quote!(.attr(::tagplan::tags::OR_METHOD, #name)));
                    out.method = Some((name, method));
                } else if meta.input.peek(Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    let key = key.to_string();
                    out.modifiers.push(quote!(.attr(#key, #value)));
                } else {
                    let key = key.to_string();
                    out.modifiers.push(quote!(.attr(#key, "")));
                }
                Ok(())
            })?;
        }
        if !matches!(field.vis, Visibility::Public(_)) {
            out.modifiers.push(quote!(.private()));
        }
        Ok(out)
    }
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let container = ContainerAttrs::parse(&input.attrs)?;
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "Schema can only be derived for structs",
        ));
    };

    let ident = &input.ident;
    let (kind, compile) = match &data.fields {
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let inner = &fields.unnamed[0].ty;
            (
                quote!(<#inner as ::tagplan::Schema>::kind()),
                quote!(compiler.newtype::<Self, #inner>(site, |record: &mut Self| &mut record.0)),
            )
        }
        Fields::Unnamed(fields) if !fields.unnamed.is_empty() => {
            return Err(Error::new_spanned(
                fields,
                "Schema needs named fields, or a single unnamed field",
            ));
        }
        Fields::Unnamed(_) | Fields::Unit => (
            quote!(::tagplan::Kind::Record),
            quote!(compiler.record(site, ::tagplan::RecordShape::<Self>::new())),
        ),
        Fields::Named(fields) => {
            let mut shape = Vec::new();
            let mut methods: Vec<(LitStr, Ident)> = Vec::new();
            for field in &fields.named {
                let attrs = FieldAttrs::parse(field)?;
                let Some(field_ident) = &field.ident else {
                    continue;
                };
                let name = field_ident.unraw().to_string();
                let ty = &field.ty;
                let modifiers = &attrs.modifiers;
                shape.push(quote! {
                    .field(
                        ::tagplan::FieldShape::<Self>::new::<#ty>(
                            #name,
                            |record: &mut Self| &mut record.#field_ident,
                        )
                        #(#modifiers)*
                    )
                });
                if let Some((lit, method)) = attrs.method {
                    if !methods.iter().any(|(known, _)| known.value() == lit.value()) {
                        methods.push((lit, method));
                    }
                }
            }
            let methods = methods
                .iter()
                .map(|(lit, method)| quote!(.method(::tagplan::Method::new(#lit, Self::#method))));
            (
                quote!(::tagplan::Kind::Record),
                quote! {
                    let shape = ::tagplan::RecordShape::<Self>::new()
                        #(#shape)*
                        #(#methods)*;
                    compiler.record(site, shape)
                },
            )
        }
    };

    let params: Vec<Ident> = input
        .generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(param) => Some(param.ident.clone()),
            _ => None,
        })
        .collect();
    let type_name = match &container.name {
        Some(name) => quote!(::std::string::String::from(#name)),
        None if params.is_empty() => {
            let name = ident.unraw().to_string();
            quote!(::std::string::String::from(#name))
        }
        None => {
            let name = ident.unraw().to_string();
            quote! {
                ::std::format!(
                    "{}<{}>",
                    #name,
                    [#(<#params as ::tagplan::Schema>::type_name()),*].join(", ")
                )
            }
        }
    };

    let hooks = container.hooks();
    let where_clause = input.generics.make_where_clause();
    for param in &params {
        where_clause
            .predicates
            .push(parse_quote!(#param: ::tagplan::Schema));
    }
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::tagplan::Schema for #ident #ty_generics #where_clause {
            fn type_name() -> ::std::string::String {
                #type_name
            }

            fn kind() -> ::tagplan::Kind {
                #kind
            }

            #hooks

            fn compile(
                compiler: &mut ::tagplan::Compiler<'_>,
                site: &::tagplan::Site<'_>,
            ) -> ::core::result::Result<::tagplan::Plan<Self>, ::tagplan::ConfigError> {
                #compile
            }
        }
    })
}
