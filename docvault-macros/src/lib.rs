//! Procedural macros for the docvault project.
//!
//! `#[derive(RecordFields)]` generates the field table the record store needs: which field holds
//! the identifier and which `String` fields are encrypted. Field attributes:
//!
//! - `#[record(id)]` marks the identifier field, an `Option<ObjectId>`. Without it, a field
//!   named `id` is used.
//! - `#[record(encrypt = "aes")]` marks a field for AES encryption. Only `String` fields are
//!   encrypted; the attribute is ignored on other types and for any other value.
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, RecordFields)]
//! pub struct Account {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[record(id)]
//!     pub id: Option<ObjectId>,
//!     #[record(encrypt = "aes")]
//!     pub iban: String,
//!     pub owner: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docvault_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, Type, parse_macro_input};

const AES: &str = "aes";

#[proc_macro_derive(RecordFields, attributes(record))]
pub fn derive_record_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_record_fields(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldOptions {
    id: bool,
    encrypt: Option<LitStr>,
}

impl FieldOptions {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut options = Self::default();

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    options.id = true;
                    Ok(())
                } else if meta.path.is_ident("encrypt") {
                    options.encrypt = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `id` or `encrypt = \"...\"`"))
                }
            })?;
        }

        Ok(options)
    }
}

fn is_string(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "String" && segment.arguments.is_none()),
        _ => false,
    }
}

fn expand_record_fields(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "RecordFields requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "RecordFields can only be derived for structs",
            ));
        }
    };

    let mut marked_id: Option<&Ident> = None;
    let mut named_id: Option<&Ident> = None;
    let mut encrypted: Vec<&Ident> = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let options = FieldOptions::parse(field)?;

        if options.id {
            if marked_id.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "only one field may be marked #[record(id)]",
                ));
            }
            marked_id = Some(ident);
        } else if ident == "id" {
            named_id = Some(ident);
        }

        if let Some(algorithm) = options.encrypt {
            if algorithm.value() == AES && is_string(&field.ty) {
                encrypted.push(ident);
            }
        }
    }

    let id = marked_id.or(named_id).ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "RecordFields requires an identifier field: mark it with #[record(id)] or name it `id`",
        )
    })?;

    let name = &input.ident;
    let names = encrypted.iter().map(|ident| ident.to_string());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docvault::record::RecordFields for #name #ty_generics #where_clause {
            fn id(&self) -> ::core::option::Option<&::docvault::bson::oid::ObjectId> {
                self.#id.as_ref()
            }

            fn set_id(&mut self, id: ::docvault::bson::oid::ObjectId) {
                self.#id = ::core::option::Option::Some(id);
            }

            #[allow(unused_variables)]
            fn visit_encrypted_fields(
                &mut self,
                visitor: &mut ::docvault::record::FieldVisitor<'_>,
            ) -> ::docvault::error::RecordStoreResult<()> {
                #( visitor(#names, &mut self.#encrypted)?; )*
                ::core::result::Result::Ok(())
            }
        }
    })
}
