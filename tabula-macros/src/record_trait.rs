use crate::decode_field::FieldMetadata;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

pub(crate) fn record_trait(item: &ItemStruct, fields: &[FieldMetadata]) -> TokenStream {
    let struct_name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let names = fields.iter().map(|f| &f.name);
    let getters = fields.iter().map(|f| {
        let name = &f.name;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            #name => Some(<#ty as ::tabula::AsValue>::as_value(
                ::std::clone::Clone::clone(&self.#ident)
            )),
        }
    });
    let setters = fields.iter().map(|f| {
        let name = &f.name;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            #name => {
                self.#ident = <#ty as ::tabula::AsValue>::try_from_value(value).map_err(|e| {
                    e.context(format!(
                        "While assigning field `{}` of {}",
                        #name,
                        ::std::any::type_name::<Self>()
                    ))
                })?;
            }
        }
    });
    quote! {
        impl #impl_generics ::tabula::Record for #struct_name #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn field(&self, name: &str) -> Option<::tabula::Value> {
                match name {
                    #(#getters)*
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::tabula::Value,
            ) -> ::tabula::anyhow::Result<()> {
                match name {
                    #(#setters)*
                    _ => ::tabula::anyhow::bail!(
                        "{} has no field `{}`",
                        ::std::any::type_name::<Self>(),
                        name
                    ),
                }
                Ok(())
            }
        }
    }
}
