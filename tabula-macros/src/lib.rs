mod decode_field;
mod record_trait;

use decode_field::decode_field;
use proc_macro::TokenStream;
use record_trait::record_trait;
use syn::{Fields, ItemStruct, parse_macro_input};

/// Implements `tabula::Record` for a struct with named fields.
///
/// Every field takes part in the mapping unless marked `#[record(skip)]`. Field types
/// must implement `tabula::AsValue` and the struct must implement `Default`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let Fields::Named(named) = &item.fields else {
        return syn::Error::new_spanned(
            &item.ident,
            "Record can only be derived for structs with named fields",
        )
        .to_compile_error()
        .into();
    };
    let fields = match named
        .named
        .iter()
        .map(decode_field)
        .collect::<syn::Result<Vec<_>>>()
    {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };
    let fields: Vec<_> = fields.into_iter().filter(|f| !f.skip).collect();
    record_trait(&item, &fields).into()
}
