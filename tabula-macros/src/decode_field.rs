use syn::{Field, Ident, Result, Type};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) skip: bool,
}

/// Reads a named field and its `#[record(..)]` attributes.
pub(crate) fn decode_field(field: &Field) -> Result<FieldMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(
            field,
            "Record can only be derived for structs with named fields",
        ));
    };
    let mut metadata = FieldMetadata {
        name: ident.to_string().trim_start_matches("r#").to_string(),
        ident,
        ty: field.ty.clone(),
        skip: false,
    };
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                metadata.skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown record attribute, expected `skip`"))
            }
        })?;
    }
    Ok(metadata)
}
