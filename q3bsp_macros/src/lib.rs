use quote::quote;
use syn::*;

/// Automatically implements `BspValue` on structs in the order of the fields.
///
/// Struct fields are read back to back with no padding, so the derived `bsp_struct_size` is the sum of the field sizes,
/// which is what the lump reader uses to check that a lump holds a whole number of records.
#[proc_macro_derive(BspValue)]
pub fn bsp_value_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let ident = input.ident;

	let (bsp_parse_contents, bsp_struct_size_contents) = match input.data {
		Data::Struct(data) => match data.fields {
			Fields::Named(fields) => {
				let types = fields.named.iter().map(|field| &field.ty);
				let field_names = fields.named.iter().map(|field| field.ident.as_ref().expect("Ident required"));

				(
					quote! {
						Ok(Self {
							#(
								#field_names: ::q3bsp::BspParseResultDoingJobExt::job(::q3bsp::reader::BspValue::bsp_parse(reader), concat!(
									"Reading field \"",
										stringify!(#field_names),
										"\" on type ",
										stringify!(#ident)
								))?,
							)*
						})
					},
					quote! { #(<#types as ::q3bsp::reader::BspValue>::bsp_struct_size(ctx) + )* 0 },
				)
			}
			Fields::Unnamed(_) => panic!("Tuple structs not supported"),
			Fields::Unit => panic!("Unit structs not supported"),
		},
		_ => panic!("Only structs with named fields are supported"),
	};

	quote! {
		impl ::q3bsp::reader::BspValue for #ident {
			fn bsp_parse(reader: &mut ::q3bsp::reader::BspByteReader) -> ::q3bsp::BspResult<Self> {
				#bsp_parse_contents
			}
			fn bsp_struct_size(ctx: &::q3bsp::reader::BspParseContext) -> usize {
				#bsp_struct_size_contents
			}
		}
	}
	.into()
}
