use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ parse_macro_input, LitStr };
use pipe_trait::Pipe ;

/// Expands a compact dependency graph description into a `( id, deps )` table.
///
/// Entries are separated by whitespace. `1d2,3` declares unit `m1` depending on
/// `m2` and `m3`; a bare number declares a unit without dependencies. Entries keep
/// their order, which is the order tests declare the units in.
/// ```ignore
/// let graph: &[( &str, &[&str] )] = &dep_graph!( "1d2,3 2d3 3" );
/// // [( "m1", &[ "m2", "m3" ]), ( "m2", &[ "m3" ]), ( "m3", &[] )]
/// ```
#[proc_macro]
pub fn dep_graph( input: TokenStream ) -> TokenStream {

    let description = parse_macro_input!( input as LitStr );

    match parse_graph( &description.value() ) {
        Ok( entries ) => entries
            .iter()
            .map(|( id, deps )| quote! { ( #id, &[ #( #deps ),* ] as &[&str] ) })
            .collect::<Vec<TokenStream2>>()
            .pipe(| entries | quote! { [ #( #entries ),* ] })
            .into(),
        Err( message ) => syn::Error::new( description.span(), message ).to_compile_error().into(),
    }

}

fn unit_name( number: &str ) -> Result<String, String> {
    match !number.is_empty() && number.bytes().all(| byte | byte.is_ascii_digit() ) {
        true => Ok( format!( "m{}", number )),
        false => Err( format!( "expected a unit number, found '{}'", number )),
    }
}

fn parse_graph( description: &str ) -> Result<Vec<( String, Vec<String> )>, String> {
    description
        .split_whitespace()
        .map(| entry | match entry.split_once( 'd' ) {
            None => Ok(( unit_name( entry )?, Vec::new() )),
            Some(( id, deps )) => Ok((
                unit_name( id )?,
                deps.split( ',' ).map( unit_name ).collect::<Result<Vec<_>, _>>()?,
            )),
        })
        .collect::<Result<Vec<_>, String>>()
        .and_then(| entries | match entries.is_empty() {
            true => Err( "empty dependency graph".to_string() ),
            false => Ok( entries ),
        })
}
