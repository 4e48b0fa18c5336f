//! Canonical unit identifiers.
//!
//! A [`UnitId`] is the normalized name of a unit inside a [`Context`]( crate::Context ).
//! Plain ids look like paths (`app/models/user`), plugin resource ids carry the
//! plugin's id as a prefix separated by the first unescaped `!` (`text!./readme`).

use std::borrow::Borrow ;



/// Unique identifier of a unit within a context.
///
/// Ids are produced by normalization and are therefore canonical: two requests
/// that normalize to the same `UnitId` address the same unit.
#[derive( Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord )]
pub struct UnitId( String );

impl UnitId {

	/// Wraps an already-normalized id.
	pub fn new( id: impl Into<String> ) -> Self { Self( id.into() )}

	/// The id as a string slice.
	#[inline] pub fn as_str( &self ) -> &str { &self.0 }

	/// Directory part of the id including the trailing `/`, used as the base for
	/// relative names required from this unit. Empty for top level ids.
	pub fn dir( &self ) -> &str {
		let path = match self.plugin_parts() {
			Some(( _, resource )) => resource,
			None => &self.0,
		};
		match path.rfind( '/' ) {
			Some( index ) => &path[ ..=index ],
			None => "",
		}
	}

	/// Splits a plugin resource id into `( plugin, resource )`.
	pub fn plugin_parts( &self ) -> Option<( &str, &str )> { split_plugin( &self.0 ) }

	/// The plugin id this resource id is produced by, if any.
	pub fn plugin( &self ) -> Option<UnitId> {
		self.plugin_parts().map(|( plugin, _ )| UnitId::new( plugin ))
	}

}

impl std::fmt::Display for UnitId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		std::fmt::Display::fmt( &self.0, f )
	}
}

impl From<&str> for UnitId {
	fn from( id: &str ) -> Self { Self( id.to_string() )}
}

impl From<String> for UnitId {
	fn from( id: String ) -> Self { Self( id )}
}

impl From<UnitId> for String {
	fn from( id: UnitId ) -> Self { id.0 }
}

impl AsRef<str> for UnitId {
	fn as_ref( &self ) -> &str { &self.0 }
}

impl Borrow<str> for UnitId {
	fn borrow( &self ) -> &str { &self.0 }
}

impl PartialEq<str> for UnitId {
	fn eq( &self, other: &str ) -> bool { self.0 == other }
}

impl PartialEq<&str> for UnitId {
	fn eq( &self, other: &&str ) -> bool { self.0 == *other }
}

/// Splits `name` at the first `!` that is not escaped with a backslash.
///
/// Returns `None` for names without a plugin prefix, including names whose
/// prefix would be empty.
pub fn split_plugin( name: &str ) -> Option<( &str, &str )> {
	let bytes = name.as_bytes();
	let mut escaped = false ;
	for ( index, byte ) in bytes.iter().enumerate() {
		match byte {
			b'\\' if !escaped => escaped = true,
			b'!' if !escaped => return match index {
				0 => None,
				_ => Some(( &name[ ..index ], &name[ index + 1.. ] )),
			},
			_ => escaped = false,
		}
	}
	None
}

#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn splits_at_the_first_unescaped_bang() {
		assert_eq!( split_plugin( "text!./readme" ), Some(( "text", "./readme" )));
		assert_eq!( split_plugin( "a!b!c" ), Some(( "a", "b!c" )));
		assert_eq!( split_plugin( "a\\!b!c" ), Some(( "a\\!b", "c" )));
		assert_eq!( split_plugin( "!b" ), None );
		assert_eq!( split_plugin( "plain/name" ), None );
	}

	#[test]
	fn directory_of_plain_and_plugin_ids() {
		assert_eq!( UnitId::new( "app/models/user" ).dir(), "app/models/" );
		assert_eq!( UnitId::new( "main" ).dir(), "" );
		assert_eq!( UnitId::new( "text!views/index.html" ).dir(), "views/" );
		assert_eq!( UnitId::new( "text!views/index.html" ).plugin(), Some( UnitId::new( "text" )));
	}

}
