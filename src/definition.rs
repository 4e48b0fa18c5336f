//! What a unit is made of once its resource has been parsed.

use crate::{ BoxError, Scope, Value };



/// A unit's definition function. Runs at most once per unit lifecycle, after every
/// dependency is ready (or has been deferred to break a cycle).
pub type Factory = Box<dyn FnOnce( &Scope ) -> Result<Value, BoxError>> ;

/// How a unit produces its export.
pub enum Definition {
	/// The unit exports a ready-made value.
	Value( Value ),
	/// The unit exports whatever its factory returns.
	Factory( Factory ),
}

impl Definition {

	/// Convenience constructor for [`Definition::Factory`].
	pub fn factory( factory: impl FnOnce( &Scope ) -> Result<Value, BoxError> + 'static ) -> Self {
		Self::Factory( Box::new( factory ))
	}

	/// Convenience constructor for [`Definition::Value`].
	pub fn value<T: 'static>( value: T ) -> Self { Self::Value( Value::new( value ))}

}

impl From<Value> for Definition {
	fn from( value: Value ) -> Self { Self::Value( value )}
}

impl std::fmt::Debug for Definition {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Value( value ) => f.debug_tuple( "Value" ).field( value ).finish(),
			Self::Factory( _ ) => f.write_str( "Factory(<closure>)" ),
		}
	}
}

/// A parsed unit resource as reported by a [`Loader`]( crate::Loader ): the raw
/// names of its dependencies, in declaration order, and its definition.
///
/// Dependency names may be relative (`./sibling`) or plugin-prefixed; they are
/// normalized against the unit's own id.
#[derive( Debug )]
pub struct Resource {
	pub(crate) deps: Vec<String>,
	pub(crate) definition: Definition,
}

impl Resource {

	/// A resource declaring `deps` and defined by `definition`.
	pub fn new(
		deps: impl IntoIterator<Item = impl Into<String>>,
		definition: impl Into<Definition>,
	) -> Self {
		Self {
			deps: deps.into_iter().map( Into::into ).collect(),
			definition: definition.into(),
		}
	}

	/// A dependency-free resource exporting `value`.
	pub fn value( value: Value ) -> Self {
		Self { deps: Vec::with_capacity( 0 ), definition: Definition::Value( value )}
	}

	/// A resource whose factory receives `deps` through its [`Scope`].
	pub fn factory(
		deps: impl IntoIterator<Item = impl Into<String>>,
		factory: impl FnOnce( &Scope ) -> Result<Value, BoxError> + 'static,
	) -> Self {
		Self::new( deps, Definition::factory( factory ))
	}

	/// Raw dependency names in declaration order.
	pub fn deps( &self ) -> &[String] { &self.deps }

}
