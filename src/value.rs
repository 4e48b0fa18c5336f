//! Unit export values.
//!
//! Units export arbitrary host values. A [`Value`] is a cheap, shared, type-erased
//! handle to such a value; an [`Export`] is the deferred cell a unit's value is
//! published through once its definition has run.

use std::any::Any ;
use std::rc::Rc ;
use once_cell::unsync::OnceCell ;

use crate::plugin::Plugin ;



/// A shared, type-erased export value.
///
/// Cloning a `Value` clones the handle, not the underlying data, so identity is
/// preserved: every consumer of a unit observes the same value (see [`Value::ptr_eq`]).
#[derive( Clone )]
pub struct Value( Rc<dyn Any> );

impl Value {

	/// Wraps any `'static` value.
	pub fn new<T: Any>( value: T ) -> Self { Self( Rc::new( value ))}

	/// The empty value, exported by units that finish loading without defining anything.
	pub fn unit() -> Self { Self::new(()) }

	/// Wraps a plugin so that the unit exporting it can serve `prefix!name` requests.
	pub fn plugin( plugin: impl Plugin + 'static ) -> Self {
		Self::new( Rc::new( plugin ) as Rc<dyn Plugin> )
	}

	/// Borrows the value as `T` if it has that type.
	pub fn downcast_ref<T: Any>( &self ) -> Option<&T> { self.0.downcast_ref::<T>() }

	/// Returns a shared handle to the value as `T` if it has that type.
	pub fn downcast<T: Any>( &self ) -> Option<Rc<T>> { Rc::clone( &self.0 ).downcast::<T>().ok() }

	/// Whether the value holds a `T`.
	pub fn is<T: Any>( &self ) -> bool { self.0.is::<T>() }

	/// The plugin this value carries, if it was created with [`Value::plugin`].
	pub fn as_plugin( &self ) -> Option<Rc<dyn Plugin>> { self.downcast_ref::<Rc<dyn Plugin>>().cloned() }

	/// Whether both handles point to the same value.
	pub fn ptr_eq( &self, other: &Value ) -> bool { Rc::ptr_eq( &self.0, &other.0 ) }

}

impl std::fmt::Debug for Value {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self.as_plugin() {
			Some( _ ) => f.write_str( "Value(<plugin>)" ),
			None => f.write_str( "Value(..)" ),
		}
	}
}

/// A deferred handle to a unit's export.
///
/// Every unit owns exactly one `Export` per lifecycle. The handle exists before the
/// unit's definition has run and is populated exactly once when the unit becomes
/// ready. Units evaluated ahead of a dependency to break a cycle receive that
/// dependency's handle while it is still empty and observe the value once it lands.
#[derive( Clone, Default )]
pub struct Export( Rc<OnceCell<Value>> );

impl Export {

	pub(crate) fn new() -> Self { Self::default() }

	/// The exported value, if the unit has been evaluated.
	pub fn get( &self ) -> Option<&Value> { self.0.get() }

	/// A clone of the exported value, if the unit has been evaluated.
	pub fn value( &self ) -> Option<Value> { self.0.get().cloned() }

	/// Whether the unit has published its value.
	pub fn is_ready( &self ) -> bool { self.0.get().is_some() }

	/// Whether both handles belong to the same unit lifecycle.
	pub fn ptr_eq( &self, other: &Export ) -> bool { Rc::ptr_eq( &self.0, &other.0 ) }

	pub(crate) fn publish( &self, value: Value ) -> Result<(), Value> { self.0.set( value ) }

}

impl std::fmt::Debug for Export {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_tuple( "Export" ).field( &self.0.get() ).finish()
	}
}
