//! A dependency-driven dynamic unit loader.
//!
//! Units are named pieces of code or data whose dependencies are discovered
//! incrementally, as each unit's resource is fetched and parsed. `unit_link` resolves
//! their canonical identities, schedules loading and evaluation, and runs every
//! unit's definition at most once, including across mutual dependency cycles.
//!
//! # Core Concepts
//!
//! - [`Context`]: An isolated namespace of units with its own configuration and
//! 	[`Loader`]. Nothing is global; independent contexts share nothing.
//!
//! - [`Loader`]: The host's I/O adapter. It receives a [`LoadRequest`] per unit and
//! 	settles it through a [`Completion`], synchronously or later on. [`MemoryLoader`]
//! 	serves units registered in memory.
//!
//! - [`Resource`]: What a loaded unit consists of: raw dependency names in declaration
//! 	order and a [`Definition`], either a ready [`Value`] or a factory run once every
//! 	dependency is ready.
//!
//! - [`Plugin`]: A unit export that produces other units. A name `prefix!name` is
//! 	normalized and loaded by the plugin exported by unit `prefix`.
//!
//! - [`Export`]: The deferred handle a unit publishes its value through. Units
//! 	evaluated ahead of a dependency to break a cycle see the dependency's handle
//! 	before it is populated.
//!
//! # Lifecycle
//!
//! A unit moves from [`UnitState::Pending`] through `Loading` and `LoadedWaiting` to
//! `Ready`, or ends up in `Error`. Pausing a context ([`Context::pause`]) holds back
//! loads and evaluation so that a batch of definitions can be made before any of it
//! runs; the outermost [`Context::unpause`] evaluates the batch in dependency order,
//! earliest declared first.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc ;
//! use std::cell::RefCell ;
//! use unit_link::{ Context, Definition, MemoryLoader, Value };
//!
//! let context = Context::new( MemoryLoader::new() );
//! let order = Rc::new( RefCell::new( Vec::new() ));
//!
//! context.pause();
//! for ( name, deps ) in [( "m1", vec![ "m2" ]), ( "m2", vec![] ), ( "m3", vec![] )] {
//! 	let order = Rc::clone( &order );
//! 	context.define( name, deps, Definition::factory( move | scope | {
//! 		order.borrow_mut().push( scope.id().to_string() );
//! 		Ok( Value::unit() )
//! 	}))?;
//! }
//! assert!( order.borrow().is_empty() );
//!
//! context.unpause()?;
//! assert_eq!( *order.borrow(), [ "m2", "m1", "m3" ]);
//! # Ok::<(), unit_link::LoadError>(())
//! ```

mod config ;
mod context ;
mod definition ;
mod error ;
mod graph ;
pub mod loader ;
mod plugin ;
mod registry ;
mod requirer ;
mod resolver ;
mod scheduler ;
mod unit ;
mod unit_id ;
mod value ;

#[doc( no_inline )]
pub use nonempty_collections::NEVec ;

pub use config::{ Config, PackageSpec, ShimExports, ShimSpec };
pub use context::{ Context, Contexts };
pub use definition::{ Definition, Factory, Resource };
pub use error::{ BoxError, LoadError, SharedError };
pub use loader::{ Completion, LoadRequest, Loader };
pub use loader::memory::{ Delivery, MemoryLoader };
pub use plugin::{ Normalizer, Plugin };
pub use requirer::{ Requirer, Scope };
pub use unit::UnitState ;
pub use unit_id::{ UnitId, split_plugin };
pub use value::{ Export, Value };
