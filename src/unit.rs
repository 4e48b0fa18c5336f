//! Unit records and their lifecycle.
//!
//! ```text
//! Pending ──▶ Loading ──▶ LoadedWaiting ──▶ Ready
//!    │           │              │
//!    └───────────┴──────────────┴──▶ Error
//! (any non-terminal state) ──▶ Unloaded
//! ```

use std::collections::HashSet ;

use crate::{ Definition, Export, LoadError, UnitId, Value };



/// Lifecycle state of a unit.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum UnitState {
	/// Referenced but not yet handed to the loader (or to its plugin).
	Pending,
	/// The resource is being fetched.
	Loading,
	/// Dependencies and definition are known; waiting to be evaluated.
	LoadedWaiting,
	/// The definition ran and the export is published.
	Ready,
	/// Loading or evaluation failed.
	Error,
	/// Removed from its context.
	Unloaded,
}

impl UnitState {

	/// Whether the lifecycle permits moving from `self` to `to`.
	pub fn can_transition( self, to: UnitState ) -> bool {
		use UnitState::* ;
		matches!(( self, to ),
			( Pending, Loading )
			| ( Pending | Loading, LoadedWaiting )
			| ( LoadedWaiting, Ready )
			| ( Pending | Loading | LoadedWaiting, Error )
			| ( Pending | Loading | LoadedWaiting | Ready | Error, Unloaded )
		)
	}

	/// Ready and Error are settled: waiters registered on them resolve immediately.
	pub fn is_settled( self ) -> bool { matches!( self, Self::Ready | Self::Error ) }

}

impl std::fmt::Display for UnitState {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// Continuation resumed when a unit settles.
pub(crate) type Waiter = Box<dyn FnOnce( Result<Value, LoadError> )> ;

/// Hook run when a unit is unloaded.
pub(crate) type UnloadHook = Box<dyn FnOnce( &UnitId )> ;

/// A plugin resource request whose suffix could not be normalized by the plugin
/// yet because the plugin was not ready. The unit lives under a provisional id
/// until the plugin normalizes `name` against `dir`.
#[derive( Clone, Debug )]
pub(crate) struct PluginRequest {
	pub name: String,
	pub dir: String,
}

pub(crate) struct Unit {
	pub id: UnitId,
	/// Distinguishes lifecycles of the same id across unload and rebuild.
	/// Also orders creation within a context.
	pub generation: u64,
	pub state: UnitState,
	/// Declaration order, assigned when the definition becomes known.
	pub seq: Option<u64>,
	pub deps: Vec<UnitId>,
	/// Dependencies this unit no longer waits for because waiting would deadlock a cycle.
	pub deferred_deps: HashSet<UnitId>,
	/// Dependencies (and the plugin, while the id is provisional) not yet ready.
	pub unresolved: usize,
	pub required_by: Vec<UnitId>,
	pub definition: Option<Definition>,
	pub export: Export,
	pub waiters: Vec<Waiter>,
	pub unload_hooks: Vec<UnloadHook>,
	pub error: Option<LoadError>,
	pub plugin_request: Option<PluginRequest>,
	/// Whether the unit's resource was requested from the loader.
	pub from_loader: bool,
}

impl Unit {

	pub fn new( id: UnitId, generation: u64, plugin_request: Option<PluginRequest> ) -> Self {
		Self {
			id,
			generation,
			state: UnitState::Pending,
			seq: None,
			deps: Vec::with_capacity( 0 ),
			deferred_deps: HashSet::with_capacity( 0 ),
			unresolved: 0,
			required_by: Vec::with_capacity( 0 ),
			definition: None,
			export: Export::new(),
			waiters: Vec::with_capacity( 0 ),
			unload_hooks: Vec::with_capacity( 0 ),
			error: None,
			plugin_request,
			from_loader: false,
		}
	}

	pub fn transition( &mut self, to: UnitState ) {
		debug_assert!(
			self.state.can_transition( to ),
			"illegal transition of '{}' from {} to {}", self.id, self.state, to,
		);
		tracing::trace!( unit = %self.id, from = %self.state, to = %to, "unit transition" );
		self.state = to ;
	}

	/// Whether this unit waits in the scheduler for its dependencies.
	pub fn is_waiting( &self ) -> bool {
		self.state == UnitState::LoadedWaiting && self.definition.is_some()
	}

	/// Whether this is a plugin resource still waiting for its plugin to be ready.
	pub fn awaits_plugin( &self ) -> bool {
		self.state == UnitState::Pending && self.id.plugin_parts().is_some()
	}

	/// Whether this plugin resource was defined before its plugin could give it a
	/// canonical id. It is not evaluated until it has one.
	pub fn awaits_canonical_id( &self ) -> bool {
		self.is_waiting() && self.plugin_request.is_some()
	}

	pub fn add_dependant( &mut self, dependant: &UnitId ) {
		if !self.required_by.contains( dependant ) { self.required_by.push( dependant.clone() ) }
	}

}
