//! The per-context unit table and the bookkeeping that keeps it consistent.
//!
//! Everything here runs under the context's borrow and never calls back into
//! host code. Work that does (loader dispatch, waiters, unload hooks, plugin
//! normalization) is queued as an [`Effect`] and carried out by the context once
//! the borrow has been released.

use std::collections::{ BTreeMap, BTreeSet, HashMap, VecDeque };
use std::rc::Rc ;
use itertools::Itertools ;

use crate::config::Settings ;
use crate::plugin::Plugin ;
use crate::unit::{ PluginRequest, Unit, UnitState, UnloadHook, Waiter };
use crate::{ Definition, LoadError, UnitId, Value };



/// Host-facing work deferred until the registry is no longer borrowed.
pub(crate) enum Effect {
	/// Hand the unit to its loader or plugin.
	Dispatch( UnitId ),
	/// Resume continuations with a unit's outcome.
	Notify( Vec<Waiter>, Result<Value, LoadError> ),
	/// Run a removed unit's unload hooks, most recently registered first.
	RunUnloadHooks( UnitId, Vec<UnloadHook> ),
	/// Let the loader forget a removed unit.
	Undefine( UnitId ),
	/// Normalize and dispatch the resources waiting on a plugin that became ready.
	ResolvePlugin( UnitId ),
}

/// A normalized request: the canonical (or provisional) id and, for plugin
/// resources whose plugin is not ready yet, what to normalize once it is.
#[derive( Debug, Clone )]
pub(crate) struct Resolved {
	pub id: UnitId,
	pub plugin_request: Option<PluginRequest>,
}

impl Resolved {
	pub fn canonical( id: UnitId ) -> Self { Self { id, plugin_request: None }}
}

#[derive( Default )]
pub(crate) struct Registry {
	pub name: String,
	pub settings: Settings,
	pub units: HashMap<UnitId, Unit>,
	/// Units with a known definition that have not been evaluated, by declaration order.
	pub waiting: BTreeMap<u64, UnitId>,
	/// Declaration numbers of waiting units with nothing left to wait for.
	pub ready: BTreeSet<u64>,
	/// Units whose resource is being fetched.
	pub in_flight: usize,
	pub pause_depth: usize,
	/// Units defined while paused, in declaration order.
	pub pending_definitions: Vec<UnitId>,
	/// Dispatches held back while paused.
	pub deferred_dispatch: Vec<UnitId>,
	pub effects: VecDeque<Effect>,
	next_seq: u64,
	next_generation: u64,
}

impl Registry {

	pub fn new( name: String ) -> Self { Self { name, ..Self::default() }}

	#[inline] pub fn is_paused( &self ) -> bool { self.pause_depth > 0 }

	pub fn state( &self, id: &str ) -> Option<UnitState> { self.units.get( id ).map(| unit | unit.state ) }

	/// Whether `id` is still in the lifecycle `generation` and in one of `states`.
	pub fn is_current( &self, id: &UnitId, generation: u64, states: &[UnitState] ) -> bool {
		self.units.get( id ).is_some_and(| unit | unit.generation == generation && states.contains( &unit.state ))
	}

	/// Whether some unit is waiting on the host.
	#[inline] pub fn has_in_flight( &self ) -> bool { self.in_flight > 0 }

	/// The earliest declared unit with nothing left to wait for.
	pub fn next_ready( &self ) -> Option<UnitId> {
		self.ready.first().and_then(| seq | self.waiting.get( seq )).cloned()
	}

	/// Moves `unit` to `to`, keeping count of the units in flight.
	fn transition( in_flight: &mut usize, unit: &mut Unit, to: UnitState ) {
		if unit.state == UnitState::Loading { *in_flight -= 1 }
		if to == UnitState::Loading { *in_flight += 1 }
		unit.transition( to );
	}

	/// Moves the pending unit `id` to [`UnitState::Loading`] and returns its generation.
	pub fn begin_load( &mut self, id: &UnitId ) -> Option<u64> {
		let unit = self.units.get_mut( id ).filter(| unit | unit.state == UnitState::Pending )?;
		Self::transition( &mut self.in_flight, unit, UnitState::Loading );
		Some( unit.generation )
	}

	/// Takes the unit declared `seq`th out of the evaluation queue.
	pub fn dequeue( &mut self, seq: u64 ) {
		self.waiting.remove( &seq );
		self.ready.remove( &seq );
	}

	/// The plugin exported by `id`, `None` while it is not ready.
	pub fn ready_plugin( &self, id: &UnitId ) -> Result<Option<Rc<dyn Plugin>>, LoadError> {
		let Some( unit ) = self.units.get( id ) else { return Ok( None ) };
		match unit.state {
			UnitState::Ready => unit.export.get()
				.and_then( Value::as_plugin )
				.map( Some )
				.ok_or_else(|| LoadError::NotAPlugin( id.clone() )),
			UnitState::Error => Err( unit.error.clone().unwrap_or_else(|| LoadError::NotFound( id.clone() ))),
			_ => Ok( None ),
		}
	}

	pub fn create_unit( &mut self, id: UnitId, plugin_request: Option<PluginRequest> ) -> &mut Unit {
		self.next_generation += 1 ;
		let generation = self.next_generation ;
		tracing::trace!( context = %self.name, unit = %id, "creating unit" );
		self.units.entry( id.clone() ).or_insert_with(|| Unit::new( id, generation, plugin_request ))
	}

	/// Returns the unit for `resolved`, creating and dispatching it if it does not exist.
	pub fn ensure( &mut self, resolved: Resolved ) -> UnitId {
		if self.units.contains_key( &resolved.id ) { return resolved.id }
		let id = self.insert_unit( resolved ).id.clone();
		self.schedule_dispatch( id.clone() );
		id
	}

	/// Creates the unit for `resolved` without dispatching it. A plugin resource also
	/// pulls in its plugin unit.
	pub fn insert_unit( &mut self, resolved: Resolved ) -> &mut Unit {
		let Resolved { id, plugin_request } = resolved ;
		if let Some( plugin ) = id.plugin() {
			let plugin = self.ensure( Resolved::canonical( plugin ));
			if let Some( plugin ) = self.units.get_mut( &plugin ) { plugin.add_dependant( &id ) }
		}
		self.create_unit( id, plugin_request )
	}

	pub fn schedule_dispatch( &mut self, id: UnitId ) {
		match self.is_paused() {
			true => self.deferred_dispatch.push( id ),
			false => self.effects.push_back( Effect::Dispatch( id )),
		}
	}

	/// Records the definition of `id` and moves it to [`UnitState::LoadedWaiting`].
	pub fn register_definition( &mut self, id: &UnitId, deps: Vec<Resolved>, definition: Definition ) {

		let deps = deps.into_iter()
			.map(| dep | self.ensure( dep ))
			.unique()
			.collect::<Vec<_>>();

		deps.iter().for_each(| dep | if let Some( unit ) = self.units.get_mut( dep ) { unit.add_dependant( id ) });

		self.next_seq += 1 ;
		let seq = self.next_seq ;
		let paused = self.is_paused();

		let Some( unit ) = self.units.get_mut( id ) else { return };
		tracing::debug!( unit = %id, deps = %deps.iter().join( ", " ), "unit defined" );
		unit.deps = deps ;
		unit.definition = Some( definition );
		unit.seq = Some( seq );
		Self::transition( &mut self.in_flight, unit, UnitState::LoadedWaiting );
		self.waiting.insert( seq, id.clone() );
		if paused { self.pending_definitions.push( id.clone() ) }

		let failed_dep = self.units.get( id )
			.into_iter()
			.flat_map(| unit | unit.deps.iter() )
			.filter_map(| dep | self.units.get( dep ))
			.find(| dep | dep.state == UnitState::Error )
			.and_then(| dep | dep.error.clone() );
		match failed_dep {
			Some( error ) => self.fail( id, error ),
			None => self.recount( id ),
		}

	}

	/// Recomputes how many dependencies `id` still waits for and queues it for
	/// evaluation once that is none. A plugin resource without its canonical id also
	/// waits for its plugin.
	pub fn recount( &mut self, id: &UnitId ) {

		let Some( unit ) = self.units.get( id ).filter(| unit | unit.is_waiting() ) else { return };
		let unresolved = unit.deps.iter()
			.filter(| dep | !unit.deferred_deps.contains( *dep ))
			.filter(| dep | self.state( dep.as_str() ) != Some( UnitState::Ready ))
			.count()
			+ usize::from( unit.plugin_request.is_some() );
		let seq = unit.seq ;

		if let Some( unit ) = self.units.get_mut( id ) { unit.unresolved = unresolved }
		let Some( seq ) = seq else { return };
		match unresolved {
			0 => self.ready.insert( seq ),
			_ => self.ready.remove( &seq ),
		};

	}

	/// Counts the now ready `dep` off what `dependant` waits for.
	fn release( &mut self, dependant: &UnitId, dep: &UnitId ) {
		let Some( unit ) = self.units.get_mut( dependant ) else { return };
		if !unit.is_waiting() || unit.deferred_deps.contains( dep ) || !unit.deps.contains( dep ) { return }
		unit.unresolved = unit.unresolved.saturating_sub( 1 );
		if let ( 0, Some( seq )) = ( unit.unresolved, unit.seq ) { self.ready.insert( seq ); }
	}

	/// Lets `id` stop waiting for `dep` to break a dependency cycle.
	pub fn defer( &mut self, id: &UnitId, dep: &UnitId ) {
		let Some( unit ) = self.units.get_mut( id ) else { return };
		unit.deferred_deps.insert( dep.clone() );
		self.recount( id );
	}

	/// Publishes the result of evaluating `id`.
	pub fn finish( &mut self, id: &UnitId, generation: u64, result: Result<Value, LoadError> ) {

		let Some( unit ) = self.units.get_mut( id )
			.filter(| unit | unit.generation == generation && unit.state == UnitState::LoadedWaiting )
		else {
			tracing::debug!( unit = %id, "discarding result of a unit no longer awaiting evaluation" );
			return
		};

		match result {
			Ok( value ) => {
				if unit.export.publish( value.clone() ).is_err() {
					tracing::warn!( unit = %id, "export already published" );
				}
				Self::transition( &mut self.in_flight, unit, UnitState::Ready );
				tracing::debug!( unit = %id, "unit ready" );
				let waiters = std::mem::take( &mut unit.waiters );
				let dependants = unit.required_by.clone();
				let serves = value.as_plugin().is_some()
					|| dependants.iter().any(| dependant | dependant.plugin().as_ref() == Some( id ));
				if !waiters.is_empty() { self.effects.push_back( Effect::Notify( waiters, Ok( value ))) }
				if serves { self.effects.push_back( Effect::ResolvePlugin( id.clone() )) }
				dependants.iter().for_each(| dependant | self.release( dependant, id ));
			},
			Err( error ) => self.fail( id, error ),
		}

	}

	/// Moves `id` and every unit still waiting on it into [`UnitState::Error`].
	/// Ready dependants keep their exports.
	pub fn fail( &mut self, id: &UnitId, error: LoadError ) {

		tracing::debug!( unit = %id, error = %error, "unit failed" );

		let mut stack = vec![ id.clone() ];
		while let Some( id ) = stack.pop() {

			let Some( unit ) = self.units.get_mut( &id ) else { continue };
			if unit.state.is_settled() { continue }

			Self::transition( &mut self.in_flight, unit, UnitState::Error );
			unit.error = Some( error.clone() );
			unit.definition = None ;
			let waiters = std::mem::take( &mut unit.waiters );
			stack.extend( unit.required_by.iter().cloned() );
			if let Some( seq ) = unit.seq {
				self.waiting.remove( &seq );
				self.ready.remove( &seq );
			}
			if !waiters.is_empty() { self.effects.push_back( Effect::Notify( waiters, Err( error.clone() ))) }

		}

	}

	/// Discards `id` after its loader reported that it does not exist.
	pub fn discard_not_found( &mut self, id: &UnitId ) {

		let Some( mut unit ) = self.units.remove( id ) else { return };
		tracing::debug!( unit = %id, "unit not found" );
		Self::transition( &mut self.in_flight, &mut unit, UnitState::Unloaded );

		self.detach( &unit );
		let error = LoadError::NotFound( id.clone() );
		let waiters = std::mem::take( &mut unit.waiters );
		if !waiters.is_empty() { self.effects.push_back( Effect::Notify( waiters, Err( error.clone() ))) }
		unit.required_by.iter().for_each(| dependant | self.fail( dependant, error.clone() ));

	}

	/// Removes `id` and, recursively, every unit depending on it.
	///
	/// Each removed unit queues its hooks, the rejection of its waiters and its
	/// loader cleanup, suppliers before their dependants. Returns the removed ids.
	pub fn unload( &mut self, id: &UnitId ) -> Vec<UnitId> {

		let Some( mut unit ) = self.units.remove( id ) else { return Vec::with_capacity( 0 ) };
		tracing::debug!( unit = %id, state = %unit.state, "unloading unit" );
		Self::transition( &mut self.in_flight, &mut unit, UnitState::Unloaded );

		self.detach( &unit );

		let hooks = std::mem::take( &mut unit.unload_hooks );
		if !hooks.is_empty() { self.effects.push_back( Effect::RunUnloadHooks( id.clone(), hooks )) }
		let waiters = std::mem::take( &mut unit.waiters );
		if !waiters.is_empty() { self.effects.push_back( Effect::Notify( waiters, Err( LoadError::Unloaded( id.clone() )))) }
		if unit.from_loader { self.effects.push_back( Effect::Undefine( id.clone() )) }

		std::iter::once( id.clone() )
			.chain( unit.required_by.iter().flat_map(| dependant | self.unload( dependant )))
			.collect()

	}

	/// Drops every reference the registry keeps to a removed unit.
	fn detach( &mut self, unit: &Unit ) {
		if let Some( seq ) = unit.seq { self.dequeue( seq ) }
		self.pending_definitions.retain(| id | *id != unit.id );
		self.deferred_dispatch.retain(| id | *id != unit.id );
		unit.deps.iter()
			.chain( unit.id.plugin().as_ref() )
			.for_each(| dep | if let Some( dep ) = self.units.get_mut( dep ) {
				dep.required_by.retain(| dependant | *dependant != unit.id );
			});
	}

	/// Moves the provisional plugin resource `from` to its canonical id `to`,
	/// merging it into `to` when that unit already exists. A definition made under
	/// the provisional id completes a `to` that is still pending or loading.
	pub fn canonicalize( &mut self, from: &UnitId, to: &UnitId ) {

		if from == to {
			if let Some( unit ) = self.units.get_mut( from ) { unit.plugin_request = None }
			self.recount( from );
			return
		}

		let Some( mut unit ) = self.units.remove( from ) else { return };
		tracing::trace!( from = %from, to = %to, "canonicalizing plugin resource" );
		unit.plugin_request = None ;
		let dependants = unit.required_by.clone();

		for dependant in &dependants {
			let Some( dependant ) = self.units.get_mut( dependant ) else { continue };
			dependant.deps.iter_mut().filter(| dep | **dep == *from ).for_each(| dep | *dep = to.clone() );
			dependant.deps = std::mem::take( &mut dependant.deps ).into_iter().unique().collect();
			if dependant.deferred_deps.remove( from ) { dependant.deferred_deps.insert( to.clone() ); }
		}

		for supplier in unit.deps.iter().chain( unit.id.plugin().as_ref() ) {
			let Some( supplier ) = self.units.get_mut( supplier ) else { continue };
			supplier.required_by.retain(| dependant | dependant != from );
			supplier.add_dependant( to );
		}

		self.deferred_dispatch.retain(| id | id != from );
		self.pending_definitions.iter_mut().filter(| id | *id == from ).for_each(| id | *id = to.clone() );

		match self.units.remove( to ) {
			None => {
				unit.id = to.clone();
				if let Some( seq ) = unit.seq { self.waiting.insert( seq, to.clone() ); }
				self.units.insert( to.clone(), unit );
			},
			Some( mut target ) if unit.is_waiting() && matches!( target.state, UnitState::Pending | UnitState::Loading ) => {
				if target.state == UnitState::Loading { self.in_flight -= 1 }
				unit.id = to.clone();
				unit.waiters.append( &mut target.waiters );
				unit.unload_hooks.append( &mut target.unload_hooks );
				unit.from_loader |= target.from_loader ;
				target.required_by.iter().for_each(| dependant | unit.add_dependant( dependant ));
				if let Some( seq ) = unit.seq { self.waiting.insert( seq, to.clone() ); }
				self.units.insert( to.clone(), unit );
			},
			Some( mut target ) => {
				if let Some( seq ) = unit.seq {
					tracing::warn!( unit = %to, provisional = %from, "discarding definition of an already defined plugin resource" );
					self.dequeue( seq );
				}
				unit.required_by.iter().for_each(| dependant | target.add_dependant( dependant ));
				target.unload_hooks.append( &mut unit.unload_hooks );
				let waiters = std::mem::take( &mut unit.waiters );
				let error = target.error.clone();
				match target.state {
					UnitState::Ready => if let Some( value ) = target.export.value() {
						self.effects.push_back( Effect::Notify( waiters, Ok( value )));
					},
					UnitState::Error => if let Some( error ) = &error {
						self.effects.push_back( Effect::Notify( waiters, Err( error.clone() )));
					},
					_ => target.waiters.extend( waiters ),
				}
				self.units.insert( to.clone(), target );
				if let Some( error ) = error {
					dependants.iter().for_each(| dependant | self.fail( dependant, error.clone() ));
				}
			},
		}

		self.recount( to );
		dependants.iter().for_each(| dependant | self.recount( dependant ));

	}

	/// Ids of the plugin resources waiting for `plugin` to normalize them, oldest first.
	pub fn plugin_resources( &self, plugin: &UnitId ) -> Vec<( UnitId, Option<PluginRequest> )> {
		self.units.values()
			.filter(| unit | unit.awaits_plugin() || unit.awaits_canonical_id() )
			.filter(| unit | unit.id.plugin().as_ref() == Some( plugin ))
			.sorted_by_key(| unit | unit.generation )
			.map(| unit | ( unit.id.clone(), unit.plugin_request.clone() ))
			.collect()
	}

}
