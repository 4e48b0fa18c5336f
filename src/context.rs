//! Contexts: isolated namespaces of units sharing one configuration and loader.
//!
//! All state lives behind a single `RefCell`. Host code (loaders, plugins, factories,
//! waiters and unload hooks) is only ever called once that borrow has been released,
//! so any of it may call back into the context. Work is driven by a pump that drains
//! queued effects and then evaluates whatever the scheduler deems runnable. A call
//! made while the pump is running only queues its work; the running pump picks it up.

use std::cell::{ Cell, Ref, RefCell, RefMut };
use std::collections::HashMap ;
use std::rc::Rc ;
use itertools::Itertools ;
use nonempty_collections::NEVec ;

use crate::config::Config ;
use crate::graph ;
use crate::loader::Outcome ;
use crate::plugin::Plugin ;
use crate::registry::{ Effect, Registry, Resolved };
use crate::resolver ;
use crate::scheduler ;
use crate::unit::{ PluginRequest, UnitState, UnloadHook, Waiter };
use crate::unit_id::split_plugin ;
use crate::{
	Completion, Definition, Export, LoadError, LoadRequest, Loader,
	Requirer, Resource, Scope, UnitId, Value,
};



type RequireCallback = Box<dyn FnOnce( Result<Vec<Value>, LoadError> )> ;

pub(crate) struct Inner {
	registry: RefCell<Registry>,
	loader: Rc<dyn Loader>,
	pumping: Cell<bool>,
}

/// An isolated namespace of units.
///
/// `Context` is a cheap handle; clones refer to the same namespace. Dropping the
/// last handle drops every unit and turns outstanding completions into no-ops.
///
/// # Example
///
/// ```
/// use std::rc::Rc ;
/// use std::cell::RefCell ;
/// use unit_link::{ Context, MemoryLoader, Resource, Value };
///
/// let loader = MemoryLoader::new()
///     .with( "greeting", | _ | Ok( Resource::value( Value::new( "hello" ))))
///     .with( "app", | _ | Ok( Resource::factory([ "./greeting" ], | scope | {
///         let greeting = scope.dep_value( 0 )
///             .and_then(| value | value.downcast_ref::<&str>().copied() )
///             .unwrap_or_default();
///         Ok( Value::new( format!( "{} world", greeting )))
///     })));
///
/// let context = Context::new( loader );
/// let result = Rc::new( RefCell::new( None ));
/// let sink = Rc::clone( &result );
/// context.require_one( "app", move | app | *sink.borrow_mut() = app.ok() );
///
/// let app = result.borrow().clone().unwrap();
/// assert_eq!( app.downcast_ref::<String>().unwrap(), "hello world" );
/// ```
#[derive( Clone )]
pub struct Context {
	inner: Rc<Inner>,
}

impl Context {

	/// A context with default configuration backed by `loader`.
	pub fn new( loader: impl Loader + 'static ) -> Self { Self::named( String::new(), Rc::new( loader )) }

	/// A context backed by `loader`, named and configured by `config`.
	pub fn with_config( loader: impl Loader + 'static, config: &Config ) -> Result<Self, LoadError> {
		let context = Self::named( config.context.clone().unwrap_or_default(), Rc::new( loader ));
		context.config( config )?;
		Ok( context )
	}

	pub(crate) fn named( name: String, loader: Rc<dyn Loader> ) -> Self {
		Self { inner: Rc::new( Inner {
			registry: RefCell::new( Registry::new( name )),
			loader,
			pumping: Cell::new( false ),
		})}
	}

	pub(crate) fn from_inner( inner: Rc<Inner> ) -> Self { Self { inner }}

	fn registry( &self ) -> Ref<'_, Registry> { self.inner.registry.borrow() }

	fn registry_mut( &self ) -> RefMut<'_, Registry> { self.inner.registry.borrow_mut() }

	pub fn name( &self ) -> String { self.registry().name.clone() }

	/// Whether both handles refer to the same context.
	pub fn ptr_eq( &self, other: &Context ) -> bool { Rc::ptr_eq( &self.inner, &other.inner ) }

	/// Applies `config` on top of the current configuration. Nothing is applied
	/// when any part of it is invalid.
	pub fn config( &self, config: &Config ) -> Result<(), LoadError> {
		let mut settings = self.registry().settings.clone();
		resolver::apply( &mut settings, config )?;
		self.registry_mut().settings = settings ;
		Ok(())
	}

	pub fn base_url( &self ) -> String { self.registry().settings.base_url.clone() }

	/// The configuration blob of unit `name`, if one is configured.
	pub fn unit_config( &self, name: &str ) -> Option<serde_json::Value> {
		let id = self.normalize( name ).ok()?;
		self.registry().settings.unit_config.get( &id ).cloned()
	}

	/// A requirer for top level requests.
	pub fn requirer( &self ) -> Requirer { Requirer::new( self.clone(), None ) }

	/// Normalizes a top level name into its canonical id.
	pub fn normalize( &self, name: &str ) -> Result<UnitId, LoadError> { self.normalize_from( name, None ) }

	pub(crate) fn normalize_from( &self, name: &str, from: Option<&UnitId> ) -> Result<UnitId, LoadError> {
		self.resolve( name, from, false ).map(| resolved | resolved.id )
	}

	/// The location the resource of `id` is fetched from.
	pub fn uri( &self, id: &UnitId ) -> String {
		let registry = self.registry();
		resolver::uri( &registry.settings, id.as_str(), &registry.settings.suffix )
	}

	pub(crate) fn uri_with_suffix( &self, id: &UnitId, suffix: &str ) -> String {
		resolver::uri( &self.registry().settings, id.as_str(), suffix )
	}

	/// Requires `names` and calls `callback` with their exports, in order, once all of
	/// them are ready, or with the first error. Runs `callback` before returning when
	/// everything is ready already. Unknown names fail the request without creating
	/// any unit.
	pub fn require<N: AsRef<str>>(
		&self,
		names: impl IntoIterator<Item = N>,
		callback: impl FnOnce( Result<Vec<Value>, LoadError> ) + 'static,
	) {
		self.requirer().require( names, callback );
	}

	/// Requires a single unit.
	pub fn require_one( &self, name: &str, callback: impl FnOnce( Result<Value, LoadError> ) + 'static ) {
		self.requirer().require_one( name, callback );
	}

	/// The export of `name` if it is ready after pumping. Otherwise the unit keeps
	/// loading in the background and `None` is returned.
	pub fn try_require( &self, name: &str ) -> Result<Option<Value>, LoadError> {
		self.try_require_from( name, None )
	}

	/// Defines unit `name` with `deps` and `definition` without involving the loader.
	///
	/// Completes a unit that is already being loaded. Fails with
	/// [`LoadError::DefinedTwice`] when the unit already has a definition, and with the
	/// name error when `name` or one of `deps` does not normalize, in which case no
	/// unit is created. A plugin resource (`prefix!name`) loads its plugin and is not
	/// evaluated before the plugin has given it its canonical id. While the context is
	/// paused the unit is only recorded; see [`pause`]( Self::pause ).
	pub fn define<N: Into<String>>(
		&self,
		name: &str,
		deps: impl IntoIterator<Item = N>,
		definition: impl Into<Definition>,
	) -> Result<UnitId, LoadError> {

		let resolved = self.resolve( name, None, false )?;
		let id = resolved.id.clone();
		let Resource { deps, definition } = Resource::new( deps, definition );
		let deps = self.resolve_deps( &id, &deps )?;

		let generation = {
			let mut registry = self.registry_mut();
			match registry.units.get( &id ) {
				Some( unit ) if matches!( unit.state, UnitState::Pending | UnitState::Loading ) => unit.generation,
				Some( _ ) => return Err( LoadError::DefinedTwice( id )),
				None => registry.insert_unit( resolved ).generation,
			}
		};

		self.record( &id, generation, Ok( deps ), definition );
		self.pump();
		Ok( id )

	}

	/// Registers `hook` to run when unit `name` is unloaded.
	pub fn on_unload( &self, name: &str, hook: impl FnOnce( &UnitId ) + 'static ) -> Result<(), LoadError> {
		let id = self.lookup( name )?;
		self.push_unload_hook( &id, Box::new( hook ));
		Ok(())
	}

	/// Removes unit `name` and every unit depending on it. Their unload hooks run
	/// (most recently registered first), their waiters are rejected with
	/// [`LoadError::Unloaded`] and the loader is told to forget them. A later
	/// require creates fresh units. Returns the removed ids, suppliers first.
	pub fn unload( &self, name: &str ) -> Result<Vec<UnitId>, LoadError> {
		let id = self.lookup( name )?;
		let removed = self.registry_mut().unload( &id );
		self.pump();
		Ok( removed )
	}

	/// Stops evaluating units until a matching [`unpause`]( Self::unpause ).
	/// Definitions made meanwhile are recorded and loads are held back. Nests.
	pub fn pause( &self ) {
		let mut registry = self.registry_mut();
		registry.pause_depth += 1 ;
		tracing::debug!( context = %registry.name, depth = registry.pause_depth, "paused" );
	}

	/// Undoes one [`pause`]( Self::pause ). The outermost unpause releases held back
	/// loads and evaluates recorded definitions in dependency order. Called from
	/// within a running flush, the release happens once the current step completes.
	pub fn unpause( &self ) -> Result<(), LoadError> {

		{
			let mut registry = self.registry_mut();
			if registry.pause_depth == 0 {
				return Err( LoadError::ReentrancyViolation( "unpause without a matching pause" ));
			}
			registry.pause_depth -= 1 ;
			if registry.pause_depth > 0 { return Ok(()) }

			let flushed = std::mem::take( &mut registry.pending_definitions );
			tracing::debug!( context = %registry.name, units = %flushed.iter().join( ", " ), "flushing pending definitions" );
			let deferred = std::mem::take( &mut registry.deferred_dispatch );
			registry.effects.extend( deferred.into_iter().map( Effect::Dispatch ));
		}

		if self.inner.pumping.get() { tracing::trace!( "unpaused during a flush, continuing after the current step" ) }
		self.pump();
		Ok(())

	}

	pub fn is_paused( &self ) -> bool { self.registry().is_paused() }

	pub fn pause_depth( &self ) -> usize { self.registry().pause_depth }

	/// Units defined since the context was paused, in declaration order.
	pub fn pending_definitions( &self ) -> Vec<UnitId> { self.registry().pending_definitions.clone() }

	pub fn state( &self, name: &str ) -> Option<UnitState> {
		let id = self.lookup( name ).ok()?;
		self.registry().state( id.as_str() )
	}

	/// The export handle of unit `name`, populated or not.
	pub fn export( &self, name: &str ) -> Option<Export> {
		let id = self.lookup( name ).ok()?;
		self.registry().units.get( &id ).map(| unit | unit.export.clone() )
	}

	/// The error unit `name` failed with.
	pub fn error( &self, name: &str ) -> Option<LoadError> {
		let id = self.lookup( name ).ok()?;
		self.registry().units.get( &id ).and_then(| unit | unit.error.clone() )
	}

	/// Canonical dependency ids of unit `name` once they are known.
	pub fn dependencies( &self, name: &str ) -> Option<Vec<UnitId>> {
		let id = self.lookup( name ).ok()?;
		self.registry().units.get( &id )
			.filter(| unit | !matches!( unit.state, UnitState::Pending | UnitState::Loading ))
			.map(| unit | unit.deps.clone() )
	}

	/// Ids of every unit in the context, sorted.
	pub fn unit_ids( &self ) -> Vec<UnitId> { self.registry().units.keys().cloned().sorted().collect() }

	/// Shortest dependency chain from `start` to `goal`, both included.
	pub fn find_path( &self, start: &str, goal: &str ) -> Option<NEVec<UnitId>> {
		graph::find_path( &self.registry(), &UnitId::new( start ), &UnitId::new( goal ))
	}

	/// Whether `user` depends on `supplier`, directly or transitively.
	pub fn is_required_by( &self, supplier: &str, user: &str ) -> bool {
		graph::is_required_by( &self.registry(), &UnitId::new( supplier ), &UnitId::new( user ))
	}

	/// Ids of the ready units exporting `value` itself (not merely an equal value).
	pub fn exporters_of( &self, value: &Value ) -> Vec<UnitId> {
		self.registry().units.values()
			.filter(| unit | unit.state == UnitState::Ready )
			.filter(| unit | unit.export.get().is_some_and(| export | export.ptr_eq( value )))
			.map(| unit | unit.id.clone() )
			.sorted()
			.collect()
	}

	/// Asks the plugin serving the `prefix!name` resource `name` (or the plugin it
	/// names as its builder) for an offline rendition of the resource. The plugin
	/// must be loaded in this context.
	pub fn write_plugin( &self, name: &str ) -> Result<Option<String>, LoadError> {

		let id = self.normalize( name )?;
		let Some(( plugin_name, resource )) = id.plugin_parts() else {
			return Err( LoadError::InvalidName { name: name.to_string(), reason: "not a plugin resource" });
		};

		let plugin_id = UnitId::new( plugin_name );
		let plugin = self.loaded_plugin( &plugin_id )?;
		let writer = match plugin.plugin_builder().map( String::from ) {
			Some( builder ) => self.loaded_plugin( &self.normalize( &builder )? )?,
			None => plugin,
		};

		Ok( writer.write( plugin_name, resource ))

	}

	fn loaded_plugin( &self, id: &UnitId ) -> Result<Rc<dyn Plugin>, LoadError> {
		let plugin = self.registry().ready_plugin( id )?;
		plugin.ok_or_else(|| LoadError::NotFound( id.clone() ))
	}

	/// An existing unit addressed by id or by a name normalizing to its id.
	fn lookup( &self, name: &str ) -> Result<UnitId, LoadError> {
		if self.registry().units.contains_key( name ) { return Ok( UnitId::new( name )) }
		let id = self.normalize( name )?;
		match self.registry().units.contains_key( &id ) {
			true => Ok( id ),
			false => Err( LoadError::NotFound( id )),
		}
	}

	/// Default normalization. Names of existing units are fixed points.
	fn normalize_default( &self, name: &str, dir: &str ) -> Result<UnitId, LoadError> {
		let registry = self.registry();
		if registry.units.contains_key( name ) { return Ok( UnitId::new( name )) }
		resolver::normalize_plain( &registry.settings, name, dir ).map( UnitId::new )
	}

	/// Normalizes `name` as requested by `from`. Plugin resources whose plugin is not
	/// ready get a provisional id derived with default normalization.
	fn resolve( &self, name: &str, from: Option<&UnitId>, check_exists: bool ) -> Result<Resolved, LoadError> {

		let dir = from.map_or( "", UnitId::dir ).to_string();

		let Some(( prefix, rest )) = split_plugin( name ) else {
			let id = self.normalize_default( name, &dir )?;
			if check_exists { self.check_exists( &id )? }
			return Ok( Resolved::canonical( id ));
		};

		let plugin_id = self.resolve( prefix, from, check_exists )?.id ;
		let plugin = self.registry().ready_plugin( &plugin_id )?;

		match plugin {
			Some( plugin ) => {
				let suffix = plugin.normalize( rest, &| name: &str | self.normalize_default( name, &dir ).map( String::from ))?;
				Ok( Resolved::canonical( UnitId::new( format!( "{}!{}", plugin_id, suffix ))))
			},
			None => {
				let suffix = self.normalize_default( rest, &dir )?;
				Ok( Resolved {
					id: UnitId::new( format!( "{}!{}", plugin_id, suffix )),
					plugin_request: Some( PluginRequest { name: rest.to_string(), dir }),
				})
			},
		}

	}

	fn check_exists( &self, id: &UnitId ) -> Result<(), LoadError> {
		let uri = {
			let registry = self.registry();
			if registry.units.contains_key( id ) { return Ok(()) }
			resolver::uri( &registry.settings, id.as_str(), &registry.settings.suffix )
		};
		match self.inner.loader.exists( id, &uri ) {
			true => Ok(()),
			false => Err( LoadError::NotFound( id.clone() )),
		}
	}

	pub(crate) fn require_from( &self, names: Vec<String>, from: Option<&UnitId>, callback: RequireCallback ) {

		let resolved = names.iter()
			.map(| name | self.resolve( name, from, true ))
			.collect::<Result<Vec<_>, _>>();
		let resolved = match resolved {
			Ok( resolved ) => resolved,
			Err( error ) => {
				tracing::debug!( names = %names.iter().join( ", " ), error = %error, "require rejected" );
				return callback( Err( error ));
			},
		};
		if resolved.is_empty() { return callback( Ok( Vec::with_capacity( 0 ))) }

		let gather = Gather::new( resolved.len(), callback );
		let mut settled = Vec::new();
		{
			let mut registry = self.registry_mut();
			for ( slot, resolved ) in resolved.into_iter().enumerate() {
				let id = registry.ensure( resolved );
				let waiter = Gather::waiter( &gather, slot );
				let Some( unit ) = registry.units.get_mut( &id ) else { continue };
				match unit.state {
					UnitState::Ready => settled.push(( waiter, unit.export.value().ok_or( LoadError::NotFound( id )))),
					UnitState::Error => settled.push(( waiter, Err( unit.error.clone().unwrap_or( LoadError::NotFound( id ))))),
					_ => unit.waiters.push( waiter ),
				}
			}
		}

		settled.into_iter().for_each(|( waiter, result )| waiter( result ));
		self.pump();

	}

	pub(crate) fn try_require_from( &self, name: &str, from: Option<&UnitId> ) -> Result<Option<Value>, LoadError> {

		let resolved = self.resolve( name, from, true )?;
		let id = self.registry_mut().ensure( resolved );
		self.pump();

		let registry = self.registry();
		match registry.units.get( &id ) {
			Some( unit ) if unit.state == UnitState::Error => Err( unit.error.clone().unwrap_or( LoadError::NotFound( id ))),
			Some( unit ) if unit.state == UnitState::Ready => Ok( unit.export.value() ),
			_ => Ok( None ),
		}

	}

	pub(crate) fn push_unload_hook( &self, id: &UnitId, hook: UnloadHook ) {
		match self.registry_mut().units.get_mut( id ) {
			Some( unit ) => unit.unload_hooks.push( hook ),
			None => tracing::debug!( unit = %id, "unload hook registered for a unit that no longer exists" ),
		}
	}

	/// Settles a unit on behalf of a [`Completion`].
	pub(crate) fn complete( &self, id: &UnitId, generation: u64, outcome: Outcome ) {

		if !self.registry().is_current( id, generation, &[ UnitState::Loading ]) {
			tracing::warn!( unit = %id, "ignoring completion for a unit that is no longer loading" );
			return
		}

		match outcome {
			Outcome::Resource( resource ) => self.prepare( id, generation, resource ),
			Outcome::Failed( error ) => self.registry_mut().fail( id, error ),
			Outcome::NotFound => self.registry_mut().discard_not_found( id ),
			Outcome::NoDefine => {
				let ( shim, enforce ) = {
					let registry = self.registry();
					( registry.settings.shim.get( id ).cloned(), registry.settings.enforce_define )
				};
				match shim {
					Some( shim ) if !shim.expect_define => {
						tracing::debug!( unit = %id, "completing unit from its shim" );
						self.prepare( id, generation, shim.resource() );
					},
					_ if enforce => self.registry_mut().fail( id, LoadError::load_failure( id, "resource loaded without a definition" )),
					_ => self.prepare( id, generation, Resource::value( Value::unit() )),
				}
			},
			Outcome::Text( text ) => {
				tracing::debug!( unit = %id, "evaluating source text" );
				let request = self.load_request( id.clone(), generation );
				self.inner.loader.load_text( request, text );
			},
		}

		self.pump();

	}

	/// Normalizes the dependency names of unit `id`.
	fn resolve_deps( &self, id: &UnitId, deps: &[String] ) -> Result<Vec<Resolved>, LoadError> {
		deps.iter().map(| dep | self.resolve( dep, Some( id ), false )).collect()
	}

	/// Normalizes the dependencies of `resource` and records its definition.
	fn prepare( &self, id: &UnitId, generation: u64, resource: Resource ) {
		let Resource { deps, definition } = resource ;
		let resolved = self.resolve_deps( id, &deps );
		self.record( id, generation, resolved, definition );
	}

	/// Records the definition of `id`, or its failure to resolve its dependencies,
	/// unless the unit has moved on from the lifecycle `generation`.
	fn record( &self, id: &UnitId, generation: u64, resolved: Result<Vec<Resolved>, LoadError>, definition: Definition ) {

		let mut registry = self.registry_mut();
		if !registry.is_current( id, generation, &[ UnitState::Pending, UnitState::Loading ]) {
			tracing::warn!( unit = %id, "ignoring definition for a unit that is no longer loading" );
			return
		}

		match resolved {
			Ok( deps ) => registry.register_definition( id, deps, definition ),
			Err( error ) => registry.fail( id, error ),
		}

	}

	fn load_request( &self, id: UnitId, generation: u64 ) -> LoadRequest {
		let uri = self.uri( &id );
		let completion = Completion::new( &self.inner, id.clone(), generation );
		LoadRequest::new( id, uri, completion )
	}

	/// Drains queued effects and evaluates runnable units until neither is left.
	/// Returns immediately when a pump is already running further up the stack.
	fn pump( &self ) {

		if self.inner.pumping.replace( true ) { return }
		let _guard = PumpGuard( &self.inner.pumping );

		loop {
			let effect = self.registry_mut().effects.pop_front();
			if let Some( effect ) = effect {
				self.apply( effect );
				continue
			}
			let next = scheduler::next_evaluation( &mut self.registry_mut() );
			match next {
				Some( id ) => self.evaluate( id ),
				None => break,
			}
		}

	}

	fn apply( &self, effect: Effect ) {
		match effect {
			Effect::Dispatch( id ) => self.dispatch( id ),
			Effect::Notify( waiters, result ) => waiters.into_iter().for_each(| waiter | waiter( result.clone() )),
			Effect::RunUnloadHooks( id, hooks ) => hooks.into_iter().rev().for_each(| hook | hook( &id )),
			Effect::Undefine( id ) => self.inner.loader.undefine( &id ),
			Effect::ResolvePlugin( id ) => self.resolve_plugin( &id ),
		}
	}

	/// Hands a pending unit to the loader, or to its plugin once that is ready.
	fn dispatch( &self, id: UnitId ) {

		enum Plan { Loader( u64 ), Plugin( Rc<dyn Plugin>, u64 ), Normalize( UnitId ) }

		let plan = {
			let mut registry = self.registry_mut();
			if registry.is_paused() {
				registry.deferred_dispatch.push( id );
				return
			}

			let plugin = id.plugin().map(| plugin | {
				let ready = registry.ready_plugin( &plugin );
				( plugin, ready )
			});
			let Some( unit ) = registry.units.get( &id ) else { return };
			if unit.state != UnitState::Pending { return }
			let provisional = unit.plugin_request.is_some();

			match plugin {
				None => {
					let Some( generation ) = registry.begin_load( &id ) else { return };
					if let Some( unit ) = registry.units.get_mut( &id ) { unit.from_loader = true }
					Plan::Loader( generation )
				},
				Some(( _, Ok( None ))) => return,
				Some(( plugin, Ok( Some( _ )))) if provisional => Plan::Normalize( plugin ),
				Some(( _, Ok( Some( plugin )))) => {
					let Some( generation ) = registry.begin_load( &id ) else { return };
					Plan::Plugin( plugin, generation )
				},
				Some(( _, Err( error ))) => {
					registry.fail( &id, error );
					return
				},
			}
		};

		match plan {
			Plan::Loader( generation ) => {
				tracing::debug!( unit = %id, "dispatching to loader" );
				let request = self.load_request( id, generation );
				self.inner.loader.load( request );
			},
			Plan::Plugin( plugin, generation ) => {
				let Some(( plugin_id, name )) = id.plugin_parts() else { return };
				tracing::debug!( unit = %id, plugin = plugin_id, "dispatching to plugin" );
				let config = self.registry().settings.unit_config.get( plugin_id ).cloned();
				let requirer = Requirer::new( self.clone(), Some( id.clone() ));
				let completion = Completion::new( &self.inner, id.clone(), generation );
				plugin.load( name, &requirer, completion, config.as_ref() );
			},
			Plan::Normalize( plugin ) => self.resolve_plugin( &plugin ),
		}

	}

	/// Gives the pending resources of a plugin that became ready their canonical
	/// ids and dispatches them.
	fn resolve_plugin( &self, plugin_id: &UnitId ) {

		let ( plugin, resources ) = {
			let registry = self.registry();
			let resources = registry.plugin_resources( plugin_id );
			match registry.ready_plugin( plugin_id ) {
				Ok( Some( plugin )) => ( plugin, resources ),
				Ok( None ) => return,
				Err( error ) => {
					drop( registry );
					let mut registry = self.registry_mut();
					resources.iter().for_each(|( id, _ )| registry.fail( id, error.clone() ));
					return
				},
			}
		};

		let canonical = resources.into_iter()
			.map(|( id, request )| {
				let to = match &request {
					None => Ok( id.clone() ),
					Some( request ) => plugin
						.normalize( &request.name, &| name: &str | self.normalize_default( name, &request.dir ).map( String::from ))
						.map(| suffix | UnitId::new( format!( "{}!{}", plugin_id, suffix ))),
				};
				( id, to )
			})
			.collect::<Vec<_>>();

		let mut registry = self.registry_mut();
		for ( from, to ) in canonical {
			match to {
				Ok( to ) => {
					registry.canonicalize( &from, &to );
					registry.schedule_dispatch( to );
				},
				Err( error ) => registry.fail( &from, error ),
			}
		}

	}

	/// Runs the definition of a unit the scheduler found runnable.
	fn evaluate( &self, id: UnitId ) {

		let prepared = {
			let mut registry = self.registry_mut();
			let config = registry.settings.unit_config.get( &id ).cloned();
			let deps = registry.units.get( &id )
				.map(| unit | unit.deps.iter()
					.map(| dep | registry.units.get( dep ).map(| dep | dep.export.clone() ).unwrap_or_default() )
					.collect::<Vec<_>>()
				)
				.unwrap_or_default();
			let Some( unit ) = registry.units.get_mut( &id ) else { return };
			let Some( definition ) = unit.definition.take() else { return };
			let ( generation, seq ) = ( unit.generation, unit.seq );
			if let Some( seq ) = seq { registry.dequeue( seq ) }
			( definition, deps, generation, config )
		};

		let ( definition, deps, generation, config ) = prepared ;
		tracing::debug!( unit = %id, "evaluating unit" );

		let result = match definition {
			Definition::Value( value ) => Ok( value ),
			Definition::Factory( factory ) => {
				let scope = Scope::new( self.clone(), id.clone(), deps, config );
				factory( &scope ).map_err(| error | LoadError::definition_failure( &id, error ))
			},
		};

		self.registry_mut().finish( &id, generation, result );

	}

}

impl std::fmt::Debug for Context {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self.inner.registry.try_borrow() {
			Ok( registry ) => f.debug_struct( "Context" )
				.field( "name", &registry.name )
				.field( "units", &registry.units.len() )
				.field( "pause_depth", &registry.pause_depth )
				.finish(),
			Err( _ ) => f.write_str( "Context(<busy>)" ),
		}
	}
}

struct PumpGuard<'a>( &'a Cell<bool> );

impl Drop for PumpGuard<'_> {
	fn drop( &mut self ) { self.0.set( false ) }
}

/// Collects the exports of a multi-name require into declaration order.
struct Gather {
	values: Vec<Option<Value>>,
	remaining: usize,
	callback: Option<RequireCallback>,
}

impl Gather {

	fn new( len: usize, callback: RequireCallback ) -> Rc<RefCell<Self>> {
		Rc::new( RefCell::new( Self { values: vec![ None ; len ], remaining: len, callback: Some( callback ) }))
	}

	fn waiter( gather: &Rc<RefCell<Self>>, slot: usize ) -> Waiter {
		let gather = Rc::clone( gather );
		Box::new( move | result | {
			let finished = {
				let mut gather = gather.borrow_mut();
				match result {
					Ok( value ) => {
						gather.values[ slot ] = Some( value );
						gather.remaining -= 1 ;
						match gather.remaining {
							0 => {
								let values: Vec<Value> = gather.values.iter_mut().filter_map( Option::take ).collect();
								gather.callback.take().map(| callback | ( callback, Ok( values )))
							},
							_ => None,
						}
					},
					Err( error ) => gather.callback.take().map(| callback | ( callback, Err( error ))),
				}
			};
			if let Some(( callback, result )) = finished { callback( result ) }
		})
	}

}

/// Named contexts sharing one loader.
///
/// A [`Config`] carrying a `context` name configures that context, creating it on
/// first use; without a name it targets the default context `""`.
pub struct Contexts {
	loader: Rc<dyn Loader>,
	contexts: HashMap<String, Context>,
}

impl Contexts {

	pub fn new( loader: impl Loader + 'static ) -> Self {
		Self { loader: Rc::new( loader ), contexts: HashMap::new() }
	}

	/// Applies `config` to the context it names and returns that context.
	pub fn config( &mut self, config: &Config ) -> Result<Context, LoadError> {
		let name = config.context.clone().unwrap_or_default();
		let context = match self.contexts.get( &name ) {
			Some( context ) => context.clone(),
			None => Context::named( name.clone(), Rc::clone( &self.loader )),
		};
		context.config( config )?;
		self.contexts.entry( name ).or_insert_with(|| context.clone() );
		Ok( context )
	}

	pub fn get( &self, name: &str ) -> Option<&Context> { self.contexts.get( name ) }

	/// The default context, created on first use.
	pub fn default_context( &mut self ) -> Context {
		self.contexts.entry( String::new() )
			.or_insert_with(|| Context::named( String::new(), Rc::clone( &self.loader )))
			.clone()
	}

	/// Forgets the context `name`. Its units go away once the last handle is dropped.
	pub fn remove( &mut self, name: &str ) -> Option<Context> { self.contexts.remove( name ) }

	pub fn names( &self ) -> Vec<&str> { self.contexts.keys().map( String::as_str ).sorted().collect() }

}

impl std::fmt::Debug for Contexts {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Contexts" ).field( "names", &self.names() ).finish_non_exhaustive()
	}
}
