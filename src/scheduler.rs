//! Picks the next unit to evaluate.
//!
//! Units with a known definition wait in declaration order, each counting the
//! dependencies it still waits for. The registry keeps the count current as units
//! become ready, and queues a unit once it reaches zero, so the next unit to run is
//! simply the earliest declared one in that queue. When the queue is empty and
//! nothing is in flight, the remaining units can only be waiting on each other: the
//! first cycle reachable from the earliest declared unit has one edge broken and
//! evaluation continues.

use std::collections::{ HashMap, HashSet };
use itertools::Itertools ;

use crate::registry::Registry ;
use crate::unit::Unit ;
use crate::{ LoadError, UnitId };



/// The next unit to evaluate, breaking dependency cycles as needed.
/// Returns `None` while paused or when nothing can make progress yet.
pub(crate) fn next_evaluation( registry: &mut Registry ) -> Option<UnitId> {

	if registry.is_paused() { return None }

	loop {

		if let Some( id ) = registry.next_ready() { return Some( id ) }
		if registry.waiting.is_empty() || registry.has_in_flight() { return None }

		match find_cycle( registry ) {
			Some( cycle ) => resolve_cycle( registry, &cycle ),
			None => {
				let stuck = registry.waiting.values().cloned().collect::<Vec<_>>();
				tracing::error!( context = %registry.name, units = %stuck.iter().join( ", " ), "units are waiting but no cycle can be broken" );
				let error = LoadError::CycleUnresolvable( stuck.clone() );
				stuck.iter().for_each(| id | registry.fail( id, error.clone() ));
			},
		}

	}

}

/// The node the walk continues to from `id`: the first dependency (in declaration
/// order) that `id` is still blocked on and that is itself blocked. A plugin resource
/// without its canonical id is blocked on its plugin.
fn blocking_successor( registry: &Registry, id: &UnitId ) -> Option<UnitId> {

	let unit = registry.units.get( id )?;
	let plugin = unit.id.plugin().filter(| plugin | registry.units.get( plugin ).is_some_and( Unit::is_waiting ));

	if unit.awaits_plugin() { return plugin }
	if !unit.is_waiting() { return None }
	if unit.awaits_canonical_id() && plugin.is_some() { return plugin }

	unit.deps.iter()
		.filter(| dep | !unit.deferred_deps.contains( *dep ))
		.find(| dep | registry.units.get( *dep ).is_some_and(| dep | dep.is_waiting() || dep.awaits_plugin() ))
		.cloned()

}

/// Walks blocking dependencies from each waiting unit, earliest declared first,
/// and returns the first cycle found, starting at the node the walk re-entered.
fn find_cycle( registry: &Registry ) -> Option<Vec<UnitId>> {

	let mut explored = HashSet::new();

	for start in registry.waiting.values() {

		if explored.contains( start ) { continue }

		let mut path = Vec::new();
		let mut on_path = HashMap::new();
		let mut current = start.clone();

		loop {
			if let Some( &index ) = on_path.get( &current ) {
				return Some( path.split_off( index ));
			}
			if explored.contains( &current ) { break }
			on_path.insert( current.clone(), path.len() );
			path.push( current.clone() );
			match blocking_successor( registry, &current ) {
				Some( next ) => current = next,
				None => break,
			}
		}

		explored.extend( path );

	}

	None

}

/// Breaks (or, for acyclic contexts, fails) one edge of `cycle`.
///
/// The closing edge, from the last unit of the cycle back to its first, is preferred.
/// When it is not a dependency edge between units awaiting evaluation, earlier edges
/// are tried walking backwards.
fn resolve_cycle( registry: &mut Registry, cycle: &[UnitId] ) {

	let edge = ( 0..cycle.len() ).rev()
		.map(| index | ( index, ( index + 1 ) % cycle.len() ))
		.find(|&( from, to )| {
			let source = registry.units.get( &cycle[ from ])
				.is_some_and(| unit | unit.is_waiting() && unit.deps.contains( &cycle[ to ]));
			let target = registry.units.get( &cycle[ to ]).is_some_and( Unit::is_waiting );
			source && target
		});

	let Some(( from, to )) = edge else {
		tracing::error!( context = %registry.name, cycle = %cycle.iter().join( " -> " ), "dependency cycle has no breakable edge" );
		let error = LoadError::CycleUnresolvable( cycle.to_vec() );
		cycle.iter().for_each(| id | registry.fail( id, error.clone() ));
		return
	};

	// Rotated so that the cycle starts at the dependency and ends at the dependant.
	let rotated = cycle[ to.. ].iter().chain( &cycle[ ..to ]).cloned().collect::<Vec<_>>();

	match registry.settings.enforce_acyclic {
		true => {
			tracing::debug!( context = %registry.name, cycle = %rotated.iter().join( " -> " ), "cycle rejected" );
			registry.fail( &cycle[ from ], LoadError::CycleDetected( rotated ));
		},
		false => {
			tracing::debug!( context = %registry.name, from = %cycle[ from ], to = %cycle[ to ], "breaking dependency cycle" );
			registry.defer( &cycle[ from ], &cycle[ to ]);
		},
	}

}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::Definition ;
	use crate::registry::Resolved ;
	use crate::unit::UnitState ;

	fn registry( edges: &[( &str, &[&str] )] ) -> Registry {
		let mut registry = Registry::new( String::new() );
		for ( id, deps ) in edges {
			let id = UnitId::new( *id );
			if !registry.units.contains_key( &id ) { registry.create_unit( id.clone(), None ); }
			let deps = deps.iter().map(| dep | Resolved::canonical( UnitId::new( *dep ))).collect();
			registry.register_definition( &id, deps, Definition::value(()));
		}
		registry
	}

	#[test]
	fn breaks_the_closing_edge() {
		let mut registry = registry( &[( "m1", &[ "m2" ]), ( "m2", &[ "m3" ]), ( "m3", &[ "m1" ])]);
		assert_eq!( find_cycle( &registry ), Some( vec![ UnitId::new( "m1" ), UnitId::new( "m2" ), UnitId::new( "m3" )]));
		assert_eq!( next_evaluation( &mut registry ), Some( UnitId::new( "m3" )));
		assert!( registry.units[ "m3" ].deferred_deps.contains( "m1" ));
	}

	#[test]
	fn waits_while_units_are_in_flight() {
		let mut registry = registry( &[( "m1", &[ "m2" ]), ( "m2", &[ "m1", "m3" ])]);
		assert!( registry.begin_load( &UnitId::new( "m3" )).is_some() );
		assert_eq!( next_evaluation( &mut registry ), None );
		assert!( registry.units.values().all(| unit | unit.deferred_deps.is_empty() ));
	}

	#[test]
	fn rejects_cycles_when_acyclic() {
		let mut registry = registry( &[( "m1", &[ "m2" ]), ( "m2", &[ "m1" ])]);
		registry.settings.enforce_acyclic = true ;
		assert_eq!( next_evaluation( &mut registry ), None );
		match &registry.units[ "m2" ].error {
			Some( LoadError::CycleDetected( cycle )) => assert_eq!( cycle, &[ UnitId::new( "m1" ), UnitId::new( "m2" )]),
			other => panic!( "Expected a cycle error, found: {:?}", other ),
		}
		assert_eq!( registry.state( "m1" ), Some( UnitState::Error ));
	}

	#[test]
	fn ready_units_run_in_declaration_order() {
		let mut registry = registry( &[( "m1", &[ "m3" ]), ( "m2", &[] ), ( "m3", &[] )]);
		assert_eq!( registry.units[ "m1" ].unresolved, 1 );
		assert_eq!( registry.ready.len(), 2 );
		assert_eq!( next_evaluation( &mut registry ), Some( UnitId::new( "m2" )));
		let ( generation, seq ) = ( registry.units[ "m2" ].generation, registry.units[ "m2" ].seq );
		if let Some( seq ) = seq { registry.dequeue( seq ) }
		registry.finish( &UnitId::new( "m2" ), generation, Ok( crate::Value::unit() ));
		assert_eq!( next_evaluation( &mut registry ), Some( UnitId::new( "m3" )));
	}

	#[test]
	fn finishing_a_dependency_releases_its_dependants() {
		let mut registry = registry( &[( "m1", &[ "m2", "m3" ]), ( "m2", &[] ), ( "m3", &[] )]);
		for id in [ "m2", "m3" ] {
			let id = UnitId::new( id );
			let generation = registry.units[ &id ].generation ;
			if let Some( seq ) = registry.units[ &id ].seq { registry.dequeue( seq ) }
			registry.finish( &id, generation, Ok( crate::Value::unit() ));
		}
		assert_eq!( registry.units[ "m1" ].unresolved, 0 );
		assert_eq!( next_evaluation( &mut registry ), Some( UnitId::new( "m1" )));
	}

	#[test]
	fn paused_registry_evaluates_nothing() {
		let mut registry = registry( &[( "m1", &[] )]);
		registry.pause_depth = 1 ;
		assert_eq!( next_evaluation( &mut registry ), None );
		registry.pause_depth = 0 ;
		assert_eq!( next_evaluation( &mut registry ), Some( UnitId::new( "m1" )));
	}

}
