//! Read-only queries over realized dependency edges.
//!
//! An edge exists once a unit's dependencies are known, i.e. from
//! [`UnitState::LoadedWaiting`]( crate::UnitState::LoadedWaiting ) on. Edges deferred
//! to break a cycle are still edges. Traversal visits dependencies in declaration
//! order, so among equally short paths the one through earlier declared
//! dependencies is found.

use std::collections::{ HashMap, HashSet, VecDeque };
use nonempty_collections::NEVec ;

use crate::registry::Registry ;
use crate::UnitId ;



fn deps<'a>( registry: &'a Registry, id: &UnitId ) -> &'a [UnitId] {
    registry.units.get( id ).map(| unit | unit.deps.as_slice() ).unwrap_or_default()
}

/// Shortest chain of dependency edges leading from `start` to `goal`, both
/// included. `[start]` when they are the same unit.
pub(crate) fn find_path( registry: &Registry, start: &UnitId, goal: &UnitId ) -> Option<NEVec<UnitId>> {

    if start == goal { return Some( NEVec::new( start.clone() )) }

    let mut parents = HashMap::<&UnitId, &UnitId>::new();
    let mut queue = VecDeque::from([ start ]);

    while let Some( current ) = queue.pop_front() {
        for dep in deps( registry, current ) {
            if dep == start || parents.contains_key( dep ) { continue }
            parents.insert( dep, current );
            if dep == goal { return Some( unwind( &parents, start, goal )) }
            queue.push_back( dep );
        }
    }

    None

}

fn unwind( parents: &HashMap<&UnitId, &UnitId>, start: &UnitId, goal: &UnitId ) -> NEVec<UnitId> {
    let mut chain = vec![ goal.clone() ];
    let mut current = goal ;
    while let Some( &parent ) = parents.get( current ) {
        chain.push( parent.clone() );
        current = parent ;
    }
    debug_assert!( current == start );
    let mut path = NEVec::new( start.clone() );
    chain.into_iter().rev().skip( 1 ).for_each(| id | path.push( id ));
    path
}

/// Whether `user` reaches `supplier` through dependency edges. A unit counts as
/// requiring itself.
pub(crate) fn is_required_by( registry: &Registry, supplier: &UnitId, user: &UnitId ) -> bool {

    if supplier == user { return true }

    let mut visited = HashSet::from([ user ]);
    let mut queue = VecDeque::from([ user ]);

    while let Some( current ) = queue.pop_front() {
        for dep in deps( registry, current ) {
            if dep == supplier { return true }
            if visited.insert( dep ) { queue.push_back( dep ) }
        }
    }

    false

}

#[cfg( test )]
mod tests {

    use super::* ;
    use crate::Definition ;
    use crate::registry::Resolved ;

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

    fn ids( path: NEVec<UnitId> ) -> Vec<String> { path.into_iter().map( String::from ).collect() }

    #[test]
    fn finds_shortest_path_preferring_earlier_dependencies() {
        let registry = registry( &[
            ( "a", &[ "b", "c" ]),
            ( "b", &[ "d" ]),
            ( "c", &[ "d" ]),
            ( "d", &[] ),
        ]);
        let path = find_path( &registry, &UnitId::new( "a" ), &UnitId::new( "d" ));
        assert_eq!( path.map( ids ), Some( vec![ "a".to_string(), "b".to_string(), "d".to_string() ]));
    }

    #[test]
    fn path_to_self_is_the_unit_alone() {
        let registry = registry( &[( "a", &[] )]);
        let path = find_path( &registry, &UnitId::new( "a" ), &UnitId::new( "a" ));
        assert_eq!( path.map( ids ), Some( vec![ "a".to_string() ]));
        assert!( is_required_by( &registry, &UnitId::new( "a" ), &UnitId::new( "a" )));
    }

    #[test]
    fn unreachable_goal_has_no_path() {
        let registry = registry( &[( "a", &[ "b" ]), ( "b", &[] ), ( "c", &[] )]);
        assert!( find_path( &registry, &UnitId::new( "a" ), &UnitId::new( "c" )).is_none() );
        assert!( !is_required_by( &registry, &UnitId::new( "c" ), &UnitId::new( "a" )));
        assert!( !is_required_by( &registry, &UnitId::new( "a" ), &UnitId::new( "c" )));
    }

    #[test]
    fn cycles_terminate() {
        let registry = registry( &[( "a", &[ "b" ]), ( "b", &[ "c" ]), ( "c", &[ "a" ])]);
        let path = find_path( &registry, &UnitId::new( "a" ), &UnitId::new( "c" ));
        assert_eq!( path.map( ids ), Some( vec![ "a".to_string(), "b".to_string(), "c".to_string() ]));
        assert!( is_required_by( &registry, &UnitId::new( "a" ), &UnitId::new( "c" )));
        assert!( find_path( &registry, &UnitId::new( "a" ), &UnitId::new( "x" )).is_none() );
    }

}
