use std::sync::Arc ;
use itertools::Itertools ;
use thiserror::Error ;

use crate::UnitId ;



/// Boxed error returned by definitions, loaders and plugins.
pub type BoxError = Box<dyn std::error::Error + Send + Sync> ;

/// Shared error source. Failures are delivered to every waiter of a unit, so the
/// underlying cause is reference counted rather than owned.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync> ;

/// Errors produced while resolving, loading or evaluating units.
///
/// `LoadFailure` and `DefinitionFailure` move the affected unit into its error state
/// and are delivered to all of its current and future waiters, as well as to units
/// still waiting on it. `NotFound` and `InvalidName` are only ever returned to the
/// caller that made the request; no unit is created for them. `ReentrancyViolation`
/// and `CycleUnresolvable` signal misuse or an internal inconsistency and are never
/// swallowed.
#[derive( Debug, Clone, Error )]
pub enum LoadError {

	/// No backing resource and no plugin could produce the unit.
	#[error( "Unit not found: '{0}'" )]
	NotFound( UnitId ),

	/// The loader failed to fetch or parse the unit's resource.
	#[error( "Failed to load '{id}': {reason}" )]
	LoadFailure { id: UnitId, #[source] reason: SharedError },

	/// The unit's definition returned an error.
	#[error( "Definition of '{id}' failed: {reason}" )]
	DefinitionFailure { id: UnitId, #[source] reason: SharedError },

	/// A dependency cycle was found while cycles are forbidden for the context.
	/// Holds the cycle starting at the unit the closing edge points to.
	#[error( "Cycle detected: {}", .0.iter().join( " -> " ))]
	CycleDetected( Vec<UnitId> ),

	/// Units are waiting on each other but no cycle could be found to break.
	#[error( "Unable to make progress, units stuck waiting: {}", .0.iter().join( ", " ))]
	CycleUnresolvable( Vec<UnitId> ),

	/// Pause and unpause calls are unbalanced.
	#[error( "Reentrancy violation: {0}" )]
	ReentrancyViolation( &'static str ),

	/// The unit was unloaded while the request was outstanding.
	#[error( "Unit '{0}' was unloaded" )]
	Unloaded( UnitId ),

	/// A definition was supplied for a unit that already has one.
	#[error( "Unit '{0}' defined more than once" )]
	DefinedTwice( UnitId ),

	/// The name can not be normalized, e.g. `..` segments escape the base.
	#[error( "Invalid name '{name}': {reason}" )]
	InvalidName { name: String, reason: &'static str },

	/// A `prefix!name` request was made but the prefix unit does not export a plugin.
	#[error( "Unit '{0}' is not a plugin" )]
	NotAPlugin( UnitId ),

}

impl LoadError {

	pub(crate) fn load_failure( id: &UnitId, reason: impl Into<BoxError> ) -> Self {
		Self::LoadFailure { id: id.clone(), reason: Arc::from( reason.into() )}
	}

	pub(crate) fn definition_failure( id: &UnitId, reason: impl Into<BoxError> ) -> Self {
		Self::DefinitionFailure { id: id.clone(), reason: Arc::from( reason.into() )}
	}

	/// The unit the error originated from, when it is tied to one.
	pub fn unit( &self ) -> Option<&UnitId> {
		match self {
			Self::NotFound( id )
			| Self::LoadFailure { id, .. }
			| Self::DefinitionFailure { id, .. }
			| Self::Unloaded( id )
			| Self::DefinedTwice( id )
			| Self::NotAPlugin( id ) => Some( id ),
			Self::CycleDetected( cycle ) => cycle.last(),
			Self::CycleUnresolvable( _ )
			| Self::ReentrancyViolation( _ )
			| Self::InvalidName { .. } => None,
		}
	}

}
