//! The require surface handed to definitions and plugins.

use std::ops::Deref ;

use crate::{ Context, Export, LoadError, UnitId, Value };



/// Requires units on behalf of one unit (or of the context's top level), so that
/// relative names resolve against that unit's directory.
#[derive( Clone, Debug )]
pub struct Requirer {
    context: Context,
    unit: Option<UnitId>,
}

impl Requirer {

    pub(crate) fn new( context: Context, unit: Option<UnitId> ) -> Self { Self { context, unit }}

    pub fn context( &self ) -> &Context { &self.context }

    /// The unit requests are made for; `None` at the top level.
    pub fn unit( &self ) -> Option<&UnitId> { self.unit.as_ref() }

    /// Normalizes `name` relative to the requesting unit.
    pub fn normalize( &self, name: &str ) -> Result<UnitId, LoadError> {
        self.context.normalize_from( name, self.unit.as_ref() )
    }

    /// Location `name` maps to, without the resource suffix.
    pub fn to_url( &self, name: &str ) -> Result<String, LoadError> {
        let id = self.normalize( name )?;
        Ok( self.context.uri_with_suffix( &id, "" ))
    }

    /// The export of `name` if it is ready. Otherwise starts loading it and returns `None`.
    pub fn get( &self, name: &str ) -> Result<Option<Value>, LoadError> {
        self.context.try_require_from( name, self.unit.as_ref() )
    }

    /// Requires `names` and calls `callback` with their exports, in order, once all
    /// are ready, or with the first error.
    pub fn require<N: AsRef<str>>(
        &self,
        names: impl IntoIterator<Item = N>,
        callback: impl FnOnce( Result<Vec<Value>, LoadError> ) + 'static,
    ) {
        let names = names.into_iter().map(| name | name.as_ref().to_string() ).collect();
        self.context.require_from( names, self.unit.as_ref(), Box::new( callback ));
    }

    /// Requires a single unit.
    pub fn require_one( &self, name: &str, callback: impl FnOnce( Result<Value, LoadError> ) + 'static ) {
        let id = UnitId::new( name );
        self.require([ name ], move | result | callback(
            result.and_then(| mut values | values.pop().ok_or( LoadError::NotFound( id )))
        ));
    }

}

/// What a unit's factory sees while it runs.
///
/// Dereferences to a [`Requirer`] bound to the unit. Dependency handles are in
/// declaration order. A handle may still be empty when the dependency was deferred
/// to break a cycle; it is populated once that dependency is evaluated.
#[derive( Debug )]
pub struct Scope {
    requirer: Requirer,
    id: UnitId,
    deps: Vec<Export>,
    config: Option<serde_json::Value>,
}

impl Scope {

    pub(crate) fn new( context: Context, id: UnitId, deps: Vec<Export>, config: Option<serde_json::Value> ) -> Self {
        Self { requirer: Requirer::new( context, Some( id.clone() )), id, deps, config }
    }

    /// The unit being defined.
    pub fn id( &self ) -> &UnitId { &self.id }

    /// Handles to the unit's dependencies in declaration order.
    pub fn deps( &self ) -> &[Export] { &self.deps }

    pub fn dep( &self, index: usize ) -> Option<&Export> { self.deps.get( index ) }

    /// The value of dependency `index`, `None` if it has not been published yet.
    pub fn dep_value( &self, index: usize ) -> Option<Value> { self.deps.get( index ).and_then( Export::value ) }

    /// The per-unit configuration blob, if one was configured for this unit.
    pub fn config( &self ) -> Option<&serde_json::Value> { self.config.as_ref() }

    /// Registers `hook` to run when the unit is unloaded. Hooks run in reverse
    /// registration order.
    pub fn on_unload( &self, hook: impl FnOnce( &UnitId ) + 'static ) {
        self.requirer.context.push_unload_hook( &self.id, Box::new( hook ));
    }

}

impl Deref for Scope {
    type Target = Requirer ;
    fn deref( &self ) -> &Requirer { &self.requirer }
}
