//! The host I/O adapter.
//!
//! A context never fetches anything itself. When a unit needs its resource the
//! context hands a [`LoadRequest`] to its [`Loader`]; the loader reports back through
//! the request's [`Completion`], either immediately or at any later point.

use std::rc::{ Rc, Weak };

use crate::context::{ Context, Inner };
use crate::{ BoxError, LoadError, Resource, UnitId, Value };

pub mod memory ;



/// Host side of resource loading.
pub trait Loader {

    /// Whether a resource exists for `id` at `uri`. Checked before a unit is created
    /// for a caller's request so that unknown names are reported to that caller only.
    /// Loaders that cannot tell cheaply keep the default and report missing resources
    /// through [`Completion::not_found`].
    fn exists( &self, _id: &UnitId, _uri: &str ) -> bool { true }

    /// Starts fetching the resource for `request`.
    fn load( &self, request: LoadRequest );

    /// Parses source text handed back through [`Completion::from_text`].
    fn load_text( &self, request: LoadRequest, _text: String ) {
        let reason = format!( "loader cannot evaluate source text for '{}'", request.id() );
        request.fail( reason );
    }

    /// Forgets anything cached for `id`. Called when the unit is unloaded.
    fn undefine( &self, _id: &UnitId ) {}

}

impl<L: Loader + ?Sized> Loader for Rc<L> {
    fn exists( &self, id: &UnitId, uri: &str ) -> bool { ( **self ).exists( id, uri ) }
    fn load( &self, request: LoadRequest ) { ( **self ).load( request ) }
    fn load_text( &self, request: LoadRequest, text: String ) { ( **self ).load_text( request, text ) }
    fn undefine( &self, id: &UnitId ) { ( **self ).undefine( id ) }
}

/// What a completion reports for its unit.
pub(crate) enum Outcome {
    Resource( Resource ),
    Failed( LoadError ),
    NotFound,
    NoDefine,
    Text( String ),
}

/// One-shot continuation through which a loader (or plugin) settles a unit.
///
/// Holds only a weak reference to its context, so outstanding completions do not
/// keep a dropped context alive. Completions for a unit that has since been unloaded,
/// or completed by other means, are ignored. Dropping a completion without using it
/// fails the unit.
#[must_use = "a dropped completion fails its unit"]
pub struct Completion {
    context: Weak<Inner>,
    id: UnitId,
    generation: u64,
    settled: bool,
}

impl Completion {

    pub(crate) fn new( context: &Rc<Inner>, id: UnitId, generation: u64 ) -> Self {
        Self { context: Rc::downgrade( context ), id, generation, settled: false }
    }

    /// The unit this completion settles.
    pub fn id( &self ) -> &UnitId { &self.id }

    /// Reports the parsed resource.
    pub fn define( mut self, resource: Resource ) { self.settle( Outcome::Resource( resource )) }

    /// Reports a dependency-free resource exporting `value`.
    pub fn value( self, value: Value ) { self.define( Resource::value( value )) }

    /// Reports that fetching or parsing failed.
    pub fn fail( mut self, reason: impl Into<BoxError> ) {
        let error = LoadError::load_failure( &self.id, reason );
        self.settle( Outcome::Failed( error ));
    }

    /// Reports that no resource exists for the unit. The unit is discarded and
    /// everything waiting on it receives [`LoadError::NotFound`].
    pub fn not_found( mut self ) { self.settle( Outcome::NotFound ) }

    /// Reports that the resource loaded but defined nothing. The unit exports
    /// [`Value::unit`] unless the context enforces definitions.
    pub fn no_define( mut self ) { self.settle( Outcome::NoDefine ) }

    /// Hands source text back to the loader's [`Loader::load_text`] for evaluation.
    pub fn from_text( mut self, text: impl Into<String> ) { self.settle( Outcome::Text( text.into() )) }

    fn settle( &mut self, outcome: Outcome ) {
        self.settled = true ;
        match self.context.upgrade() {
            Some( inner ) => Context::from_inner( inner ).complete( &self.id, self.generation, outcome ),
            None => tracing::debug!( unit = %self.id, "completion outlived its context" ),
        }
    }

}

impl Drop for Completion {
    fn drop( &mut self ) {
        if self.settled { return }
        tracing::warn!( unit = %self.id, "completion dropped without settling its unit" );
        let error = LoadError::load_failure( &self.id, "completion dropped without a result" );
        self.settle( Outcome::Failed( error ));
    }
}

impl std::fmt::Debug for Completion {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "Completion" )
            .field( "id", &self.id )
            .field( "generation", &self.generation )
            .finish_non_exhaustive()
    }
}

/// A request to fetch the resource of one unit.
///
/// Like its [`Completion`], a request only refers weakly to its context, so a loader
/// owned by the context may queue requests without keeping the context alive.
#[derive( Debug )]
pub struct LoadRequest {
    id: UnitId,
    uri: String,
    completion: Completion,
}

impl LoadRequest {

    pub(crate) fn new( id: UnitId, uri: String, completion: Completion ) -> Self {
        Self { id, uri, completion }
    }

    /// Canonical id of the unit.
    pub fn id( &self ) -> &UnitId { &self.id }

    /// Location the unit maps to under the context's configuration.
    pub fn uri( &self ) -> &str { &self.uri }

    /// The context the unit belongs to, unless it has been dropped since.
    pub fn context( &self ) -> Option<Context> { self.completion.context.upgrade().map( Context::from_inner ) }

    /// Detaches the completion, e.g. to settle the unit asynchronously.
    pub fn into_completion( self ) -> Completion { self.completion }

    pub fn define( self, resource: Resource ) { self.completion.define( resource ) }

    pub fn value( self, value: Value ) { self.completion.value( value ) }

    pub fn fail( self, reason: impl Into<BoxError> ) { self.completion.fail( reason ) }

    pub fn not_found( self ) { self.completion.not_found() }

    pub fn no_define( self ) { self.completion.no_define() }

    pub fn from_text( self, text: impl Into<String> ) { self.completion.from_text( text ) }

}
