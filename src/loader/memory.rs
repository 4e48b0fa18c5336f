//! An in-memory [`Loader`] for hosts that register their units up front, and for tests.

use std::cell::RefCell ;
use std::collections::{ HashMap, VecDeque };
use std::rc::Rc ;
use pipe_trait::Pipe ;

use crate::{ BoxError, LoadRequest, Loader, Resource, UnitId };



type Producer = Rc<dyn Fn( &UnitId ) -> Result<Resource, BoxError>> ;
type TextParser = Rc<dyn Fn( &UnitId, &str ) -> Result<Resource, BoxError>> ;

/// When a [`MemoryLoader`] settles the requests it receives.
#[derive( Copy, Clone, Debug, Default, Eq, PartialEq )]
pub enum Delivery {
    /// Within the `load` call.
    #[default]
    Immediate,
    /// Only when asked to through [`MemoryLoader::complete`] and friends.
    Deferred,
}

/// Serves resources from producers registered by id.
///
/// Every request is recorded, so the order in which a context dispatches loads can
/// be inspected with [`dispatched`]( Self::dispatched ). Ids with no producer are
/// reported as not found.
#[derive( Default )]
pub struct MemoryLoader {
    delivery: Delivery,
    producers: RefCell<HashMap<UnitId, Producer>>,
    text_parser: Option<TextParser>,
    queue: RefCell<VecDeque<LoadRequest>>,
    dispatched: RefCell<Vec<UnitId>>,
    undefined: RefCell<Vec<UnitId>>,
}

impl MemoryLoader {

    pub fn new() -> Self { Self::default() }

    /// A loader that holds on to requests until they are completed explicitly.
    pub fn deferred() -> Self { Self { delivery: Delivery::Deferred, ..Self::default() }}

    /// Registers `producer` for `id`, builder style.
    pub fn with(
        self,
        id: impl Into<UnitId>,
        producer: impl Fn( &UnitId ) -> Result<Resource, BoxError> + 'static,
    ) -> Self {
        self.insert( id, producer );
        self
    }

    /// Registers `producer` for `id`, replacing any previous one.
    pub fn insert(
        &self,
        id: impl Into<UnitId>,
        producer: impl Fn( &UnitId ) -> Result<Resource, BoxError> + 'static,
    ) {
        self.producers.borrow_mut().insert( id.into(), Rc::new( producer ));
    }

    /// Parser used when a unit's completion hands back source text.
    pub fn with_text_parser( mut self, parser: impl Fn( &UnitId, &str ) -> Result<Resource, BoxError> + 'static ) -> Self {
        self.text_parser = Some( Rc::new( parser ));
        self
    }

    pub fn delivery( &self ) -> Delivery { self.delivery }

    /// Ids of every load request received, in order.
    pub fn dispatched( &self ) -> Vec<UnitId> { self.dispatched.borrow().clone() }

    /// Ids passed to [`Loader::undefine`], in order.
    pub fn undefined( &self ) -> Vec<UnitId> { self.undefined.borrow().clone() }

    /// Ids of requests not yet completed, in arrival order.
    pub fn pending( &self ) -> Vec<UnitId> {
        self.queue.borrow().iter().map(| request | request.id().clone() ).collect()
    }

    /// Completes the queued request for `id`. Returns whether one was queued.
    pub fn complete( &self, id: &str ) -> bool {
        let request = {
            let mut queue = self.queue.borrow_mut();
            queue.iter().position(| request | request.id() == id ).and_then(| index | queue.remove( index ))
        };
        match request {
            Some( request ) => { self.serve( request ); true },
            None => false,
        }
    }

    /// Completes the oldest queued request. Returns whether one was queued.
    pub fn complete_next( &self ) -> bool {
        let request = self.queue.borrow_mut().pop_front();
        match request {
            Some( request ) => { self.serve( request ); true },
            None => false,
        }
    }

    /// Completes queued requests, including those queued while completing, until
    /// none are left. Returns how many were completed.
    pub fn flush( &self ) -> usize {
        std::iter::from_fn(|| self.complete_next().then_some(()) ).count()
    }

    /// Takes the queued request for `id` so the caller can settle it by hand.
    pub fn take( &self, id: &str ) -> Option<LoadRequest> {
        let mut queue = self.queue.borrow_mut();
        queue.iter().position(| request | request.id() == id ).and_then(| index | queue.remove( index ))
    }

    fn serve( &self, request: LoadRequest ) {
        let producer = self.producers.borrow().get( request.id() ).cloned();
        match producer {
            None => request.not_found(),
            Some( producer ) => match producer( request.id() ) {
                Ok( resource ) => request.define( resource ),
                Err( err ) => request.fail( err ),
            },
        }
    }

}

impl Loader for MemoryLoader {

    fn exists( &self, id: &UnitId, _uri: &str ) -> bool {
        self.producers.borrow().contains_key( id )
    }

    fn load( &self, request: LoadRequest ) {
        tracing::debug!( unit = %request.id(), uri = request.uri(), "memory loader received request" );
        self.dispatched.borrow_mut().push( request.id().clone() );
        match self.delivery {
            Delivery::Immediate => self.serve( request ),
            Delivery::Deferred => self.queue.borrow_mut().push_back( request ),
        }
    }

    fn load_text( &self, request: LoadRequest, text: String ) {
        match &self.text_parser {
            None => request.fail( "no text parser configured" ),
            Some( parser ) => match parser( request.id(), &text ) {
                Ok( resource ) => request.define( resource ),
                Err( err ) => request.fail( err ),
            },
        }
    }

    fn undefine( &self, id: &UnitId ) {
        self.undefined.borrow_mut().push( id.clone() );
    }

}

impl std::fmt::Debug for MemoryLoader {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "MemoryLoader" )
            .field( "delivery", &self.delivery )
            .field( "producers", &self.producers.borrow().keys().cloned().collect::<Vec<_>>().pipe(| mut ids | { ids.sort(); ids }))
            .field( "pending", &self.pending() )
            .finish_non_exhaustive()
    }
}
