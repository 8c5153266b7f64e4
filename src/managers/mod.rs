// syncmarks state managers
// The client-side synchronization core: session guard, bookmark store, reconciler,
// mutation gateway and change feed listener.

pub mod bookmark_store;
pub mod change_feed_listener;
pub mod mutation_gateway;
pub mod reconciler;
pub mod session_guard;
